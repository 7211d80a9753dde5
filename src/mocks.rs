// This file is only compiled during tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::accelerometer::{Acceleration, Accelerometer};
use crate::buttons::{ButtonEvent, ButtonSource};
use crate::display::{Display, DisplayCommand, Icon};
use crate::error::{Error, Result};
use crate::radio::Radio;

#[derive(Debug, Default)]
struct RadioLog {
    group: Option<u8>,
    group_changes: usize,
    power: Option<u8>,
    frames: Vec<String>,
}

/// Records everything sent; clones share the same log.
#[derive(Clone, Default)]
pub struct MockRadio {
    log: Arc<Mutex<RadioLog>>,
}

impl MockRadio {
    pub fn group(&self) -> Option<u8> {
        self.log.lock().unwrap().group
    }

    pub fn group_changes(&self) -> usize {
        self.log.lock().unwrap().group_changes
    }

    pub fn power(&self) -> Option<u8> {
        self.log.lock().unwrap().power
    }

    pub fn frames(&self) -> Vec<String> {
        self.log.lock().unwrap().frames.clone()
    }
}

impl Radio for MockRadio {
    fn set_group(&mut self, group: u8) {
        let mut log = self.log.lock().unwrap();
        log.group = Some(group);
        log.group_changes += 1;
    }

    fn set_transmit_power(&mut self, power: u8) {
        self.log.lock().unwrap().power = Some(power);
    }

    fn send_text(&mut self, text: &str) {
        self.log.lock().unwrap().frames.push(text.to_string());
    }
}

/// Returns whatever sample was last set, or fails on demand.
#[derive(Clone)]
pub struct MockAccelerometer {
    sample: Arc<Mutex<Acceleration>>,
    failing: Arc<Mutex<bool>>,
}

impl MockAccelerometer {
    pub fn level() -> Self {
        MockAccelerometer {
            sample: Arc::new(Mutex::new(Acceleration { x: 0, y: 0, z: 1024 })),
            failing: Arc::new(Mutex::new(false)),
        }
    }

    pub fn set(&self, x: i16, y: i16) {
        let mut sample = self.sample.lock().unwrap();
        sample.x = x;
        sample.y = y;
    }

    pub fn fail(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }
}

impl Accelerometer for MockAccelerometer {
    fn read(&mut self) -> Result<Acceleration> {
        if *self.failing.lock().unwrap() {
            return Err(Error::Io(std::io::Error::other("mock bus error")));
        }
        Ok(*self.sample.lock().unwrap())
    }
}

/// Records display commands; clones share the same log.
#[derive(Clone, Default)]
pub struct MockDisplay {
    commands: Arc<Mutex<Vec<DisplayCommand>>>,
}

impl MockDisplay {
    pub fn commands(&self) -> Vec<DisplayCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.commands.lock().unwrap().clear();
    }
}

impl Display for MockDisplay {
    fn show_icon(&mut self, icon: Icon) {
        self.commands.lock().unwrap().push(DisplayCommand::Icon(icon));
    }

    fn show_string(&mut self, text: &str) {
        self.commands.lock().unwrap().push(DisplayCommand::Text(text.to_string()));
    }

    fn plot(&mut self, x: u8, y: u8) {
        self.commands.lock().unwrap().push(DisplayCommand::Plot(x, y));
    }

    fn unplot(&mut self, x: u8, y: u8) {
        self.commands.lock().unwrap().push(DisplayCommand::Unplot(x, y));
    }
}

/// Hands out a fixed list of events, one per poll.
pub struct ScriptedButtons {
    events: VecDeque<ButtonEvent>,
}

impl ScriptedButtons {
    pub fn new(events: &[ButtonEvent]) -> Self {
        ScriptedButtons {
            events: events.iter().copied().collect(),
        }
    }
}

impl ButtonSource for ScriptedButtons {
    fn poll(&mut self) -> Option<ButtonEvent> {
        self.events.pop_front()
    }
}
