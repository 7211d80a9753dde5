use log::{debug, info};
use rppal::gpio::{Gpio, InputPin, Level};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    A,
    B,
    AB, // Both held together, fired once both are released
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Edge {
    Rising,
    Falling,
}

/// Something that produces button events when polled.
pub trait ButtonSource {
    fn poll(&mut self) -> Option<ButtonEvent>;
}

/// Anything that reacts to button events.
pub trait ButtonHandler {
    fn dispatch(&mut self, event: ButtonEvent);
}

struct Debouncer {
    current: bool,
    last_stable: bool,
    last_change: Instant,
    debounce: Duration,
}

impl Debouncer {
    fn new(debounce: Duration, now: Instant) -> Self {
        Debouncer {
            current: false,
            last_stable: false,
            last_change: now,
            debounce,
        }
    }

    fn update(&mut self, pressed: bool, now: Instant) -> Option<Edge> {
        if pressed != self.current {
            self.current = pressed;
            self.last_change = now;
            return None;
        }

        if now.duration_since(self.last_change) >= self.debounce && self.current != self.last_stable {
            self.last_stable = self.current;
            return Some(if self.current { Edge::Rising } else { Edge::Falling });
        }

        None
    }
}

/// Turns debounced press/release edges of the two buttons into events.
#[derive(Debug, Default)]
pub struct GestureTracker {
    held: [bool; 2],
    combined: bool,
}

impl GestureTracker {
    /// `button` is 0 for A, 1 for B.
    pub fn on_edge(&mut self, button: usize, edge: Edge) -> Option<ButtonEvent> {
        match edge {
            Edge::Rising => {
                self.held[button] = true;
                if self.held[0] && self.held[1] {
                    self.combined = true;
                }
                None
            }
            Edge::Falling => {
                if !self.held[button] {
                    return None;
                }
                self.held[button] = false;

                if self.combined {
                    if self.held.iter().any(|&h| h) {
                        return None;
                    }
                    self.combined = false;
                    return Some(ButtonEvent::AB);
                }

                Some(if button == 0 { ButtonEvent::A } else { ButtonEvent::B })
            }
        }
    }
}

/// Buttons A and B on GPIO inputs, wired active low with pull-ups.
pub struct ButtonPad {
    pins: [InputPin; 2],
    debouncers: [Debouncer; 2],
    gestures: GestureTracker,
}

impl ButtonPad {
    pub fn new(pin_a: u8, pin_b: u8, debounce: Duration) -> Result<Self> {
        let gpio = Gpio::new()?;
        let a = gpio.get(pin_a)?.into_input_pullup();
        info!("GPIO {} initialized (button A)", pin_a);
        let b = gpio.get(pin_b)?.into_input_pullup();
        info!("GPIO {} initialized (button B)", pin_b);

        let now = Instant::now();
        Ok(ButtonPad {
            pins: [a, b],
            debouncers: [Debouncer::new(debounce, now), Debouncer::new(debounce, now)],
            gestures: GestureTracker::default(),
        })
    }
}

impl ButtonSource for ButtonPad {
    fn poll(&mut self) -> Option<ButtonEvent> {
        let now = Instant::now();
        let mut event = None;
        for (i, pin) in self.pins.iter().enumerate() {
            let pressed = pin.read() == Level::Low;
            if let Some(edge) = self.debouncers[i].update(pressed, now) {
                debug!("Button {} {:?}", i, edge);
                event = event.or(self.gestures.on_edge(i, edge));
            }
        }
        event
    }
}

pub fn poll_once<B: ButtonSource, H: ButtonHandler>(buttons: &mut B, handler: &mut H) -> Option<ButtonEvent> {
    let event = buttons.poll()?;
    info!("[EVENT] Button {:?}", event);
    handler.dispatch(event);
    Some(event)
}

pub fn button_thread<B: ButtonSource, H: ButtonHandler>(mut buttons: B, mut handler: H, poll: Duration) {
    loop {
        poll_once(&mut buttons, &mut handler);
        thread::sleep(poll);
    }
}
