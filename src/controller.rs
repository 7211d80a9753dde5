use log::{debug, info, warn};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::accelerometer::{Acceleration, Accelerometer, Dimension};
use crate::buttons::{ButtonEvent, ButtonHandler};
use crate::config::Settings;
use crate::display::{Display, Icon};
use crate::mixer::ChannelMixer;
use crate::packet::RcPacket;
use crate::radio::Radio;
use crate::state::ControllerState;

pub const LIVENESS_PIXEL: (u8, u8) = (2, 4);
const LIVENESS_PERIOD_MS: u128 = 200;
const LIVENESS_ON_MS: u128 = 100;

/// Reads tilt, mixes it with the button-driven throttle and yaw, and
/// broadcasts one frame per cycle.
///
/// Starts `Idle`. `start` moves it to `Active` for good; there is no way
/// back.
pub struct Controller<R, A, D> {
    state: Arc<ControllerState>,
    radio: R,
    accelerometer: A,
    display: D,
    mixer: ChannelMixer,
    transmit_power: u8,
    period: Duration,
    epoch: Instant,
    sensor_ok: bool,
}

impl<R: Radio, A: Accelerometer, D: Display + Clone> Controller<R, A, D> {
    pub fn new(radio: R, accelerometer: A, display: D, settings: &Settings) -> Self {
        Controller {
            state: Arc::new(ControllerState::default()),
            radio,
            accelerometer,
            display,
            mixer: settings.mixer(),
            transmit_power: settings.transmit_power,
            period: settings.period(),
            epoch: Instant::now(),
            sensor_ok: true,
        }
    }

    pub fn state(&self) -> &Arc<ControllerState> {
        &self.state
    }

    /// Tunes the radio, centers the sticks and goes `Active`.
    ///
    /// Returns the button bindings to register, only on the first call;
    /// starting an active controller does nothing.
    pub fn start(&mut self, group: u8) -> Option<ButtonBindings<D>> {
        if self.state.is_active() {
            debug!("Controller already active, start ignored");
            return None;
        }

        self.radio.set_group(group);
        self.radio.set_transmit_power(self.transmit_power);

        self.state.center();
        self.state.activate();
        self.display.show_icon(Icon::No);
        info!("Controller active on radio group {}", group);

        Some(ButtonBindings {
            state: Arc::clone(&self.state),
            display: self.display.clone(),
        })
    }

    /// One transmit cycle. Returns the packet sent, or `None` while idle.
    pub fn transmit_cycle(&mut self) -> Option<RcPacket> {
        let elapsed = self.epoch.elapsed();
        self.cycle_at(elapsed)
    }

    fn cycle_at(&mut self, elapsed: Duration) -> Option<RcPacket> {
        if !self.state.is_active() {
            return None;
        }

        let sample = self.read_sample();
        let roll = self.mixer.transform_tilt(i32::from(sample.axis(Dimension::X)));
        // Y is negated so tilting forward pitches down
        let pitch = self.mixer.transform_tilt(-i32::from(sample.axis(Dimension::Y)));

        let packet = RcPacket {
            throttle: self.state.throttle(),
            roll,
            pitch,
            yaw: self.state.yaw(),
        };

        let frame = packet.to_string();
        debug!("TX {}", frame);
        self.radio.send_text(&frame);

        self.update_liveness(elapsed);
        Some(packet)
    }

    /// Runs the transmit cycle forever, pausing `period` after each one.
    pub fn run(&mut self) -> ! {
        info!("Transmitting every {:?}", self.period);
        loop {
            self.transmit_cycle();
            thread::sleep(self.period);
        }
    }

    /// A failed read counts as a level board for that cycle.
    fn read_sample(&mut self) -> Acceleration {
        match self.accelerometer.read() {
            Ok(sample) => {
                if !self.sensor_ok {
                    info!("Accelerometer readings recovered");
                    self.sensor_ok = true;
                }
                sample
            }
            Err(e) => {
                if self.sensor_ok {
                    warn!("Accelerometer read failed, centering roll/pitch: {}", e);
                    self.sensor_ok = false;
                } else {
                    debug!("Accelerometer read failed: {}", e);
                }
                Acceleration::default()
            }
        }
    }

    /// Set every cycle: an icon drawn from the button thread may have
    /// overwritten the pixel since the last one.
    fn update_liveness(&mut self, elapsed: Duration) {
        let lit = elapsed.as_millis() % LIVENESS_PERIOD_MS < LIVENESS_ON_MS;
        let (x, y) = LIVENESS_PIXEL;
        if lit {
            self.display.plot(x, y);
        } else {
            self.display.unplot(x, y);
        }
    }
}

/// Button handlers registered by `Controller::start`.
pub struct ButtonBindings<D> {
    state: Arc<ControllerState>,
    display: D,
}

impl<D: Display> ButtonHandler for ButtonBindings<D> {
    fn dispatch(&mut self, event: ButtonEvent) {
        if !self.state.is_active() {
            return;
        }

        match event {
            ButtonEvent::A => {
                let throttle = self.state.decrease_throttle();
                info!("Throttle {}", throttle);
            }
            ButtonEvent::B => {
                let throttle = self.state.increase_throttle();
                info!("Throttle {}", throttle);
            }
            ButtonEvent::AB => {
                self.state.center();
                self.display.show_icon(Icon::Target);
                info!("Throttle and yaw centered");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buttons::poll_once;
    use crate::display::{DisplayCommand, Screen};
    use crate::mocks::{MockAccelerometer, MockDisplay, MockRadio, ScriptedButtons};
    use crate::state::Lifecycle;

    type TestController = Controller<MockRadio, MockAccelerometer, MockDisplay>;

    fn controller() -> (TestController, MockRadio, MockAccelerometer, MockDisplay) {
        let radio = MockRadio::default();
        let accelerometer = MockAccelerometer::level();
        let display = MockDisplay::default();
        let controller = Controller::new(
            radio.clone(),
            accelerometer.clone(),
            display.clone(),
            &Settings::default(),
        );
        (controller, radio, accelerometer, display)
    }

    #[test]
    fn test_idle_controller_sends_nothing() {
        let (mut controller, radio, _, display) = controller();
        assert_eq!(controller.state().lifecycle(), Lifecycle::Idle);
        assert_eq!(controller.transmit_cycle(), None);
        assert!(radio.frames().is_empty());
        assert!(display.commands().is_empty());
    }

    #[test]
    fn test_start_configures_radio_and_state() {
        let (mut controller, radio, _, display) = controller();
        assert!(controller.start(9).is_some());

        assert_eq!(radio.group(), Some(9));
        assert_eq!(radio.power(), Some(7));
        assert_eq!(controller.state().throttle(), 0);
        assert_eq!(controller.state().yaw(), 512);
        assert_eq!(controller.state().lifecycle(), Lifecycle::Active);
        assert_eq!(display.commands(), vec![DisplayCommand::Icon(Icon::No)]);
    }

    #[test]
    fn test_second_start_is_ignored() {
        let (mut controller, radio, _, display) = controller();
        let mut bindings = controller.start(1).unwrap();
        bindings.dispatch(ButtonEvent::B);

        assert!(controller.start(2).is_none());
        assert_eq!(radio.group(), Some(1));
        assert_eq!(radio.group_changes(), 1);
        assert_eq!(controller.state().throttle(), 100);
        assert_eq!(display.commands(), vec![DisplayCommand::Icon(Icon::No)]);
    }

    #[test]
    fn test_frame_for_level_board() {
        let (mut controller, radio, _, _) = controller();
        let mut bindings = controller.start(1).unwrap();
        for _ in 0..3 {
            bindings.dispatch(ButtonEvent::B);
        }

        let packet = controller.transmit_cycle().unwrap();
        assert_eq!(packet.channels(), [300, 512, 512, 512]);
        assert_eq!(radio.frames(), vec!["300,512,512,512".to_string()]);
    }

    #[test]
    fn test_tilt_maps_to_roll_and_inverted_pitch() {
        let (mut controller, radio, accelerometer, _) = controller();
        controller.start(1);

        accelerometer.set(1024, 1024);
        let packet = controller.transmit_cycle().unwrap();
        assert_eq!(packet.roll, 1023);
        assert_eq!(packet.pitch, 0);

        accelerometer.set(-1024, -2000);
        let packet = controller.transmit_cycle().unwrap();
        assert_eq!(packet.roll, 0);
        assert_eq!(packet.pitch, 1023);

        accelerometer.set(100, -120);
        let packet = controller.transmit_cycle().unwrap();
        assert_eq!((packet.roll, packet.pitch), (512, 512));

        assert_eq!(radio.frames().len(), 3);
    }

    #[test]
    fn test_sensor_failure_centers_tilt() {
        let (mut controller, radio, accelerometer, _) = controller();
        controller.start(1);

        accelerometer.set(900, 900);
        accelerometer.fail(true);
        let packet = controller.transmit_cycle().unwrap();
        assert_eq!((packet.roll, packet.pitch), (512, 512));

        accelerometer.fail(false);
        let packet = controller.transmit_cycle().unwrap();
        assert_ne!(packet.roll, 512);
        assert_eq!(radio.frames().len(), 2);
    }

    #[test]
    fn test_throttle_buttons_saturate() {
        let (mut controller, _, _, _) = controller();
        let mut bindings = controller.start(1).unwrap();

        for _ in 0..20 {
            bindings.dispatch(ButtonEvent::B);
        }
        assert_eq!(controller.transmit_cycle().unwrap().throttle, 1023);

        for _ in 0..20 {
            bindings.dispatch(ButtonEvent::A);
        }
        assert_eq!(controller.transmit_cycle().unwrap().throttle, 0);
    }

    #[test]
    fn test_combined_press_centers_and_shows_target() {
        let (mut controller, _, _, display) = controller();
        let mut bindings = controller.start(1).unwrap();
        for _ in 0..7 {
            bindings.dispatch(ButtonEvent::B);
        }

        let mut buttons = ScriptedButtons::new(&[ButtonEvent::AB]);
        assert_eq!(poll_once(&mut buttons, &mut bindings), Some(ButtonEvent::AB));
        assert_eq!(poll_once(&mut buttons, &mut bindings), None);

        let packet = controller.transmit_cycle().unwrap();
        assert_eq!(packet.throttle, 0);
        assert_eq!(packet.yaw, 512);
        assert!(display.commands().contains(&DisplayCommand::Icon(Icon::Target)));
    }

    #[test]
    fn test_liveness_pixel_blinks_at_5hz() {
        let (mut controller, _, _, display) = controller();
        controller.start(1);
        display.clear();

        let ms = Duration::from_millis;
        for t in [0, 15, 99, 100, 185, 200, 1_000_050] {
            controller.cycle_at(ms(t));
        }

        let (on, off) = (DisplayCommand::Plot(2, 4), DisplayCommand::Unplot(2, 4));
        assert_eq!(
            display.commands(),
            vec![on.clone(), on.clone(), on.clone(), off.clone(), off, on.clone(), on]
        );
    }

    #[test]
    fn test_liveness_pixel_restored_after_center_icon() {
        let (mut controller, _, _, display) = controller();
        let mut bindings = controller.start(1).unwrap();
        controller.cycle_at(Duration::from_millis(150));

        // Target lights (2, 4) while the blink is in its off phase
        bindings.dispatch(ButtonEvent::AB);
        controller.cycle_at(Duration::from_millis(165));

        let mut screen = Screen::default();
        for command in display.commands() {
            screen.apply(command);
        }
        assert!(!screen.matrix.get(2, 4));
        assert!(screen.matrix.get(2, 0));
    }
}
