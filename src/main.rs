use anyhow::Result;
use log::{info, warn};
use std::thread;

use rc_transmitter::accelerometer::Lsm303Accelerometer;
use rc_transmitter::buttons::{button_thread, ButtonPad};
use rc_transmitter::config::{Settings, SETTINGS_PATH};
use rc_transmitter::display::{display_thread, matrix_display, Display};
use rc_transmitter::radio::WebSocketRadio;
use rc_transmitter::Controller;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Starting RC transmitter");

    let mut settings = Settings::new(SETTINGS_PATH);
    if let Err(e) = settings.load() {
        warn!("Error loading {}: {}, using defaults", settings.path(), e);
    }
    settings.save()?;

    let (mut display, rx_display) = matrix_display();
    let (i2c_bus, display_address) = (settings.i2c_bus, settings.display_address);
    thread::spawn(move || {
        display_thread(rx_display, i2c_bus, display_address);
    });
    display.show_string(&settings.boot_message);

    let accelerometer = Lsm303Accelerometer::new(settings.i2c_bus, settings.accelerometer_address)?;
    let buttons = ButtonPad::new(settings.button_a_pin, settings.button_b_pin, settings.debounce())?;
    let radio = WebSocketRadio::bind(settings.radio_bind.as_str())?;

    let mut controller = Controller::new(radio, accelerometer, display, &settings);
    if let Some(bindings) = controller.start(settings.radio_group) {
        let poll = settings.button_poll();
        thread::spawn(move || {
            button_thread(buttons, bindings, poll);
        });
    }

    controller.run()
}
