use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::time::Duration;

use crate::accelerometer::LSM303_ADDRESS;
use crate::error::Result;
use crate::mixer::{ChannelMixer, DEFAULT_DEADZONE};
use crate::radio::MAX_TRANSMIT_POWER;

pub const SETTINGS_PATH: &str = "transmitter.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(skip)]
    settings_path: String,

    pub radio_group: u8,
    pub transmit_power: u8, // 0..=7
    pub period_ms: u64,     // Transmit cycle, ~66 Hz at 15 ms
    pub deadzone: u16,      // Tilt deadzone in milli-g

    pub button_a_pin: u8,
    pub button_b_pin: u8,
    pub debounce_ms: u64,
    pub button_poll_ms: u64,

    pub i2c_bus: u8,
    pub accelerometer_address: u16,
    pub display_address: u16,

    pub radio_bind: String,
    pub boot_message: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            settings_path: SETTINGS_PATH.to_string(),
            radio_group: 1,
            transmit_power: MAX_TRANSMIT_POWER,
            period_ms: 15,
            deadzone: DEFAULT_DEADZONE,
            button_a_pin: 17,
            button_b_pin: 27,
            debounce_ms: 20,
            button_poll_ms: 5,
            i2c_bus: 1,
            accelerometer_address: LSM303_ADDRESS,
            display_address: 0x3C,
            radio_bind: String::from("0.0.0.0:10013"),
            boot_message: String::from("CONTROLLER"),
        }
    }
}

impl Settings {
    pub fn new(settings_path: &str) -> Self {
        Settings {
            settings_path: settings_path.to_string(),
            ..Settings::default()
        }
    }

    pub fn path(&self) -> &str {
        &self.settings_path
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms.max(1))
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn button_poll(&self) -> Duration {
        Duration::from_millis(self.button_poll_ms.max(1))
    }

    pub fn mixer(&self) -> ChannelMixer {
        ChannelMixer::new(self.deadzone)
    }

    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;

        let mut file = fs::File::create(&self.settings_path)?;
        file.write_all(json.as_bytes())?;
        info!("Settings saved to {}", self.settings_path);
        Ok(())
    }

    /// Fields missing from the file keep their defaults.
    pub fn load(&mut self) -> Result<()> {
        let content = fs::read_to_string(&self.settings_path)?;
        let mut loaded: Settings = serde_json::from_str(&content)?;
        loaded.settings_path = std::mem::take(&mut self.settings_path);
        loaded.transmit_power = loaded.transmit_power.min(MAX_TRANSMIT_POWER);
        *self = loaded;
        info!("Settings loaded from {}", self.settings_path);
        Ok(())
    }
}
