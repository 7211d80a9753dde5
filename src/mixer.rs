use serde::{Deserialize, Serialize};

pub const CHANNEL_MIN: u16 = 0;
pub const CHANNEL_MAX: u16 = 1023;
pub const CHANNEL_CENTER: u16 = 512;

/// Half of the accelerometer span; raw tilt readings are nominally in
/// `[-TILT_SPAN, TILT_SPAN]` milli-g.
pub const TILT_SPAN: i32 = 1024;
pub const DEFAULT_DEADZONE: u16 = 150;

/// Maps a signed tilt reading onto an RC channel value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelMixer {
    pub deadzone: u16, // Raw readings with |raw| below this are centered
}

impl Default for ChannelMixer {
    fn default() -> Self {
        ChannelMixer {
            deadzone: DEFAULT_DEADZONE,
        }
    }
}

impl ChannelMixer {
    pub fn new(deadzone: u16) -> Self {
        ChannelMixer { deadzone }
    }

    /// Converts a raw reading in `[-1024, 1024]` to `[0, 1023]`.
    ///
    /// Readings inside the deadzone collapse to the center value, the
    /// shifted value is scaled by 1023/2048 with halves rounded up, and
    /// anything outside the nominal range saturates.
    pub fn transform_tilt(&self, raw: i32) -> u16 {
        let raw = if raw.unsigned_abs() < u32::from(self.deadzone) { 0 } else { raw };

        let shifted = i64::from(raw) + i64::from(TILT_SPAN);
        let span = 2 * i64::from(TILT_SPAN);

        // round(shifted * 1023 / 2048) == floor((2 * shifted * 1023 + 2048) / 4096)
        let scaled = (2 * shifted * i64::from(CHANNEL_MAX) + span).div_euclid(2 * span);

        scaled.clamp(i64::from(CHANNEL_MIN), i64::from(CHANNEL_MAX)) as u16
    }
}
