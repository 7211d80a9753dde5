use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::mixer::CHANNEL_MAX;

/// One frame of the four RC channels.
///
/// The wire form is `THR,AIL,ELE,RUD` as decimal text with no trailing
/// delimiter, e.g. `300,512,512,512`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RcPacket {
    pub throttle: u16,
    pub roll: u16,  // Aileron
    pub pitch: u16, // Elevator
    pub yaw: u16,   // Rudder
}

impl RcPacket {
    pub fn channels(&self) -> [u16; 4] {
        [self.throttle, self.roll, self.pitch, self.yaw]
    }
}

impl fmt::Display for RcPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.throttle, self.roll, self.pitch, self.yaw)
    }
}

impl FromStr for RcPacket {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidFrame(text.to_string());

        let mut channels = [0u16; 4];
        let mut fields = text.split(',');
        for channel in channels.iter_mut() {
            let field = fields.next().ok_or_else(invalid)?;
            if field.is_empty() || !field.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let value: u16 = field.parse().map_err(|_| invalid())?;
            if value > CHANNEL_MAX {
                return Err(invalid());
            }
            *channel = value;
        }
        if fields.next().is_some() {
            return Err(invalid());
        }

        let [throttle, roll, pitch, yaw] = channels;
        Ok(RcPacket { throttle, roll, pitch, yaw })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let packet = RcPacket { throttle: 300, roll: 512, pitch: 512, yaw: 512 };
        assert_eq!(packet.to_string(), "300,512,512,512");

        let packet = RcPacket { throttle: 0, roll: 1023, pitch: 7, yaw: 512 };
        assert_eq!(packet.to_string(), "0,1023,7,512");
    }

    #[test]
    fn test_parse_frame() {
        let packet: RcPacket = "1023,0,44,512".parse().unwrap();
        assert_eq!(packet.channels(), [1023, 0, 44, 512]);
    }

    #[test]
    fn test_parse_rejects_malformed_frames() {
        for text in [
            "",
            "1,2,3",
            "1,2,3,4,",
            "1,2,3,4,5",
            "1, 2,3,4",
            "+1,2,3,4",
            "-1,2,3,4",
            "1024,0,0,0",
            "a,b,c,d",
            "99999,0,0,0",
        ] {
            assert!(text.parse::<RcPacket>().is_err(), "accepted {:?}", text);
        }
    }
}
