use log::info;
use rppal::i2c::I2c;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    X,
    Y,
    Z,
}

/// One sample in milli-g.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Acceleration {
    pub x: i16,
    pub y: i16,
    pub z: i16,
}

impl Acceleration {
    pub fn axis(&self, dimension: Dimension) -> i16 {
        match dimension {
            Dimension::X => self.x,
            Dimension::Y => self.y,
            Dimension::Z => self.z,
        }
    }
}

pub trait Accelerometer {
    fn read(&mut self) -> Result<Acceleration>;
}

pub const LSM303_ADDRESS: u16 = 0x19;

const WHO_AM_I_A: u8 = 0x0F;
const WHO_AM_I_VALUE: u8 = 0x33;
const CTRL_REG1_A: u8 = 0x20;
const CTRL_REG4_A: u8 = 0x23;
const OUT_X_L_A: u8 = 0x28;
const AUTO_INCREMENT: u8 = 0x80;

const ODR_100HZ_XYZ: u8 = 0x57; // 100 Hz, normal mode, X/Y/Z enabled
const BDU_2G: u8 = 0x80; // Block data update, +/-2 g

const MG_PER_DIGIT: i16 = 4; // Normal mode at +/-2 g

/// LSM303AGR accelerometer (the micro:bit v2 part) on a Linux I2C bus.
pub struct Lsm303Accelerometer {
    i2c: I2c,
}

impl Lsm303Accelerometer {
    pub fn new(bus: u8, address: u16) -> Result<Self> {
        let mut i2c = I2c::with_bus(bus)?;
        i2c.set_slave_address(address)?;

        let mut sensor = Lsm303Accelerometer { i2c };
        sensor.init()?;

        info!("LSM303 accelerometer initialized on I2C bus {}, address 0x{:02X}", bus, address);
        Ok(sensor)
    }

    fn init(&mut self) -> Result<()> {
        let mut id = [0u8; 1];
        self.i2c.write_read(&[WHO_AM_I_A], &mut id)?;
        if id[0] != WHO_AM_I_VALUE {
            return Err(Error::UnknownSensor {
                expected: WHO_AM_I_VALUE,
                found: id[0],
            });
        }

        self.i2c.write(&[CTRL_REG1_A, ODR_100HZ_XYZ])?;
        self.i2c.write(&[CTRL_REG4_A, BDU_2G])?;
        Ok(())
    }
}

impl Accelerometer for Lsm303Accelerometer {
    fn read(&mut self) -> Result<Acceleration> {
        let mut buffer = [0u8; 6];
        self.i2c.write_read(&[OUT_X_L_A | AUTO_INCREMENT], &mut buffer)?;
        Ok(decode_sample(&buffer))
    }
}

/// Output registers hold 10-bit left-justified little-endian samples.
pub fn decode_sample(buffer: &[u8; 6]) -> Acceleration {
    let axis = |lo: u8, hi: u8| (i16::from_le_bytes([lo, hi]) >> 6) * MG_PER_DIGIT;
    Acceleration {
        x: axis(buffer[0], buffer[1]),
        y: axis(buffer[2], buffer[3]),
        z: axis(buffer[4], buffer[5]),
    }
}
