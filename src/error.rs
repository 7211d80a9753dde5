use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("I2C error: {0}")]
    I2c(#[from] rppal::i2c::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    #[error("unexpected accelerometer id 0x{found:02X} (expected 0x{expected:02X})")]
    UnknownSensor { expected: u8, found: u8 },

    #[error("invalid frame {0:?}")]
    InvalidFrame(String),
}

pub type Result<T> = std::result::Result<T, Error>;
