pub mod accelerometer;
pub mod buttons;
pub mod config;
pub mod controller;
pub mod display;
pub mod error;
pub mod mixer;
pub mod packet;
pub mod radio;
pub mod state;

pub use controller::{ButtonBindings, Controller};
pub use error::{Error, Result};
pub use mixer::ChannelMixer;
pub use packet::RcPacket;
pub use state::{ControllerState, Lifecycle};

#[cfg(test)]
pub(crate) mod mocks;
