use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::mixer::{CHANNEL_CENTER, CHANNEL_MAX, CHANNEL_MIN};

pub const THROTTLE_STEP: u16 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Idle,
    Active, // Terminal
}

/// Throttle, yaw and the active flag, shared between the transmit loop and
/// the button thread.
///
/// Every update is a single atomic operation, so button handlers never
/// need a lock and the loop always reads a value inside `[0, 1023]`.
#[derive(Debug)]
pub struct ControllerState {
    throttle: AtomicU16,
    yaw: AtomicU16,
    active: AtomicBool,
}

impl Default for ControllerState {
    fn default() -> Self {
        ControllerState {
            throttle: AtomicU16::new(CHANNEL_MIN),
            yaw: AtomicU16::new(CHANNEL_CENTER),
            active: AtomicBool::new(false),
        }
    }
}

impl ControllerState {
    pub fn throttle(&self) -> u16 {
        self.throttle.load(Ordering::Acquire)
    }

    pub fn yaw(&self) -> u16 {
        self.yaw.load(Ordering::Acquire)
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn lifecycle(&self) -> Lifecycle {
        if self.is_active() { Lifecycle::Active } else { Lifecycle::Idle }
    }

    pub(crate) fn activate(&self) {
        self.active.store(true, Ordering::Release);
    }

    /// Throttle to 0, yaw to center.
    pub fn center(&self) {
        self.yaw.store(CHANNEL_CENTER, Ordering::Release);
        self.throttle.store(CHANNEL_MIN, Ordering::Release);
    }

    /// Returns the new throttle.
    pub fn increase_throttle(&self) -> u16 {
        self.update_throttle(|t| t.saturating_add(THROTTLE_STEP).min(CHANNEL_MAX))
    }

    /// Returns the new throttle.
    pub fn decrease_throttle(&self) -> u16 {
        self.update_throttle(|t| t.saturating_sub(THROTTLE_STEP).max(CHANNEL_MIN))
    }

    fn update_throttle(&self, step: impl Fn(u16) -> u16) -> u16 {
        let previous = self
            .throttle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |t| Some(step(t)))
            .unwrap_or_else(|t| t);
        step(previous)
    }
}
