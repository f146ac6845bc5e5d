//! GPIO pin abstraction.
//!
//! `OutputPin`/`InputPin` traits with two impls each:
//! - `RpiOutputPin`/`RpiInputPin` — Linux-only, wraps `rppal` (in `rpi.rs`)
//! - `MockOutputPin`/`MockInputPin` — all platforms, scripted (in `mock.rs`)
//!
//! Pin methods are synchronous: a write is a register poke, not bus I/O.
//! Each pin is claimed by exactly one owner — the relay and status LED by
//! the actuator, the button by the control loop's sampler.

use crate::error::GpioResult;

/// Logic level on a GPIO pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_low(self) -> bool {
        matches!(self, Self::Low)
    }

    pub fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

/// Trait for output pin implementations (relay, status LED).
pub trait OutputPin: Send {
    /// Drive the pin to the given level.
    fn write(&mut self, level: Level) -> GpioResult<()>;

    /// BCM pin number, for logging.
    fn pin(&self) -> u8;
}

/// Trait for input pin implementations (push-button).
pub trait InputPin: Send {
    /// Sample the current level.
    fn read(&self) -> GpioResult<Level>;

    /// BCM pin number, for logging.
    fn pin(&self) -> u8;
}
