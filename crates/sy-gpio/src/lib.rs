//! GPIO access for the switch agent.
//!
//! - `OutputPin`/`InputPin` traits (mockable in tests)
//! - `RpiOutputPin`/`RpiInputPin` — Linux-only, wraps `rppal`
//! - `MockOutputPin`/`MockInputPin` — all platforms, scripted (in `mock.rs`)
//! - `Debouncer` — pure press detection over sampled button levels

pub mod debounce;
pub mod error;
pub mod interface;
pub mod mock;

// Pi GPIO only available on Linux
#[cfg(target_os = "linux")]
pub mod rpi;

// Re-exports for convenience.
pub use debounce::{ButtonEvent, Debouncer};
pub use error::{GpioError, GpioResult};
pub use interface::{InputPin, Level, OutputPin};
pub use mock::{MockInputPin, MockOutputPin};
