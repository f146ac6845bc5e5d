//! GPIO error types.

use thiserror::Error;

/// Errors that can occur during GPIO operations.
///
/// A failed write on a pin we already claimed is a hardware fault —
/// callers treat it as unrecoverable rather than retrying in software.
#[derive(Debug, Error)]
pub enum GpioError {
    #[error("GPIO init error: {0}")]
    Init(String),

    #[error("write to pin {pin} failed: {reason}")]
    Write { pin: u8, reason: String },

    #[error("read from pin {pin} failed: {reason}")]
    Read { pin: u8, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for GPIO results.
pub type GpioResult<T> = Result<T, GpioError>;
