//! MQTT link error types.

use thiserror::Error;

/// Errors that can occur on the MQTT link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("connect error: {0}")]
    Connect(String),

    #[error("connect timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("no active session")]
    NotConnected,

    #[error("publish error: {0}")]
    Publish(String),

    #[error("subscribe error: {0}")]
    Subscribe(String),

    #[error("TLS error: {0}")]
    Tls(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

/// Convenience alias for link results.
pub type LinkResult<T> = Result<T, LinkError>;
