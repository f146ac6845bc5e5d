//! MQTT link to the home broker.
//!
//! Provides a typed MQTT abstraction for the switch agent:
//! - `Channel` trait for session lifecycle + publish/subscribe (mockable in tests)
//! - `MqttLink` over `rumqttc` with last-will availability for production
//! - `MockChannel` for testing without a broker
//! - `IncomingMessage` classification for dispatching inbound publishes

pub mod channel;
pub mod config;
pub mod error;
pub mod handler;
pub mod mock;
pub mod tls;

// Re-exports for convenience.
pub use channel::{Channel, MqttLink};
pub use config::MqttConfig;
pub use error::{LinkError, LinkResult};
pub use handler::{IncomingMessage, LinkEvent, classify};
pub use mock::MockChannel;
