//! Incoming message classification for the MQTT event pump.
//!
//! Parses raw MQTT publishes into typed `IncomingMessage` variants so the
//! control loop can dispatch them without topic string matching.

use rumqttc::Publish;

use sy_protocol::SwitchCommand;
use sy_protocol::topics;

/// A classified incoming MQTT message.
#[derive(Debug)]
pub enum IncomingMessage {
    /// Switch command addressed to this device, or broadcast site-wide.
    Command {
        command: SwitchCommand,
        /// Set when the broker delivered the message from retention.
        /// The router skips these — acting on them would re-fire a stale
        /// command on every reconnect.
        retained: bool,
    },
    /// Unrecognized topic or payload.
    Unknown { topic: String, payload: Vec<u8> },
}

/// Events flowing from the pump task into the control loop's queue.
#[derive(Debug)]
pub enum LinkEvent {
    /// A classified inbound publish.
    Message(IncomingMessage),
    /// The session died between maintenance ticks.
    Down { reason: String },
}

/// Classify a raw MQTT publish into a typed message.
///
/// Uses `sy_protocol::topics::parse_topic` to extract category/action,
/// then parses the payload with the command grammar. Subscriptions keep
/// foreign topics out, so anything unparseable here is logged and
/// dropped by the consumer.
pub fn classify(publish: &Publish) -> IncomingMessage {
    let topic = &publish.topic;
    let payload = &publish.payload;

    let Some(parsed) = topics::parse_topic(topic) else {
        return IncomingMessage::Unknown {
            topic: topic.clone(),
            payload: payload.to_vec(),
        };
    };

    match (parsed.category.as_str(), parsed.action.as_str()) {
        ("switch", "set") => match SwitchCommand::parse(payload) {
            Some(command) => IncomingMessage::Command {
                command,
                retained: publish.retain,
            },
            None => IncomingMessage::Unknown {
                topic: topic.clone(),
                payload: payload.to_vec(),
            },
        },
        _ => IncomingMessage::Unknown {
            topic: topic.clone(),
            payload: payload.to_vec(),
        },
    }
}
