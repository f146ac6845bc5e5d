use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::relay::RelayState;

/// Position on the connectivity ladder, re-evaluated every maintenance tick.
///
/// Only ever advances one rung at a time (`Disconnected` → `WifiUp` →
/// `MqttUp`); any failure on an established layer collapses straight back
/// to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Disconnected,
    WifiUp,
    MqttUp,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::WifiUp => "wifi_up",
            Self::MqttUp => "mqtt_up",
        };
        f.write_str(s)
    }
}

/// Periodic telemetry document published while the MQTT session is up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub device_id: String,
    pub site_id: String,
    pub relay: RelayState,
    pub connection: ConnectionState,
    pub uptime_secs: u64,
    pub agent_version: String,
    pub timestamp: DateTime<Utc>,
}
