use serde::{Deserialize, Serialize};

/// Relay output state.
///
/// Wire text on the state topic is `ON`/`OFF`; the same spelling is used
/// inside JSON telemetry documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    /// The opposite state.
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    /// Wire representation published on the state topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::On => "ON",
            Self::Off => "OFF",
        }
    }
}

impl std::fmt::Display for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A switching command received on a command topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
    Toggle,
}

impl SwitchCommand {
    /// Parse a raw command payload.
    ///
    /// Accepts `ON`/`OFF`/`TOGGLE` case-insensitively (whitespace trimmed),
    /// plus `1`/`0` as aliases for compatibility with stock smart-switch
    /// firmwares. Returns `None` for anything else — callers drop and log.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(payload).ok()?;
        let text = text.trim();
        if text.eq_ignore_ascii_case("on") || text == "1" {
            Some(Self::On)
        } else if text.eq_ignore_ascii_case("off") || text == "0" {
            Some(Self::Off)
        } else if text.eq_ignore_ascii_case("toggle") {
            Some(Self::Toggle)
        } else {
            None
        }
    }

    /// The relay state this command requests, given the current state.
    pub fn target(self, current: RelayState) -> RelayState {
        match self {
            Self::On => RelayState::On,
            Self::Off => RelayState::Off,
            Self::Toggle => current.toggled(),
        }
    }
}

/// Broker-visible device availability, published retained on the
/// availability topic. `Offline` doubles as the MQTT last-will payload
/// so the broker announces ungraceful death on our behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Availability {
    Online,
    Offline,
}

impl Availability {
    /// Wire representation published on the availability topic.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }
}

impl std::fmt::Display for Availability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
