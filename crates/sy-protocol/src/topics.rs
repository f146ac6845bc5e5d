//! MQTT topic builders and parsers for the home topic hierarchy.
//!
//! Topic structure:
//! ```text
//! home/{site_id}/{device_id}/switch/set
//! home/{site_id}/{device_id}/switch/state
//! home/{site_id}/{device_id}/availability/state
//! home/{site_id}/{device_id}/telemetry/report
//! home/{site_id}/broadcast/switch/set
//! ```

const PREFIX: &str = "home";

// ─── Switch topics ───

/// Inbound commands for one device (`ON`/`OFF`/`TOGGLE` payloads).
pub fn switch_set(site_id: &str, device_id: &str) -> String {
    format!("{PREFIX}/{site_id}/{device_id}/switch/set")
}

/// Retained relay state (`ON`/`OFF` payloads).
pub fn switch_state(site_id: &str, device_id: &str) -> String {
    format!("{PREFIX}/{site_id}/{device_id}/switch/state")
}

// ─── Availability & telemetry ───

/// Retained `online`/`offline`, also the last-will topic.
pub fn availability(site_id: &str, device_id: &str) -> String {
    format!("{PREFIX}/{site_id}/{device_id}/availability/state")
}

pub fn telemetry_report(site_id: &str, device_id: &str) -> String {
    format!("{PREFIX}/{site_id}/{device_id}/telemetry/report")
}

// ─── Broadcast topics ───

/// Commands addressed to every switch in a site.
pub fn broadcast_switch_set(site_id: &str) -> String {
    format!("{PREFIX}/{site_id}/broadcast/switch/set")
}

// ─── Subscription patterns (with MQTT wildcards) ───

/// Subscribe to the relay states of every switch in a site (for dashboards).
pub fn site_switch_states(site_id: &str) -> String {
    format!("{PREFIX}/{site_id}/+/switch/state")
}

/// Subscribe to the availability of every switch in a site.
pub fn site_availability(site_id: &str) -> String {
    format!("{PREFIX}/{site_id}/+/availability/state")
}

// ─── Topic parsing ───

/// Parsed MQTT topic components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTopic {
    pub site_id: String,
    pub device_id: Option<String>,
    pub category: String,
    pub action: String,
}

/// Parse a topic string into its components.
/// Returns `None` if the topic doesn't match the expected format.
pub fn parse_topic(topic: &str) -> Option<ParsedTopic> {
    let parts: Vec<&str> = topic.split('/').collect();

    if parts.first() != Some(&PREFIX) || parts.len() < 5 {
        return None;
    }

    let site_id = parts[1].to_string();

    // Broadcast topic: home/{site_id}/broadcast/{category}/{action}
    if parts[2] == "broadcast" {
        return Some(ParsedTopic {
            site_id,
            device_id: None,
            category: parts[3].to_string(),
            action: parts[4].to_string(),
        });
    }

    // Device topic: home/{site_id}/{device_id}/{category}/{action}
    Some(ParsedTopic {
        site_id,
        device_id: Some(parts[2].to_string()),
        category: parts[3].to_string(),
        action: parts[4].to_string(),
    })
}
