//! Switch agent configuration, loadable from TOML.

use serde::Deserialize;
use sy_mqtt_link::MqttConfig;

/// Top-level configuration for the switch agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Site this switch belongs to (first topic segment after the prefix).
    pub site_id: String,
    /// Unique device identifier within the site.
    pub device_id: String,
    /// MQTT connection settings.
    pub mqtt: MqttConfig,
    /// Wi-Fi association settings.
    pub wifi: WifiConfig,
    /// GPIO pin assignments (BCM numbering).
    #[serde(default)]
    pub pins: PinConfig,
    /// Button stability window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub button_debounce_ms: u64,
    /// Connectivity maintenance tick period in seconds.
    #[serde(default = "default_maintenance_interval")]
    pub maintenance_interval_secs: u64,
}

/// Wi-Fi association settings. The agent delegates the radio to
/// NetworkManager; these feed the `nmcli` invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct WifiConfig {
    /// Wireless interface name.
    #[serde(default = "default_wifi_interface")]
    pub interface: String,
    /// Network SSID.
    pub ssid: String,
    /// WPA passphrase.
    pub password: String,
    /// Bound on a single association attempt, in seconds.
    #[serde(default = "default_wifi_timeout")]
    pub connect_timeout_secs: u64,
}

/// GPIO pin assignments, defaulting to the single-relay HAT layout.
#[derive(Debug, Clone, Deserialize)]
pub struct PinConfig {
    /// Pin driving the relay coil.
    #[serde(default = "default_relay_pin")]
    pub relay: u8,
    /// Pin driving the status indicator LED.
    #[serde(default = "default_led_pin")]
    pub status_led: u8,
    /// Pin sampled for the push-button (active-low, internal pull-up).
    #[serde(default = "default_button_pin")]
    pub button: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            relay: default_relay_pin(),
            status_led: default_led_pin(),
            button: default_button_pin(),
        }
    }
}

fn default_wifi_interface() -> String {
    "wlan0".to_string()
}

fn default_wifi_timeout() -> u64 {
    20
}

fn default_relay_pin() -> u8 {
    12
}

fn default_led_pin() -> u8 {
    13
}

fn default_button_pin() -> u8 {
    0
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_maintenance_interval() -> u64 {
    60
}

impl AgentConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        Ok(config)
    }
}
