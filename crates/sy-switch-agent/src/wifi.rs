//! Wi-Fi link supervision.
//!
//! The radio itself belongs to NetworkManager: the production
//! implementation reads the kernel's `operstate` for the interface and
//! shells out to `nmcli` only when the link is down. Association
//! attempts are bounded by the configured timeout.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::config::WifiConfig;

/// Errors from Wi-Fi association attempts.
#[derive(Debug, thiserror::Error)]
pub enum WifiError {
    #[error("association timed out after {0}s")]
    Timeout(u64),
    #[error("nmcli failed: {0}")]
    Nmcli(String),
    #[error("interface state unreadable: {0}")]
    Operstate(String),
}

/// Abstraction over bringing the wireless link up.
#[async_trait]
pub trait WifiLink: Send + Sync {
    /// Ensure the wireless link is up, associating if needed.
    async fn ensure_up(&self) -> Result<(), WifiError>;
}

/// Production Wi-Fi link that drives NetworkManager via `nmcli`.
pub struct NmcliWifi {
    config: WifiConfig,
    operstate_path: PathBuf,
}

impl NmcliWifi {
    pub fn new(config: WifiConfig) -> Self {
        let operstate_path =
            PathBuf::from(format!("/sys/class/net/{}/operstate", config.interface));
        Self {
            config,
            operstate_path,
        }
    }

    /// Whether the kernel reports the interface as up.
    fn link_is_up(&self) -> Result<bool, WifiError> {
        let contents = std::fs::read_to_string(&self.operstate_path).map_err(|e| {
            WifiError::Operstate(format!("{}: {e}", self.operstate_path.display()))
        })?;
        Ok(operstate_is_up(&contents))
    }
}

/// Parse the contents of a `/sys/class/net/<iface>/operstate` file.
fn operstate_is_up(contents: &str) -> bool {
    contents.trim() == "up"
}

#[async_trait]
impl WifiLink for NmcliWifi {
    async fn ensure_up(&self) -> Result<(), WifiError> {
        if self.link_is_up()? {
            return Ok(());
        }

        tracing::info!(
            interface = %self.config.interface,
            ssid = %self.config.ssid,
            "wireless link down, associating"
        );

        let timeout_secs = self.config.connect_timeout_secs;
        let result = tokio::time::timeout(Duration::from_secs(timeout_secs), async {
            Command::new("nmcli")
                .args([
                    "dev",
                    "wifi",
                    "connect",
                    &self.config.ssid,
                    "password",
                    &self.config.password,
                    "ifname",
                    &self.config.interface,
                ])
                .output()
                .await
                .map_err(|e| WifiError::Nmcli(format!("spawn failed: {e}")))
        })
        .await;

        let output = match result {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(WifiError::Timeout(timeout_secs)),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(WifiError::Nmcli(stderr.trim().to_string()));
        }

        // nmcli exiting zero does not guarantee carrier; trust operstate.
        if self.link_is_up()? {
            tracing::info!(interface = %self.config.interface, "wireless link associated");
            Ok(())
        } else {
            Err(WifiError::Nmcli(
                "nmcli reported success but the link is not up".to_string(),
            ))
        }
    }
}

// ── Mock implementation for tests ──────────────────────────────────────

#[derive(Debug, Default)]
struct MockWifiState {
    up: AtomicBool,
    attempts: AtomicUsize,
}

/// Scripted Wi-Fi link for tests. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockWifi {
    state: Arc<MockWifiState>,
}

impl MockWifi {
    pub fn new(up: bool) -> Self {
        let mock = Self::default();
        mock.set_up(up);
        mock
    }

    /// Script whether subsequent `ensure_up` calls succeed.
    pub fn set_up(&self, up: bool) {
        self.state.up.store(up, Ordering::SeqCst);
    }

    /// How many times `ensure_up` was called.
    pub fn attempts(&self) -> usize {
        self.state.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WifiLink for MockWifi {
    async fn ensure_up(&self) -> Result<(), WifiError> {
        self.state.attempts.fetch_add(1, Ordering::SeqCst);
        if self.state.up.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(WifiError::Nmcli("scripted association failure".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operstate_up_is_up() {
        assert!(operstate_is_up("up\n"));
        assert!(operstate_is_up("up"));
    }

    #[test]
    fn operstate_other_values_are_down() {
        assert!(!operstate_is_up("down\n"));
        assert!(!operstate_is_up("dormant\n"));
        assert!(!operstate_is_up("unknown\n"));
        assert!(!operstate_is_up(""));
    }

    #[tokio::test]
    async fn mock_wifi_reports_scripted_state() {
        let wifi = MockWifi::new(false);
        assert!(wifi.ensure_up().await.is_err());

        wifi.set_up(true);
        assert!(wifi.ensure_up().await.is_ok());
        assert_eq!(wifi.attempts(), 2);
    }

    #[tokio::test]
    async fn missing_interface_is_an_operstate_error() {
        let wifi = NmcliWifi::new(WifiConfig {
            interface: "does-not-exist0".to_string(),
            ssid: "TestNet".to_string(),
            password: "secret".to_string(),
            connect_timeout_secs: 1,
        });
        let result = wifi.ensure_up().await;
        assert!(matches!(result, Err(WifiError::Operstate(_))));
    }
}
