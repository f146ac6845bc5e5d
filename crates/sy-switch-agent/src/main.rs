//! Switchyard switch agent — edge runtime for a Wi-Fi smart switch.
//!
//! Wires the relay, status LED, and push-button GPIO into the MQTT link
//! and runs them from a single control task on Pi-class boards.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use sy_gpio::Debouncer;
use sy_gpio::rpi::{RpiInputPin, RpiOutputPin};
use sy_mqtt_link::{Channel, MqttLink};
use sy_protocol::RelayState;
use sy_switch_agent::actuator::RelayActuator;
use sy_switch_agent::config::AgentConfig;
use sy_switch_agent::control_loop::ControlLoop;
use sy_switch_agent::router::CommandRouter;
use sy_switch_agent::supervisor::ConnectivitySupervisor;
use sy_switch_agent::wifi::NmcliWifi;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "sy-switch-agent starting"
    );

    // ── Load config ─────────────────────────────────────────────
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/etc/switchyard/agent.toml".to_string());

    let config = AgentConfig::from_file(&config_path)?;
    tracing::info!(
        site_id = %config.site_id,
        device_id = %config.device_id,
        "config loaded"
    );

    // ── Claim GPIO ──────────────────────────────────────────────
    let relay = RpiOutputPin::claim(config.pins.relay)?;
    let led = RpiOutputPin::claim(config.pins.status_led)?;
    let button = RpiInputPin::claim_pullup(config.pins.button)?;
    tracing::info!(
        relay = config.pins.relay,
        status_led = config.pins.status_led,
        button = config.pins.button,
        "GPIO pins claimed"
    );

    // The relay boots Off; the retained state topic is corrected once
    // the first session comes up.
    let actuator = RelayActuator::new(relay, led, RelayState::Off)?;
    let debouncer = Debouncer::new(Duration::from_millis(config.button_debounce_ms));

    // ── MQTT link ───────────────────────────────────────────────
    let (event_tx, event_rx) = tokio::sync::mpsc::channel(64);
    let channel = Arc::new(MqttLink::new(
        config.mqtt.clone(),
        &config.site_id,
        &config.device_id,
        event_tx,
    ));

    // ── Wire the control loop ───────────────────────────────────
    let wifi = NmcliWifi::new(config.wifi.clone());
    let router = CommandRouter::new(channel.clone(), &config.site_id, &config.device_id);
    let supervisor =
        ConnectivitySupervisor::new(wifi, channel.clone(), &config.site_id, &config.device_id);
    let control = ControlLoop::new(
        button,
        debouncer,
        actuator,
        router,
        supervisor,
        event_rx,
        Duration::from_secs(config.maintenance_interval_secs),
    );

    tracing::info!("sy-switch-agent ready");

    tokio::select! {
        result = control.run() => match result {
            Ok(()) => tracing::error!("control loop exited unexpectedly"),
            Err(e) => {
                tracing::error!(error = %e, "hardware fault, stopping");
                channel.disconnect().await;
                return Err(e.into());
            }
        },
        // Graceful shutdown on SIGINT/SIGTERM
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    // Retire cleanly: the broker retains `offline` without waiting for
    // the last will to fire.
    channel.disconnect().await;

    tracing::info!("sy-switch-agent stopped");
    Ok(())
}
