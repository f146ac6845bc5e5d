//! Connectivity supervision — the Disconnected → WifiUp → MqttUp ladder.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sy_gpio::OutputPin;
use sy_mqtt_link::{Channel, LinkResult};
use sy_protocol::{Availability, ConnectionState, StatusReport};

use crate::actuator::RelayActuator;
use crate::router::CommandRouter;
use crate::wifi::WifiLink;

/// What one rung of the ladder did to the connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepOutcome {
    /// Climbed a rung; the tick keeps going.
    Advanced,
    /// Stayed put; retry from here next tick.
    Held,
    /// Collapsed to Disconnected; the tick ends here.
    Downgraded,
}

/// Drives the connectivity ladder from the maintenance tick.
///
/// One tick climbs as many rungs as keep succeeding, so a healthy boot
/// reaches `MqttUp` on the first tick. A failed MQTT connect attempt
/// holds at `WifiUp` for a retry; a failure observed on an established
/// session collapses straight back to `Disconnected` and the next tick
/// rebuilds from the radio up. The ladder never skips a rung.
pub struct ConnectivitySupervisor<W, C> {
    wifi: W,
    channel: Arc<C>,
    site_id: String,
    device_id: String,
    state: ConnectionState,
    started: Instant,
}

impl<W: WifiLink, C: Channel> ConnectivitySupervisor<W, C> {
    pub fn new(
        wifi: W,
        channel: Arc<C>,
        site_id: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            wifi,
            channel,
            site_id: site_id.into(),
            device_id: device_id.into(),
            state: ConnectionState::Disconnected,
            started: Instant::now(),
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Run one maintenance tick.
    ///
    /// A tick that starts at the top of the ladder is a health pass:
    /// probe the session, refresh availability, report telemetry.
    /// Otherwise the tick climbs as many rungs as keep succeeding; a
    /// freshly established session ends the tick, probing starts on the
    /// next one.
    pub async fn tick<P: OutputPin>(
        &mut self,
        actuator: &mut RelayActuator<P>,
        router: &CommandRouter<C>,
    ) {
        if self.state == ConnectionState::MqttUp {
            self.step_probe(actuator).await;
            return;
        }

        loop {
            let outcome = match self.state {
                ConnectionState::Disconnected => self.step_wifi().await,
                ConnectionState::WifiUp => self.step_mqtt(actuator, router).await,
                ConnectionState::MqttUp => return,
            };
            if outcome != StepOutcome::Advanced {
                return;
            }
        }
    }

    /// React to the pump reporting session loss between ticks.
    pub async fn note_link_down<P: OutputPin>(
        &mut self,
        reason: &str,
        actuator: &mut RelayActuator<P>,
    ) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        tracing::warn!(reason = %reason, "session lost between ticks, downgrading");
        self.channel.disconnect().await;
        self.transition(ConnectionState::Disconnected);
        actuator.mark_pending();
    }

    async fn step_wifi(&mut self) -> StepOutcome {
        match self.wifi.ensure_up().await {
            Ok(()) => {
                self.transition(ConnectionState::WifiUp);
                StepOutcome::Advanced
            }
            Err(e) => {
                tracing::warn!(error = %e, "wifi association failed, retrying next tick");
                StepOutcome::Held
            }
        }
    }

    async fn step_mqtt<P: OutputPin>(
        &mut self,
        actuator: &mut RelayActuator<P>,
        router: &CommandRouter<C>,
    ) -> StepOutcome {
        // The radio can drop between ticks; re-verify before spending the
        // connect timeout on a dead link.
        if let Err(e) = self.wifi.ensure_up().await {
            tracing::warn!(error = %e, "wireless link lost, downgrading");
            self.transition(ConnectionState::Disconnected);
            return StepOutcome::Downgraded;
        }

        if let Err(e) = self.channel.connect().await {
            tracing::warn!(error = %e, "MQTT connect failed, retrying next tick");
            return StepOutcome::Held;
        }

        if let Err(e) = self.establish_session(actuator, router).await {
            // A session that cannot finish its opening sequence is no
            // session at all.
            tracing::warn!(error = %e, "session establishment failed, tearing down");
            self.channel.disconnect().await;
            return StepOutcome::Held;
        }

        self.transition(ConnectionState::MqttUp);
        StepOutcome::Advanced
    }

    /// Opening sequence for a fresh session: (re)subscribe to commands,
    /// announce availability, and republish the relay state — the
    /// retained copy on the broker may predate button presses made while
    /// offline.
    async fn establish_session<P: OutputPin>(
        &self,
        actuator: &mut RelayActuator<P>,
        router: &CommandRouter<C>,
    ) -> LinkResult<()> {
        self.channel
            .subscribe_commands(&self.site_id, &self.device_id)
            .await?;
        self.channel
            .publish_availability(&self.site_id, &self.device_id, Availability::Online)
            .await?;
        router.publish_state(actuator).await?;
        Ok(())
    }

    async fn step_probe<P: OutputPin>(&mut self, actuator: &mut RelayActuator<P>) {
        if let Err(e) = self.channel.probe().await {
            tracing::warn!(error = %e, "session probe failed, downgrading");
            self.channel.disconnect().await;
            self.transition(ConnectionState::Disconnected);
            actuator.mark_pending();
            return;
        }

        // Session healthy: refresh availability and report telemetry.
        // Failures here are absorbed; the next tick's probe decides
        // whether the session is really gone.
        if let Err(e) = self
            .channel
            .publish_availability(&self.site_id, &self.device_id, Availability::Online)
            .await
        {
            tracing::warn!(error = %e, "availability refresh failed");
        }

        let report = StatusReport {
            device_id: self.device_id.clone(),
            site_id: self.site_id.clone(),
            relay: actuator.state(),
            connection: self.state,
            uptime_secs: self.started.elapsed().as_secs(),
            agent_version: env!("CARGO_PKG_VERSION").to_string(),
            timestamp: Utc::now(),
        };
        match self
            .channel
            .publish_report(&self.site_id, &self.device_id, &report)
            .await
        {
            Ok(()) => tracing::debug!(uptime_secs = report.uptime_secs, "status report sent"),
            Err(e) => tracing::warn!(error = %e, "status report failed"),
        }
    }

    fn transition(&mut self, to: ConnectionState) {
        if self.state != to {
            tracing::info!(from = %self.state, to = %to, "connectivity state change");
            self.state = to;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sy_gpio::MockOutputPin;
    use sy_mqtt_link::MockChannel;
    use sy_protocol::{RelayState, topics};

    use crate::wifi::MockWifi;

    const SITE: &str = "home-alpha";
    const DEVICE: &str = "switch-001";

    struct Fixture {
        supervisor: ConnectivitySupervisor<MockWifi, MockChannel>,
        router: CommandRouter<MockChannel>,
        actuator: RelayActuator<MockOutputPin>,
        channel: Arc<MockChannel>,
        wifi: MockWifi,
    }

    fn fixture(wifi_up: bool) -> Fixture {
        let channel = Arc::new(MockChannel::new());
        let wifi = MockWifi::new(wifi_up);
        let relay = MockOutputPin::new(12);
        let led = MockOutputPin::new(13);
        let actuator = RelayActuator::new(relay, led, RelayState::Off).unwrap();
        Fixture {
            supervisor: ConnectivitySupervisor::new(wifi.clone(), channel.clone(), SITE, DEVICE),
            router: CommandRouter::new(channel.clone(), SITE, DEVICE),
            actuator,
            channel,
            wifi,
        }
    }

    #[tokio::test]
    async fn boot_reaches_mqtt_up_in_one_tick() {
        let mut f = fixture(true);

        f.supervisor.tick(&mut f.actuator, &f.router).await;

        assert_eq!(f.supervisor.state(), ConnectionState::MqttUp);
        assert_eq!(f.channel.connect_count(), 1);
        assert!(f.channel.is_subscribed_to(&topics::switch_set(SITE, DEVICE)));
        assert!(f.channel.is_subscribed_to(&topics::broadcast_switch_set(SITE)));

        let availability = f.channel.published_to(&topics::availability(SITE, DEVICE));
        assert_eq!(availability.len(), 1);
        assert_eq!(availability[0].payload, b"online");
        assert!(availability[0].retain);

        let state = f.channel.published_to(&topics::switch_state(SITE, DEVICE));
        assert_eq!(state.len(), 1);
        assert_eq!(state[0].payload, b"OFF");
        assert!(f.actuator.is_synced());
    }

    #[tokio::test]
    async fn wifi_down_holds_disconnected_without_touching_mqtt() {
        let mut f = fixture(false);

        f.supervisor.tick(&mut f.actuator, &f.router).await;
        f.supervisor.tick(&mut f.actuator, &f.router).await;

        assert_eq!(f.supervisor.state(), ConnectionState::Disconnected);
        assert_eq!(f.channel.connect_count(), 0);
        assert_eq!(f.wifi.attempts(), 2);

        // Radio comes back: next tick climbs all the way up.
        f.wifi.set_up(true);
        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::MqttUp);
    }

    #[tokio::test]
    async fn mqtt_connect_failure_holds_wifi_up() {
        let mut f = fixture(true);
        f.channel.fail_connect(true);

        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::WifiUp);

        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::WifiUp);

        f.channel.fail_connect(false);
        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::MqttUp);
    }

    #[tokio::test]
    async fn subscribe_failure_tears_the_session_down() {
        let mut f = fixture(true);
        f.channel.fail_subscribe(true);

        f.supervisor.tick(&mut f.actuator, &f.router).await;

        assert_eq!(f.supervisor.state(), ConnectionState::WifiUp);
        assert_eq!(f.channel.disconnect_count(), 1);
        assert!(!f.channel.connected());
    }

    #[tokio::test]
    async fn publish_failure_during_establishment_tears_the_session_down() {
        let mut f = fixture(true);
        f.channel.fail_publish(true);

        f.supervisor.tick(&mut f.actuator, &f.router).await;

        assert_eq!(f.supervisor.state(), ConnectionState::WifiUp);
        assert_eq!(f.channel.disconnect_count(), 1);
        assert!(!f.actuator.is_synced());
    }

    #[tokio::test]
    async fn probe_failure_downgrades_to_disconnected() {
        let mut f = fixture(true);
        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::MqttUp);

        f.channel.fail_probe(true);
        f.supervisor.tick(&mut f.actuator, &f.router).await;

        assert_eq!(f.supervisor.state(), ConnectionState::Disconnected);
        assert_eq!(f.channel.disconnect_count(), 1);
        assert!(!f.actuator.is_synced());

        // Next tick rebuilds the whole ladder, resubscribing and
        // republishing along the way.
        f.channel.fail_probe(false);
        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::MqttUp);
        assert_eq!(f.channel.connect_count(), 2);
        assert!(f.actuator.is_synced());
    }

    #[tokio::test]
    async fn healthy_probe_refreshes_availability_and_reports() {
        let mut f = fixture(true);
        f.supervisor.tick(&mut f.actuator, &f.router).await;

        // Second tick: already MqttUp, so this is a pure probe pass.
        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::MqttUp);

        let availability = f.channel.published_to(&topics::availability(SITE, DEVICE));
        assert_eq!(availability.len(), 2); // establishment + refresh

        let reports = f.channel.published_to(&topics::telemetry_report(SITE, DEVICE));
        assert_eq!(reports.len(), 1);
        let report: StatusReport = serde_json::from_slice(&reports[0].payload).unwrap();
        assert_eq!(report.device_id, DEVICE);
        assert_eq!(report.relay, RelayState::Off);
        assert_eq!(report.connection, ConnectionState::MqttUp);
    }

    #[tokio::test]
    async fn link_down_notification_forces_full_rebuild() {
        let mut f = fixture(true);
        f.supervisor.tick(&mut f.actuator, &f.router).await;
        assert_eq!(f.supervisor.state(), ConnectionState::MqttUp);

        f.supervisor
            .note_link_down("connection reset by peer", &mut f.actuator)
            .await;

        assert_eq!(f.supervisor.state(), ConnectionState::Disconnected);
        assert_eq!(f.channel.disconnect_count(), 1);
        assert!(!f.actuator.is_synced());
    }

    #[tokio::test]
    async fn link_down_while_already_disconnected_is_a_noop() {
        let mut f = fixture(false);

        f.supervisor
            .note_link_down("connection reset by peer", &mut f.actuator)
            .await;

        assert_eq!(f.supervisor.state(), ConnectionState::Disconnected);
        assert_eq!(f.channel.disconnect_count(), 0);
    }
}
