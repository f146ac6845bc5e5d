//! Shared test harness for E2E integration tests.
//!
//! Wires the real actuator, router, supervisor, and debouncer over mock
//! GPIO, Wi-Fi, and MQTT, exercising the same code paths the binary
//! runs — only the hardware and the broker are simulated.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rumqttc::{Publish, QoS};

use sy_gpio::{Debouncer, Level, MockInputPin, MockOutputPin};
use sy_mqtt_link::{MockChannel, classify};
use sy_protocol::RelayState;
use sy_switch_agent::actuator::RelayActuator;
use sy_switch_agent::router::CommandRouter;
use sy_switch_agent::supervisor::ConnectivitySupervisor;
use sy_switch_agent::wifi::MockWifi;

pub const SITE: &str = "home-alpha";
pub const DEVICE: &str = "switch-001";

/// The agent's default button stability window.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// End-to-end harness: real agent components over mock transports.
pub struct TestHarness {
    /// Shared MQTT mock standing in for the broker.
    pub channel: Arc<MockChannel>,
    /// Scripted Wi-Fi link.
    pub wifi: MockWifi,
    /// Assertion handle for the relay coil pin.
    pub relay: MockOutputPin,
    /// Assertion handle for the status LED pin.
    pub led: MockOutputPin,
    /// Scripted push-button pin.
    pub button: MockInputPin,
    pub actuator: RelayActuator<MockOutputPin>,
    pub router: CommandRouter<MockChannel>,
    pub supervisor: ConnectivitySupervisor<MockWifi, MockChannel>,
    pub debouncer: Debouncer,
}

impl TestHarness {
    /// Fresh harness: relay Off, Wi-Fi reachable, broker reachable,
    /// nothing connected yet.
    pub fn new() -> Self {
        let channel = Arc::new(MockChannel::new());
        let wifi = MockWifi::new(true);
        let relay = MockOutputPin::new(12);
        let led = MockOutputPin::new(13);
        let button = MockInputPin::new(0);
        let actuator =
            RelayActuator::new(relay.clone(), led.clone(), RelayState::Off).expect("mock pins");
        let router = CommandRouter::new(channel.clone(), SITE, DEVICE);
        let supervisor = ConnectivitySupervisor::new(wifi.clone(), channel.clone(), SITE, DEVICE);

        Self {
            channel,
            wifi,
            relay,
            led,
            button,
            actuator,
            router,
            supervisor,
            debouncer: Debouncer::new(DEBOUNCE_WINDOW),
        }
    }

    /// Run one connectivity maintenance tick.
    pub async fn tick(&mut self) {
        self.supervisor.tick(&mut self.actuator, &self.router).await;
    }

    /// Deliver a raw MQTT publish to the agent the way the event pump
    /// would: classify, then route.
    pub async fn deliver(&mut self, topic: &str, payload: &[u8], retained: bool) {
        let mut publish = Publish::new(topic, QoS::AtLeastOnce, payload.to_vec());
        publish.retain = retained;
        let message = classify(&publish);
        self.router
            .on_message(message, &mut self.actuator)
            .await
            .expect("message routing failed");
    }

    /// Deliver a payload on this device's command topic.
    pub async fn send_command(&mut self, payload: &[u8]) {
        let topic = sy_protocol::topics::switch_set(SITE, DEVICE);
        self.deliver(&topic, payload, false).await;
    }

    /// Simulate a clean button press starting at `t0`: held through the
    /// stability window, routed, then released.
    pub async fn press_and_release(&mut self, t0: Instant) {
        self.debouncer.on_edge(Level::Low, t0);
        let settled = t0 + DEBOUNCE_WINDOW;
        let event = self
            .debouncer
            .poll(settled)
            .expect("debounced press did not emit");
        self.router
            .on_button(event, &mut self.actuator)
            .await
            .expect("button routing failed");
        self.debouncer
            .on_edge(Level::High, settled + Duration::from_millis(50));
    }

    /// Simulate the pump reporting session loss between ticks.
    pub async fn link_down(&mut self, reason: &str) {
        self.supervisor
            .note_link_down(reason, &mut self.actuator)
            .await;
    }
}
