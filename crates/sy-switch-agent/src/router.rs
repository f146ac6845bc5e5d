//! Command routing — inbound MQTT messages and button presses onto the
//! relay.

use std::sync::Arc;

use sy_gpio::{ButtonEvent, GpioResult, OutputPin};
use sy_mqtt_link::{Channel, IncomingMessage, LinkResult};
use sy_protocol::SwitchCommand;

use crate::actuator::RelayActuator;

/// Applies switching intents to the actuator and reports resulting state
/// changes back to the broker.
///
/// Publish failures are logged and absorbed, never retried inline: the
/// actuator is marked pending so the LED shows the desync, and the
/// supervisor's next maintenance tick repairs the session and
/// republishes. Only hardware faults propagate out of the router.
pub struct CommandRouter<C> {
    channel: Arc<C>,
    site_id: String,
    device_id: String,
}

impl<C: Channel> CommandRouter<C> {
    pub fn new(channel: Arc<C>, site_id: impl Into<String>, device_id: impl Into<String>) -> Self {
        Self {
            channel,
            site_id: site_id.into(),
            device_id: device_id.into(),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Handle one classified inbound message.
    pub async fn on_message<P: OutputPin>(
        &self,
        message: IncomingMessage,
        actuator: &mut RelayActuator<P>,
    ) -> GpioResult<()> {
        match message {
            IncomingMessage::Command { retained: true, command } => {
                // A retained command is a replay of something already
                // acted on (or superseded) before this session began.
                tracing::debug!(command = ?command, "skipping retained command replay");
                Ok(())
            }
            IncomingMessage::Command { command, .. } => {
                tracing::info!(command = ?command, "switch command received");
                self.apply(command, actuator).await
            }
            IncomingMessage::Unknown { topic, payload } => {
                tracing::warn!(
                    topic = %topic,
                    payload_len = payload.len(),
                    "dropping unrecognized message"
                );
                Ok(())
            }
        }
    }

    /// Handle a debounced button press: local override, always a toggle.
    pub async fn on_button<P: OutputPin>(
        &self,
        _event: ButtonEvent,
        actuator: &mut RelayActuator<P>,
    ) -> GpioResult<()> {
        let new_state = actuator.toggle()?;
        tracing::info!(state = %new_state, "button press toggled relay");
        if let Err(e) = self.publish_state(actuator).await {
            tracing::warn!(error = %e, "state publish failed, awaiting session repair");
        }
        Ok(())
    }

    async fn apply<P: OutputPin>(
        &self,
        command: SwitchCommand,
        actuator: &mut RelayActuator<P>,
    ) -> GpioResult<()> {
        let target = command.target(actuator.state());
        match actuator.set(target)? {
            Some(_) => {
                if let Err(e) = self.publish_state(actuator).await {
                    tracing::warn!(error = %e, "state publish failed, awaiting session repair");
                }
            }
            None => {
                tracing::debug!(state = %actuator.state(), "command is a no-op, nothing to publish");
            }
        }
        Ok(())
    }

    /// Publish the actuator's current state, retained, updating the sync
    /// flag both ways. Session establishment calls this directly so that
    /// a failed republish tears the session down instead of being
    /// absorbed.
    pub async fn publish_state<P: OutputPin>(
        &self,
        actuator: &mut RelayActuator<P>,
    ) -> LinkResult<()> {
        actuator.mark_pending();
        self.channel
            .publish_state(&self.site_id, &self.device_id, actuator.state())
            .await?;
        actuator.mark_synced();
        tracing::debug!(state = %actuator.state(), "relay state published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sy_gpio::MockOutputPin;
    use sy_mqtt_link::MockChannel;
    use sy_protocol::{RelayState, topics};

    const SITE: &str = "home-alpha";
    const DEVICE: &str = "switch-001";

    struct Fixture {
        router: CommandRouter<MockChannel>,
        channel: Arc<MockChannel>,
        actuator: RelayActuator<MockOutputPin>,
        relay: MockOutputPin,
    }

    async fn fixture() -> Fixture {
        let channel = Arc::new(MockChannel::new());
        channel.connect().await.unwrap();
        let relay = MockOutputPin::new(12);
        let led = MockOutputPin::new(13);
        let actuator = RelayActuator::new(relay.clone(), led, RelayState::Off).unwrap();
        Fixture {
            router: CommandRouter::new(channel.clone(), SITE, DEVICE),
            channel,
            actuator,
            relay,
        }
    }

    fn command(command: SwitchCommand) -> IncomingMessage {
        IncomingMessage::Command {
            command,
            retained: false,
        }
    }

    #[tokio::test]
    async fn on_command_switches_and_publishes() {
        let mut f = fixture().await;

        f.router
            .on_message(command(SwitchCommand::On), &mut f.actuator)
            .await
            .unwrap();

        assert_eq!(f.actuator.state(), RelayState::On);
        assert!(f.actuator.is_synced());
        let published = f.channel.last_published().unwrap();
        assert_eq!(published.topic, topics::switch_state(SITE, DEVICE));
        assert_eq!(published.payload, b"ON");
        assert!(published.retain);
    }

    #[tokio::test]
    async fn duplicate_command_publishes_nothing() {
        let mut f = fixture().await;
        f.router
            .on_message(command(SwitchCommand::On), &mut f.actuator)
            .await
            .unwrap();
        f.channel.reset();

        f.router
            .on_message(command(SwitchCommand::On), &mut f.actuator)
            .await
            .unwrap();

        assert_eq!(f.actuator.state(), RelayState::On);
        assert!(f.channel.published().is_empty());
    }

    #[tokio::test]
    async fn toggle_command_always_switches() {
        let mut f = fixture().await;

        f.router
            .on_message(command(SwitchCommand::Toggle), &mut f.actuator)
            .await
            .unwrap();
        assert_eq!(f.actuator.state(), RelayState::On);

        f.router
            .on_message(command(SwitchCommand::Toggle), &mut f.actuator)
            .await
            .unwrap();
        assert_eq!(f.actuator.state(), RelayState::Off);
        assert_eq!(f.channel.published_to(&topics::switch_state(SITE, DEVICE)).len(), 2);
    }

    #[tokio::test]
    async fn retained_command_is_skipped() {
        let mut f = fixture().await;

        f.router
            .on_message(
                IncomingMessage::Command {
                    command: SwitchCommand::On,
                    retained: true,
                },
                &mut f.actuator,
            )
            .await
            .unwrap();

        assert_eq!(f.actuator.state(), RelayState::Off);
        assert!(f.channel.published().is_empty());
    }

    #[tokio::test]
    async fn unknown_message_is_dropped() {
        let mut f = fixture().await;

        f.router
            .on_message(
                IncomingMessage::Unknown {
                    topic: "home/home-alpha/switch-001/thermostat/set".to_string(),
                    payload: b"22.5".to_vec(),
                },
                &mut f.actuator,
            )
            .await
            .unwrap();

        assert_eq!(f.actuator.state(), RelayState::Off);
        assert!(f.channel.published().is_empty());
    }

    #[tokio::test]
    async fn button_press_toggles_and_publishes() {
        let mut f = fixture().await;

        f.router
            .on_button(ButtonEvent::Pressed, &mut f.actuator)
            .await
            .unwrap();

        assert_eq!(f.actuator.state(), RelayState::On);
        assert_eq!(f.channel.last_published().unwrap().payload, b"ON");
    }

    #[tokio::test]
    async fn publish_failure_is_absorbed_and_leaves_pending() {
        let mut f = fixture().await;
        f.channel.fail_publish(true);

        f.router
            .on_message(command(SwitchCommand::On), &mut f.actuator)
            .await
            .unwrap();

        // The relay switched even though the report could not go out.
        assert_eq!(f.actuator.state(), RelayState::On);
        assert_eq!(f.relay.level(), sy_gpio::Level::High);
        assert!(!f.actuator.is_synced());
        assert!(f.channel.published().is_empty());

        // Once publishing works again the state can be resynced.
        f.channel.fail_publish(false);
        f.router.publish_state(&mut f.actuator).await.unwrap();
        assert!(f.actuator.is_synced());
        assert_eq!(f.channel.last_published().unwrap().payload, b"ON");
    }

    #[tokio::test]
    async fn button_while_disconnected_still_toggles() {
        let mut f = fixture().await;
        f.channel.disconnect().await;
        f.channel.reset();

        f.router
            .on_button(ButtonEvent::Pressed, &mut f.actuator)
            .await
            .unwrap();

        assert_eq!(f.actuator.state(), RelayState::On);
        assert!(!f.actuator.is_synced());
        assert!(f.channel.published().is_empty());
    }

    #[tokio::test]
    async fn hardware_fault_propagates() {
        let mut f = fixture().await;
        f.relay.fail_writes(true);

        let result = f
            .router
            .on_message(command(SwitchCommand::On), &mut f.actuator)
            .await;

        assert!(result.is_err());
        assert_eq!(f.actuator.state(), RelayState::Off);
        assert!(f.channel.published().is_empty());
    }
}
