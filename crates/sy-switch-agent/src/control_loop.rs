//! The agent's single control task.
//!
//! One `tokio::select!` loop multiplexes three sources: a fine-grained
//! tick that samples the button and refreshes the LED, the inbound link
//! event queue fed by the MQTT pump, and the connectivity maintenance
//! tick. All mutable state — relay, debouncer, connectivity ladder —
//! lives in this task, so nothing needs a lock.
//!
//! Only the maintenance tick blocks for any length of time, and every
//! network call it makes is bounded by a configured timeout, so the
//! button stays responsive within a fraction of its debounce window.

use std::time::{Duration, Instant};

use tokio::time::MissedTickBehavior;

use sy_gpio::{Debouncer, GpioResult, InputPin, OutputPin};
use sy_mqtt_link::{Channel, LinkEvent};

use crate::actuator::RelayActuator;
use crate::router::CommandRouter;
use crate::supervisor::ConnectivitySupervisor;
use crate::wifi::WifiLink;

/// Button sampling cadence; fine-grained against the 500 ms debounce
/// window.
const BUTTON_SAMPLE_INTERVAL: Duration = Duration::from_millis(10);

/// Owns every moving part of the agent and runs them cooperatively.
pub struct ControlLoop<B, P: OutputPin, W, C> {
    button: B,
    debouncer: Debouncer,
    actuator: RelayActuator<P>,
    router: CommandRouter<C>,
    supervisor: ConnectivitySupervisor<W, C>,
    events: tokio::sync::mpsc::Receiver<LinkEvent>,
    maintenance_interval: Duration,
}

impl<B, P, W, C> ControlLoop<B, P, W, C>
where
    B: InputPin,
    P: OutputPin,
    W: WifiLink,
    C: Channel,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        button: B,
        debouncer: Debouncer,
        actuator: RelayActuator<P>,
        router: CommandRouter<C>,
        supervisor: ConnectivitySupervisor<W, C>,
        events: tokio::sync::mpsc::Receiver<LinkEvent>,
        maintenance_interval: Duration,
    ) -> Self {
        Self {
            button,
            debouncer,
            actuator,
            router,
            supervisor,
            events,
            maintenance_interval,
        }
    }

    /// Run until a hardware fault or the link event channel closing.
    ///
    /// The first maintenance tick fires immediately, so a booting agent
    /// starts climbing the connectivity ladder without waiting a full
    /// interval.
    pub async fn run(mut self) -> GpioResult<()> {
        let mut sample_tick = tokio::time::interval(BUTTON_SAMPLE_INTERVAL);
        // Samples missed while a maintenance tick ran are stale; skip them.
        sample_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut maintenance_tick = tokio::time::interval(self.maintenance_interval);
        maintenance_tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = sample_tick.tick() => {
                    self.sample_button(Instant::now()).await?;
                }
                event = self.events.recv() => match event {
                    Some(event) => self.handle_event(event).await?,
                    None => {
                        tracing::error!("link event channel closed, stopping");
                        return Ok(());
                    }
                },
                _ = maintenance_tick.tick() => {
                    self.supervisor.tick(&mut self.actuator, &self.router).await;
                }
            }
        }
    }

    /// One fine-grained tick: sample the button, emit a debounced press
    /// if one matured, refresh the LED.
    async fn sample_button(&mut self, now: Instant) -> GpioResult<()> {
        match self.button.read() {
            Ok(level) => self.debouncer.on_edge(level, now),
            Err(e) => {
                // Local control degrades; MQTT commands still work.
                tracing::warn!(error = %e, "button read failed");
            }
        }
        if let Some(event) = self.debouncer.poll(now) {
            self.router.on_button(event, &mut self.actuator).await?;
        }
        self.actuator.drive_led(now)
    }

    async fn handle_event(&mut self, event: LinkEvent) -> GpioResult<()> {
        match event {
            LinkEvent::Message(message) => {
                self.router.on_message(message, &mut self.actuator).await
            }
            LinkEvent::Down { reason } => {
                self.supervisor
                    .note_link_down(&reason, &mut self.actuator)
                    .await;
                Ok(())
            }
        }
    }
}
