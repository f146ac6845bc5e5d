//! MQTT session management.
//!
//! Wraps `rumqttc::AsyncClient` behind the `Channel` trait with typed
//! helpers for relay state, availability, and telemetry publishes.
//!
//! Session model: every `connect()` builds a fresh client + event loop
//! and spawns a pump task that forwards classified publishes into the
//! control loop's queue. The pump exits on the first event-loop error
//! after emitting `LinkEvent::Down` — recovery belongs to the
//! connectivity supervisor, so there is no hidden auto-reconnect here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, LastWill, MqttOptions, Packet, QoS};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::MqttConfig;
use crate::error::{LinkError, LinkResult};
use crate::handler::{LinkEvent, classify};
use crate::tls;
use sy_protocol::{Availability, RelayState, StatusReport, topics};

// ── Channel trait ─────────────────────────────────────────────

/// Abstraction over the MQTT session.
///
/// The connectivity supervisor drives the lifecycle methods; the command
/// router uses the publish side. Enables mocking in tests without a real
/// broker.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Establish a session, bounded by the configured connect timeout.
    async fn connect(&self) -> LinkResult<()>;

    /// Tear the session down, best-effort announcing `offline` first.
    async fn disconnect(&self);

    /// Publish a raw payload to a topic.
    async fn publish(&self, topic: &str, payload: &[u8], qos: QoS, retain: bool)
    -> LinkResult<()>;

    /// Subscribe to a topic filter.
    async fn subscribe(&self, filter: &str, qos: QoS) -> LinkResult<()>;

    /// Check session liveness. An error here means the session is gone
    /// and the caller should rebuild it from the ground up.
    async fn probe(&self) -> LinkResult<()>;

    // ── Typed helpers (composed from the raw operations) ──────

    /// Publish the relay state, retained, to the device's state topic.
    async fn publish_state(
        &self,
        site_id: &str,
        device_id: &str,
        state: RelayState,
    ) -> LinkResult<()> {
        let topic = topics::switch_state(site_id, device_id);
        self.publish(&topic, state.as_str().as_bytes(), QoS::AtLeastOnce, true)
            .await
    }

    /// Publish availability, retained, to the device's availability topic.
    async fn publish_availability(
        &self,
        site_id: &str,
        device_id: &str,
        availability: Availability,
    ) -> LinkResult<()> {
        let topic = topics::availability(site_id, device_id);
        self.publish(
            &topic,
            availability.as_str().as_bytes(),
            QoS::AtLeastOnce,
            true,
        )
        .await
    }

    /// Publish a JSON telemetry report (fire-and-forget QoS).
    async fn publish_report(
        &self,
        site_id: &str,
        device_id: &str,
        report: &StatusReport,
    ) -> LinkResult<()> {
        let topic = topics::telemetry_report(site_id, device_id);
        let bytes =
            serde_json::to_vec(report).map_err(|e| LinkError::Serialization(e.to_string()))?;
        self.publish(&topic, &bytes, QoS::AtMostOnce, false).await
    }

    /// Subscribe to incoming commands (device-specific + site broadcast).
    async fn subscribe_commands(&self, site_id: &str, device_id: &str) -> LinkResult<()> {
        let device_topic = topics::switch_set(site_id, device_id);
        self.subscribe(&device_topic, QoS::AtLeastOnce).await?;

        let broadcast = topics::broadcast_switch_set(site_id);
        self.subscribe(&broadcast, QoS::AtLeastOnce).await
    }
}

// ── MqttLink ──────────────────────────────────────────────────

struct ActiveSession {
    client: AsyncClient,
    pump: JoinHandle<()>,
}

/// MQTT link to the home broker.
///
/// Holds at most one active session. The session's last will is a
/// retained `offline` on the availability topic, so the broker announces
/// an ungraceful death even when we never get to say goodbye.
pub struct MqttLink {
    config: MqttConfig,
    site_id: String,
    device_id: String,
    events: mpsc::Sender<LinkEvent>,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
    healthy: Arc<AtomicBool>,
}

impl MqttLink {
    /// Create an unconnected link. `events` is the control loop's inbound
    /// queue; the pump task feeds it once `connect()` succeeds.
    pub fn new(
        config: MqttConfig,
        site_id: impl Into<String>,
        device_id: impl Into<String>,
        events: mpsc::Sender<LinkEvent>,
    ) -> Self {
        Self {
            config,
            site_id: site_id.into(),
            device_id: device_id.into(),
            events,
            session: tokio::sync::Mutex::new(None),
            healthy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn site_id(&self) -> &str {
        &self.site_id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    async fn client(&self) -> LinkResult<AsyncClient> {
        let session = self.session.lock().await;
        match session.as_ref() {
            Some(active) => Ok(active.client.clone()),
            None => Err(LinkError::NotConnected),
        }
    }
}

#[async_trait]
impl Channel for MqttLink {
    async fn connect(&self) -> LinkResult<()> {
        // Drop whatever is left of a previous session.
        self.disconnect().await;

        let mut options = MqttOptions::new(
            &self.config.client_id,
            &self.config.broker_host,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keepalive_secs.into()));
        if let (Some(user), Some(pass)) = (&self.config.username, &self.config.password) {
            options.set_credentials(user, pass);
        }
        options.set_last_will(LastWill::new(
            topics::availability(&self.site_id, &self.device_id),
            Availability::Offline.as_str(),
            QoS::AtLeastOnce,
            true,
        ));
        options.set_transport(tls::transport(&self.config)?);

        let (client, eventloop) = AsyncClient::new(options, 64);

        let (ready_tx, ready_rx) = oneshot::channel();
        self.healthy.store(false, Ordering::SeqCst);
        let pump = tokio::spawn(pump(
            eventloop,
            self.events.clone(),
            self.healthy.clone(),
            ready_tx,
        ));

        let timeout_secs = self.config.connect_timeout_secs;
        match tokio::time::timeout(Duration::from_secs(timeout_secs), ready_rx).await {
            Ok(Ok(Ok(()))) => {
                *self.session.lock().await = Some(ActiveSession { client, pump });
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_)) => Err(LinkError::Connect("event pump exited before ack".into())),
            Err(_) => {
                pump.abort();
                Err(LinkError::Timeout { timeout_secs })
            }
        }
    }

    async fn disconnect(&self) {
        let taken = self.session.lock().await.take();
        let Some(session) = taken else {
            return;
        };

        if self.healthy.load(Ordering::SeqCst) {
            // Graceful goodbye: retained offline, then a clean DISCONNECT.
            let topic = topics::availability(&self.site_id, &self.device_id);
            let _ = session
                .client
                .publish(
                    &topic,
                    QoS::AtLeastOnce,
                    true,
                    Availability::Offline.as_str(),
                )
                .await;
            let _ = session.client.disconnect().await;
        }
        self.healthy.store(false, Ordering::SeqCst);

        // The pump exits once the broker closes the connection; give it a
        // moment to flush the goodbye, then stop it for good.
        let mut pump = session.pump;
        if tokio::time::timeout(Duration::from_secs(1), &mut pump)
            .await
            .is_err()
        {
            pump.abort();
        }
    }

    async fn publish(
        &self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> LinkResult<()> {
        let client = self.client().await?;
        client
            .publish(topic, qos, retain, payload)
            .await
            .map_err(|e| LinkError::Publish(e.to_string()))
    }

    async fn subscribe(&self, filter: &str, qos: QoS) -> LinkResult<()> {
        let client = self.client().await?;
        client
            .subscribe(filter, qos)
            .await
            .map_err(|e| LinkError::Subscribe(e.to_string()))
    }

    async fn probe(&self) -> LinkResult<()> {
        if self.session.lock().await.is_none() {
            return Err(LinkError::NotConnected);
        }
        if !self.healthy.load(Ordering::SeqCst) {
            return Err(LinkError::Connect("event pump reported session loss".into()));
        }
        Ok(())
    }
}

// ── Event pump ────────────────────────────────────────────────

/// Drive the rumqttc event loop for one session.
///
/// Completes the `ready` handshake on the first ConnAck (or first error),
/// then forwards classified publishes into the control loop's queue. On a
/// mid-session error it flags the session unhealthy, emits
/// `LinkEvent::Down`, and exits — one pump per session, never resurrected.
async fn pump(
    mut eventloop: EventLoop,
    events: mpsc::Sender<LinkEvent>,
    healthy: Arc<AtomicBool>,
    ready: oneshot::Sender<LinkResult<()>>,
) {
    let mut ready = Some(ready);

    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => {
                healthy.store(true, Ordering::SeqCst);
                if let Some(tx) = ready.take() {
                    let _ = tx.send(Ok(()));
                }
            }
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                let msg = classify(&publish);
                if events.send(LinkEvent::Message(msg)).await.is_err() {
                    // Control loop gone — nothing left to feed.
                    return;
                }
            }
            Ok(_) => {}
            Err(e) => {
                healthy.store(false, Ordering::SeqCst);
                match ready.take() {
                    // Error before the ack: report through connect() and die quietly.
                    Some(tx) => {
                        let _ = tx.send(Err(LinkError::Connect(e.to_string())));
                    }
                    // Error mid-session: the supervisor owns recovery.
                    None => {
                        tracing::warn!(error = %e, "MQTT event loop error, pump exiting");
                        let _ = events
                            .send(LinkEvent::Down {
                                reason: e.to_string(),
                            })
                            .await;
                    }
                }
                return;
            }
        }
    }
}
