//! Relay actuation and the status LED.

use std::time::{Duration, Instant};

use sy_gpio::{GpioResult, Level, OutputPin};
use sy_protocol::RelayState;

/// Status LED half-period while a state change awaits publication.
const BLINK_INTERVAL: Duration = Duration::from_millis(500);

/// Whether the broker's retained state topic reflects the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SyncState {
    Synced,
    Pending,
}

/// Owns the relay and status LED pins and is the single authority for
/// [`RelayState`].
///
/// The coil pin is written before the in-memory state advances, so the
/// two can never disagree: a failed write aborts the mutation and
/// surfaces as a hardware fault. The LED mirrors the relay while synced
/// (lit for On, dark for Off) and blinks while a change has not yet
/// reached the broker.
pub struct RelayActuator<P: OutputPin> {
    relay: P,
    led: P,
    state: RelayState,
    sync: SyncState,
    blink_phase: Level,
    last_blink: Option<Instant>,
}

impl<P: OutputPin> RelayActuator<P> {
    /// Take ownership of the pins and drive the relay to `initial`.
    ///
    /// Starts in pending sync — nothing has been published yet.
    pub fn new(mut relay: P, led: P, initial: RelayState) -> GpioResult<Self> {
        relay.write(coil_level(initial))?;
        Ok(Self {
            relay,
            led,
            state: initial,
            sync: SyncState::Pending,
            blink_phase: Level::Low,
            last_blink: None,
        })
    }

    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Drive the relay to `target`.
    ///
    /// Idempotent: returns `Ok(None)` without touching the pin when the
    /// relay is already in `target`, so callers only publish real
    /// changes.
    pub fn set(&mut self, target: RelayState) -> GpioResult<Option<RelayState>> {
        if target == self.state {
            return Ok(None);
        }
        self.relay.write(coil_level(target))?;
        self.state = target;
        tracing::info!(pin = self.relay.pin(), state = %target, "relay switched");
        Ok(Some(target))
    }

    /// Flip the relay, returning the new state.
    pub fn toggle(&mut self) -> GpioResult<RelayState> {
        let target = self.state.toggled();
        self.relay.write(coil_level(target))?;
        self.state = target;
        tracing::info!(pin = self.relay.pin(), state = %target, "relay toggled");
        Ok(target)
    }

    /// Record that the broker now holds the current state (LED goes solid).
    pub fn mark_synced(&mut self) {
        self.sync = SyncState::Synced;
    }

    /// Record that a state change still awaits a successful publish
    /// (LED blinks until the session is repaired).
    pub fn mark_pending(&mut self) {
        self.sync = SyncState::Pending;
    }

    pub fn is_synced(&self) -> bool {
        self.sync == SyncState::Synced
    }

    /// Refresh the status LED. Called from the fine-grained loop tick;
    /// alternates every [`BLINK_INTERVAL`] while pending.
    pub fn drive_led(&mut self, now: Instant) -> GpioResult<()> {
        let level = match self.sync {
            SyncState::Synced => {
                self.last_blink = None;
                coil_level(self.state)
            }
            SyncState::Pending => {
                let due = match self.last_blink {
                    None => true,
                    Some(at) => now.duration_since(at) >= BLINK_INTERVAL,
                };
                if due {
                    self.blink_phase = match self.blink_phase {
                        Level::Low => Level::High,
                        Level::High => Level::Low,
                    };
                    self.last_blink = Some(now);
                }
                self.blink_phase
            }
        };
        self.led.write(level)
    }
}

/// Coil drive level for a relay state. The board is active-high.
fn coil_level(state: RelayState) -> Level {
    match state {
        RelayState::On => Level::High,
        RelayState::Off => Level::Low,
    }
}
