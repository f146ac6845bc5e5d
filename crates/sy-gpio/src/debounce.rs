//! Push-button debouncing.
//!
//! Pure state machine over caller-supplied timestamps — no I/O, no clock
//! reads, fully deterministic in tests. The control loop samples the
//! button pin and feeds levels in; the debouncer decides when a press is
//! real.

use std::time::{Duration, Instant};

use crate::interface::Level;

/// A debounced button event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    Pressed,
}

/// Debounces a sampled active-low push-button.
///
/// The button idles `High` (internal pull-up) and reads `Low` while
/// pressed. A press is reported only once the level has stayed `Low` for
/// a full stability window; every raw transition restarts the window, so
/// contact bounce never produces events. After reporting, the debouncer
/// stays quiet until a release is observed — holding the button yields
/// exactly one event per physical press.
pub struct Debouncer {
    window: Duration,
    level: Level,
    last_transition: Option<Instant>,
    armed: bool,
}

impl Debouncer {
    /// Create a debouncer with the given stability window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            level: Level::High,
            last_transition: None,
            armed: true,
        }
    }

    /// Feed the level observed at `at`.
    ///
    /// Level changes restart the stability window; a repeated level is a
    /// no-op, so callers may feed every raw sample without tracking edges
    /// themselves.
    pub fn on_edge(&mut self, level: Level, at: Instant) {
        if level == self.level {
            return;
        }
        self.level = level;
        self.last_transition = Some(at);
        if level.is_high() {
            // Release re-arms for the next press.
            self.armed = true;
        }
    }

    /// Evaluate the stability window; called once per scheduling iteration.
    ///
    /// Returns `Some(Pressed)` exactly once per press, when the level has
    /// been stably low for the full window.
    pub fn poll(&mut self, now: Instant) -> Option<ButtonEvent> {
        if !self.armed || self.level.is_high() {
            return None;
        }
        let since = self.last_transition?;
        if now.duration_since(since) >= self.window {
            self.armed = false;
            return Some(ButtonEvent::Pressed);
        }
        None
    }
}
