//! End-to-end button paths: debounced presses through the router, bounce
//! rejection, and local override while offline.

mod helpers;

use std::time::{Duration, Instant};

use helpers::{DEBOUNCE_WINDOW, DEVICE, SITE, TestHarness};
use sy_gpio::Level;
use sy_protocol::{RelayState, topics};

#[tokio::test]
async fn press_toggles_and_publishes() {
    let mut h = TestHarness::new();
    h.tick().await;

    h.press_and_release(Instant::now()).await;

    assert_eq!(h.actuator.state(), RelayState::On);
    assert_eq!(h.relay.level(), Level::High);
    let last = h.channel.last_published().unwrap();
    assert_eq!(last.topic, topics::switch_state(SITE, DEVICE));
    assert_eq!(last.payload, b"ON");
}

#[tokio::test]
async fn holding_the_button_emits_a_single_toggle() {
    let mut h = TestHarness::new();
    h.tick().await;

    let t0 = Instant::now();
    h.debouncer.on_edge(Level::Low, t0);
    let event = h.debouncer.poll(t0 + DEBOUNCE_WINDOW).unwrap();
    h.router.on_button(event, &mut h.actuator).await.unwrap();
    assert_eq!(h.actuator.state(), RelayState::On);

    // Still held long after: no further events, no second toggle.
    assert_eq!(h.debouncer.poll(t0 + Duration::from_secs(10)), None);
    assert_eq!(h.actuator.state(), RelayState::On);
}

#[tokio::test]
async fn bounce_storm_changes_nothing() {
    let mut h = TestHarness::new();
    h.tick().await;
    let published_before = h.channel.published().len();

    let t0 = Instant::now();
    h.debouncer.on_edge(Level::Low, t0);
    h.debouncer.on_edge(Level::High, t0 + Duration::from_millis(20));
    h.debouncer.on_edge(Level::Low, t0 + Duration::from_millis(45));
    h.debouncer.on_edge(Level::High, t0 + Duration::from_millis(70));

    assert_eq!(h.debouncer.poll(t0 + Duration::from_secs(5)), None);
    assert_eq!(h.actuator.state(), RelayState::Off);
    assert_eq!(h.channel.published().len(), published_before);
}

#[tokio::test]
async fn offline_press_switches_locally_and_syncs_on_reconnect() {
    let mut h = TestHarness::new();

    // Never connected: the button must still work.
    h.press_and_release(Instant::now()).await;
    assert_eq!(h.actuator.state(), RelayState::On);
    assert_eq!(h.relay.level(), Level::High);
    assert!(!h.actuator.is_synced());
    assert!(h.channel.published().is_empty());

    // First session announces the offline change as the current truth.
    h.tick().await;
    assert!(h.actuator.is_synced());
    let states = h.channel.published_to(&topics::switch_state(SITE, DEVICE));
    assert_eq!(states.len(), 1);
    assert_eq!(states[0].payload, b"ON");
}

#[tokio::test]
async fn presses_and_commands_interleave() {
    let mut h = TestHarness::new();
    h.tick().await;

    h.send_command(b"ON").await;
    assert_eq!(h.actuator.state(), RelayState::On);

    let t0 = Instant::now();
    h.press_and_release(t0).await;
    assert_eq!(h.actuator.state(), RelayState::Off);

    // Redundant command after the local override: no-op, no publish.
    let published_before = h.channel.published().len();
    h.send_command(b"OFF").await;
    assert_eq!(h.channel.published().len(), published_before);

    h.press_and_release(t0 + Duration::from_secs(2)).await;
    assert_eq!(h.actuator.state(), RelayState::On);

    let states = h.channel.published_to(&topics::switch_state(SITE, DEVICE));
    let payloads: Vec<&[u8]> = states.iter().map(|m| m.payload.as_slice()).collect();
    assert_eq!(
        payloads,
        vec![b"OFF" as &[u8], b"ON", b"OFF", b"ON"]
    );
}
