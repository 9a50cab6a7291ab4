// SPDX-License-Identifier: MPL-2.0
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;
use toast_bus::config::{self, Config, DEFAULT_DURATION_MS, DEFAULT_ERROR_DURATION_MS};
use toast_bus::notifications::{Notification, NotificationBus, PublishOptions, Severity};

fn ids(bus: &NotificationBus) -> Vec<toast_bus::NotificationId> {
    bus.snapshot().iter().map(Notification::id).collect()
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn ids_are_pairwise_distinct_for_rapid_publishes() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let issued: Vec<_> = (0..1_000).map(|i| bus.info(format!("n{i}"), None)).collect();

    let unique: HashSet<_> = issued.iter().copied().collect();
    assert_eq!(unique.len(), issued.len());
    assert_eq!(bus.len(), 1_000);
}

#[tokio::test(start_paused = true)]
async fn publish_order_is_snapshot_order() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let a = bus.warning("A", Some(5_000));
    let b = bus.success("B", Some(5_000));
    let c = bus.info("C", Some(0));

    assert_eq!(ids(&bus), [a, b, c]);
    sleep_ms(1_000).await;
    assert_eq!(ids(&bus), [a, b, c]);
}

#[tokio::test(start_paused = true)]
async fn notification_auto_retires_after_its_duration() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let id = bus.publish(PublishOptions::new("x").duration_ms(100));

    sleep_ms(50).await;
    assert_eq!(ids(&bus), [id]);
    sleep_ms(51).await;
    assert!(bus.is_empty());
    assert_eq!(bus.pending_timers(), 0);
}

#[tokio::test(start_paused = true)]
async fn dismiss_twice_and_after_expiry_never_double_removes() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let keep = bus.info("keep", Some(0));
    let twice = bus.info("twice", Some(0));
    let expired = bus.info("expired", Some(100));

    bus.dismiss(twice);
    bus.dismiss(twice);
    assert_eq!(ids(&bus), [keep, expired]);

    sleep_ms(101).await;
    bus.dismiss(expired);
    assert_eq!(ids(&bus), [keep]);
}

#[tokio::test(start_paused = true)]
async fn zero_duration_is_never_auto_retired() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let id = bus.publish(PublishOptions::new("x").duration_ms(0));

    sleep_ms(24 * 60 * 60 * 1_000).await;
    assert_eq!(ids(&bus), [id]);

    bus.dismiss(id);
    assert!(bus.is_empty());
}

#[tokio::test(start_paused = true)]
async fn error_uses_longer_default_then_retires() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let options: PublishOptions =
        toml::from_str("kind = \"error\"\nmessage = \"failed\"").expect("valid toml");
    bus.publish(options);

    let snapshot = bus.snapshot();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].kind(), Severity::Error);
    assert_eq!(
        snapshot[0].duration(),
        Some(Duration::from_millis(DEFAULT_ERROR_DURATION_MS))
    );
    assert!(DEFAULT_ERROR_DURATION_MS > DEFAULT_DURATION_MS);

    sleep_ms(DEFAULT_DURATION_MS + 1).await;
    assert_eq!(bus.len(), 1);
    sleep_ms(DEFAULT_ERROR_DURATION_MS - DEFAULT_DURATION_MS).await;
    assert!(bus.is_empty());
}

#[tokio::test(start_paused = true)]
async fn shorter_timer_retires_first() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let a = bus.info("A", Some(5_000));
    let _b = bus.info("B", Some(1_000));

    sleep_ms(1_001).await;
    assert_eq!(ids(&bus), [a]);
    sleep_ms(4_000).await;
    assert!(bus.is_empty());
}

#[tokio::test(start_paused = true)]
async fn dismissing_a_never_issued_id_changes_nothing() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    bus.info("a", None);
    let before = bus.snapshot();

    let other = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let foreign = other.info("elsewhere", None);
    bus.dismiss(foreign);

    assert_eq!(bus.snapshot(), before);
}

#[tokio::test(start_paused = true)]
async fn unknown_kind_is_published_as_info() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let id = bus.publish(PublishOptions::new("x").kind("celebration"));

    assert_eq!(bus.get(id).map(|n| n.kind()), Some(Severity::Info));
}

#[tokio::test(start_paused = true)]
async fn teardown_stops_pending_timers() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    bus.subscribe(move |snapshot: &[Notification]| {
        sink.lock().expect("sink poisoned").push(snapshot.len());
    });
    bus.info("a", Some(100));
    bus.error("b", None);

    bus.teardown();
    sleep_ms(10_000).await;

    assert!(bus.is_empty());
    assert_eq!(*seen.lock().expect("sink poisoned"), [1, 2, 0]);
}

#[tokio::test(start_paused = true)]
async fn watch_receiver_wakes_on_expiry() {
    let bus = NotificationBus::with_tokio(Config::default()).expect("inside runtime");
    let mut rx = bus.watch();
    bus.info("a", Some(100));
    rx.borrow_and_update();

    rx.changed().await.expect("bus still alive");
    assert!(rx.borrow().is_empty());
}

#[tokio::test(start_paused = true)]
async fn configured_durations_drive_defaults() {
    let dir = tempdir().expect("Failed to create temporary directory");
    let path = dir.path().join("settings.toml");
    let saved = Config {
        success_ms: Some(200),
        ..Config::default()
    };
    config::save_to_path(&saved, &path).expect("Failed to write config file");

    let loaded = config::load_from_path(&path).expect("Failed to load config from path");
    let bus = NotificationBus::with_tokio(loaded).expect("inside runtime");
    let quick = bus.success("quick", None);
    let slow = bus.info("slow", None);

    sleep_ms(201).await;
    assert!(bus.get(quick).is_none());
    assert!(bus.get(slow).is_some());
}
