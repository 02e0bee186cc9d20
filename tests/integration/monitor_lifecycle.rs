//! Integration tests for the monitor start/stop lifecycle
//!
//! These tests verify that:
//! - start() is idempotent and never arms a second timer
//! - no poll runs and no event is published after stop()
//! - the poll interval comes from the caller, then the settings record
//! - every device call is serialised, scheduled or ad hoc

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use network_monitor::{
    actors::{PollOutcome, StartOutcome, StopOutcome},
    events::EventGateway,
    storage::{MemoryBackend, MonitorSettings},
};
use tokio::sync::broadcast::error::TryRecvError;

use crate::helpers::*;

#[tokio::test(start_paused = true)]
async fn test_start_is_idempotent() {
    let device = Arc::new(FakeDevice::healthy());
    let monitor = spawn_monitor(device.clone(), Arc::new(MemoryBackend::new()), EventGateway::default());

    let first = monitor.start(Some(Duration::from_secs(10))).await.unwrap();
    assert_eq!(first, StartOutcome::Started { poll_interval_ms: 10_000 });
    assert_eq!(device.polls(), 1, "start polls once before answering");

    let second = monitor.start(Some(Duration::from_secs(1))).await.unwrap();
    assert_eq!(second, StartOutcome::AlreadyRunning);
    assert_eq!(device.polls(), 1);

    // one timer at the original period, not two
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(device.polls(), 3);

    let status = monitor.status().await;
    assert!(status.is_running);
    assert_eq!(status.poll_interval_ms, Some(10_000));

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_no_events_after_stop() {
    let device = Arc::new(FakeDevice::healthy());
    let gateway = EventGateway::default();
    let mut rx = gateway.subscribe();
    let monitor = spawn_monitor(device.clone(), Arc::new(MemoryBackend::new()), gateway);

    monitor.start(Some(Duration::from_secs(5))).await.unwrap();
    tokio::time::sleep(Duration::from_secs(11)).await;
    assert_eq!(monitor.stop().await.unwrap(), StopOutcome::Stopped);

    let before = drain(&mut rx);
    assert_eq!(kinds(&before), vec!["monitoring_data"; 3]);
    let polls = device.polls();

    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(device.polls(), polls);
    assert_matches!(rx.try_recv(), Err(TryRecvError::Empty));

    let status = monitor.status().await;
    assert!(!status.is_running);
    assert_eq!(status.poll_interval_ms, None);
    assert!(status.last_snapshot_timestamp.is_some());

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_stop_when_not_running() {
    let monitor = spawn_monitor(
        Arc::new(FakeDevice::healthy()),
        Arc::new(MemoryBackend::new()),
        EventGateway::default(),
    );

    assert_eq!(monitor.stop().await.unwrap(), StopOutcome::NotRunning);

    monitor.start(None).await.unwrap();
    assert_eq!(monitor.stop().await.unwrap(), StopOutcome::Stopped);
    assert_eq!(monitor.stop().await.unwrap(), StopOutcome::NotRunning);

    // a stopped monitor can be started again
    assert_matches!(monitor.start(None).await, Ok(StartOutcome::Started { .. }));

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_interval_and_thresholds_from_settings() {
    let storage = Arc::new(MemoryBackend::with_settings(MonitorSettings {
        cpu_threshold: Some(50.0),
        memory_threshold: None,
        temperature_threshold: Some(60.0),
        monitoring_interval: Some(30),
    }));
    let monitor = spawn_monitor(Arc::new(FakeDevice::healthy()), storage, EventGateway::default());

    let outcome = monitor.start(None).await.unwrap();
    assert_eq!(outcome, StartOutcome::Started { poll_interval_ms: 30_000 });

    let thresholds = monitor.thresholds();
    assert_eq!(thresholds.cpu_load_percent, 50.0);
    assert_eq!(thresholds.memory_usage_percent, 80.0);
    assert_eq!(thresholds.temperature_celsius, 60.0);

    monitor.stop().await.unwrap();

    // an explicit interval wins over the settings record
    let outcome = monitor.start(Some(Duration::from_secs(5))).await.unwrap();
    assert_eq!(outcome, StartOutcome::Started { poll_interval_ms: 5_000 });

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_default_interval_without_settings() {
    let monitor = spawn_monitor(
        Arc::new(FakeDevice::healthy()),
        Arc::new(MemoryBackend::new()),
        EventGateway::default(),
    );

    let outcome = monitor.start(None).await.unwrap();
    assert_eq!(outcome, StartOutcome::Started { poll_interval_ms: 60_000 });

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_start_survives_broken_storage() {
    let monitor = spawn_monitor(
        Arc::new(FakeDevice::healthy()),
        Arc::new(BrokenStorage),
        EventGateway::default(),
    );

    let outcome = monitor.start(None).await.unwrap();
    assert_eq!(outcome, StartOutcome::Started { poll_interval_ms: 60_000 });
    assert_eq!(monitor.thresholds().cpu_load_percent, 80.0);

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_device_calls_never_overlap() {
    let device = Arc::new(FakeDevice::healthy().with_delay(Duration::from_millis(200)));
    let monitor = spawn_monitor(device.clone(), Arc::new(MemoryBackend::new()), EventGateway::default());

    let (poll, ping, trace) = tokio::join!(
        monitor.poll_now(),
        monitor.ping("10.0.0.1", Some(2)),
        monitor.traceroute("10.0.0.1"),
    );

    assert_matches!(poll, Ok(PollOutcome::Captured(_)));
    assert_eq!(ping.unwrap().received, 2);
    assert_eq!(trace.unwrap().len(), 1);
    assert_eq!(device.peak_in_flight(), 1);

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_slow_device_times_out() {
    // slower than the 2s call budget
    let device = Arc::new(FakeDevice::healthy().with_delay(Duration::from_secs(5)));
    let monitor = spawn_monitor(device, Arc::new(MemoryBackend::new()), EventGateway::default());

    let outcome = monitor.poll_now().await.unwrap();
    assert_matches!(outcome, PollOutcome::Failed(error) if error.contains("did not respond"));

    let status = monitor.status().await;
    assert!(status.last_error.is_some());
    assert!(monitor.latest_snapshot().await.is_none());

    monitor.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_ping_times_out() {
    // ping budget is the call timeout plus one second per echo
    let device = Arc::new(FakeDevice::healthy().with_delay(Duration::from_secs(5)));
    let monitor = spawn_monitor(device, Arc::new(MemoryBackend::new()), EventGateway::default());

    let error = monitor.ping("10.0.0.1", Some(1)).await.unwrap_err();
    assert!(error.to_string().contains("did not respond"), "{error}");

    monitor.shutdown().await.unwrap();
}
