//! End-to-end detection scenarios: poll, detect, publish, file tickets

use std::collections::BTreeSet;
use std::sync::Arc;

use assert_matches::assert_matches;
use network_monitor::{
    InterfaceStats, LinkStatus, WirelessClient, WirelessOverview, WirelessRadio,
    actors::{MonitorConfig, MonitorHandle, PollOutcome},
    device::{DeviceError, DeviceErrorKind},
    events::{EventGateway, MonitorEvent},
    snapshot::{MonitoringSnapshot, Probe},
    storage::{MemoryBackend, StorageBackend, TicketPriority, TicketStatus},
    thresholds::ThresholdUpdate,
};
use pretty_assertions::assert_eq;

use crate::helpers::*;

fn captured(outcome: PollOutcome) -> Arc<MonitoringSnapshot> {
    match outcome {
        PollOutcome::Captured(snapshot) => snapshot,
        PollOutcome::Failed(error) => panic!("poll failed: {error}"),
    }
}

/// High CPU plus a dead uplink
fn overloaded_device() -> FakeDevice {
    let device = FakeDevice::healthy();
    device.set_resources(Ok(resources(95.0)));
    device.set_interfaces(Ok(vec![
        InterfaceStats::new("ether1", "ether", LinkStatus::Down),
        InterfaceStats::new("ether2", "ether", LinkStatus::Up),
    ]));
    device
}

#[tokio::test]
async fn test_cpu_and_interface_down_file_two_tickets() {
    let storage = Arc::new(MemoryBackend::new());
    let gateway = EventGateway::default();
    let mut rx = gateway.subscribe();
    let monitor = spawn_monitor(Arc::new(overloaded_device()), storage.clone(), gateway);

    let snapshot = captured(monitor.poll_now().await.unwrap());

    let critical: Vec<&str> = snapshot
        .issues()
        .critical
        .iter()
        .map(|finding| finding.message.as_str())
        .collect();
    assert_eq!(
        critical,
        vec!["CPU load above 80% threshold", "Interface ether1 is down"]
    );

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec!["monitoring_data", "critical_issue"]);
    assert_matches!(
        &events[1],
        MonitorEvent::CriticalIssue { device_id, issues, .. } if device_id == DEVICE_ID && issues.len() == 2
    );

    let tickets = storage.list_tickets(10).await.unwrap();
    assert_eq!(tickets.len(), 2);
    let subjects: BTreeSet<&str> = tickets.iter().map(|t| t.subject.as_str()).collect();
    assert_eq!(
        subjects,
        BTreeSet::from([
            "Automatic Alert: CPU load above 80% threshold",
            "Automatic Alert: Interface ether1 is down",
        ])
    );
    for ticket in &tickets {
        assert_eq!(ticket.status, TicketStatus::Open);
        assert_eq!(ticket.priority, TicketPriority::High);
        assert_eq!(ticket.category, "network_issue");
        assert_eq!(ticket.source, "ai_monitoring");
        assert_eq!(ticket.device_id.as_deref(), Some(DEVICE_ID));
        assert!(ticket.ticket_number.starts_with("NET-"));
    }

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_persisting_condition_keeps_one_ticket() {
    let storage = Arc::new(MemoryBackend::new());
    let device = Arc::new(overloaded_device());
    let monitor = spawn_monitor(device.clone(), storage.clone(), EventGateway::default());

    for _ in 0..3 {
        captured(monitor.poll_now().await.unwrap());
    }
    let tickets = storage.list_tickets(10).await.unwrap();
    assert_eq!(tickets.len(), 2);

    // resolving the CPU ticket lets the next occurrence file a fresh one
    let cpu_ticket = tickets
        .iter()
        .find(|t| t.subject.contains("CPU"))
        .unwrap();
    storage
        .update_ticket_status(cpu_ticket.id, TicketStatus::Resolved)
        .await
        .unwrap();

    captured(monitor.poll_now().await.unwrap());
    let tickets = storage.list_tickets(10).await.unwrap();
    assert_eq!(tickets.len(), 3);
    let open_cpu = tickets
        .iter()
        .filter(|t| t.subject.contains("CPU") && t.status == TicketStatus::Open)
        .count();
    assert_eq!(open_cpu, 1);

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_same_condition_on_two_devices_files_a_ticket_each() {
    let storage = Arc::new(MemoryBackend::new());
    let gateway = EventGateway::default();
    let core = spawn_monitor(Arc::new(overloaded_device()), storage.clone(), gateway.clone());
    let edge = MonitorHandle::spawn(
        MonitorConfig {
            device_id: "edge".to_string(),
            display_name: "Edge Router".to_string(),
            ..monitor_config()
        },
        Arc::new(overloaded_device()),
        storage.clone(),
        gateway,
    );

    for _ in 0..2 {
        captured(core.poll_now().await.unwrap());
        captured(edge.poll_now().await.unwrap());
    }

    let tickets = storage.list_tickets(10).await.unwrap();
    assert_eq!(tickets.len(), 4);
    let cpu_devices: BTreeSet<&str> = tickets
        .iter()
        .filter(|t| t.subject == "Automatic Alert: CPU load above 80% threshold")
        .filter_map(|t| t.device_id.as_deref())
        .collect();
    assert_eq!(cpu_devices, BTreeSet::from(["core", "edge"]));

    core.shutdown().await.unwrap();
    edge.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_wireless_failure_keeps_other_categories() {
    let device = FakeDevice::healthy();
    device.set_wireless(Err(DeviceError::Unavailable("no such command".to_string())));
    let monitor = spawn_monitor(Arc::new(device), Arc::new(MemoryBackend::new()), EventGateway::default());

    let snapshot = captured(monitor.poll_now().await.unwrap());

    assert_matches!(snapshot.resources(), Probe::Ok(r) if r.cpu_load == 12.0);
    assert_matches!(snapshot.interfaces(), Probe::Ok(list) if list.len() == 1);
    let failure = snapshot.wireless().failure().unwrap();
    assert_eq!(failure.kind, DeviceErrorKind::Unavailable);

    let json = serde_json::to_value(snapshot.as_ref()).unwrap();
    assert_eq!(json["wireless"]["status"], "error");
    assert_eq!(json["wireless"]["value"]["kind"], "unavailable");
    assert_eq!(json["resources"]["status"], "ok");

    assert!(monitor.status().await.last_error.is_none());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_bridge_down_is_not_critical() {
    let storage = Arc::new(MemoryBackend::new());
    let gateway = EventGateway::default();
    let mut rx = gateway.subscribe();
    let device = FakeDevice::healthy();
    device.set_interfaces(Ok(vec![
        InterfaceStats::new("bridge1", "bridge", LinkStatus::Down),
        InterfaceStats::new("ether5", "ether", LinkStatus::Disabled),
    ]));
    let monitor = spawn_monitor(Arc::new(device), storage.clone(), gateway);

    let snapshot = captured(monitor.poll_now().await.unwrap());

    assert!(snapshot.issues().is_empty());
    assert_eq!(kinds(&drain(&mut rx)), vec!["monitoring_data"]);
    assert!(storage.list_tickets(10).await.unwrap().is_empty());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_total_failure_keeps_previous_snapshot() {
    let gateway = EventGateway::default();
    let mut rx = gateway.subscribe();
    let device = Arc::new(FakeDevice::healthy());
    let monitor = spawn_monitor(device.clone(), Arc::new(MemoryBackend::new()), gateway);

    let first = captured(monitor.poll_now().await.unwrap());
    drain(&mut rx);

    device.fail_all(DeviceError::Unreachable("connection refused".to_string()));
    let outcome = monitor.poll_now().await.unwrap();
    assert_matches!(outcome, PollOutcome::Failed(error) if error.contains("connection refused"));

    let events = drain(&mut rx);
    assert_eq!(kinds(&events), vec!["monitoring_error"]);

    let kept = monitor.latest_snapshot().await.unwrap();
    assert_eq!(kept.timestamp(), first.timestamp());
    assert!(monitor.status().await.last_error.is_some());

    // recovery clears the error
    device.set_resources(Ok(resources(10.0)));
    captured(monitor.poll_now().await.unwrap());
    assert!(monitor.status().await.last_error.is_none());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_threshold_update_applies_to_next_poll() {
    let storage = Arc::new(MemoryBackend::new());
    let device = FakeDevice::healthy();
    device.set_resources(Ok(resources(95.0)));
    let monitor = spawn_monitor(Arc::new(device), storage.clone(), EventGateway::default());

    let updated = monitor
        .update_thresholds(&ThresholdUpdate {
            cpu_load_percent: Some(99.0),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(updated.cpu_load_percent, 99.0);
    assert_eq!(monitor.thresholds(), updated);

    let snapshot = captured(monitor.poll_now().await.unwrap());
    assert!(snapshot.issues().critical.is_empty());
    assert_eq!(snapshot.issues().warning.len(), 1);
    assert_eq!(
        snapshot.issues().warning[0].message,
        "CPU load elevated above 79.2%"
    );
    assert!(storage.list_tickets(10).await.unwrap().is_empty());

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_wireless_findings() {
    let device = FakeDevice::healthy();
    device.set_wireless(Ok(WirelessOverview {
        radios: vec![WirelessRadio {
            name: "wlan2".to_string(),
            mac_address: None,
            ssid: Some("guest".to_string()),
            band: None,
            channel: None,
            frequency: None,
            enabled: false,
        }],
        clients: vec![WirelessClient {
            radio_interface: "wlan1".to_string(),
            mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            signal_strength_dbm: -85,
            tx_rate: None,
            rx_rate: None,
            uptime_secs: 120,
        }],
    }));
    let monitor = spawn_monitor(Arc::new(device), Arc::new(MemoryBackend::new()), EventGateway::default());

    let snapshot = captured(monitor.poll_now().await.unwrap());
    let issues = snapshot.issues();

    assert!(issues.critical.is_empty());
    assert_eq!(issues.info[0].message, "Wireless radio wlan2 is disabled");
    assert_eq!(
        issues.warning[0].message,
        "Weak signal from wireless client AA:BB:CC:DD:EE:FF on wlan1"
    );

    monitor.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_storage_outage_does_not_break_polling() {
    let gateway = EventGateway::default();
    let mut rx = gateway.subscribe();
    let monitor = spawn_monitor(Arc::new(overloaded_device()), Arc::new(BrokenStorage), gateway);

    let snapshot = captured(monitor.poll_now().await.unwrap());
    assert_eq!(snapshot.issues().critical.len(), 2);
    assert_eq!(kinds(&drain(&mut rx)), vec!["monitoring_data", "critical_issue"]);

    monitor.shutdown().await.unwrap();
}
