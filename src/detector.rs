//! Issue detection
//!
//! [`detect`] is a pure function over one set of readings. Rules run in a
//! fixed order (system, then interfaces, then wireless) and keep input order
//! within a category, so the same readings always yield the same findings in
//! the same order.
//!
//! Messages deliberately omit the observed value. A condition that persists
//! across polls therefore produces an identical message every time, which is
//! what ticket deduplication keys on.

use chrono::{DateTime, Utc};

use crate::snapshot::{DeviceReadings, Finding, FindingCategory, Issues, Measure, Severity, format_number};
use crate::thresholds::ThresholdSet;
use crate::{InterfaceStats, LinkStatus, SystemResources, WirelessOverview};

/// Fraction of a threshold above which a metric counts as elevated
pub const ELEVATED_MARGIN: f64 = 0.8;

/// Drop counters above this raise a warning
pub const DROP_WARNING_THRESHOLD: u64 = 10;

/// Wireless clients weaker than this raise a warning
pub const WEAK_SIGNAL_DBM: i32 = -80;

/// Interface types whose link state follows their members
const AGGREGATE_INTERFACE_TYPES: [&str; 2] = ["bridge", "bond"];

pub fn detect(readings: &DeviceReadings, thresholds: &ThresholdSet, detected_at: DateTime<Utc>) -> Issues {
    let mut issues = Issues::default();

    if let Some(resources) = readings.resources.value() {
        check_system(resources, thresholds, detected_at, &mut issues);
    }

    if let Some(interfaces) = readings.interfaces.value() {
        for interface in interfaces {
            check_interface(interface, detected_at, &mut issues);
        }
    }

    if let Some(wireless) = readings.wireless.value() {
        check_wireless(wireless, detected_at, &mut issues);
    }

    issues
}

/// Tier of `value` against `threshold`, `None` when within normal range
pub fn classify(value: f64, threshold: f64) -> Option<Severity> {
    if value > threshold {
        Some(Severity::Critical)
    } else if value > threshold * ELEVATED_MARGIN {
        Some(Severity::Warning)
    } else {
        None
    }
}

fn check_system(
    resources: &SystemResources,
    thresholds: &ThresholdSet,
    detected_at: DateTime<Utc>,
    issues: &mut Issues,
) {
    let mut metrics = vec![
        ("cpu", "CPU load", resources.cpu_load, thresholds.cpu_load_percent, "%"),
        (
            "memory",
            "Memory usage",
            resources.memory_usage_percent,
            thresholds.memory_usage_percent,
            "%",
        ),
        ("disk", "Disk usage", resources.disk_usage_percent, thresholds.disk_usage_percent, "%"),
    ];
    if let Some(temperature) = resources.temperature {
        metrics.push((
            "temperature",
            "Temperature",
            temperature,
            thresholds.temperature_celsius,
            "°C",
        ));
    }

    for (component, label, value, threshold, unit) in metrics {
        let Some(severity) = classify(value, threshold) else {
            continue;
        };

        let limit = match severity {
            Severity::Critical => format_number(threshold),
            _ => format_number(threshold * ELEVATED_MARGIN),
        };
        let message = match severity {
            Severity::Critical => format!("{label} above {limit}{unit} threshold"),
            _ => format!("{label} elevated above {limit}{unit}"),
        };

        issues.push(
            severity,
            Finding {
                category: FindingCategory::System,
                component: component.to_string(),
                message,
                observed_value: Measure::Number(value),
                threshold: Some(Measure::Number(threshold)),
                detected_at,
            },
        );
    }
}

fn check_interface(interface: &InterfaceStats, detected_at: DateTime<Utc>, issues: &mut Issues) {
    let finding = |message: String, observed: Measure, threshold: Option<Measure>| Finding {
        category: FindingCategory::Interface,
        component: interface.name.clone(),
        message,
        observed_value: observed,
        threshold,
        detected_at,
    };

    let aggregate = AGGREGATE_INTERFACE_TYPES.contains(&interface.interface_type.as_str());
    if interface.link_status == LinkStatus::Down && !aggregate {
        issues.push(
            Severity::Critical,
            finding(
                format!("Interface {} is down", interface.name),
                Measure::from("down"),
                Some(Measure::from("up")),
            ),
        );
    }

    if interface.rx_errors > 0 || interface.tx_errors > 0 {
        let errors = interface.rx_errors.saturating_add(interface.tx_errors);
        issues.push(
            Severity::Warning,
            finding(
                format!("Interface {} has transmission errors", interface.name),
                Measure::Number(errors as f64),
                Some(Measure::Number(0.0)),
            ),
        );
    }

    if interface.rx_drops > DROP_WARNING_THRESHOLD || interface.tx_drops > DROP_WARNING_THRESHOLD {
        let drops = interface.rx_drops.max(interface.tx_drops);
        issues.push(
            Severity::Warning,
            finding(
                format!("Interface {} is dropping packets", interface.name),
                Measure::Number(drops as f64),
                Some(Measure::Number(DROP_WARNING_THRESHOLD as f64)),
            ),
        );
    }
}

fn check_wireless(wireless: &WirelessOverview, detected_at: DateTime<Utc>, issues: &mut Issues) {
    for radio in wireless.radios.iter().filter(|radio| !radio.enabled) {
        issues.push(
            Severity::Info,
            Finding {
                category: FindingCategory::Wireless,
                component: radio.name.clone(),
                message: format!("Wireless radio {} is disabled", radio.name),
                observed_value: Measure::from("disabled"),
                threshold: None,
                detected_at,
            },
        );
    }

    for client in wireless
        .clients
        .iter()
        .filter(|client| client.signal_strength_dbm < WEAK_SIGNAL_DBM)
    {
        issues.push(
            Severity::Warning,
            Finding {
                category: FindingCategory::Wireless,
                component: client.radio_interface.clone(),
                message: format!(
                    "Weak signal from wireless client {} on {}",
                    client.mac_address, client.radio_interface
                ),
                observed_value: Measure::Number(f64::from(client.signal_strength_dbm)),
                threshold: Some(Measure::Number(f64::from(WEAK_SIGNAL_DBM))),
                detected_at,
            },
        );
    }
}
