//! Result of a single poll cycle
//!
//! A [`MonitoringSnapshot`] is never mutated after [`MonitoringSnapshot::capture`];
//! its issue list is derived once from the readings and the thresholds that
//! were current at capture time.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::detector;
use crate::device::{DeviceErrorKind, DeviceResult};
use crate::thresholds::ThresholdSet;
use crate::{ActiveSession, InterfaceStats, SystemResources, WirelessOverview};

/// Replaces a readings category whose query failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeFailure {
    pub kind: DeviceErrorKind,
    pub message: String,
}

/// Outcome of querying one data category
///
/// Serialised as `{"status": "ok", "value": ...}` or
/// `{"status": "error", "value": {"kind": ..., "message": ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Probe<T> {
    Ok(T),
    Error(ProbeFailure),
}

impl<T> Probe<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Probe::Ok(value) => Some(value),
            Probe::Error(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&ProbeFailure> {
        match self {
            Probe::Ok(_) => None,
            Probe::Error(failure) => Some(failure),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Probe::Error(_))
    }
}

impl<T> From<DeviceResult<T>> for Probe<T> {
    fn from(result: DeviceResult<T>) -> Self {
        match result {
            Ok(value) => Probe::Ok(value),
            Err(e) => Probe::Error(ProbeFailure {
                kind: e.kind(),
                message: e.to_string(),
            }),
        }
    }
}

/// The four categories gathered in one poll
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceReadings {
    pub resources: Probe<SystemResources>,
    pub interfaces: Probe<Vec<InterfaceStats>>,
    pub active_sessions: Probe<Vec<ActiveSession>>,
    pub wireless: Probe<WirelessOverview>,
}

impl DeviceReadings {
    /// Every category failed, nothing usable was gathered
    pub fn all_failed(&self) -> bool {
        self.resources.is_error()
            && self.interfaces.is_error()
            && self.active_sessions.is_error()
            && self.wireless.is_error()
    }

    /// Failure messages of all failed categories, `category: message`
    pub fn failures(&self) -> Vec<String> {
        [
            ("resources", self.resources.failure()),
            ("interfaces", self.interfaces.failure()),
            ("activeSessions", self.active_sessions.failure()),
            ("wireless", self.wireless.failure()),
        ]
        .into_iter()
        .filter_map(|(category, failure)| {
            failure.map(|failure| format!("{category}: {}", failure.message))
        })
        .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingCategory {
    System,
    Interface,
    Wireless,
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FindingCategory::System => "system",
            FindingCategory::Interface => "interface",
            FindingCategory::Wireless => "wireless",
        })
    }
}

/// Observed or threshold value attached to a finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Measure {
    Number(f64),
    Text(String),
}

impl fmt::Display for Measure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Measure::Number(value) => f.write_str(&format_number(*value)),
            Measure::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for Measure {
    fn from(value: f64) -> Self {
        Measure::Number(value)
    }
}

impl From<&str> for Measure {
    fn from(value: &str) -> Self {
        Measure::Text(value.to_string())
    }
}

/// One decimal, `80.0` rendered as `80`
pub fn format_number(value: f64) -> String {
    let text = format!("{value:.1}");
    match text.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub category: FindingCategory,
    /// Metric or component name, e.g. `cpu`, `ether1`, `wlan1`
    pub component: String,
    pub message: String,
    pub observed_value: Measure,
    pub threshold: Option<Measure>,
    pub detected_at: DateTime<Utc>,
}

/// Findings of one poll, split into severity tiers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Issues {
    pub critical: Vec<Finding>,
    pub warning: Vec<Finding>,
    pub info: Vec<Finding>,
}

impl Issues {
    pub fn push(&mut self, severity: Severity, finding: Finding) {
        match severity {
            Severity::Critical => self.critical.push(finding),
            Severity::Warning => self.warning.push(finding),
            Severity::Info => self.info.push(finding),
        }
    }

    pub fn tier(&self, severity: Severity) -> &[Finding] {
        match severity {
            Severity::Critical => &self.critical,
            Severity::Warning => &self.warning,
            Severity::Info => &self.info,
        }
    }

    pub fn has_critical(&self) -> bool {
        !self.critical.is_empty()
    }

    pub fn len(&self) -> usize {
        self.critical.len() + self.warning.len() + self.info.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSnapshot {
    device_id: String,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    readings: DeviceReadings,
    issues: Issues,
}

impl MonitoringSnapshot {
    pub fn capture(
        device_id: impl Into<String>,
        readings: DeviceReadings,
        thresholds: &ThresholdSet,
    ) -> Self {
        Self::capture_at(device_id, readings, thresholds, Utc::now())
    }

    pub fn capture_at(
        device_id: impl Into<String>,
        readings: DeviceReadings,
        thresholds: &ThresholdSet,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let issues = detector::detect(&readings, thresholds, timestamp);
        Self {
            device_id: device_id.into(),
            timestamp,
            readings,
            issues,
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn readings(&self) -> &DeviceReadings {
        &self.readings
    }

    pub fn resources(&self) -> &Probe<SystemResources> {
        &self.readings.resources
    }

    pub fn interfaces(&self) -> &Probe<Vec<InterfaceStats>> {
        &self.readings.interfaces
    }

    pub fn active_sessions(&self) -> &Probe<Vec<ActiveSession>> {
        &self.readings.active_sessions
    }

    pub fn wireless(&self) -> &Probe<WirelessOverview> {
        &self.readings.wireless
    }

    pub fn issues(&self) -> &Issues {
        &self.issues
    }
}
