//! Alerting thresholds, shared between the poll loop and the API

use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MonitorError, MonitorResult};
use crate::storage::MonitorSettings;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdSet {
    pub cpu_load_percent: f64,
    pub memory_usage_percent: f64,
    pub disk_usage_percent: f64,
    pub packet_loss_percent: f64,
    pub latency_ms: f64,
    pub bandwidth_utilization_percent: f64,
    pub signal_strength_dbm: f64,
    pub temperature_celsius: f64,
}

impl Default for ThresholdSet {
    fn default() -> Self {
        Self {
            cpu_load_percent: 80.0,
            memory_usage_percent: 80.0,
            disk_usage_percent: 80.0,
            packet_loss_percent: 5.0,
            latency_ms: 100.0,
            bandwidth_utilization_percent: 80.0,
            signal_strength_dbm: -70.0,
            temperature_celsius: 70.0,
        }
    }
}

/// Partial threshold change; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ThresholdUpdate {
    pub cpu_load_percent: Option<f64>,
    pub memory_usage_percent: Option<f64>,
    pub disk_usage_percent: Option<f64>,
    pub packet_loss_percent: Option<f64>,
    pub latency_ms: Option<f64>,
    pub bandwidth_utilization_percent: Option<f64>,
    pub signal_strength_dbm: Option<f64>,
    pub temperature_celsius: Option<f64>,
}

impl ThresholdUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Copy)]
enum Range {
    Percent,
    Positive,
    Signal,
    Temperature,
}

impl Range {
    fn check(self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            Range::Percent => value > 0.0 && value <= 100.0,
            Range::Positive => value > 0.0,
            Range::Signal => (-150.0..=0.0).contains(&value),
            Range::Temperature => value > 0.0 && value <= 150.0,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Range::Percent => "a percentage in (0, 100]",
            Range::Positive => "greater than 0",
            Range::Signal => "a dBm value in [-150, 0]",
            Range::Temperature => "a temperature in (0, 150]",
        }
    }
}

fn validate(field: &str, value: f64, range: Range) -> MonitorResult<f64> {
    if range.check(value) {
        Ok(value)
    } else {
        Err(MonitorError::configuration(format!(
            "{field} must be {}, got {value}",
            range.describe()
        )))
    }
}

/// Current thresholds for one device
///
/// Reads return a copy, so a comparison in flight always sees one consistent
/// set even when an update lands concurrently.
#[derive(Debug, Default)]
pub struct ThresholdStore {
    current: RwLock<ThresholdSet>,
}

impl ThresholdStore {
    pub fn new(initial: ThresholdSet) -> Self {
        Self {
            current: RwLock::new(initial),
        }
    }

    pub fn get(&self) -> ThresholdSet {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Reset to defaults overlaid with the persisted settings
    pub fn load(&self, settings: Option<&MonitorSettings>) -> ThresholdSet {
        let mut next = ThresholdSet::default();

        if let Some(settings) = settings {
            let persisted = [
                ("cpuThreshold", settings.cpu_threshold, Range::Percent, &mut next.cpu_load_percent),
                (
                    "memoryThreshold",
                    settings.memory_threshold,
                    Range::Percent,
                    &mut next.memory_usage_percent,
                ),
                (
                    "temperatureThreshold",
                    settings.temperature_threshold,
                    Range::Temperature,
                    &mut next.temperature_celsius,
                ),
            ];

            for (key, value, range, slot) in persisted {
                let Some(value) = value else {
                    continue;
                };
                if range.check(value) {
                    *slot = value;
                } else {
                    warn!("ignoring persisted {key}={value}, using default {slot}");
                }
            }
        }

        *self.current.write().unwrap_or_else(PoisonError::into_inner) = next;
        debug!("thresholds loaded: {next:?}");
        next
    }

    /// Validate and merge `update`, returning the resulting set
    ///
    /// Nothing changes unless every provided field is valid.
    pub fn update(&self, update: &ThresholdUpdate) -> MonitorResult<ThresholdSet> {
        if update.is_empty() {
            return Err(MonitorError::configuration("no threshold fields provided"));
        }

        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = *guard;

        let fields = [
            ("cpuLoadPercent", update.cpu_load_percent, Range::Percent, &mut next.cpu_load_percent),
            (
                "memoryUsagePercent",
                update.memory_usage_percent,
                Range::Percent,
                &mut next.memory_usage_percent,
            ),
            (
                "diskUsagePercent",
                update.disk_usage_percent,
                Range::Percent,
                &mut next.disk_usage_percent,
            ),
            (
                "packetLossPercent",
                update.packet_loss_percent,
                Range::Percent,
                &mut next.packet_loss_percent,
            ),
            ("latencyMs", update.latency_ms, Range::Positive, &mut next.latency_ms),
            (
                "bandwidthUtilizationPercent",
                update.bandwidth_utilization_percent,
                Range::Percent,
                &mut next.bandwidth_utilization_percent,
            ),
            (
                "signalStrengthDbm",
                update.signal_strength_dbm,
                Range::Signal,
                &mut next.signal_strength_dbm,
            ),
            (
                "temperatureCelsius",
                update.temperature_celsius,
                Range::Temperature,
                &mut next.temperature_celsius,
            ),
        ];

        for (field, value, range, slot) in fields {
            if let Some(value) = value {
                *slot = validate(field, value, range)?;
            }
        }

        *guard = next;
        debug!("thresholds updated: {next:?}");
        Ok(next)
    }
}
