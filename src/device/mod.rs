//! Managed network device access
//!
//! The monitor talks to a router only through the [`DeviceClient`] capability
//! trait. Two implementations ship with the crate:
//!
//! - [`routeros::RouterOsClient`]: Mikrotik RouterOS REST API over HTTP(S)
//! - [`serialized::SerializedDevice`]: wraps any client, serialises calls on a
//!   single connection and bounds each one with a timeout
//!
//! Tests provide their own fakes.

pub mod error;
pub mod routeros;
pub mod serialized;

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{ActiveSession, InterfaceStats, SystemResources, WirelessOverview};

pub use error::{DeviceError, DeviceErrorKind, DeviceResult};

/// Extra budget per echo, since RouterOS waits one second between pings
pub const PER_ECHO_BUDGET: Duration = Duration::from_secs(1);

/// Time allowed for a ping of `count` echoes on top of the call timeout
pub fn ping_budget(timeout: Duration, count: u32) -> Duration {
    timeout.saturating_add(PER_ECHO_BUDGET.saturating_mul(count))
}

/// Read queries and action commands against one managed device
///
/// Every operation is independent: a failing wireless query must not affect
/// the resource query issued right after it. Implementations never retry;
/// the caller decides.
#[async_trait]
pub trait DeviceClient: Send + Sync {
    async fn get_resources(&self) -> DeviceResult<SystemResources>;

    async fn get_interfaces(&self) -> DeviceResult<Vec<InterfaceStats>>;

    async fn get_active_sessions(&self) -> DeviceResult<Vec<ActiveSession>>;

    async fn get_wireless(&self) -> DeviceResult<WirelessOverview>;

    /// Send `count` ICMP echoes from the device to `host`
    async fn ping(&self, host: &str, count: u32) -> DeviceResult<PingResult>;

    /// Trace the route from the device to `host`, hops in order
    async fn traceroute(&self, host: &str) -> DeviceResult<Vec<TracerouteHop>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EchoStatus {
    Reply,
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingEcho {
    pub seq: u32,
    pub response_time_ms: Option<f64>,
    pub ttl: Option<u32>,
    pub status: EchoStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingResult {
    pub host: String,
    pub sent: u32,
    pub received: u32,
    pub packet_loss_percent: f64,
    pub avg_response_time_ms: Option<f64>,
    pub echoes: Vec<PingEcho>,
}

impl PingResult {
    /// Build the aggregate from per-echo results
    ///
    /// Loss is 100% when nothing was sent; the average only covers replies
    /// that carried a round-trip time.
    pub fn from_echoes(host: impl Into<String>, echoes: Vec<PingEcho>) -> Self {
        let sent = echoes.len() as u32;
        let received = echoes
            .iter()
            .filter(|echo| echo.status == EchoStatus::Reply)
            .count() as u32;

        let packet_loss_percent = if sent == 0 {
            100.0
        } else {
            f64::from(sent - received) / f64::from(sent) * 100.0
        };

        let times: Vec<f64> = echoes
            .iter()
            .filter(|echo| echo.status == EchoStatus::Reply)
            .filter_map(|echo| echo.response_time_ms)
            .collect();
        let avg_response_time_ms = if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<f64>() / times.len() as f64)
        };

        Self {
            host: host.into(),
            sent,
            received,
            packet_loss_percent,
            avg_response_time_ms,
            echoes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerouteHop {
    pub hop: u32,
    /// `None` when the hop never answered
    pub address: Option<String>,
    pub loss_percent: f64,
    pub sent: u32,
    pub last_ms: Option<f64>,
    pub avg_ms: Option<f64>,
    pub best_ms: Option<f64>,
    pub worst_ms: Option<f64>,
    pub status: Option<String>,
}
