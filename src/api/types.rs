//! API request and response types

use serde::{Deserialize, Serialize};

use crate::actors::messages::MonitorStatus;
use crate::storage::Ticket;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub storage: StorageHealth,
    pub devices: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StorageHealth {
    pub healthy: bool,
    pub message: String,
}

/// List of monitored devices
#[derive(Debug, Serialize, Deserialize)]
pub struct DevicesResponse {
    pub devices: Vec<MonitorStatus>,
    pub count: usize,
}

/// Body of `POST /devices/:id/start`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartRequest {
    pub interval_seconds: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PingRequest {
    pub host: String,
    pub count: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerouteRequest {
    pub host: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TracerouteResponse {
    pub host: String,
    pub hops: Vec<crate::device::TracerouteHop>,
}

/// Query parameters for the ticket listing
#[derive(Debug, Deserialize)]
pub struct TicketsQuery {
    /// Maximum number of tickets (default: 50, max: 500)
    #[serde(default = "default_ticket_limit")]
    pub limit: usize,
}

fn default_ticket_limit() -> usize {
    50
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TicketsResponse {
    pub tickets: Vec<Ticket>,
    pub count: usize,
}

/// Query parameters for the event stream
#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    /// Only forward events for this device
    pub device: Option<String>,
}
