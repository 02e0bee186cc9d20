pub mod actors;
pub mod api;
pub mod config;
pub mod detector;
pub mod device;
pub mod error;
pub mod events;
pub mod snapshot;
pub mod storage;
pub mod thresholds;
pub mod tickets;
pub mod util;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemResources {
    pub cpu_load: f64,
    pub memory_usage_percent: f64,
    pub disk_usage_percent: f64,
    pub uptime_secs: u64,
    pub firmware_version: String,
    pub board_name: String,
    /// Board temperature in °C, when the device reports one
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStatus {
    Up,
    Down,
    /// Administratively disabled, not a fault
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterfaceStats {
    pub name: String,
    #[serde(rename = "type")]
    pub interface_type: String,
    pub link_status: LinkStatus,
    pub mac_address: Option<String>,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_drops: u64,
    pub tx_drops: u64,
}

impl InterfaceStats {
    pub fn new(name: impl Into<String>, interface_type: impl Into<String>, link_status: LinkStatus) -> Self {
        Self {
            name: name.into(),
            interface_type: interface_type.into(),
            link_status,
            mac_address: None,
            rx_bytes: 0,
            tx_bytes: 0,
            rx_packets: 0,
            tx_packets: 0,
            rx_errors: 0,
            tx_errors: 0,
            rx_drops: 0,
            tx_drops: 0,
        }
    }
}

/// An authenticated PPP/PPPoE customer session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveSession {
    pub session_name: String,
    pub service_type: String,
    pub remote_address: Option<String>,
    pub uptime_secs: u64,
    pub encoding: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirelessRadio {
    pub name: String,
    pub mac_address: Option<String>,
    pub ssid: Option<String>,
    pub band: Option<String>,
    pub channel: Option<String>,
    pub frequency: Option<u32>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirelessClient {
    pub radio_interface: String,
    pub mac_address: String,
    pub signal_strength_dbm: i32,
    pub tx_rate: Option<String>,
    pub rx_rate: Option<String>,
    pub uptime_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirelessOverview {
    pub radios: Vec<WirelessRadio>,
    pub clients: Vec<WirelessClient>,
}
