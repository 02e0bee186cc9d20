//! Ticket and settings records
//!
//! ## Tickets
//!
//! The monitor only ever creates tickets and looks them up by device and subject.
//! Everything after creation (assignment, progress, resolution) belongs to
//! the ticketing back office, which drives status through
//! [`StorageBackend::update_ticket_status`](super::StorageBackend::update_ticket_status).
//!
//! ```text
//! open ──► in_progress ──► resolved
//!   │           │
//!   └───────────┴────────► closed
//! ```
//!
//! Only `open` and `in_progress` tickets suppress a new one for the same device and subject.
//!
//! ## Settings
//!
//! A flat key/value record shared with the back office. Unknown keys are
//! ignored; values that do not parse are treated as absent.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category of every ticket filed by the monitor
pub const NETWORK_ISSUE_CATEGORY: &str = "network_issue";

/// Source marker of every ticket filed by the monitor
pub const MONITORING_SOURCE: &str = "ai_monitoring";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    /// Still being worked on; blocks duplicates
    pub fn is_active(self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TicketStatus::Open),
            "in_progress" => Ok(TicketStatus::InProgress),
            "resolved" => Ok(TicketStatus::Resolved),
            "closed" => Ok(TicketStatus::Closed),
            other => Err(format!("unknown ticket status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TicketPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            TicketPriority::Low => "low",
            TicketPriority::Medium => "medium",
            TicketPriority::High => "high",
            TicketPriority::Urgent => "urgent",
        }
    }
}

impl fmt::Display for TicketPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TicketPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TicketPriority::Low),
            "medium" => Ok(TicketPriority::Medium),
            "high" => Ok(TicketPriority::High),
            "urgent" => Ok(TicketPriority::Urgent),
            other => Err(format!("unknown ticket priority: {other}")),
        }
    }
}

/// A stored trouble ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: i64,
    pub ticket_number: String,
    pub subject: String,
    pub description: String,
    pub category: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub source: String,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ticket fields supplied by the creator; the backend assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub ticket_number: String,
    pub subject: String,
    pub description: String,
    pub category: String,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub source: String,
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewTicket {
    pub fn into_ticket(self, id: i64) -> Ticket {
        Ticket {
            id,
            ticket_number: self.ticket_number,
            subject: self.subject,
            description: self.description,
            category: self.category,
            priority: self.priority,
            status: self.status,
            source: self.source,
            device_id: self.device_id,
            created_at: self.created_at,
        }
    }
}

/// Persisted monitoring settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorSettings {
    pub cpu_threshold: Option<f64>,
    pub memory_threshold: Option<f64>,
    pub temperature_threshold: Option<f64>,
    /// Poll interval in seconds
    pub monitoring_interval: Option<u64>,
}

impl MonitorSettings {
    pub const CPU_THRESHOLD: &'static str = "cpuThreshold";
    pub const MEMORY_THRESHOLD: &'static str = "memoryThreshold";
    pub const TEMPERATURE_THRESHOLD: &'static str = "temperatureThreshold";
    pub const MONITORING_INTERVAL: &'static str = "monitoringInterval";

    /// Build from raw key/value rows
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut settings = Self::default();
        for (key, value) in pairs {
            let value = value.trim();
            match key {
                Self::CPU_THRESHOLD => settings.cpu_threshold = value.parse().ok(),
                Self::MEMORY_THRESHOLD => settings.memory_threshold = value.parse().ok(),
                Self::TEMPERATURE_THRESHOLD => settings.temperature_threshold = value.parse().ok(),
                Self::MONITORING_INTERVAL => settings.monitoring_interval = value.parse().ok(),
                _ => {}
            }
        }
        settings
    }

    /// Key/value rows for the fields that are set
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(v) = self.cpu_threshold {
            pairs.push((Self::CPU_THRESHOLD, v.to_string()));
        }
        if let Some(v) = self.memory_threshold {
            pairs.push((Self::MEMORY_THRESHOLD, v.to_string()));
        }
        if let Some(v) = self.temperature_threshold {
            pairs.push((Self::TEMPERATURE_THRESHOLD, v.to_string()));
        }
        if let Some(v) = self.monitoring_interval {
            pairs.push((Self::MONITORING_INTERVAL, v.to_string()));
        }
        pairs
    }
}
