//! Message types for monitor actor communication
//!
//! ## Design Principles
//!
//! 1. **Commands**: Request/response messages sent to one monitor via mpsc
//! 2. **Events**: Broadcast through [`EventGateway`](crate::events::EventGateway)
//! 3. **Outcomes**: "already running" and "not running" are answers, not errors

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use crate::error::MonitorResult;
use crate::snapshot::MonitoringSnapshot;
use crate::thresholds::ThresholdSet;

/// Commands that can be sent to a MonitorActor
#[derive(Debug)]
pub enum MonitorCommand {
    /// Begin scheduled polling
    ///
    /// Runs one poll before answering. `interval` overrides the persisted
    /// `monitoringInterval`.
    Start {
        interval: Option<Duration>,
        respond_to: oneshot::Sender<MonitorResult<StartOutcome>>,
    },

    /// Cancel the schedule; no tick fires after the answer
    Stop {
        respond_to: oneshot::Sender<StopOutcome>,
    },

    /// Run one poll now, independent of the schedule
    PollNow {
        respond_to: oneshot::Sender<PollOutcome>,
    },

    /// End the actor task
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StartOutcome {
    #[serde(rename_all = "camelCase")]
    Started { poll_interval_ms: u64 },
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// At least one category was gathered
    Captured(Arc<MonitoringSnapshot>),
    /// Every category failed; the previous snapshot is kept
    Failed(String),
}

/// Session state shared between the actor and its handles
///
/// The actor holds the write lock only for field assignments, never across
/// a device call, so status reads are not blocked by an in-flight poll.
#[derive(Debug, Clone, Default)]
pub struct SessionView {
    pub running: bool,
    pub poll_interval: Option<Duration>,
    pub last_snapshot: Option<Arc<MonitoringSnapshot>>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorStatus {
    pub device_id: String,
    pub display_name: String,
    pub is_running: bool,
    pub poll_interval_ms: Option<u64>,
    pub last_snapshot_timestamp: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub thresholds: ThresholdSet,
}
