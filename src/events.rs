//! Fan-out of monitor events to subscribers
//!
//! Publishing never blocks and never fails: with no subscribers the event is
//! dropped, and a subscriber that falls behind loses the oldest events
//! (`RecvError::Lagged`) instead of slowing the poll loop down.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};

use crate::snapshot::{Finding, MonitoringSnapshot};

/// Events retained for slow subscribers before they start lagging
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// A poll completed
    #[serde(rename_all = "camelCase")]
    MonitoringData {
        device_id: String,
        snapshot: Arc<MonitoringSnapshot>,
    },

    /// A poll produced at least one critical finding
    #[serde(rename_all = "camelCase")]
    CriticalIssue {
        device_id: String,
        timestamp: DateTime<Utc>,
        issues: Vec<Finding>,
    },

    /// Nothing could be gathered from the device
    #[serde(rename_all = "camelCase")]
    MonitoringError {
        device_id: String,
        timestamp: DateTime<Utc>,
        error: String,
    },
}

impl MonitorEvent {
    pub fn device_id(&self) -> &str {
        match self {
            MonitorEvent::MonitoringData { device_id, .. }
            | MonitorEvent::CriticalIssue { device_id, .. }
            | MonitorEvent::MonitoringError { device_id, .. } => device_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MonitorEvent::MonitoringData { .. } => "monitoring_data",
            MonitorEvent::CriticalIssue { .. } => "critical_issue",
            MonitorEvent::MonitoringError { .. } => "monitoring_error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventGateway {
    sender: broadcast::Sender<MonitorEvent>,
}

impl Default for EventGateway {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventGateway {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn publish(&self, event: MonitorEvent) {
        let kind = event.kind();
        match self.sender.send(event) {
            Ok(receivers) => trace!("published {kind} to {receivers} receivers"),
            Err(_) => trace!("no receivers for {kind} (this is OK)"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MonitorEvent> {
        self.sender.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Run `listener` for every event in its own task
    ///
    /// A panicking listener is logged and keeps receiving; the task ends when
    /// every gateway clone has been dropped.
    pub fn spawn_listener<F>(&self, name: impl Into<String>, listener: F) -> JoinHandle<()>
    where
        F: Fn(&MonitorEvent) + Send + 'static,
    {
        let name = name.into();
        let mut receiver = self.subscribe();

        tokio::spawn(async move {
            debug!("listener {name} started");
            loop {
                match receiver.recv().await {
                    Ok(event) => {
                        if catch_unwind(AssertUnwindSafe(|| listener(&event))).is_err() {
                            error!("listener {name} panicked on {} event", event.kind());
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("listener {name} lagged, skipped {skipped} events");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        debug!("event channel closed, listener {name} stopping");
                        break;
                    }
                }
            }
        })
    }
}
