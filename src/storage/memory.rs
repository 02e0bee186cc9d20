//! In-memory storage backend (no persistence)
//!
//! Useful for tests and for running the monitor without a database.
//! Tickets and settings are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{MonitorSettings, NewTicket, Ticket, TicketStatus};

#[derive(Default)]
struct MemoryState {
    tickets: Vec<Ticket>,
    settings: Option<MonitorSettings>,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend pre-seeded with a settings record
    pub fn with_settings(settings: MonitorSettings) -> Self {
        Self {
            state: RwLock::new(MemoryState {
                tickets: Vec::new(),
                settings: Some(settings),
            }),
        }
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn find_active_ticket(
        &self,
        device_id: &str,
        subject: &str,
    ) -> StorageResult<Option<Ticket>> {
        let state = self.state.read().await;
        Ok(state
            .tickets
            .iter()
            .rev()
            .find(|ticket| {
                ticket.device_id.as_deref() == Some(device_id)
                    && ticket.subject == subject
                    && ticket.status.is_active()
            })
            .cloned())
    }

    async fn insert_ticket(&self, ticket: NewTicket) -> StorageResult<Ticket> {
        let mut state = self.state.write().await;

        if state
            .tickets
            .iter()
            .any(|existing| existing.ticket_number == ticket.ticket_number)
        {
            return Err(StorageError::Conflict(format!(
                "ticket number {} already exists",
                ticket.ticket_number
            )));
        }

        let id = state.tickets.len() as i64 + 1;
        let ticket = ticket.into_ticket(id);
        debug!("stored ticket {} in memory", ticket.ticket_number);
        state.tickets.push(ticket.clone());
        Ok(ticket)
    }

    async fn update_ticket_status(&self, id: i64, status: TicketStatus) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let ticket = state
            .tickets
            .iter_mut()
            .find(|ticket| ticket.id == id)
            .ok_or_else(|| StorageError::NotFound(format!("ticket {id}")))?;
        ticket.status = status;
        Ok(())
    }

    async fn list_tickets(&self, limit: usize) -> StorageResult<Vec<Ticket>> {
        let state = self.state.read().await;
        Ok(state.tickets.iter().rev().take(limit).cloned().collect())
    }

    async fn load_settings(&self) -> StorageResult<Option<MonitorSettings>> {
        Ok(self.state.read().await.settings.clone())
    }

    async fn save_settings(&self, settings: &MonitorSettings) -> StorageResult<()> {
        let mut state = self.state.write().await;
        let current = state.settings.get_or_insert_with(MonitorSettings::default);

        if settings.cpu_threshold.is_some() {
            current.cpu_threshold = settings.cpu_threshold;
        }
        if settings.memory_threshold.is_some() {
            current.memory_threshold = settings.memory_threshold;
        }
        if settings.temperature_threshold.is_some() {
            current.temperature_threshold = settings.temperature_threshold;
        }
        if settings.monitoring_interval.is_some() {
            current.monitoring_interval = settings.monitoring_interval;
        }
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        let state = self.state.read().await;
        Ok(HealthStatus {
            healthy: true,
            message: "In-memory storage operational".to_string(),
            metadata: HashMap::from([
                ("backend".to_string(), "memory".to_string()),
                ("tickets".to_string(), state.tickets.len().to_string()),
            ]),
        })
    }

    async fn close(&self) -> StorageResult<()> {
        debug!("closing in-memory backend (no-op)");
        Ok(())
    }
}
