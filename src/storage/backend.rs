//! Storage backend trait definition
//!
//! This module defines the core `StorageBackend` trait that all
//! storage implementations must implement.

use std::collections::HashMap;

use async_trait::async_trait;

use super::error::StorageResult;
use super::schema::{MonitorSettings, NewTicket, Ticket, TicketStatus};

/// Health status of the storage backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    /// Is the backend operational?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional backend-specific metadata
    pub metadata: HashMap<String, String>,
}

/// Persistence seam for tickets and the monitoring settings record
///
/// ## Thread Safety
///
/// Implementations must be `Send + Sync`; one backend is shared by every
/// monitor and the HTTP API.
///
/// ## Error Handling
///
/// Methods return `StorageResult<T>`. Implementations convert
/// backend-specific errors to `StorageError` variants.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Most recent open or in-progress ticket filed for `device_id` with
    /// exactly this subject
    async fn find_active_ticket(
        &self,
        device_id: &str,
        subject: &str,
    ) -> StorageResult<Option<Ticket>>;

    /// Store a new ticket and return it with its assigned id
    ///
    /// Fails with `StorageError::Conflict` when the ticket number is taken.
    async fn insert_ticket(&self, ticket: NewTicket) -> StorageResult<Ticket>;

    /// Move a ticket to another status
    async fn update_ticket_status(&self, id: i64, status: TicketStatus) -> StorageResult<()>;

    /// Newest tickets first
    async fn list_tickets(&self, limit: usize) -> StorageResult<Vec<Ticket>>;

    /// `None` when no settings were ever saved
    async fn load_settings(&self) -> StorageResult<Option<MonitorSettings>>;

    /// Upsert the fields of `settings` that are set
    async fn save_settings(&self, settings: &MonitorSettings) -> StorageResult<()>;

    /// Check backend health
    ///
    /// Performs a lightweight operation to verify the backend
    /// is operational (e.g., ping database, check file access).
    async fn health_check(&self) -> StorageResult<HealthStatus>;

    /// Close the backend and release resources
    async fn close(&self) -> StorageResult<()>;
}
