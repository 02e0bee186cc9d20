//! Persistence for tickets and monitoring settings
//!
//! ## Design
//!
//! - **Trait-based**: `StorageBackend` trait allows swapping implementations
//! - **Async**: All operations are async for compatibility with Tokio actors
//! - **Narrow**: the monitor only creates tickets, looks them up by device and subject
//!   and reads the settings record
//!
//! ## Backends
//!
//! - **SQLite** (default): Embedded database, feature `storage-sqlite`
//! - **In-Memory** (fallback): No persistence, for testing or when no
//!   database is configured
//!
//! ## Usage
//!
//! ```no_run
//! use network_monitor::storage::{StorageBackend, sqlite::SqliteBackend};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let backend = SqliteBackend::new("./monitor.db").await?;
//!     let settings = backend.load_settings().await?;
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tracing::info;

use crate::config::StorageConfig;

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{HealthStatus, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use schema::{MonitorSettings, NewTicket, Ticket, TicketPriority, TicketStatus};

/// Open the backend selected by `config`
pub async fn open_backend(config: &StorageConfig) -> StorageResult<Arc<dyn StorageBackend>> {
    match config {
        StorageConfig::None => {
            info!("using in-memory storage, tickets are not persisted");
            Ok(Arc::new(MemoryBackend::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => Ok(Arc::new(sqlite::SqliteBackend::new(path).await?)),
        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => Err(error::StorageError::ConnectionFailed(
            "SQLite support not compiled in (enable feature storage-sqlite)".to_string(),
        )),
    }
}
