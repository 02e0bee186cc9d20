//! SQLite storage backend implementation
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Readers (API, dedup lookups) never block on ticket writes
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! Timestamps are stored as Unix milliseconds.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use super::schema::{MonitorSettings, NewTicket, Ticket, TicketStatus};

const TICKET_COLUMNS: &str = "id, ticket_number, subject, description, category, priority, \
                              status, source, device_id, created_at";

pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Open (or create) the database at `db_path` and run migrations
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn row_to_ticket(row: &SqliteRow) -> StorageResult<Ticket> {
        let priority: String = row.try_get("priority")?;
        let status: String = row.try_get("status")?;

        Ok(Ticket {
            id: row.try_get("id")?,
            ticket_number: row.try_get("ticket_number")?,
            subject: row.try_get("subject")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            priority: priority.parse().map_err(StorageError::CorruptRecord)?,
            status: status.parse().map_err(StorageError::CorruptRecord)?,
            source: row.try_get("source")?,
            device_id: row.try_get("device_id")?,
            created_at: Self::millis_to_timestamp(row.try_get("created_at")?),
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip(self))]
    async fn find_active_ticket(
        &self,
        device_id: &str,
        subject: &str,
    ) -> StorageResult<Option<Ticket>> {
        let sql = format!(
            "SELECT {TICKET_COLUMNS} FROM tickets \
             WHERE device_id = ? AND subject = ? AND status IN (?, ?) \
             ORDER BY id DESC LIMIT 1"
        );

        let row = sqlx::query(&sql)
            .bind(device_id)
            .bind(subject)
            .bind(TicketStatus::Open.as_str())
            .bind(TicketStatus::InProgress.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_ticket).transpose()
    }

    #[instrument(skip(self, ticket), fields(number = %ticket.ticket_number))]
    async fn insert_ticket(&self, ticket: NewTicket) -> StorageResult<Ticket> {
        let result = sqlx::query(
            r#"
            INSERT INTO tickets (
                ticket_number, subject, description, category,
                priority, status, source, device_id, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&ticket.ticket_number)
        .bind(&ticket.subject)
        .bind(&ticket.description)
        .bind(&ticket.category)
        .bind(ticket.priority.as_str())
        .bind(ticket.status.as_str())
        .bind(&ticket.source)
        .bind(&ticket.device_id)
        .bind(Self::timestamp_to_millis(&ticket.created_at))
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        debug!("inserted ticket with id {id}");
        Ok(ticket.into_ticket(id))
    }

    #[instrument(skip(self))]
    async fn update_ticket_status(&self, id: i64, status: TicketStatus) -> StorageResult<()> {
        let result = sqlx::query("UPDATE tickets SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound(format!("ticket {id}")));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_tickets(&self, limit: usize) -> StorageResult<Vec<Ticket>> {
        let sql = format!("SELECT {TICKET_COLUMNS} FROM tickets ORDER BY id DESC LIMIT ?");

        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_ticket).collect()
    }

    #[instrument(skip(self))]
    async fn load_settings(&self) -> StorageResult<Option<MonitorSettings>> {
        let rows = sqlx::query("SELECT key, value FROM settings")
            .fetch_all(&self.pool)
            .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let pairs = rows
            .iter()
            .map(|row| -> StorageResult<(String, String)> {
                Ok((row.try_get("key")?, row.try_get("value")?))
            })
            .collect::<StorageResult<Vec<_>>>()?;

        let settings =
            MonitorSettings::from_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        Ok(Some(settings))
    }

    #[instrument(skip(self, settings))]
    async fn save_settings(&self, settings: &MonitorSettings) -> StorageResult<()> {
        let now = Self::timestamp_to_millis(&Utc::now());
        let mut tx = self.pool.begin().await?;

        for (key, value) in settings.to_pairs() {
            sqlx::query(
                r#"
                INSERT INTO settings (key, value, updated_at)
                VALUES (?, ?, ?)
                ON CONFLICT (key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(key)
            .bind(value)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
