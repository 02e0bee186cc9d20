//! Trouble tickets for critical findings
//!
//! At most one actionable ticket exists per device and subject. A subject is
//! derived from the finding message, which stays identical while a condition persists,
//! so a router whose CPU stays pinned for an hour yields one ticket, not sixty.
//! Once that ticket is resolved or closed the next occurrence files a new one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use crate::snapshot::Finding;
use crate::storage::schema::{MONITORING_SOURCE, NETWORK_ISSUE_CATEGORY};
use crate::storage::{NewTicket, StorageBackend, StorageResult, Ticket, TicketPriority, TicketStatus};

const SUBJECT_PREFIX: &str = "Automatic Alert: ";

/// Disambiguates tickets filed within the same millisecond
static TICKET_SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn ticket_subject(finding: &Finding) -> String {
    format!("{SUBJECT_PREFIX}{}", finding.message)
}

/// `NET-<unix millis>-<sequence>`, unique within the process
pub fn next_ticket_number(now: DateTime<Utc>) -> String {
    let seq = TICKET_SEQUENCE.fetch_add(1, Ordering::Relaxed) % 10_000;
    format!("NET-{}-{seq:04}", now.timestamp_millis())
}

fn describe(device_id: &str, finding: &Finding) -> String {
    let threshold = finding
        .threshold
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_else(|| String::from("n/a"));

    format!(
        "Automatically detected {category} issue.\n\
         Device: {device_id}\n\
         Component: {component}\n\
         Observed value: {observed}\n\
         Threshold: {threshold}\n\
         Detected at: {detected_at}",
        category = finding.category,
        component = finding.component,
        observed = finding.observed_value,
        detected_at = finding.detected_at.to_rfc3339(),
    )
}

#[derive(Debug, Clone, PartialEq)]
pub struct TicketOutcome {
    /// `false` when an active ticket already covered the finding
    pub created: bool,
    pub ticket: Ticket,
}

pub struct TicketDeduplicator {
    storage: Arc<dyn StorageBackend>,
}

impl TicketDeduplicator {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self { storage }
    }

    /// File a ticket for `finding` unless an open or in-progress one exists
    #[instrument(skip(self, finding), fields(component = %finding.component))]
    pub async fn ensure_ticket_for(&self, device_id: &str, finding: &Finding) -> StorageResult<TicketOutcome> {
        let subject = ticket_subject(finding);

        if let Some(existing) = self.storage.find_active_ticket(device_id, &subject).await? {
            debug!("ticket {} already covers {subject:?}", existing.ticket_number);
            return Ok(TicketOutcome {
                created: false,
                ticket: existing,
            });
        }

        let now = Utc::now();
        let ticket = self
            .storage
            .insert_ticket(NewTicket {
                ticket_number: next_ticket_number(now),
                subject,
                description: describe(device_id, finding),
                category: NETWORK_ISSUE_CATEGORY.to_string(),
                priority: TicketPriority::High,
                status: TicketStatus::Open,
                source: MONITORING_SOURCE.to_string(),
                device_id: Some(device_id.to_string()),
                created_at: now,
            })
            .await?;

        info!("filed ticket {} for {device_id}: {}", ticket.ticket_number, ticket.subject);
        Ok(TicketOutcome {
            created: true,
            ticket,
        })
    }
}
