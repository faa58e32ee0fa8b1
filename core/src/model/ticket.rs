//! Tickets issued against verified payments.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a ticket.
///
/// Issuance always produces `Valid`. The other states are set by processes
/// outside this crate (gate scanning, refunds, fraud review) and freeze the
/// ticket: only `Valid` tickets can change hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    Valid,
    /// Scanned at the venue.
    Used,
    Refunded,
    Revoked,
}

impl TicketStatus {
    pub fn is_transferable(&self) -> bool {
        matches!(self, TicketStatus::Valid)
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketStatus::Valid => write!(f, "valid"),
            TicketStatus::Used => write!(f, "used"),
            TicketStatus::Refunded => write!(f, "refunded"),
            TicketStatus::Revoked => write!(f, "revoked"),
        }
    }
}

/// An issued ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Assigned when the ticket is created.
    pub id: Uuid,
    pub event_id: String,
    /// Current holder. Starts as the paying user.
    pub owner_id: String,
    /// Asset the ticket was paid in.
    pub asset_code: String,
    /// Hash of the paying chain transaction. Unique across all tickets.
    pub transaction_hash: String,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a ticket. Everything else is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub event_id: String,
    pub owner_id: String,
    pub asset_code: String,
    pub transaction_hash: String,
    pub status: TicketStatus,
}

impl Ticket {
    /// Build an unsaved ticket with a fresh id and timestamps.
    pub fn from_new(fields: NewTicket) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            event_id: fields.event_id,
            owner_id: fields.owner_id,
            asset_code: fields.asset_code,
            transaction_hash: fields.transaction_hash,
            status: fields.status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }

    /// Hand the ticket to `new_owner`. Status is left alone.
    pub fn reassign(&mut self, new_owner: impl Into<String>) {
        self.owner_id = new_owner.into();
        self.updated_at = Utc::now();
    }
}
