//! # Ticket Storage
//!
//! The [`TicketStore`] trait is the only way the workflows touch persisted
//! tickets. Two implementations ship with the crate:
//!
//! ```text
//! db.rs     — TicketDb, sled-backed and durable
//! memory.rs — InMemoryTicketStore plus in-memory payment/chain doubles
//! ```
//!
//! ## Uniqueness
//!
//! A transaction hash maps to at most one ticket. Stores enforce this on
//! `save`: writing a ticket whose hash is already held by a *different*
//! ticket fails with [`StoreError::DuplicateTransactionHash`]. Saving the
//! same ticket again (same id, same hash) is an update.
//!
//! ## Conditional updates
//!
//! `replace` is a compare-and-swap on the whole ticket. Read-check-write
//! workflows use it so a check made against one snapshot never overwrites a
//! newer one.

pub mod db;
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::model::{NewTicket, Ticket};

pub use db::TicketDb;
pub use memory::{InMemoryChain, InMemoryPayments, InMemoryTicketStore};

/// Errors raised by ticket stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("transaction hash {tx_hash} already has ticket {existing}")]
    DuplicateTransactionHash {
        tx_hash: String,
        existing: Uuid,
    },

    #[error("ticket {id} changed since it was read")]
    Conflict { id: Uuid },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Selects a single ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TicketFilter {
    Id(Uuid),
    TransactionHash(String),
}

impl std::fmt::Display for TicketFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TicketFilter::Id(id) => write!(f, "id={}", id),
            TicketFilter::TransactionHash(hash) => write!(f, "transaction_hash={}", hash),
        }
    }
}

/// Persistence for tickets.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// Find the ticket matching `filter`, if any.
    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>>;

    /// Build an unsaved ticket from `fields`. Nothing is written.
    fn create(&self, fields: NewTicket) -> Ticket {
        Ticket::from_new(fields)
    }

    /// Insert or update `ticket`, returning the persisted copy.
    async fn save(&self, ticket: &Ticket) -> StoreResult<Ticket>;

    /// Write `ticket` only if the stored copy still equals `expected`.
    ///
    /// Fails with [`StoreError::Conflict`] when the ticket is missing or was
    /// updated after `expected` was read.
    async fn replace(&self, expected: &Ticket, ticket: &Ticket) -> StoreResult<Ticket>;

    /// All tickets currently held by `owner_id`, oldest first.
    async fn find_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Ticket>>;
}
