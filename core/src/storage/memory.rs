//! In-memory collaborators.
//!
//! DashMap-backed implementations of [`TicketStore`], [`PaymentLookup`] and
//! [`ChainTransactionFetcher`], for tests and local wiring.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use super::{StoreError, StoreResult, TicketFilter, TicketStore};
use crate::error::{TicketingError, TicketingResult};
use crate::model::{ChainTransaction, Payment, Ticket};
use crate::upstream::{ChainTransactionFetcher, PaymentLookup};

// ---------------------------------------------------------------------------
// Tickets
// ---------------------------------------------------------------------------

/// Volatile ticket store.
///
/// The hash index entry is claimed before the ticket is written, and the
/// claim holds the shard lock, so the one-ticket-per-hash rule holds under
/// concurrent saves.
#[derive(Debug, Default)]
pub struct InMemoryTicketStore {
    tickets: DashMap<Uuid, Ticket>,
    by_hash: DashMap<String, Uuid>,
}

impl InMemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a ticket directly, bypassing uniqueness checks. For seeding
    /// fixtures in a state issuance cannot produce (e.g. `used`).
    pub fn insert_raw(&self, ticket: Ticket) {
        self.by_hash
            .insert(ticket.transaction_hash.clone(), ticket.id);
        self.tickets.insert(ticket.id, ticket);
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[async_trait]
impl TicketStore for InMemoryTicketStore {
    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>> {
        let id = match filter {
            TicketFilter::Id(id) => *id,
            TicketFilter::TransactionHash(hash) => match self.by_hash.get(hash) {
                Some(id) => *id,
                None => return Ok(None),
            },
        };
        Ok(self.tickets.get(&id).map(|t| t.clone()))
    }

    async fn save(&self, ticket: &Ticket) -> StoreResult<Ticket> {
        match self.by_hash.entry(ticket.transaction_hash.clone()) {
            Entry::Occupied(entry) => {
                let existing = *entry.get();
                if existing != ticket.id {
                    return Err(StoreError::DuplicateTransactionHash {
                        tx_hash: ticket.transaction_hash.clone(),
                        existing,
                    });
                }
                self.tickets.insert(ticket.id, ticket.clone());
            }
            Entry::Vacant(entry) => {
                entry.insert(ticket.id);
                if let Some(previous) = self.tickets.insert(ticket.id, ticket.clone()) {
                    if previous.transaction_hash != ticket.transaction_hash {
                        self.by_hash.remove(&previous.transaction_hash);
                    }
                }
            }
        }
        Ok(ticket.clone())
    }

    async fn replace(&self, expected: &Ticket, ticket: &Ticket) -> StoreResult<Ticket> {
        // Hash changes are not supported here; ownership moves keep the hash.
        if expected.transaction_hash != ticket.transaction_hash {
            return Err(StoreError::Conflict { id: ticket.id });
        }
        match self.tickets.entry(ticket.id) {
            Entry::Occupied(mut entry) if entry.get() == expected => {
                entry.insert(ticket.clone());
                Ok(ticket.clone())
            }
            _ => Err(StoreError::Conflict { id: ticket.id }),
        }
    }

    async fn find_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Ticket>> {
        let mut owned: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|t| t.is_owned_by(owner_id))
            .map(|t| t.clone())
            .collect();
        owned.sort_by_key(|t| t.created_at);
        Ok(owned)
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Payment lookup over a fixed set of payments.
#[derive(Debug, Default)]
pub struct InMemoryPayments {
    payments: DashMap<String, Payment>,
}

impl InMemoryPayments {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, payment: Payment) {
        self.payments.insert(payment.id.clone(), payment);
    }
}

#[async_trait]
impl PaymentLookup for InMemoryPayments {
    async fn get_payment_by_id(&self, id: &str) -> TicketingResult<Payment> {
        self.payments
            .get(id)
            .map(|p| p.clone())
            .ok_or_else(|| TicketingError::NotFound(format!("payment {id}")))
    }
}

// ---------------------------------------------------------------------------
// Chain
// ---------------------------------------------------------------------------

/// Chain fetcher over a fixed set of transactions.
#[derive(Debug, Default)]
pub struct InMemoryChain {
    transactions: DashMap<String, ChainTransaction>,
}

impl InMemoryChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tx: ChainTransaction) {
        self.transactions.insert(tx.hash.clone(), tx);
    }
}

#[async_trait]
impl ChainTransactionFetcher for InMemoryChain {
    async fn get_transaction(&self, hash: &str) -> TicketingResult<ChainTransaction> {
        self.transactions
            .get(hash)
            .map(|tx| tx.clone())
            .ok_or_else(|| TicketingError::NotFound(format!("transaction {hash}")))
    }
}
