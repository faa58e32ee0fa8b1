//! # Upstream Collaborators
//!
//! The two read-only services the issuance check depends on. Implementations
//! live elsewhere: the node ships HTTP clients, and
//! [`crate::storage::memory`] ships in-memory doubles.
//!
//! Both return [`TicketingError`] directly so that a collaborator's
//! `NotFound` reaches the caller unchanged.

use async_trait::async_trait;

use crate::error::TicketingResult;
use crate::model::{ChainTransaction, Payment};

/// Looks up payments recorded by the payments service.
#[async_trait]
pub trait PaymentLookup: Send + Sync {
    /// Fetch a payment by id. Fails with `NotFound` if there is none.
    async fn get_payment_by_id(&self, id: &str) -> TicketingResult<Payment>;
}

/// Fetches settled transactions from the chain.
#[async_trait]
pub trait ChainTransactionFetcher: Send + Sync {
    /// Fetch a transaction by hash.
    async fn get_transaction(&self, hash: &str) -> TicketingResult<ChainTransaction>;
}
