//! # Ticket Issuance
//!
//! Turns a confirmed payment into a ticket. The checks run in a fixed
//! order and the first failure ends the call:
//!
//! 1. **Payment lookup** -- a missing payment surfaces the lookup's own
//!    `NotFound`.
//! 2. **Status** -- the payment must be `CONFIRMED`.
//! 3. **Settlement** -- the payment must name its transaction hash.
//! 4. **Replay** -- if a ticket already exists for that hash it is returned
//!    as-is. The chain is not consulted again.
//! 5. **Chain fetch** -- load the transaction by hash.
//! 6. **Memo presence** -- only a text memo counts. Id, hash and return
//!    memos are treated as no memo at all.
//! 7. **Memo match** -- the memo text must equal the payment id exactly.
//!    The payer proves intent by quoting the payment id on chain.
//! 8. **Mint** -- persist a `valid` ticket owned by the paying user.
//!
//! Nothing is written unless every check passes.
//!
//! ## Races
//!
//! Two concurrent calls for the same payment can both pass step 4. The store
//! rejects the second write on the transaction hash; the loser re-reads the
//! winner's ticket and returns it, so both callers see the same ticket.

use std::sync::Arc;

use crate::error::{TicketingError, TicketingResult};
use crate::model::{NewTicket, Payment, Ticket, TicketStatus};
use crate::storage::{StoreError, TicketFilter, TicketStore};
use crate::upstream::{ChainTransactionFetcher, PaymentLookup};

/// Result of an issuance call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Issuance {
    /// A new ticket was minted by this call.
    Minted(Ticket),
    /// A ticket for the payment's transaction already existed.
    Existing(Ticket),
}

impl Issuance {
    pub fn ticket(&self) -> &Ticket {
        match self {
            Issuance::Minted(t) | Issuance::Existing(t) => t,
        }
    }

    pub fn into_ticket(self) -> Ticket {
        match self {
            Issuance::Minted(t) | Issuance::Existing(t) => t,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Issuance::Minted(_))
    }
}

/// Verifies payments against the chain and issues tickets.
#[derive(Clone)]
pub struct IssuanceVerifier {
    payments: Arc<dyn PaymentLookup>,
    chain: Arc<dyn ChainTransactionFetcher>,
    tickets: Arc<dyn TicketStore>,
}

impl IssuanceVerifier {
    pub fn new(
        payments: Arc<dyn PaymentLookup>,
        chain: Arc<dyn ChainTransactionFetcher>,
        tickets: Arc<dyn TicketStore>,
    ) -> Self {
        Self {
            payments,
            chain,
            tickets,
        }
    }

    /// Issue the ticket for `payment_id`, or return the one already issued.
    pub async fn issue_ticket(&self, payment_id: &str) -> TicketingResult<Ticket> {
        self.issue(payment_id).await.map(Issuance::into_ticket)
    }

    /// Like [`issue_ticket`](Self::issue_ticket), but reports whether the
    /// ticket was minted by this call.
    #[tracing::instrument(skip(self), fields(tx_hash = tracing::field::Empty))]
    pub async fn issue(&self, payment_id: &str) -> TicketingResult<Issuance> {
        let payment = self.payments.get_payment_by_id(payment_id).await?;

        if !payment.is_confirmed() {
            tracing::warn!(status = %payment.status, "payment not confirmed");
            return Err(TicketingError::InvalidRequest(format!(
                "payment {} is {}, not CONFIRMED",
                payment.id, payment.status
            )));
        }

        let tx_hash = match payment.settled_hash() {
            Some(hash) => hash.to_string(),
            None => {
                tracing::warn!("confirmed payment has no transaction hash");
                return Err(TicketingError::InvalidRequest(format!(
                    "payment {} has no transaction hash",
                    payment.id
                )));
            }
        };
        tracing::Span::current().record("tx_hash", tx_hash.as_str());

        let by_hash = TicketFilter::TransactionHash(tx_hash.clone());
        if let Some(existing) = self.tickets.find_one(&by_hash).await? {
            tracing::debug!(ticket_id = %existing.id, "ticket already issued for transaction");
            return Ok(Issuance::Existing(existing));
        }

        let tx = self.chain.get_transaction(&tx_hash).await?;

        let memo = match tx.memo.as_text() {
            Some(text) => text,
            None => {
                tracing::warn!(encoding = tx.memo.encoding(), "transaction has no text memo");
                return Err(TicketingError::InvalidRequest(format!(
                    "transaction {} carries no text memo",
                    tx_hash
                )));
            }
        };

        if memo != payment.id {
            tracing::warn!(memo, "transaction memo does not match payment");
            return Err(TicketingError::InvalidRequest(format!(
                "transaction {} memo does not reference payment {}",
                tx_hash, payment.id
            )));
        }

        let ticket = self.tickets.create(new_ticket_for(&payment, tx_hash));
        match self.tickets.save(&ticket).await {
            Ok(saved) => {
                tracing::info!(
                    ticket_id = %saved.id,
                    event_id = %saved.event_id,
                    owner_id = %saved.owner_id,
                    "ticket issued"
                );
                Ok(Issuance::Minted(saved))
            }
            Err(StoreError::DuplicateTransactionHash { existing, .. }) => {
                tracing::debug!(ticket_id = %existing, "lost issuance race, returning winner");
                self.tickets
                    .find_one(&by_hash)
                    .await?
                    .map(Issuance::Existing)
                    .ok_or_else(|| {
                        TicketingError::NotFound(format!(
                            "ticket {} vanished after duplicate rejection",
                            existing
                        ))
                    })
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn new_ticket_for(payment: &Payment, transaction_hash: String) -> NewTicket {
    NewTicket {
        event_id: payment.event_id.clone(),
        owner_id: payment.user_id.clone(),
        asset_code: payment.currency.clone(),
        transaction_hash,
        status: TicketStatus::Valid,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ChainTransaction, Memo, PaymentStatus};
    use crate::storage::memory::{InMemoryChain, InMemoryPayments, InMemoryTicketStore};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        payments: Arc<InMemoryPayments>,
        chain: Arc<InMemoryChain>,
        tickets: Arc<InMemoryTicketStore>,
        verifier: IssuanceVerifier,
    }

    fn fixture() -> Fixture {
        let payments = Arc::new(InMemoryPayments::new());
        let chain = Arc::new(InMemoryChain::new());
        let tickets = Arc::new(InMemoryTicketStore::new());
        let verifier = IssuanceVerifier::new(payments.clone(), chain.clone(), tickets.clone());
        Fixture {
            payments,
            chain,
            tickets,
            verifier,
        }
    }

    fn payment(id: &str, status: PaymentStatus, hash: Option<&str>) -> Payment {
        Payment {
            id: id.into(),
            status,
            transaction_hash: hash.map(str::to_string),
            event_id: "e1".into(),
            user_id: "u1".into(),
            currency: "USDC".into(),
        }
    }

    /// Chain fetcher that counts calls, to prove replays skip the chain.
    struct CountingChain {
        inner: InMemoryChain,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChainTransactionFetcher for CountingChain {
        async fn get_transaction(&self, hash: &str) -> TicketingResult<ChainTransaction> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_transaction(hash).await
        }
    }

    #[tokio::test]
    async fn confirmed_payment_with_matching_memo_mints_ticket() {
        let f = fixture();
        f.payments
            .insert(payment("p1", PaymentStatus::Confirmed, Some("tx1")));
        f.chain
            .insert(ChainTransaction::new("tx1", Memo::Text("p1".into())));

        let issuance = f.verifier.issue("p1").await.unwrap();
        assert!(issuance.is_new());

        let ticket = issuance.ticket();
        assert_eq!(ticket.event_id, "e1");
        assert_eq!(ticket.owner_id, "u1");
        assert_eq!(ticket.asset_code, "USDC");
        assert_eq!(ticket.transaction_hash, "tx1");
        assert_eq!(ticket.status, TicketStatus::Valid);
        assert_eq!(f.tickets.len(), 1);
    }

    #[tokio::test]
    async fn unknown_payment_propagates_not_found() {
        let f = fixture();
        let err = f.verifier.issue_ticket("missing").await.unwrap_err();
        assert!(matches!(err, TicketingError::NotFound(_)));
    }

    #[tokio::test]
    async fn unconfirmed_payments_are_rejected_without_writes() {
        for status in [
            PaymentStatus::Pending,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
        ] {
            let f = fixture();
            f.payments.insert(payment("p1", status, Some("tx1")));
            f.chain
                .insert(ChainTransaction::new("tx1", Memo::Text("p1".into())));

            let err = f.verifier.issue_ticket("p1").await.unwrap_err();
            assert!(matches!(err, TicketingError::InvalidRequest(_)), "{status}");
            assert!(f.tickets.is_empty());
        }
    }

    #[tokio::test]
    async fn confirmed_payment_without_hash_is_rejected() {
        let f = fixture();
        f.payments
            .insert(payment("p1", PaymentStatus::Confirmed, None));
        f.payments
            .insert(payment("p2", PaymentStatus::Confirmed, Some("")));

        for id in ["p1", "p2"] {
            let err = f.verifier.issue_ticket(id).await.unwrap_err();
            assert!(matches!(err, TicketingError::InvalidRequest(_)));
        }
        assert!(f.tickets.is_empty());
    }

    #[tokio::test]
    async fn mismatched_memo_is_rejected() {
        let f = fixture();
        f.payments
            .insert(payment("p1", PaymentStatus::Confirmed, Some("tx1")));
        f.chain
            .insert(ChainTransaction::new("tx1", Memo::Text("other".into())));

        let err = f.verifier.issue_ticket("p1").await.unwrap_err();
        assert!(matches!(err, TicketingError::InvalidRequest(_)));
        assert!(f.tickets.is_empty());
    }

    #[tokio::test]
    async fn memo_match_is_exact() {
        let f = fixture();
        f.payments
            .insert(payment("p1", PaymentStatus::Confirmed, Some("tx1")));
        f.chain
            .insert(ChainTransaction::new("tx1", Memo::Text("P1".into())));

        assert!(f.verifier.issue_ticket("p1").await.is_err());
    }

    #[tokio::test]
    async fn non_text_memos_count_as_missing() {
        let memos = [
            Memo::None,
            Memo::Id(1),
            Memo::Hash("cDE=".into()),
            Memo::Return("cDE=".into()),
        ];
        for memo in memos {
            let f = fixture();
            f.payments
                .insert(payment("p1", PaymentStatus::Confirmed, Some("tx1")));
            f.chain.insert(ChainTransaction::new("tx1", memo.clone()));

            let err = f.verifier.issue_ticket("p1").await.unwrap_err();
            assert!(
                matches!(err, TicketingError::InvalidRequest(_)),
                "memo {:?}",
                memo
            );
            assert!(f.tickets.is_empty());
        }
    }

    #[tokio::test]
    async fn missing_chain_transaction_propagates() {
        let f = fixture();
        f.payments
            .insert(payment("p1", PaymentStatus::Confirmed, Some("tx1")));

        let err = f.verifier.issue_ticket("p1").await.unwrap_err();
        assert!(matches!(err, TicketingError::NotFound(_)));
        assert!(f.tickets.is_empty());
    }

    #[tokio::test]
    async fn second_issue_returns_same_ticket_without_chain_call() {
        let payments = Arc::new(InMemoryPayments::new());
        let chain = Arc::new(CountingChain {
            inner: InMemoryChain::new(),
            calls: AtomicUsize::new(0),
        });
        let tickets = Arc::new(InMemoryTicketStore::new());
        let verifier = IssuanceVerifier::new(payments.clone(), chain.clone(), tickets.clone());

        payments.insert(payment("p1", PaymentStatus::Confirmed, Some("tx1")));
        chain
            .inner
            .insert(ChainTransaction::new("tx1", Memo::Text("p1".into())));

        let first = verifier.issue("p1").await.unwrap();
        let second = verifier.issue("p1").await.unwrap();

        assert!(first.is_new());
        assert!(!second.is_new());
        assert_eq!(first.ticket(), second.ticket());
        assert_eq!(chain.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tickets.len(), 1);
    }

    #[tokio::test]
    async fn existing_ticket_short_circuits_chain_validation() {
        let f = fixture();
        f.payments
            .insert(payment("p1", PaymentStatus::Confirmed, Some("tx1")));
        let seeded = Ticket::from_new(NewTicket {
            event_id: "e1".into(),
            owner_id: "u9".into(),
            asset_code: "USDC".into(),
            transaction_hash: "tx1".into(),
            status: TicketStatus::Used,
        });
        f.tickets.insert_raw(seeded.clone());

        // No chain transaction is registered; a chain call would fail.
        let ticket = f.verifier.issue_ticket("p1").await.unwrap();
        assert_eq!(ticket, seeded);
    }
}
