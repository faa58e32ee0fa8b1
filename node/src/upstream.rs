//! # HTTP Collaborators
//!
//! `reqwest` implementations of the core's upstream traits:
//!
//! - [`HttpPaymentLookup`] — `GET {payments_url}/payments/{id}`, JSON body in
//!   the core's `Payment` shape.
//! - [`HorizonClient`] — `GET {horizon_url}/transactions/{hash}`, Horizon's
//!   transaction resource mapped onto the core's `ChainTransaction`.
//!
//! A 404 from either service becomes `NotFound`; any other transport or
//! status failure becomes `Upstream`.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use lumentix_core::config::MAX_TEXT_MEMO_BYTES;
use lumentix_core::{
    ChainTransaction, ChainTransactionFetcher, Memo, Payment, PaymentLookup, TicketingError,
    TicketingResult,
};

fn upstream(service: &str, e: impl std::fmt::Display) -> TicketingError {
    TicketingError::Upstream(format!("{}: {}", service, e))
}

fn build_client(timeout: Duration) -> anyhow::Result<Client> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn parse_base(base_url: &str) -> anyhow::Result<Url> {
    let url = Url::parse(base_url)?;
    if url.cannot_be_a_base() {
        anyhow::bail!("{} cannot be used as a base URL", base_url);
    }
    Ok(url)
}

/// `base` joined with `segments`, each percent-encoded as one path segment.
fn endpoint(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}

// ---------------------------------------------------------------------------
// Payments service
// ---------------------------------------------------------------------------

/// Payment lookup against the payments service's REST API.
#[derive(Debug, Clone)]
pub struct HttpPaymentLookup {
    client: Client,
    base: Url,
}

impl HttpPaymentLookup {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base: parse_base(base_url)?,
        })
    }
}

#[async_trait]
impl PaymentLookup for HttpPaymentLookup {
    async fn get_payment_by_id(&self, id: &str) -> TicketingResult<Payment> {
        let url = endpoint(&self.base, &["payments", id]);
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| upstream("payments", e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(TicketingError::NotFound(format!("payment {}", id)));
        }

        resp.error_for_status()
            .map_err(|e| upstream("payments", e))?
            .json::<Payment>()
            .await
            .map_err(|e| upstream("payments", e))
    }
}

// ---------------------------------------------------------------------------
// Horizon
// ---------------------------------------------------------------------------

/// The subset of Horizon's transaction resource we read.
#[derive(Debug, Deserialize)]
struct HorizonTransaction {
    hash: String,
    #[serde(default)]
    ledger: Option<u64>,
    #[serde(default = "default_true")]
    successful: bool,
    #[serde(default)]
    memo_type: Option<String>,
    #[serde(default)]
    memo: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Map Horizon's `memo_type`/`memo` pair onto [`Memo`].
///
/// Unknown types, id memos that do not parse as `u64`, and text longer than
/// [`MAX_TEXT_MEMO_BYTES`] become [`Memo::None`].
pub fn memo_from_horizon(memo_type: Option<&str>, memo: Option<String>) -> Memo {
    match (memo_type, memo) {
        (Some("text"), Some(text)) if text.len() <= MAX_TEXT_MEMO_BYTES => Memo::Text(text),
        (Some("id"), Some(id)) => id.parse().map(Memo::Id).unwrap_or(Memo::None),
        (Some("hash"), Some(hash)) => Memo::Hash(hash),
        (Some("return"), Some(hash)) => Memo::Return(hash),
        _ => Memo::None,
    }
}

impl From<HorizonTransaction> for ChainTransaction {
    fn from(tx: HorizonTransaction) -> Self {
        ChainTransaction {
            hash: tx.hash,
            memo: memo_from_horizon(tx.memo_type.as_deref(), tx.memo),
            ledger: tx.ledger,
            successful: tx.successful,
        }
    }
}

/// Chain transaction fetcher backed by a Horizon server.
#[derive(Debug, Clone)]
pub struct HorizonClient {
    client: Client,
    base: Url,
}

impl HorizonClient {
    pub fn new(horizon_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: build_client(timeout)?,
            base: parse_base(horizon_url)?,
        })
    }
}

#[async_trait]
impl ChainTransactionFetcher for HorizonClient {
    async fn get_transaction(&self, hash: &str) -> TicketingResult<ChainTransaction> {
        let url = endpoint(&self.base, &["transactions", hash]);
        let resp = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| upstream("horizon", e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(TicketingError::NotFound(format!("transaction {}", hash)));
        }

        let tx = resp
            .error_for_status()
            .map_err(|e| upstream("horizon", e))?
            .json::<HorizonTransaction>()
            .await
            .map_err(|e| upstream("horizon", e))?;
        Ok(tx.into())
    }
}
