//! Payment records as reported by the payments service.
//!
//! The core never writes payments. It only reads them to decide whether a
//! ticket may be issued.

use serde::{Deserialize, Serialize};

/// Processing state of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Created, waiting for the payer.
    Pending,
    /// The payments service saw the on-chain transfer settle.
    Confirmed,
    /// The transfer failed or expired.
    Failed,
    /// Funds were returned to the payer.
    Refunded,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "PENDING"),
            PaymentStatus::Confirmed => write!(f, "CONFIRMED"),
            PaymentStatus::Failed => write!(f, "FAILED"),
            PaymentStatus::Refunded => write!(f, "REFUNDED"),
        }
    }
}

/// A payment for an event ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Payment identifier. Payers put this in the transaction memo.
    pub id: String,
    pub status: PaymentStatus,
    /// Hash of the settling chain transaction, once known.
    #[serde(default)]
    pub transaction_hash: Option<String>,
    pub event_id: String,
    /// The paying user; becomes the ticket's first owner.
    pub user_id: String,
    /// Asset code the payment was made in (e.g. `USDC`, `XLM`).
    pub currency: String,
}

impl Payment {
    pub fn is_confirmed(&self) -> bool {
        self.status == PaymentStatus::Confirmed
    }

    /// The settling transaction hash, treating an empty string as absent.
    pub fn settled_hash(&self) -> Option<&str> {
        self.transaction_hash
            .as_deref()
            .filter(|hash| !hash.is_empty())
    }
}
