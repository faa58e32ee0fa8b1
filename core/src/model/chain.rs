//! On-chain transactions as seen by the ticketing core.
//!
//! Only the fields needed to correlate a transaction with a payment are
//! modeled. The memo keeps its on-chain encoding so that callers can tell a
//! text memo apart from an id, hash, or return memo.

use serde::{Deserialize, Serialize};

/// A transaction memo in one of the Stellar encodings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Memo {
    /// No memo attached.
    #[default]
    None,
    /// Free UTF-8 text (up to 28 bytes on Stellar).
    Text(String),
    /// Unsigned 64-bit id memo.
    Id(u64),
    /// 32-byte hash memo, base64 as returned by Horizon.
    Hash(String),
    /// 32-byte return hash memo, base64 as returned by Horizon.
    Return(String),
}

impl Memo {
    /// The memo text, if and only if this is a text memo.
    ///
    /// Other encodings yield `None` even when they carry a value; they are
    /// never decoded into text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Memo::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Short name of the encoding, for logs.
    pub fn encoding(&self) -> &'static str {
        match self {
            Memo::None => "none",
            Memo::Text(_) => "text",
            Memo::Id(_) => "id",
            Memo::Hash(_) => "hash",
            Memo::Return(_) => "return",
        }
    }
}

/// A settled chain transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTransaction {
    pub hash: String,
    #[serde(default)]
    pub memo: Memo,
    /// Ledger sequence the transaction closed in.
    #[serde(default)]
    pub ledger: Option<u64>,
    #[serde(default = "default_successful")]
    pub successful: bool,
}

fn default_successful() -> bool {
    true
}

impl ChainTransaction {
    /// A successful transaction carrying the given memo.
    pub fn new(hash: impl Into<String>, memo: Memo) -> Self {
        Self {
            hash: hash.into(),
            memo,
            ledger: None,
            successful: true,
        }
    }
}
