// Copyright (c) 2026 Lumentix Contributors. MIT License.
// See LICENSE for details.

//! # Lumentix Core — Ticket Issuance & Transfer
//!
//! Event tickets are paid for on chain. This crate decides when a payment is
//! good enough to become a ticket, and who may move a ticket afterwards.
//!
//! ## Architecture
//!
//! - **issuance** — ties a confirmed payment to its chain transaction by
//!   memo and mints at most one ticket per transaction.
//! - **transfer** — owner-only reassignment of `valid` tickets.
//! - **query** — read-only ticket lookups.
//! - **model** — payments, chain transactions, tickets.
//! - **upstream** — traits for the payments service and the chain API.
//! - **storage** — the ticket store trait, a sled store, in-memory doubles.
//! - **config** — defaults shared with the node binary.
//!
//! Every collaborator is a trait object handed in at construction, so the
//! workflows run unchanged against sled and HTTP in production and against
//! in-memory maps in tests.

pub mod config;
pub mod error;
pub mod issuance;
pub mod model;
pub mod query;
pub mod storage;
pub mod transfer;
pub mod upstream;

pub use error::{ErrorKind, TicketingError, TicketingResult};
pub use issuance::{Issuance, IssuanceVerifier};
pub use model::{ChainTransaction, Memo, NewTicket, Payment, PaymentStatus, Ticket, TicketStatus};
pub use query::TicketQueries;
pub use storage::{StoreError, TicketDb, TicketFilter, TicketStore};
pub use transfer::TransferAuthorizer;
pub use upstream::{ChainTransactionFetcher, PaymentLookup};
