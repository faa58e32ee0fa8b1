//! # Domain Model
//!
//! ```text
//! payment.rs — Payment records read from the payments service
//! chain.rs   — Chain transactions and their memo encodings
//! ticket.rs  — Tickets owned by this crate
//! ```

pub mod chain;
pub mod payment;
pub mod ticket;

pub use chain::{ChainTransaction, Memo};
pub use payment::{Payment, PaymentStatus};
pub use ticket::{NewTicket, Ticket, TicketStatus};
