//! Error types for ticket issuance and transfer.
//!
//! Every public operation returns a [`TicketingError`]. The three request
//! kinds (`InvalidRequest`, `NotFound`, `Forbidden`) describe what the caller
//! did wrong; `Upstream` and `Storage` describe what the infrastructure did
//! wrong. Routing layers map them through [`TicketingError::kind`].

use thiserror::Error;

use crate::storage::StoreError;

/// Errors surfaced by the ticketing workflows and their collaborators.
#[derive(Debug, Error)]
pub enum TicketingError {
    /// A caller or data precondition was violated.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The caller is not allowed to act on the entity.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// A remote collaborator (payments service, chain API) failed to answer.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The ticket store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Coarse classification of a [`TicketingError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidRequest,
    NotFound,
    Forbidden,
    Upstream,
    Storage,
}

impl ErrorKind {
    /// Stable snake_case label, used in API error bodies and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "invalid_request",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Upstream => "upstream",
            ErrorKind::Storage => "storage",
        }
    }
}

impl TicketingError {
    /// Returns the classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TicketingError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            TicketingError::NotFound(_) => ErrorKind::NotFound,
            TicketingError::Forbidden(_) => ErrorKind::Forbidden,
            TicketingError::Upstream(_) => ErrorKind::Upstream,
            TicketingError::Storage(_) => ErrorKind::Storage,
        }
    }
}

pub type TicketingResult<T> = Result<T, TicketingError>;
