//! # Ticket Transfer
//!
//! Moves a ticket from its current owner to a new one. The caller identity
//! is taken as already authenticated; this module only decides whether that
//! caller may move this ticket.
//!
//! Checks, in order:
//!
//! 1. The ticket exists (`NotFound`).
//! 2. The caller owns it (`Forbidden`).
//! 3. The ticket is `valid` (`InvalidRequest`). Used, refunded and revoked
//!    tickets are frozen.
//!
//! A successful transfer changes the owner and nothing else. Status stays
//! `valid`.
//!
//! The write is conditional on the ticket being unchanged since the checks
//! ran. If it changed, the checks run again against the new copy, so a
//! caller who lost ownership in the meantime gets `Forbidden`.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{TicketingError, TicketingResult};
use crate::model::Ticket;
use crate::storage::{StoreError, TicketFilter, TicketStore};

/// Authorizes and applies ownership transfers.
#[derive(Clone)]
pub struct TransferAuthorizer {
    tickets: Arc<dyn TicketStore>,
}

impl TransferAuthorizer {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self { tickets }
    }

    /// Transfer `ticket_id` from `caller_owner_id` to `new_owner_id`.
    #[tracing::instrument(skip(self))]
    pub async fn transfer_ticket(
        &self,
        ticket_id: Uuid,
        caller_owner_id: &str,
        new_owner_id: &str,
    ) -> TicketingResult<Ticket> {
        loop {
            let current = self
                .tickets
                .find_one(&TicketFilter::Id(ticket_id))
                .await?
                .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_id)))?;

            if !current.is_owned_by(caller_owner_id) {
                tracing::warn!("transfer attempted by non-owner");
                return Err(TicketingError::Forbidden(format!(
                    "ticket {} is not owned by {}",
                    ticket_id, caller_owner_id
                )));
            }

            if !current.status.is_transferable() {
                tracing::warn!(status = %current.status, "transfer of frozen ticket");
                return Err(TicketingError::InvalidRequest(format!(
                    "ticket {} is {} and cannot be transferred",
                    ticket_id, current.status
                )));
            }

            let mut next = current.clone();
            next.reassign(new_owner_id);
            match self.tickets.replace(&current, &next).await {
                Ok(saved) => {
                    tracing::info!("ticket transferred");
                    return Ok(saved);
                }
                // Someone else moved or froze it after our read. Check again.
                Err(StoreError::Conflict { .. }) => {
                    tracing::debug!("ticket changed during transfer, re-checking");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}
