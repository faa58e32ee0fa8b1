//! Read-only ticket lookups for API consumers.

use std::sync::Arc;
use uuid::Uuid;

use crate::error::{TicketingError, TicketingResult};
use crate::model::Ticket;
use crate::storage::{TicketFilter, TicketStore};

#[derive(Clone)]
pub struct TicketQueries {
    tickets: Arc<dyn TicketStore>,
}

impl TicketQueries {
    pub fn new(tickets: Arc<dyn TicketStore>) -> Self {
        Self { tickets }
    }

    pub async fn get_ticket(&self, ticket_id: Uuid) -> TicketingResult<Ticket> {
        self.tickets
            .find_one(&TicketFilter::Id(ticket_id))
            .await?
            .ok_or_else(|| TicketingError::NotFound(format!("ticket {}", ticket_id)))
    }

    /// Tickets currently held by `owner_id`, oldest first. Empty if none.
    pub async fn tickets_for_owner(&self, owner_id: &str) -> TicketingResult<Vec<Ticket>> {
        Ok(self.tickets.find_by_owner(owner_id).await?)
    }
}
