//! # TicketDb — Persistent Ticket Store
//!
//! Durable [`TicketStore`] built on sled's embedded key-value store.
//!
//! ## Tree Layout
//!
//! | Tree              | Key                      | Value             |
//! |-------------------|--------------------------|-------------------|
//! | `tickets`         | ticket id (16B UUID)     | `bincode(Ticket)` |
//! | `ticket_tx_index` | transaction hash (UTF-8) | ticket id (16B)   |
//!
//! ## Atomicity
//!
//! `save` writes the ticket and its hash index entry inside one sled
//! transaction spanning both trees. The uniqueness check on the hash index
//! runs inside the same transaction, so two concurrent saves for one hash
//! cannot both commit. `replace` adds a compare against the stored copy to
//! that transaction.
//!
//! Writes are flushed with `flush_async`, so a save resolves only once the
//! ticket is on disk without parking a runtime worker on the fsync.

use async_trait::async_trait;
use sled::transaction::{ConflictableTransactionError, TransactionError, TransactionResult};
use sled::{Db, Transactional, Tree};
use std::path::Path;
use uuid::Uuid;

use super::{StoreError, StoreResult, TicketFilter, TicketStore};
use crate::model::Ticket;

/// Persistent ticket storage.
///
/// Cheap to clone; clones share the same sled handles.
#[derive(Debug, Clone)]
pub struct TicketDb {
    db: Db,
    /// Tickets keyed by id.
    tickets: Tree,
    /// Transaction hash -> ticket id.
    tx_index: Tree,
}

impl TicketDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is removed when dropped. For tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> StoreResult<Self> {
        let tickets = db.open_tree("tickets")?;
        let tx_index = db.open_tree("ticket_tx_index")?;
        Ok(Self {
            db,
            tickets,
            tx_index,
        })
    }

    pub fn get_ticket(&self, id: &Uuid) -> StoreResult<Option<Ticket>> {
        match self.tickets.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn get_ticket_by_hash(&self, tx_hash: &str) -> StoreResult<Option<Ticket>> {
        match self.tx_index.get(tx_hash.as_bytes())? {
            Some(id_bytes) => self.get_ticket(&decode_id(&id_bytes)?),
            None => Ok(None),
        }
    }

    /// Write `ticket`, enforcing one ticket per transaction hash.
    pub fn put_ticket(&self, ticket: &Ticket) -> StoreResult<()> {
        self.write_ticket(ticket, None)
    }

    /// Write `ticket` only if the stored copy still equals `expected`.
    ///
    /// The comparison and the write share one transaction, so a concurrent
    /// update between the caller's read and this call yields
    /// [`StoreError::Conflict`] instead of being overwritten.
    pub fn replace_ticket(&self, expected: &Ticket, ticket: &Ticket) -> StoreResult<()> {
        self.write_ticket(ticket, Some(expected))
    }

    fn write_ticket(&self, ticket: &Ticket, expected: Option<&Ticket>) -> StoreResult<()> {
        let bytes =
            bincode::serialize(ticket).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let id_key = &ticket.id.as_bytes()[..];
        let hash_key = ticket.transaction_hash.as_bytes();

        let result: TransactionResult<(), StoreError> =
            (&self.tickets, &self.tx_index).transaction(|(tickets, index)| {
                let previous = match tickets.get(id_key)? {
                    Some(raw) => Some(decode(&raw).map_err(ConflictableTransactionError::Abort)?),
                    None => None,
                };

                if let Some(expected) = expected {
                    if previous.as_ref() != Some(expected) {
                        return Err(ConflictableTransactionError::Abort(StoreError::Conflict {
                            id: ticket.id,
                        }));
                    }
                }

                if let Some(existing) = index.get(hash_key)? {
                    let existing =
                        decode_id(&existing).map_err(ConflictableTransactionError::Abort)?;
                    if existing != ticket.id {
                        return Err(ConflictableTransactionError::Abort(
                            StoreError::DuplicateTransactionHash {
                                tx_hash: ticket.transaction_hash.clone(),
                                existing,
                            },
                        ));
                    }
                }

                // Drop a stale index entry if this ticket's hash changed.
                if let Some(previous) = &previous {
                    if previous.transaction_hash != ticket.transaction_hash {
                        index.remove(previous.transaction_hash.as_bytes())?;
                    }
                }

                tickets.insert(id_key, bytes.as_slice())?;
                index.insert(hash_key, id_key)?;
                Ok(())
            });

        match result {
            Ok(()) => Ok(()),
            Err(TransactionError::Abort(e)) => Err(e),
            Err(TransactionError::Storage(e)) => Err(StoreError::Sled(e)),
        }
    }

    /// Tickets held by `owner_id`, oldest first. Full scan.
    pub fn tickets_owned_by(&self, owner_id: &str) -> StoreResult<Vec<Ticket>> {
        let mut owned = Vec::new();
        for entry in self.tickets.iter() {
            let (_key, value) = entry?;
            let ticket = decode(&value)?;
            if ticket.is_owned_by(owner_id) {
                owned.push(ticket);
            }
        }
        owned.sort_by_key(|t| t.created_at);
        Ok(owned)
    }

    pub fn ticket_count(&self) -> usize {
        self.tickets.len()
    }

    /// Block until all pending writes are durable.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

fn decode(bytes: &[u8]) -> StoreResult<Ticket> {
    bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_id(bytes: &[u8]) -> StoreResult<Uuid> {
    Uuid::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
}

#[async_trait]
impl TicketStore for TicketDb {
    async fn find_one(&self, filter: &TicketFilter) -> StoreResult<Option<Ticket>> {
        match filter {
            TicketFilter::Id(id) => self.get_ticket(id),
            TicketFilter::TransactionHash(hash) => self.get_ticket_by_hash(hash),
        }
    }

    async fn save(&self, ticket: &Ticket) -> StoreResult<Ticket> {
        self.put_ticket(ticket)?;
        self.db.flush_async().await?;
        Ok(ticket.clone())
    }

    async fn replace(&self, expected: &Ticket, ticket: &Ticket) -> StoreResult<Ticket> {
        self.replace_ticket(expected, ticket)?;
        self.db.flush_async().await?;
        Ok(ticket.clone())
    }

    async fn find_by_owner(&self, owner_id: &str) -> StoreResult<Vec<Ticket>> {
        self.tickets_owned_by(owner_id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
