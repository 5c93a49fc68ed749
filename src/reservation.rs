//! Advisory file reservations.
//!
//! A ticket reserves every file it lists, or none of them. The table lives
//! in `tickets/reservations.json` and is guarded by the same store lock as
//! the tickets, so a reservation is checked against the current ticket
//! document and the current table at once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::errors::{StoreError, StoreResult};
use crate::persist::{StoreLayout, WriteBatch, read_json_if_exists};
use crate::ticket::{Ticket, TicketIndex, now};

/// Who holds a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub ticket: String,
    pub agent: String,
    pub reserved_at: DateTime<Utc>,
}

/// A file another ticket already holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub file: String,
    pub held_by: String,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReserveOutcome {
    /// Every listed file is now held by the ticket
    Reserved { files: Vec<String> },
    /// The ticket lists no files
    NothingToReserve,
    /// Nothing was reserved because these files belong to other tickets
    Conflict { conflicts: Vec<Conflict> },
}

impl ReserveOutcome {
    pub fn is_conflict(&self) -> bool {
        matches!(self, ReserveOutcome::Conflict { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CheckResult {
    Reserved(Reservation),
    NotReserved,
}

/// The `tickets/reservations.json` document, keyed by file path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReservationTable {
    #[serde(default)]
    pub reservations: BTreeMap<String, Reservation>,
}

impl ReservationTable {
    pub fn len(&self) -> usize {
        self.reservations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reservations.is_empty()
    }

    pub fn check(&self, path: &str) -> CheckResult {
        match self.reservations.get(path) {
            Some(held) => CheckResult::Reserved(held.clone()),
            None => CheckResult::NotReserved,
        }
    }

    /// Files in `files` held by some ticket other than `ticket`.
    pub fn conflicts(&self, ticket: &str, files: &[String]) -> Vec<Conflict> {
        files
            .iter()
            .filter_map(|file| {
                self.reservations
                    .get(file)
                    .filter(|held| held.ticket != ticket)
                    .map(|held| Conflict {
                        file: file.clone(),
                        held_by: held.ticket.clone(),
                        agent: held.agent.clone(),
                    })
            })
            .collect()
    }

    /// Reserve all of `files` for `ticket`, or none on conflict.
    ///
    /// Files the ticket already holds are refreshed with the new agent and
    /// timestamp.
    pub fn reserve(&mut self, ticket: &str, agent: &str, files: &[String]) -> ReserveOutcome {
        if files.is_empty() {
            return ReserveOutcome::NothingToReserve;
        }
        let conflicts = self.conflicts(ticket, files);
        if !conflicts.is_empty() {
            return ReserveOutcome::Conflict { conflicts };
        }
        let stamp = now();
        for file in files {
            self.reservations.insert(
                file.clone(),
                Reservation {
                    ticket: ticket.to_string(),
                    agent: agent.to_string(),
                    reserved_at: stamp,
                },
            );
        }
        ReserveOutcome::Reserved {
            files: files.to_vec(),
        }
    }

    /// Drop every entry held by `ticket`, returning the released paths in
    /// path order.
    pub fn release(&mut self, ticket: &str) -> Vec<String> {
        let released: Vec<String> = self
            .reservations
            .iter()
            .filter(|(_, held)| held.ticket == ticket)
            .map(|(file, _)| file.clone())
            .collect();
        for file in &released {
            self.reservations.remove(file);
        }
        released
    }
}

/// Store-backed reservation operations.
#[derive(Debug, Clone)]
pub struct ReservationManager {
    layout: StoreLayout,
}

impl ReservationManager {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn reserve(&self, ticket_id: &str, agent: &str) -> StoreResult<ReserveOutcome> {
        let _lock = self.layout.lock_exclusive()?;
        let ticket = self.indexed_ticket(ticket_id)?;
        let mut table = self.load()?;

        let outcome = table.reserve(ticket_id, agent, &ticket.files);
        match &outcome {
            ReserveOutcome::Reserved { files } => {
                self.save(&table)?;
                info!(ticket = %ticket_id, agent = %agent, files = files.len(), "files reserved");
            }
            ReserveOutcome::Conflict { conflicts } => {
                info!(ticket = %ticket_id, conflicts = conflicts.len(), "reservation refused");
            }
            ReserveOutcome::NothingToReserve => {
                debug!(ticket = %ticket_id, "ticket lists no files");
            }
        }
        Ok(outcome)
    }

    pub fn release(&self, ticket_id: &str) -> StoreResult<Vec<String>> {
        let _lock = self.layout.lock_exclusive()?;
        let mut table = self.load()?;
        let released = table.release(ticket_id);
        if !released.is_empty() {
            self.save(&table)?;
            info!(ticket = %ticket_id, files = released.len(), "reservations released");
        }
        Ok(released)
    }

    pub fn check(&self, path: &str) -> StoreResult<CheckResult> {
        let _lock = self.layout.lock_shared()?;
        Ok(self.load()?.check(path))
    }

    /// Current table, for reports.
    pub fn table(&self) -> StoreResult<ReservationTable> {
        let _lock = self.layout.lock_shared()?;
        self.load()
    }

    /// Ticket `id`, only if the index knows it and its document exists.
    fn indexed_ticket(&self, id: &str) -> StoreResult<Ticket> {
        let not_found = || StoreError::NotFound { id: id.to_string() };
        let index: TicketIndex = read_json_if_exists(&self.layout.index_path())?.unwrap_or_default();
        if !index.ticket_ids.iter().any(|known| known == id) {
            return Err(not_found());
        }
        read_json_if_exists(&self.layout.ticket_path(id))?.ok_or_else(not_found)
    }

    fn load(&self) -> StoreResult<ReservationTable> {
        Ok(read_json_if_exists(&self.layout.reservations_path())?.unwrap_or_default())
    }

    fn save(&self, table: &ReservationTable) -> StoreResult<()> {
        let mut batch = WriteBatch::new();
        batch.stage(self.layout.reservations_path(), table)?;
        batch.commit()
    }
}
