//! Disk-backed ticket store.
//!
//! Each operation takes the store lock, loads the book, applies the change
//! in memory and commits every document it touched in one [`WriteBatch`].

use tracing::{info, warn};

use super::{
    Cascade, NewTicket, TaskGraph, Ticket, TicketBook, TicketIndex, TicketStatus, TicketSummary,
    TicketUpdate,
};
use crate::config::{Config, MatrixToml};
use crate::errors::{StoreError, StoreResult};
use crate::persist::{StoreLayout, WriteBatch, read_json, read_json_if_exists};

#[derive(Debug, Clone)]
pub struct TicketStore {
    layout: StoreLayout,
    settings: MatrixToml,
}

impl TicketStore {
    pub fn new(layout: StoreLayout, settings: MatrixToml) -> Self {
        Self { layout, settings }
    }

    pub fn open(config: &Config) -> Self {
        Self::new(StoreLayout::new(&config.matrix_dir), config.file.clone())
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    /// Create one ticket. The model falls back to the configured tier for
    /// its agent.
    pub fn create(&self, request: NewTicket) -> StoreResult<Ticket> {
        let request = self.with_model(request);
        let ticket = self.mutate(|book| book.create(request))?;
        info!(id = %ticket.id, agent = %ticket.agent, status = %ticket.status, "ticket created");
        Ok(ticket)
    }

    /// Create every task of a graph in one transaction.
    ///
    /// Ids are allocated in task order, so a task may depend on any stored
    /// ticket or on one created earlier in the same graph. On any failure
    /// nothing is written.
    pub fn create_from_graph(&self, graph: TaskGraph) -> StoreResult<Vec<Ticket>> {
        let requests: Vec<NewTicket> = graph
            .tasks
            .into_iter()
            .map(|task| self.with_model(task.into()))
            .collect();
        let created = self.mutate(|book| {
            requests
                .into_iter()
                .map(|request| book.create(request))
                .collect::<StoreResult<Vec<_>>>()
        })?;
        info!(count = created.len(), "tickets created from task graph");
        Ok(created)
    }

    pub fn update(&self, id: &str, update: TicketUpdate) -> StoreResult<(Ticket, Cascade)> {
        if update.is_empty() {
            return Err(StoreError::InvalidInput(
                "nothing to update: pass --status, --agent or --git-checkpoint".to_string(),
            ));
        }
        self.mutate(|book| book.update(id, update))
    }

    pub fn get(&self, id: &str) -> StoreResult<Ticket> {
        self.read(|book| {
            book.get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
        })?
    }

    pub fn list(&self, status: Option<TicketStatus>, agent: Option<&str>) -> StoreResult<Vec<TicketSummary>> {
        self.read(|book| book.list(status, agent))
    }

    pub fn next(&self, agent: Option<&str>) -> StoreResult<Option<Ticket>> {
        self.read(|book| book.next(agent).cloned())
    }

    /// Consistent snapshot of every ticket, for reports.
    pub fn snapshot(&self) -> StoreResult<TicketBook> {
        self.read(|book| book.clone())
    }

    fn with_model(&self, mut request: NewTicket) -> NewTicket {
        if request.model.is_none() {
            request.model = Some(self.settings.model_for(&request.agent));
        }
        request
    }

    /// Run `f` under the shared lock against a freshly loaded book.
    fn read<T>(&self, f: impl FnOnce(&TicketBook) -> T) -> StoreResult<T> {
        let _lock = self.layout.lock_shared()?;
        let book = load_book(&self.layout)?;
        Ok(f(&book))
    }

    /// Run `f` under the exclusive lock and commit what it changed. If `f`
    /// fails the book is discarded unwritten.
    fn mutate<T>(&self, f: impl FnOnce(&mut TicketBook) -> StoreResult<T>) -> StoreResult<T> {
        let _lock = self.layout.lock_exclusive()?;
        let mut book = load_book(&self.layout)?;
        let out = f(&mut book)?;
        commit_book(&self.layout, &book)?;
        Ok(out)
    }
}

/// Load the index and every ticket document it lists. Caller holds the lock.
pub(crate) fn load_book(layout: &StoreLayout) -> StoreResult<TicketBook> {
    let index: TicketIndex = read_json_if_exists(&layout.index_path())?.unwrap_or_default();
    let mut tickets = Vec::with_capacity(index.ticket_ids.len());
    for id in &index.ticket_ids {
        let path = layout.ticket_path(id);
        if !path.exists() {
            warn!(ticket = %id, "index lists a ticket with no document; skipping");
            continue;
        }
        tickets.push(read_json::<Ticket>(&path)?);
    }
    Ok(TicketBook::from_parts(index, tickets))
}

fn commit_book(layout: &StoreLayout, book: &TicketBook) -> StoreResult<()> {
    let mut batch = WriteBatch::new();
    for ticket in book.dirty_tickets() {
        batch.stage(layout.ticket_path(&ticket.id), ticket)?;
    }
    if book.index_dirty() {
        batch.stage(layout.index_path(), book.index())?;
    }
    if batch.is_empty() {
        return Ok(());
    }
    batch.commit()
}
