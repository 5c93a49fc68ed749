//! In-memory ticket graph.
//!
//! `TicketBook` holds the index and every loaded ticket, applies mutations
//! and remembers which documents changed so the store can rewrite exactly
//! those. It never touches the filesystem.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, info};

use super::resolver::{Cascade, blocked_by_for, cascade_unblock, link_dependents};
use super::{
    NewTicket, ReviewRecord, StatusCounts, Ticket, TicketIndex, TicketStatus, TicketSummary,
    TicketUpdate, empty_counts, format_ticket_id, now,
};
use crate::config::DEFAULT_MODEL;
use crate::errors::{StoreError, StoreResult};

#[derive(Debug, Clone, Default)]
pub struct TicketBook {
    index: TicketIndex,
    tickets: HashMap<String, Ticket>,
    dirty: BTreeSet<String>,
    index_dirty: bool,
}

impl TicketBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a book from loaded documents.
    pub fn from_parts(index: TicketIndex, tickets: impl IntoIterator<Item = Ticket>) -> Self {
        let mut book = Self {
            index,
            tickets: tickets.into_iter().map(|t| (t.id.clone(), t)).collect(),
            dirty: BTreeSet::new(),
            index_dirty: false,
        };
        book.index.by_status = book.status_counts();
        book
    }

    pub fn index(&self) -> &TicketIndex {
        &self.index
    }

    pub fn get(&self, id: &str) -> Option<&Ticket> {
        self.tickets.get(id)
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Tickets in creation order. Index entries without a document are skipped.
    pub fn tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.index
            .ticket_ids
            .iter()
            .filter_map(|id| self.tickets.get(id))
    }

    /// Histogram derived from the tickets themselves.
    pub fn status_counts(&self) -> StatusCounts {
        let mut counts = empty_counts();
        for ticket in self.tickets() {
            *counts.entry(ticket.status).or_default() += 1;
        }
        counts
    }

    /// Create a ticket, wiring both sides of its dependency edges.
    ///
    /// Every dependency must name a ticket already in the book; otherwise
    /// nothing changes and `UnknownDependency` is returned.
    pub fn create(&mut self, request: NewTicket) -> StoreResult<Ticket> {
        let id = format_ticket_id(self.index.next_id);

        let mut dependencies: Vec<String> = Vec::with_capacity(request.dependencies.len());
        for dep in request.dependencies {
            if !dependencies.contains(&dep) {
                dependencies.push(dep);
            }
        }
        if let Some(missing) = dependencies.iter().find(|d| !self.tickets.contains_key(*d)) {
            return Err(StoreError::UnknownDependency {
                ticket: id,
                dependency: missing.clone(),
            });
        }

        let blocked_by = blocked_by_for(&dependencies, |dep| self.tickets.get(dep).map(|t| t.status));
        let status = if blocked_by.is_empty() {
            TicketStatus::Pending
        } else {
            TicketStatus::Blocked
        };
        let stamp = now();
        let ticket = Ticket {
            id: id.clone(),
            title: request.title,
            description: request.description,
            status,
            priority: request.priority,
            model: request.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            agent: request.agent,
            dependencies,
            blocked_by,
            blocks: Vec::new(),
            files: request.files,
            acceptance_criteria: request.acceptance_criteria,
            review: ReviewRecord::default(),
            created_at: stamp,
            updated_at: stamp,
            completed_at: None,
            git_checkpoint: None,
        };

        for dep in link_dependents(&mut self.tickets, &id, &ticket.dependencies) {
            self.dirty.insert(dep);
        }

        self.tickets.insert(id.clone(), ticket.clone());
        self.dirty.insert(id.clone());

        self.index.next_id += 1;
        self.index.total += 1;
        self.index.ticket_ids.push(id);
        self.touch_index();
        Ok(ticket)
    }

    /// Apply an update, cascading unblocking when the ticket completes.
    pub fn update(&mut self, id: &str, update: TicketUpdate) -> StoreResult<(Ticket, Cascade)> {
        let ticket = self
            .tickets
            .get(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        let old_status = ticket.status;

        if let Some(requested) = update.status {
            check_transition(ticket, requested)?;
        }

        let ticket = self
            .tickets
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        if let Some(status) = update.status {
            ticket.status = status;
        }
        if let Some(agent) = update.agent {
            ticket.agent = agent;
        }
        if let Some(reference) = update.git_checkpoint {
            ticket.git_checkpoint = Some(reference);
        }
        let stamp = now();
        ticket.updated_at = stamp;

        let new_status = ticket.status;
        let mut cascade = Cascade::default();
        if new_status == TicketStatus::Completed && old_status != TicketStatus::Completed {
            ticket.completed_at = Some(stamp);
            cascade = cascade_unblock(&mut self.tickets, id);
            debug!(
                ticket = %id,
                touched = cascade.touched.len(),
                unblocked = cascade.unblocked.len(),
                "unblock cascade finished"
            );
            self.dirty.extend(cascade.touched.iter().cloned());
        } else if old_status == TicketStatus::Completed && new_status != TicketStatus::Completed {
            ticket.completed_at = None;
        }

        if old_status != new_status {
            info!(ticket = %id, from = %old_status, to = %new_status, "ticket status changed");
        }
        self.dirty.insert(id.to_string());
        self.touch_index();

        let updated = self
            .tickets
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })?;
        Ok((updated, cascade))
    }

    /// Next runnable ticket: lowest priority rank, earliest creation on ties.
    pub fn next(&self, agent: Option<&str>) -> Option<&Ticket> {
        self.tickets()
            .filter(|t| t.is_runnable())
            .filter(|t| agent.is_none_or(|a| t.agent == a))
            .min_by_key(|t| t.priority.rank())
    }

    pub fn list(&self, status: Option<TicketStatus>, agent: Option<&str>) -> Vec<TicketSummary> {
        self.tickets()
            .filter(|t| status.is_none_or(|s| t.status == s))
            .filter(|t| agent.is_none_or(|a| t.agent == a))
            .map(Ticket::summary)
            .collect()
    }

    /// Tickets changed since the book was loaded.
    pub fn dirty_tickets(&self) -> impl Iterator<Item = &Ticket> {
        self.dirty.iter().filter_map(|id| self.tickets.get(id))
    }

    pub fn index_dirty(&self) -> bool {
        self.index_dirty
    }

    fn touch_index(&mut self) {
        self.index.by_status = self.status_counts();
        self.index.last_updated = now();
        self.index_dirty = true;
    }
}

/// Reject status changes that would break `blocked <=> blocked_by non-empty`.
fn check_transition(ticket: &Ticket, requested: TicketStatus) -> StoreResult<()> {
    if ticket.is_blocked() && requested != TicketStatus::Blocked {
        return Err(StoreError::InvalidTransition {
            id: ticket.id.clone(),
            requested,
            reason: format!("still blocked by {}", ticket.blocked_by.join(", ")),
        });
    }
    if !ticket.is_blocked() && requested == TicketStatus::Blocked {
        return Err(StoreError::InvalidTransition {
            id: ticket.id.clone(),
            requested,
            reason: "it has no unfinished dependencies".to_string(),
        });
    }
    Ok(())
}
