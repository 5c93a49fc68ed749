//! Dependency resolution over the ticket set.
//!
//! Edges run both ways: `dependencies`/`blocked_by` on the dependent and
//! `blocks` on the dependency. These helpers keep the two sides consistent
//! and cascade unblocking when a dependency completes.

use std::collections::HashMap;
use tracing::debug;

use super::{Ticket, TicketStatus, now};

/// Tickets changed by an unblock cascade.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cascade {
    /// Dependents whose `blocked_by` lost the completed ticket
    pub touched: Vec<String>,
    /// Subset of `touched` that flipped from blocked to pending
    pub unblocked: Vec<String>,
}

/// Dependencies that are not completed yet.
///
/// Ids unknown to `status_of` never resolve and are left out.
pub fn blocked_by_for<F>(dependencies: &[String], status_of: F) -> Vec<String>
where
    F: Fn(&str) -> Option<TicketStatus>,
{
    dependencies
        .iter()
        .filter(|dep| matches!(status_of(dep), Some(status) if status != TicketStatus::Completed))
        .cloned()
        .collect()
}

/// Record `dependent` in the `blocks` list of each of its dependencies.
///
/// Idempotent. Returns the ids whose `blocks` list actually changed.
pub fn link_dependents(
    tickets: &mut HashMap<String, Ticket>,
    dependent: &str,
    dependencies: &[String],
) -> Vec<String> {
    let mut changed = Vec::new();
    for dep_id in dependencies {
        let Some(dep) = tickets.get_mut(dep_id) else {
            continue;
        };
        if !dep.blocks.iter().any(|b| b == dependent) {
            dep.blocks.push(dependent.to_string());
            changed.push(dep_id.clone());
        }
    }
    changed
}

/// Remove `completed_id` from the `blocked_by` of every ticket it blocks.
///
/// Dependents left with an empty `blocked_by` that were `blocked` become
/// `pending`; nothing else changes status.
pub fn cascade_unblock(tickets: &mut HashMap<String, Ticket>, completed_id: &str) -> Cascade {
    let blocks = match tickets.get(completed_id) {
        Some(ticket) => ticket.blocks.clone(),
        None => return Cascade::default(),
    };

    let mut cascade = Cascade::default();
    let stamp = now();
    for dependent_id in blocks {
        let Some(dependent) = tickets.get_mut(&dependent_id) else {
            debug!(ticket = %completed_id, dependent = %dependent_id, "skipping dangling dependent");
            continue;
        };
        dependent.blocked_by.retain(|b| b != completed_id);
        dependent.updated_at = stamp;
        if dependent.blocked_by.is_empty() && dependent.status == TicketStatus::Blocked {
            dependent.status = TicketStatus::Pending;
            debug!(ticket = %dependent_id, unblocked_by = %completed_id, "ticket unblocked");
            cascade.unblocked.push(dependent_id.clone());
        }
        cascade.touched.push(dependent_id);
    }
    cascade
}
