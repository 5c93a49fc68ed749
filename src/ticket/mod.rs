//! Tickets: units of work flowing through the dependency graph.
//!
//! This module provides:
//! - `Ticket`, `TicketStatus`, `Priority` and the `Ticket Index` document
//! - `NewTicket` / `TicketUpdate` value builders for mutations
//! - `TaskGraph` for bulk creation
//! - `TicketBook`, the in-memory graph the resolver works on
//! - `TicketStore`, the locked, disk-backed front end

mod book;
mod resolver;
mod store;

pub use book::TicketBook;
pub use resolver::{Cascade, blocked_by_for, cascade_unblock, link_dependents};
pub use store::TicketStore;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::StoreError;

/// Prefix of every ticket id.
pub const TICKET_PREFIX: &str = "TICKET-";

/// Agent assigned to bulk-created tasks that name none.
pub const DEFAULT_AGENT: &str = "dozer";

/// Format a counter value as a ticket id (`TICKET-007`).
pub fn format_ticket_id(number: u32) -> String {
    format!("{TICKET_PREFIX}{number:03}")
}

/// Current time at second precision, the resolution every document uses.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Lifecycle status of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Pending,
    InProgress,
    Review,
    Completed,
    Failed,
    Blocked,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 6] = [
        TicketStatus::Pending,
        TicketStatus::InProgress,
        TicketStatus::Review,
        TicketStatus::Completed,
        TicketStatus::Failed,
        TicketStatus::Blocked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Pending => "pending",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Review => "review",
            TicketStatus::Completed => "completed",
            TicketStatus::Failed => "failed",
            TicketStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.to_lowercase();
        TicketStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == wanted)
            .ok_or_else(|| {
                StoreError::InvalidInput(format!(
                    "invalid status '{}'. Valid values: pending, in_progress, review, completed, failed, blocked",
                    s
                ))
            })
    }
}

/// Scheduling priority. Declaration order is rank order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Numeric rank, lower runs first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Critical => 0,
            Priority::High => 1,
            Priority::Medium => 2,
            Priority::Low => 3,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Critical => write!(f, "critical"),
            Priority::High => write!(f, "high"),
            Priority::Medium => write!(f, "medium"),
            Priority::Low => write!(f, "low"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Priority::Critical),
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(StoreError::InvalidInput(format!(
                "invalid priority '{}'. Valid values: critical, high, medium, low",
                s
            ))),
        }
    }
}

/// Research / analyze / reflect / verify notes attached by the working agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(default)]
    pub research: Option<serde_json::Value>,
    #[serde(default)]
    pub analyze: Option<serde_json::Value>,
    #[serde(default)]
    pub reflect: Option<serde_json::Value>,
    #[serde(default)]
    pub verify: Option<serde_json::Value>,
}

/// A unit of work assigned to one agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TicketStatus,
    #[serde(default)]
    pub priority: Priority,
    pub agent: String,
    pub model: String,
    /// Tickets this one needs, in the order they were given
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Dependencies not yet completed
    #[serde(default)]
    pub blocked_by: Vec<String>,
    /// Tickets that list this one as a dependency
    #[serde(default)]
    pub blocks: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, rename = "rarv")]
    pub review: ReviewRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub git_checkpoint: Option<String>,
}

impl Ticket {
    pub fn is_blocked(&self) -> bool {
        !self.blocked_by.is_empty()
    }

    /// Pending with nothing left to wait on.
    pub fn is_runnable(&self) -> bool {
        self.status == TicketStatus::Pending && self.blocked_by.is_empty()
    }

    pub fn summary(&self) -> TicketSummary {
        TicketSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            status: self.status,
            agent: self.agent.clone(),
            priority: self.priority,
            blocked_by: self.blocked_by.clone(),
        }
    }
}

/// Row returned by `list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketSummary {
    pub id: String,
    pub title: String,
    pub status: TicketStatus,
    pub agent: String,
    pub priority: Priority,
    pub blocked_by: Vec<String>,
}

/// Per-status ticket counts. Always derived by scan.
pub type StatusCounts = BTreeMap<TicketStatus, usize>;

/// Zeroed histogram with every status present.
pub fn empty_counts() -> StatusCounts {
    TicketStatus::ALL.into_iter().map(|s| (s, 0)).collect()
}

/// The `tickets/index.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketIndex {
    /// Counter for the next id; never reused
    pub next_id: u32,
    /// Number of tickets ever created
    pub total: usize,
    /// All ticket ids in creation order
    #[serde(rename = "tickets")]
    pub ticket_ids: Vec<String>,
    /// Cached histogram for external readers; recomputed on every write
    #[serde(default = "empty_counts")]
    pub by_status: StatusCounts,
    pub last_updated: DateTime<Utc>,
}

impl Default for TicketIndex {
    fn default() -> Self {
        Self {
            next_id: 1,
            total: 0,
            ticket_ids: Vec::new(),
            by_status: empty_counts(),
            last_updated: now(),
        }
    }
}

/// Request to create a ticket.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub agent: String,
    pub priority: Priority,
    pub dependencies: Vec<String>,
    pub files: Vec<String>,
    pub acceptance_criteria: Vec<String>,
    /// Execution tier; resolved from configuration when absent
    pub model: Option<String>,
}

impl NewTicket {
    pub fn new(title: &str, description: &str, agent: &str) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            agent: agent.to_string(),
            priority: Priority::default(),
            dependencies: Vec::new(),
            files: Vec::new(),
            acceptance_criteria: Vec::new(),
            model: None,
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn dependencies<I, S>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies = dependencies.into_iter().map(Into::into).collect();
        self
    }

    pub fn files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn acceptance_criteria<I, S>(mut self, criteria: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.acceptance_criteria = criteria.into_iter().map(Into::into).collect();
        self
    }

    pub fn model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }
}

/// Requested changes to an existing ticket. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TicketUpdate {
    pub status: Option<TicketStatus>,
    pub agent: Option<String>,
    pub git_checkpoint: Option<String>,
}

impl TicketUpdate {
    pub fn status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn agent(mut self, agent: &str) -> Self {
        self.agent = Some(agent.to_string());
        self
    }

    pub fn git_checkpoint(mut self, reference: &str) -> Self {
        self.git_checkpoint = Some(reference.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.agent.is_none() && self.git_checkpoint.is_none()
    }
}

/// A task-graph document used for bulk creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskGraph {
    #[serde(default)]
    pub tasks: Vec<TaskSpec>,
}

/// One planned task inside a `TaskGraph`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_agent")]
    pub agent: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    #[serde(default)]
    pub model: Option<String>,
}

fn default_agent() -> String {
    DEFAULT_AGENT.to_string()
}

impl From<TaskSpec> for NewTicket {
    fn from(task: TaskSpec) -> Self {
        Self {
            title: task.title,
            description: task.description,
            agent: task.agent,
            priority: task.priority,
            dependencies: task.dependencies,
            files: task.files,
            acceptance_criteria: task.acceptance_criteria,
            model: task.model,
        }
    }
}

impl TaskGraph {
    /// Load a task graph from a JSON file.
    pub fn load(path: &std::path::Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| StoreError::json(path, e))
    }
}
