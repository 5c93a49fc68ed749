//! Read-only reports over the ticket graph.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;

use crate::reservation::ReservationTable;
use crate::ticket::{StatusCounts, TicketBook, TicketStatus};

/// Checkbox glyph shown for a status in the text graph.
pub fn status_glyph(status: TicketStatus) -> &'static str {
    match status {
        TicketStatus::Pending => "[ ]",
        TicketStatus::InProgress => "[~]",
        TicketStatus::Review => "[?]",
        TicketStatus::Completed => "[x]",
        TicketStatus::Failed => "[!]",
        TicketStatus::Blocked => "[#]",
    }
}

/// Parts of the text graph a renderer may decorate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphPart {
    Header,
    Glyph(TicketStatus),
    Id,
    Agent,
}

const GRAPH_HEADER: &str = "=== Task Dependency Graph ===";

fn plain(_: GraphPart, text: &str) -> String {
    text.to_string()
}

/// One line of the dependency graph, with `paint` applied to each part.
pub fn graph_line_with(node: &GraphNode, paint: impl Fn(GraphPart, &str) -> String) -> String {
    let mut line = format!(
        "  {} {}: {} ({})",
        paint(GraphPart::Glyph(node.status), status_glyph(node.status)),
        paint(GraphPart::Id, &node.id),
        node.title,
        paint(GraphPart::Agent, &node.agent)
    );
    if !node.dependencies.is_empty() {
        let _ = write!(line, " <- {}", node.dependencies.join(", "));
    }
    if !node.blocks.is_empty() {
        let _ = write!(line, " -> {}", node.blocks.join(", "));
    }
    line
}

/// One line of the dependency graph.
pub fn graph_line(node: &GraphNode) -> String {
    graph_line_with(node, plain)
}

/// Dependency graph, one line per ticket in creation order.
pub fn render_graph_with(book: &TicketBook, paint: impl Fn(GraphPart, &str) -> String) -> String {
    let mut out = format!("{}\n\n", paint(GraphPart::Header, GRAPH_HEADER));
    for node in graph_nodes(book) {
        out.push_str(&graph_line_with(&node, &paint));
        out.push('\n');
    }
    out
}

/// Plain-text dependency graph.
pub fn render_graph(book: &TicketBook) -> String {
    render_graph_with(book, plain)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub title: String,
    pub status: TicketStatus,
    pub agent: String,
    pub dependencies: Vec<String>,
    pub blocks: Vec<String>,
}

pub fn graph_nodes(book: &TicketBook) -> Vec<GraphNode> {
    book.tickets()
        .map(|t| GraphNode {
            id: t.id.clone(),
            title: t.title.clone(),
            status: t.status,
            agent: t.agent.clone(),
            dependencies: t.dependencies.clone(),
            blocks: t.blocks.clone(),
        })
        .collect()
}

/// Store summary printed by `neo ticket stats`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stats {
    /// Tickets ever created, as counted by the index
    pub total: usize,
    pub by_status: StatusCounts,
    /// `completed/total`
    pub completion: String,
    pub by_agent: BTreeMap<String, usize>,
    pub active_reservations: usize,
}

impl Stats {
    pub fn collect(book: &TicketBook, reservations: &ReservationTable) -> Self {
        let by_status = book.status_counts();
        let total = book.index().total;
        let completed = by_status.get(&TicketStatus::Completed).copied().unwrap_or(0);

        let mut by_agent = BTreeMap::new();
        for ticket in book.tickets() {
            *by_agent.entry(ticket.agent.clone()).or_insert(0) += 1;
        }

        Self {
            total,
            by_status,
            completion: format!("{completed}/{total}"),
            by_agent,
            active_reservations: reservations.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ticket::{NewTicket, TicketUpdate};

    fn sample_book() -> TicketBook {
        let mut book = TicketBook::new();
        book.create(NewTicket::new("Schema", "", "dozer")).unwrap();
        book.create(NewTicket::new("Login form", "", "niobe").dependencies(["TICKET-001"]))
            .unwrap();
        book.create(NewTicket::new("Routes", "", "dozer").dependencies(["TICKET-001"]))
            .unwrap();
        book
    }

    #[test]
    fn test_graph_lines() {
        let mut book = sample_book();
        book.update("TICKET-001", TicketUpdate::default().status(TicketStatus::Completed))
            .unwrap();
        book.update("TICKET-003", TicketUpdate::default().status(TicketStatus::InProgress))
            .unwrap();

        let text = render_graph(&book);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "=== Task Dependency Graph ===");
        assert_eq!(
            lines[2],
            "  [x] TICKET-001: Schema (dozer) -> TICKET-002, TICKET-003"
        );
        assert_eq!(lines[3], "  [ ] TICKET-002: Login form (niobe) <- TICKET-001");
        assert_eq!(lines[4], "  [~] TICKET-003: Routes (dozer) <- TICKET-001");
    }

    #[test]
    fn test_blocked_glyph() {
        let book = sample_book();
        let nodes = graph_nodes(&book);
        assert_eq!(nodes.len(), 3);
        assert!(graph_line(&nodes[1]).starts_with("  [#] TICKET-002"));
    }

    #[test]
    fn test_painted_line_keeps_plain_layout() {
        let book = sample_book();
        let nodes = graph_nodes(&book);
        let marked = graph_line_with(&nodes[1], |part, text| match part {
            GraphPart::Glyph(TicketStatus::Blocked) | GraphPart::Agent => format!("<{text}>"),
            _ => text.to_string(),
        });
        assert_eq!(marked, "  <[#]> TICKET-002: Login form (<niobe>) <- TICKET-001");
        assert_eq!(graph_line(&nodes[1]), "  [#] TICKET-002: Login form (niobe) <- TICKET-001");
    }

    #[test]
    fn test_stats() {
        let mut book = sample_book();
        book.update("TICKET-001", TicketUpdate::default().status(TicketStatus::Completed))
            .unwrap();
        let mut table = ReservationTable::default();
        table.reserve("TICKET-002", "niobe", &["src/ui/login.tsx".to_string()]);

        let stats = Stats::collect(&book, &table);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completion, "1/3");
        assert_eq!(stats.by_status[&TicketStatus::Pending], 2);
        assert_eq!(stats.by_status[&TicketStatus::Failed], 0);
        assert_eq!(stats.by_agent["dozer"], 2);
        assert_eq!(stats.active_reservations, 1);

        let keys: Vec<&String> = stats.by_agent.keys().collect();
        assert_eq!(keys, vec!["dozer", "niobe"]);
    }

    #[test]
    fn test_stats_total_counts_every_created_id() {
        let full = sample_book();
        let survivor = full.get("TICKET-001").unwrap().clone();
        let book = TicketBook::from_parts(full.index().clone(), [survivor]);

        let stats = Stats::collect(&book, &ReservationTable::default());
        assert_eq!(book.len(), 1);
        assert_eq!(stats.total, 3);
        assert_eq!(stats.completion, "0/3");
    }

    #[test]
    fn test_empty_store_stats() {
        let stats = Stats::collect(&TicketBook::new(), &ReservationTable::default());
        assert_eq!(stats.completion, "0/0");
        assert_eq!(stats.by_status.len(), 6);
    }
}
