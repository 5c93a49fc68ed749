//! Colored dependency graph for interactive terminals.

use console::style;

use crate::query::{GraphPart, render_graph_with};
use crate::ticket::{TicketBook, TicketStatus};

fn paint(part: GraphPart, text: &str) -> String {
    let text = style(text);
    match part {
        GraphPart::Header | GraphPart::Id => text.bold(),
        GraphPart::Agent => text.dim(),
        GraphPart::Glyph(status) => match status {
            TicketStatus::Completed => text.green(),
            TicketStatus::InProgress => text.cyan(),
            TicketStatus::Review => text.magenta(),
            TicketStatus::Failed => text.red().bold(),
            TicketStatus::Blocked => text.yellow(),
            TicketStatus::Pending => text.dim(),
        },
    }
    .to_string()
}

/// Same layout as [`crate::query::render_graph`], with status colors.
pub fn render_graph(book: &TicketBook) -> String {
    render_graph_with(book, paint)
}
