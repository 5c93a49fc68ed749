//! Ticket, reservation and report commands - `neo ticket ...`.

use anyhow::{Context, Result};
use console::Term;
use serde_json::json;
use std::process::ExitCode;

use super::super::{Cli, TicketCommands};
use super::{load_config, print_json};
use neo::persist::StoreLayout;
use neo::reservation::{CheckResult, ReservationManager, ReserveOutcome};
use neo::ticket::{NewTicket, TaskGraph, TicketStore, TicketUpdate};

/// Exit status reported when a reservation is refused.
const CONFLICT_EXIT: u8 = 2;

fn clean_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn cmd_ticket(cli: &Cli, command: &TicketCommands) -> Result<ExitCode> {
    let config = load_config(cli)?;
    let store = TicketStore::open(&config);
    let reservations = ReservationManager::new(StoreLayout::new(&config.matrix_dir));

    match command {
        TicketCommands::Create {
            title,
            description,
            agent,
            priority,
            deps,
            files,
            criteria,
            model,
        } => {
            let mut request = NewTicket::new(title, description, agent)
                .priority(*priority)
                .dependencies(clean_list(deps))
                .files(clean_list(files))
                .acceptance_criteria(clean_list(criteria));
            if let Some(model) = model {
                request = request.model(model);
            }
            let ticket = store.create(request)?;
            print_json(&ticket)?;
        }
        TicketCommands::CreateFromGraph { graph_path } => {
            let graph = TaskGraph::load(graph_path)
                .with_context(|| format!("Failed to load task graph: {}", graph_path.display()))?;
            let created = store.create_from_graph(graph)?;
            print_json(&created)?;
            let ids: Vec<&str> = created.iter().map(|t| t.id.as_str()).collect();
            eprintln!();
            eprintln!("Created {} tickets: {}", ids.len(), ids.join(", "));
        }
        TicketCommands::Update {
            ticket_id,
            status,
            agent,
            git_checkpoint,
        } => {
            let update = TicketUpdate {
                status: *status,
                agent: agent.clone(),
                git_checkpoint: git_checkpoint.clone(),
            };
            let (ticket, cascade) = store.update(ticket_id, update)?;
            print_json(&ticket)?;
            if !cascade.unblocked.is_empty() {
                eprintln!("Unblocked: {}", cascade.unblocked.join(", "));
            }
        }
        TicketCommands::Get { ticket_id } => {
            print_json(&store.get(ticket_id)?)?;
        }
        TicketCommands::List { status, agent } => {
            print_json(&store.list(*status, agent.as_deref())?)?;
        }
        TicketCommands::Next { agent } => {
            print_json(&store.next(agent.as_deref())?)?;
        }
        TicketCommands::Reserve { ticket_id, agent } => {
            return match reservations.reserve(ticket_id, agent)? {
                ReserveOutcome::Reserved { files } => {
                    print_json(&json!({"status": "ok", "reserved": files}))?;
                    Ok(ExitCode::SUCCESS)
                }
                ReserveOutcome::NothingToReserve => {
                    print_json(&json!({"status": "ok", "message": "No files to reserve"}))?;
                    Ok(ExitCode::SUCCESS)
                }
                ReserveOutcome::Conflict { conflicts } => {
                    print_json(&json!({"status": "conflict", "conflicts": conflicts}))?;
                    Ok(ExitCode::from(CONFLICT_EXIT))
                }
            };
        }
        TicketCommands::Release { ticket_id } => {
            let released = reservations.release(ticket_id)?;
            print_json(&json!({"status": "ok", "released": released}))?;
        }
        TicketCommands::CheckReservation { file_path } => match reservations.check(file_path)? {
            CheckResult::Reserved(held) => print_json(&json!({
                "reserved": true,
                "ticket": held.ticket,
                "agent": held.agent,
                "reserved_at": held.reserved_at,
            }))?,
            CheckResult::NotReserved => print_json(&json!({"reserved": false}))?,
        },
        TicketCommands::Graph { json } => {
            let book = store.snapshot()?;
            if *json {
                print_json(&neo::query::graph_nodes(&book))?;
            } else if Term::stdout().is_term() {
                println!("{}", neo::ui::render_graph(&book));
            } else {
                println!("{}", neo::query::render_graph(&book));
            }
        }
        TicketCommands::Stats => {
            let book = store.snapshot()?;
            let table = reservations.table()?;
            print_json(&neo::query::Stats::collect(&book, &table))?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
