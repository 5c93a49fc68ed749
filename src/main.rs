use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use neo::ticket::{Priority, TicketStatus};

mod cmd;

#[derive(Parser)]
#[command(name = "neo")]
#[command(version, about = "Coordinate agent work: tickets, file reservations and adaptive pipelines")]
pub struct Cli {
    /// Store directory (defaults to ./.matrix)
    #[arg(long, global = true, env = "MATRIX_DIR")]
    pub matrix_dir: Option<PathBuf>,

    /// Debug-level logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the .matrix store
    Init,
    /// Create, update and query tickets
    Ticket {
        #[command(subcommand)]
        command: TicketCommands,
    },
    /// Generate and inspect the adaptive pipeline
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
pub enum TicketCommands {
    /// Create a ticket
    Create {
        title: String,
        description: String,
        agent: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        /// Comma-separated dependency ticket ids
        #[arg(long, value_delimiter = ',')]
        deps: Vec<String>,
        /// Comma-separated file paths
        #[arg(long, value_delimiter = ',')]
        files: Vec<String>,
        /// Comma-separated acceptance criteria
        #[arg(long, value_delimiter = ',')]
        criteria: Vec<String>,
        /// Execution tier (defaults to the configured model for the agent)
        #[arg(long)]
        model: Option<String>,
    },
    /// Create tickets from a task graph JSON file
    CreateFromGraph { graph_path: PathBuf },
    /// Update a ticket
    Update {
        ticket_id: String,
        #[arg(long)]
        status: Option<TicketStatus>,
        #[arg(long)]
        agent: Option<String>,
        #[arg(long)]
        git_checkpoint: Option<String>,
    },
    /// Show a ticket
    Get { ticket_id: String },
    /// List tickets
    List {
        #[arg(long)]
        status: Option<TicketStatus>,
        #[arg(long)]
        agent: Option<String>,
    },
    /// Next runnable ticket
    Next {
        #[arg(long)]
        agent: Option<String>,
    },
    /// Reserve every file a ticket lists
    Reserve { ticket_id: String, agent: String },
    /// Release a ticket's file reservations
    Release { ticket_id: String },
    /// Check whether a file is reserved
    CheckReservation { file_path: String },
    /// Show the dependency graph
    Graph {
        /// Emit nodes and edges as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ticket statistics
    Stats,
}

#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Detect project features and write a new plan
    Generate {
        /// Project root to scan
        #[arg(default_value = ".")]
        project_dir: PathBuf,
        /// PRD file to scan for features
        #[arg(long)]
        prd: Option<PathBuf>,
        /// Task graph JSON to scan for features
        #[arg(long)]
        task_graph: Option<PathBuf>,
        /// JSON map of feature flags to turn on
        #[arg(long)]
        features: Option<PathBuf>,
    },
    /// Display the current plan
    Show {
        #[arg(long)]
        json: bool,
    },
    /// List agents the plan needs
    Agents,
    /// List enabled gates
    Gates,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Validate configuration and show any warnings
    Validate,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    neo::logging::init_logging(cli.verbose, cli.log_json);

    match &cli.command {
        Commands::Init => cmd::cmd_init(&cli)?,
        Commands::Ticket { command } => return cmd::cmd_ticket(&cli, command),
        Commands::Pipeline { command } => cmd::cmd_pipeline(&cli, command)?,
        Commands::Config { command } => cmd::cmd_config(&cli, command.clone())?,
    }

    Ok(ExitCode::SUCCESS)
}
