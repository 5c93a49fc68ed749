//! CLI command implementations.
//!
//! Each submodule owns one `Commands` variant:
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `project`  | `Init`           |
//! | `ticket`   | `Ticket`         |
//! | `pipeline` | `Pipeline`       |
//! | `config`   | `Config`         |

pub mod config;
pub mod pipeline;
pub mod project;
pub mod ticket;

pub use config::cmd_config;
pub use pipeline::cmd_pipeline;
pub use project::cmd_init;
pub use ticket::cmd_ticket;

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;

use super::Cli;

/// Store directory named on the command line or in `MATRIX_DIR`.
pub(crate) fn matrix_dir(cli: &Cli) -> PathBuf {
    cli.matrix_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(neo::config::MATRIX_DIR))
}

/// Resolve configuration for an existing store.
pub(crate) fn load_config(cli: &Cli) -> Result<neo::config::Config> {
    neo::config::Config::resolve(Some(matrix_dir(cli)))
}

/// Pretty-print `value` as JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
