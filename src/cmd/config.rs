//! Configuration view and validation commands - `neo config`.

use anyhow::Result;

use super::super::{Cli, ConfigCommands};
use super::load_config;

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    use neo::config::{DEFAULT_MODEL_ENV, MatrixToml};
    use neo::ui::icons::{CHECK, WARN};

    let config = load_config(cli)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("neo Configuration");
            println!("=================");
            println!();

            if config.config_path.exists() {
                println!("Config file: {}", config.config_path.display());
            } else {
                println!("No matrix.toml found at {}", config.config_path.display());
                println!("Using default configuration.");
            }
            println!("Store:       {}", config.matrix_dir.display());
            println!();

            let toml = &config.file;
            println!("[models]");
            println!("  default = \"{}\"", toml.models.default);
            for (agent, model) in &toml.models.agents {
                println!("  {} = \"{}\"", agent, model);
            }
            println!();

            if !toml.pipeline.gate_overrides.is_empty() {
                println!("[pipeline.gate_overrides]");
                for (gate, overlay) in &toml.pipeline.gate_overrides {
                    println!("  \"{}\":", gate);
                    if let Some(enabled) = overlay.enabled {
                        println!("    enabled = {}", enabled);
                    }
                    if let Some(agent) = &overlay.agent {
                        println!("    agent = \"{}\"", agent);
                    }
                    if let Some(model) = &overlay.model {
                        println!("    model = \"{}\"", model);
                    }
                    if let Some(threshold) = overlay.threshold {
                        println!("    threshold = {}", threshold);
                    }
                }
                println!();
            }

            if std::env::var(DEFAULT_MODEL_ENV).is_ok() {
                println!("Effective values (with env overrides):");
                println!("  {} = \"{}\"", DEFAULT_MODEL_ENV, toml.models.default);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            let file = if config.config_path.exists() {
                MatrixToml::load(&config.config_path)?
            } else {
                println!("No matrix.toml found; defaults are valid.");
                return Ok(());
            };

            let warnings = file.validate();
            if warnings.is_empty() {
                println!("{}Configuration is valid: {}", CHECK, config.config_path.display());
            } else {
                println!("Configuration warnings:");
                for warning in &warnings {
                    println!("  {}{}", WARN, warning);
                }
            }
        }
    }

    Ok(())
}
