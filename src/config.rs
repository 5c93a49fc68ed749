//! Configuration for the coordination engine.
//!
//! Settings come from `.matrix/matrix.toml`, then the environment, then the
//! command line:
//!
//! ```toml
//! [models]
//! default = "sonnet"
//! oracle = "opus"
//! smith = "opus"
//!
//! [pipeline.gate_overrides.switch-coverage]
//! threshold = 95
//!
//! [pipeline.gate_overrides.smith-review]
//! model = "sonnet"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::StoreError;
use crate::pipeline::{Gate, GateOverride};

/// Store directory used when neither `--matrix-dir` nor `MATRIX_DIR` is set.
pub const MATRIX_DIR: &str = ".matrix";

/// Configuration file name inside the store directory.
pub const CONFIG_FILE: &str = "matrix.toml";

/// Execution tier for agents with no configured model.
pub const DEFAULT_MODEL: &str = "sonnet";

/// Environment variable overriding `[models].default`.
pub const DEFAULT_MODEL_ENV: &str = "NEO_DEFAULT_MODEL";

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

/// `[models]` section: a default tier plus per-agent tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_model")]
    pub default: String,
    #[serde(flatten)]
    pub agents: BTreeMap<String, String>,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: default_model(),
            agents: BTreeMap::new(),
        }
    }
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Per-gate field overlays applied after generation
    #[serde(default)]
    pub gate_overrides: BTreeMap<String, GateOverride>,
}

/// Parsed `matrix.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixToml {
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl MatrixToml {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Invalid matrix.toml")
    }

    /// Load the file if present, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply environment overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(DEFAULT_MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.models.default = model;
        }
    }

    /// Model tier for an agent: its own entry, else the default.
    pub fn model_for(&self, agent: &str) -> String {
        self.models
            .agents
            .get(agent)
            .cloned()
            .unwrap_or_else(|| self.models.default.clone())
    }

    /// Parsed gate overrides. Unknown gate ids are skipped.
    pub fn gate_overrides(&self) -> BTreeMap<Gate, GateOverride> {
        self.pipeline
            .gate_overrides
            .iter()
            .filter_map(|(id, ov)| id.parse::<Gate>().ok().map(|gate| (gate, ov.clone())))
            .collect()
    }

    /// Non-fatal problems worth telling the user about.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.models.default.trim().is_empty() {
            warnings.push("[models].default is empty".to_string());
        }
        for (agent, model) in &self.models.agents {
            if model.trim().is_empty() {
                warnings.push(format!("[models].{} is empty", agent));
            }
        }
        for id in self.pipeline.gate_overrides.keys() {
            if id.parse::<Gate>().is_err() {
                warnings.push(format!(
                    "[pipeline.gate_overrides.{}] does not name a known gate and will be ignored",
                    id
                ));
            }
        }
        warnings
    }

    /// Commented starter file written by `neo init`.
    pub fn template() -> &'static str {
        r#"# neo configuration

[models]
default = "sonnet"
# oracle = "opus"
# smith = "opus"

# [pipeline.gate_overrides.switch-coverage]
# threshold = 95
"#
    }
}

/// Runtime configuration: resolved paths plus the parsed file.
#[derive(Debug, Clone)]
pub struct Config {
    pub matrix_dir: PathBuf,
    pub config_path: PathBuf,
    pub file: MatrixToml,
}

impl Config {
    /// Resolve the store directory and load its configuration.
    ///
    /// `matrix_dir` is the CLI/env value; `.matrix` when absent. Fails with
    /// `StoreMissing` if the directory does not exist.
    pub fn resolve(matrix_dir: Option<PathBuf>) -> Result<Self> {
        let matrix_dir = matrix_dir.unwrap_or_else(|| PathBuf::from(MATRIX_DIR));
        if !matrix_dir.is_dir() {
            return Err(StoreError::StoreMissing { path: matrix_dir }.into());
        }
        let config_path = matrix_dir.join(CONFIG_FILE);
        let mut file = MatrixToml::load_or_default(&config_path)?;
        file.apply_env(|key| std::env::var(key).ok());
        Ok(Self {
            matrix_dir,
            config_path,
            file,
        })
    }

    pub fn model_for(&self, agent: &str) -> String {
        self.file.model_for(agent)
    }
}
