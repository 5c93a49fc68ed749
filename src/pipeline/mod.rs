//! Adaptive execution pipeline.
//!
//! This module provides:
//! - `FeatureSet` and the scanners in `detect` that produce it
//! - `generate`, a pure function from features and overrides to a plan
//! - `PipelinePlan` and its phase / gate types
//! - `PipelineStore`, which persists the plan as `construct/pipeline.json`

pub mod detect;
mod features;
mod generator;

pub use features::FeatureSet;
pub use generator::{OptionalAgent, STRUCTURAL_PHASES, generate};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::info;

use crate::errors::{StoreError, StoreResult};
use crate::persist::{StoreLayout, WriteBatch, read_json_if_exists};

/// Quality gates a phase can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gate {
    SmithReview,
    TrinitySecurity,
    ShannonPentest,
    SwitchCoverage,
    StressTest,
    IntegrationCheck,
}

impl Gate {
    pub const ALL: [Gate; 6] = [
        Gate::SmithReview,
        Gate::TrinitySecurity,
        Gate::ShannonPentest,
        Gate::SwitchCoverage,
        Gate::StressTest,
        Gate::IntegrationCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gate::SmithReview => "smith-review",
            Gate::TrinitySecurity => "trinity-security",
            Gate::ShannonPentest => "shannon-pentest",
            Gate::SwitchCoverage => "switch-coverage",
            Gate::StressTest => "stress-test",
            Gate::IntegrationCheck => "integration-check",
        }
    }
}

impl std::fmt::Display for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Gate {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Gate::ALL
            .into_iter()
            .find(|gate| gate.as_str() == s)
            .ok_or_else(|| StoreError::InvalidInput(format!("unknown gate '{}'", s)))
    }
}

/// Per-gate settings in `gate_config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSettings {
    pub enabled: bool,
    pub agent: String,
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
}

impl GateSettings {
    pub fn new(agent: &str, model: &str) -> Self {
        Self {
            enabled: true,
            agent: agent.to_string(),
            model: model.to_string(),
            threshold: None,
        }
    }
}

/// Caller-supplied overlay for one gate. `None` keeps the generated value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<u32>,
}

impl GateOverride {
    pub fn apply(&self, settings: &mut GateSettings) {
        if let Some(enabled) = self.enabled {
            settings.enabled = enabled;
        }
        if let Some(agent) = &self.agent {
            settings.agent = agent.clone();
        }
        if let Some(model) = &self.model {
            settings.model = model.clone();
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = Some(threshold);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    CliTool,
    Library,
    FullStackWeb,
    FrontendOnly,
    BackendApi,
    Unknown,
}

impl ProjectType {
    /// CLI and library shapes win over frontend/backend combinations.
    pub fn classify(features: &FeatureSet) -> Self {
        if features.is_cli_tool {
            ProjectType::CliTool
        } else if features.is_library {
            ProjectType::Library
        } else {
            match (features.has_frontend, features.has_backend) {
                (true, true) => ProjectType::FullStackWeb,
                (true, false) => ProjectType::FrontendOnly,
                (false, true) => ProjectType::BackendApi,
                (false, false) => ProjectType::Unknown,
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::CliTool => "cli-tool",
            ProjectType::Library => "library",
            ProjectType::FullStackWeb => "full-stack-web",
            ProjectType::FrontendOnly => "frontend-only",
            ProjectType::BackendApi => "backend-api",
            ProjectType::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ordered stage of the plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelinePhase {
    pub id: String,
    pub name: String,
    pub order: u32,
    pub agents: Vec<String>,
    pub gates: Vec<Gate>,
    #[serde(default)]
    pub skip: bool,
    #[serde(default)]
    pub skip_reason: Option<String>,
}

/// The `construct/pipeline.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePlan {
    pub generated_at: DateTime<Utc>,
    pub project_type: ProjectType,
    pub features_detected: FeatureSet,
    pub phases: Vec<PipelinePhase>,
    pub gate_config: BTreeMap<Gate, GateSettings>,
    /// Adaptation notes in rule order
    pub optimizations: Vec<String>,
}

impl PipelinePlan {
    pub fn phase(&self, id: &str) -> Option<&PipelinePhase> {
        self.phases.iter().find(|p| p.id == id)
    }

    /// Sorted unique agents of every phase that is not skipped.
    pub fn active_agents(&self) -> Vec<String> {
        self.phases
            .iter()
            .filter(|p| !p.skip)
            .flat_map(|p| p.agents.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Gates whose `gate_config` entry is enabled.
    pub fn active_gates(&self) -> Vec<Gate> {
        self.gate_config
            .iter()
            .filter(|(_, settings)| settings.enabled)
            .map(|(gate, _)| *gate)
            .collect()
    }
}

/// Reads and writes the stored plan.
#[derive(Debug, Clone)]
pub struct PipelineStore {
    layout: StoreLayout,
}

impl PipelineStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    /// Replace the stored plan under the exclusive store lock.
    pub fn save(&self, plan: &PipelinePlan) -> StoreResult<()> {
        let _lock = self.layout.lock_exclusive()?;
        let dir = self.layout.construct_dir();
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let mut batch = WriteBatch::new();
        batch.stage(self.layout.pipeline_path(), plan)?;
        batch.commit()?;
        info!(
            project_type = %plan.project_type,
            optimizations = plan.optimizations.len(),
            "pipeline plan saved"
        );
        Ok(())
    }

    /// The stored plan, or `PipelineNotGenerated`.
    pub fn load(&self) -> StoreResult<PipelinePlan> {
        let _lock = self.layout.lock_shared()?;
        read_json_if_exists(&self.layout.pipeline_path())?.ok_or(StoreError::PipelineNotGenerated)
    }
}
