//! Plan generation.
//!
//! [`generate`] starts from the fixed seven-phase skeleton and adapts it to
//! a [`FeatureSet`]. Rules run in one fixed sequence and each appends its
//! note to the optimization log, so equal inputs give equal plans.

use std::collections::BTreeMap;
use tracing::{info, warn};

use super::{FeatureSet, Gate, GateOverride, GateSettings, PipelinePhase, PipelinePlan, ProjectType};
use crate::ticket::now;

/// Phases kept even when their roster is empty.
pub const STRUCTURAL_PHASES: [&str; 4] = ["source", "red-pill", "bullet-time", "zion"];

const SENTINELS: &str = "sentinels";
const SECURITY_AGENT: &str = "trinity";
const EMPTY_PHASE_REASON: &str = "no agents remaining after adaptation";

struct SkipRule {
    applies: fn(&FeatureSet) -> bool,
    reason: &'static str,
}

const NIOBE_RULES: &[SkipRule] = &[
    SkipRule {
        applies: |f| f.is_cli_tool,
        reason: "CLI tool project",
    },
    SkipRule {
        applies: |f| f.is_library,
        reason: "library project",
    },
    SkipRule {
        applies: |f| !f.has_frontend,
        reason: "no frontend detected",
    },
];

const DOZER_RULES: &[SkipRule] = &[SkipRule {
    applies: |f| !f.has_backend && !f.has_api_endpoints && !f.has_database,
    reason: "no backend or database detected",
}];

const TANK_RULES: &[SkipRule] = &[
    SkipRule {
        applies: |f| f.is_library,
        reason: "library project",
    },
    SkipRule {
        applies: |f| !f.has_ci_cd && !f.has_docker,
        reason: "no CI/CD or Docker detected",
    },
];

const SHANNON_RULES: &[SkipRule] = &[
    SkipRule {
        applies: |f| f.is_cli_tool,
        reason: "CLI tool project",
    },
    SkipRule {
        applies: |f| f.is_library,
        reason: "library project",
    },
    SkipRule {
        applies: |f| !f.has_api_endpoints,
        reason: "no API endpoints detected",
    },
];

/// Agents that can be dropped from the plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionalAgent {
    /// Frontend implementation
    Niobe,
    /// Backend implementation
    Dozer,
    /// Infrastructure
    Tank,
    /// Penetration testing
    Shannon,
}

impl OptionalAgent {
    /// Evaluation order; also the order of skip lines in the log.
    pub const ORDER: [OptionalAgent; 4] = [
        OptionalAgent::Niobe,
        OptionalAgent::Dozer,
        OptionalAgent::Tank,
        OptionalAgent::Shannon,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            OptionalAgent::Niobe => "niobe",
            OptionalAgent::Dozer => "dozer",
            OptionalAgent::Tank => "tank",
            OptionalAgent::Shannon => "shannon",
        }
    }

    fn rules(&self) -> &'static [SkipRule] {
        match self {
            OptionalAgent::Niobe => NIOBE_RULES,
            OptionalAgent::Dozer => DOZER_RULES,
            OptionalAgent::Tank => TANK_RULES,
            OptionalAgent::Shannon => SHANNON_RULES,
        }
    }

    /// First applying reason, or `None` if the agent is needed.
    pub fn skip_reason(&self, features: &FeatureSet) -> Option<&'static str> {
        self.rules()
            .iter()
            .find(|rule| (rule.applies)(features))
            .map(|rule| rule.reason)
    }
}

impl std::fmt::Display for OptionalAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn phase(id: &str, name: &str, order: u32, agents: &[&str], gates: &[Gate]) -> PipelinePhase {
    PipelinePhase {
        id: id.to_string(),
        name: name.to_string(),
        order,
        agents: agents.iter().map(|a| a.to_string()).collect(),
        gates: gates.to_vec(),
        skip: false,
        skip_reason: None,
    }
}

fn skeleton() -> Vec<PipelinePhase> {
    vec![
        phase("source", "THE SOURCE", 0, &[], &[]),
        phase("red-pill", "RED PILL", 1, &["neo"], &[]),
        phase("construct", "THE CONSTRUCT", 2, &["oracle", "architect"], &[]),
        phase(
            "jacking-in",
            "JACKING IN",
            3,
            &["morpheus", "dozer", "niobe", "tank"],
            &[],
        ),
        phase("bullet-time", "BULLET TIME", 4, &["neo"], &[Gate::IntegrationCheck]),
        phase(
            SENTINELS,
            "SENTINELS",
            5,
            &["smith", "trinity", "shannon", "switch", "mouse"],
            &[
                Gate::SmithReview,
                Gate::TrinitySecurity,
                Gate::ShannonPentest,
                Gate::SwitchCoverage,
            ],
        ),
        phase("zion", "ZION", 6, &["sati", "trainman"], &[]),
    ]
}

fn gate_config(features: &FeatureSet) -> BTreeMap<Gate, GateSettings> {
    let mut config = BTreeMap::new();
    config.insert(Gate::SmithReview, GateSettings::new("smith", "opus"));
    config.insert(Gate::TrinitySecurity, GateSettings::new("trinity", "sonnet"));
    config.insert(
        Gate::ShannonPentest,
        GateSettings {
            enabled: features.has_api_endpoints && !features.is_cli_tool,
            ..GateSettings::new("shannon", "sonnet")
        },
    );
    config.insert(
        Gate::SwitchCoverage,
        GateSettings {
            threshold: Some(if features.has_payments { 90 } else { 80 }),
            ..GateSettings::new("switch", "sonnet")
        },
    );
    if features.has_realtime {
        config.insert(Gate::StressTest, GateSettings::new("mouse", "sonnet"));
    }
    config
}

/// Build a plan for `features`, then overlay `overrides` onto gate settings.
///
/// Overrides only touch gates already in the generated `gate_config`.
pub fn generate(features: &FeatureSet, overrides: &BTreeMap<Gate, GateOverride>) -> PipelinePlan {
    let mut phases = skeleton();
    let mut gates = gate_config(features);
    let mut log = Vec::new();

    for agent in OptionalAgent::ORDER {
        if let Some(reason) = agent.skip_reason(features) {
            log.push(format!("Skipped {}: {}", agent, reason));
            for phase in &mut phases {
                phase.agents.retain(|a| a != agent.name());
            }
        }
    }

    if !features.has_api_endpoints || features.is_cli_tool {
        log.push("Disabled shannon-pentest: no HTTP endpoints to test".to_string());
    }
    if features.has_payments {
        log.push("Enforced 90% coverage threshold: payment-handling project".to_string());
    }

    let sentinels = phases.iter_mut().find(|p| p.id == SENTINELS);
    if let Some(sentinels) = sentinels {
        if features.has_realtime {
            if !sentinels.gates.contains(&Gate::StressTest) {
                sentinels.gates.push(Gate::StressTest);
            }
            log.push("Added stress-test gate: realtime features detected".to_string());
        }
        if features.has_auth {
            log.push("Added early trinity pass: auth-heavy project".to_string());
            if let Some(pos) = sentinels.agents.iter().position(|a| a == SECURITY_AGENT) {
                let agent = sentinels.agents.remove(pos);
                sentinels.agents.insert(0, agent);
            }
        }
    }

    for phase in &mut phases {
        phase.skip = !STRUCTURAL_PHASES.contains(&phase.id.as_str()) && phase.agents.is_empty();
        phase.skip_reason = phase.skip.then(|| EMPTY_PHASE_REASON.to_string());
    }

    if features.has_backend && !features.has_frontend {
        log.push("Backend-only: frontend agents removed from implementation wave".to_string());
    }

    for phase in &mut phases {
        phase
            .gates
            .retain(|gate| gates.get(gate).is_none_or(|settings| settings.enabled));
    }

    for (gate, overlay) in overrides {
        match gates.get_mut(gate) {
            Some(settings) => overlay.apply(settings),
            None => warn!(gate = %gate, "ignoring override for a gate this plan does not configure"),
        }
    }

    let project_type = ProjectType::classify(features);
    info!(
        project_type = %project_type,
        optimizations = log.len(),
        "pipeline generated"
    );

    PipelinePlan {
        generated_at: now(),
        project_type,
        features_detected: *features,
        phases,
        gate_config: gates,
        optimizations: log,
    }
}
