//! Human-readable rendering of a pipeline plan.

use console::style;
use std::fmt::Write as _;

use super::icons::{GATE, PHASE, SKIPPED};
use crate::pipeline::PipelinePlan;

fn rule() -> String {
    "=".repeat(50)
}

fn join_or_none<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let joined = items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "(none)".to_string()
    } else {
        joined
    }
}

/// Multi-line summary of `plan` for `neo pipeline show`.
pub fn render_plan(plan: &PipelinePlan) -> String {
    let mut out = String::new();
    let _ = writeln!(out);
    let _ = writeln!(out, "  Pipeline: {}", style(plan.project_type).bold());
    let _ = writeln!(out, "  Generated: {}", plan.generated_at.format("%Y-%m-%dT%H:%M:%SZ"));
    let _ = writeln!(out, "  {}", rule());

    for phase in &plan.phases {
        let _ = writeln!(out);
        if phase.skip {
            let _ = writeln!(
                out,
                "  {}Phase {}: {} {}",
                SKIPPED,
                phase.order,
                style(&phase.name).dim(),
                style("[SKIP]").yellow()
            );
        } else {
            let _ = writeln!(
                out,
                "  {}Phase {}: {}",
                PHASE,
                phase.order,
                style(&phase.name).cyan().bold()
            );
        }
        let _ = writeln!(out, "    Agents: {}", join_or_none(&phase.agents));
        if !phase.gates.is_empty() {
            let _ = writeln!(
                out,
                "    {}Gates:  {}",
                GATE,
                join_or_none(phase.gates.iter().map(|g| g.as_str()))
            );
        }
        if let Some(reason) = &phase.skip_reason {
            let _ = writeln!(out, "    Reason: {}", style(reason).dim());
        }
    }

    if !plan.optimizations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {}", rule());
        let _ = writeln!(out, "  Optimizations:");
        for note in &plan.optimizations {
            let _ = writeln!(out, "    - {}", note);
        }
    }

    let features = &plan.features_detected;
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  Detected: {}",
        join_or_none(features.flags().filter(|(_, on)| *on).map(|(n, _)| n))
    );
    let _ = writeln!(
        out,
        "  Absent:   {}",
        join_or_none(features.flags().filter(|(_, on)| !*on).map(|(n, _)| n))
    );
    out
}
