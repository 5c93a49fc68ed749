//! Pipeline commands - `neo pipeline ...`.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::warn;

use super::super::{Cli, PipelineCommands};
use super::{load_config, print_json};
use neo::persist::StoreLayout;
use neo::pipeline::{FeatureSet, PipelineStore, detect, generate};
use neo::ticket::TaskGraph;

pub fn cmd_pipeline(cli: &Cli, command: &PipelineCommands) -> Result<()> {
    let config = load_config(cli)?;
    let store = PipelineStore::new(StoreLayout::new(&config.matrix_dir));

    match command {
        PipelineCommands::Generate {
            project_dir,
            prd,
            task_graph,
            features,
        } => {
            let detected = detect_features(
                project_dir,
                prd.as_deref(),
                task_graph.as_deref(),
                features.as_deref(),
            )?;
            for warning in config.file.validate() {
                warn!("{}", warning);
            }
            let plan = generate(&detected, &config.file.gate_overrides());
            store.save(&plan)?;
            print_json(&plan)?;
        }
        PipelineCommands::Show { json } => {
            let plan = store.load()?;
            if *json {
                print_json(&plan)?;
            } else {
                print!("{}", neo::ui::render_plan(&plan));
            }
        }
        PipelineCommands::Agents => {
            print_json(&store.load()?.active_agents())?;
        }
        PipelineCommands::Gates => {
            print_json(&store.load()?.active_gates())?;
        }
    }

    Ok(())
}

/// Fold every available source into one feature set.
///
/// Missing PRD or task-graph files are reported and skipped; an explicit
/// feature file must exist.
fn detect_features(
    project_dir: &Path,
    prd: Option<&Path>,
    task_graph: Option<&Path>,
    feature_file: Option<&Path>,
) -> Result<FeatureSet> {
    let mut sources = Vec::new();

    if let Some(path) = prd {
        if path.exists() {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read PRD: {}", path.display()))?;
            sources.push(detect::scan_text(&text));
        } else {
            warn!(path = %path.display(), "PRD file not found; skipping");
        }
    }

    if project_dir.is_dir() {
        sources.push(detect::scan_codebase(project_dir));
    }

    if let Some(path) = task_graph {
        if path.exists() {
            let graph = TaskGraph::load(path)
                .with_context(|| format!("Failed to load task graph: {}", path.display()))?;
            sources.push(detect::scan_task_graph(&graph));
        } else {
            warn!(path = %path.display(), "task graph not found; skipping");
        }
    }

    if let Some(path) = feature_file {
        sources.push(detect::load_feature_file(path)?);
    }

    Ok(FeatureSet::any_of(sources))
}
