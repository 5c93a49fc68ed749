//! Feature detection from PRDs, project trees and task graphs.
//!
//! Each scanner yields a partial [`FeatureSet`]; callers combine them with
//! [`FeatureSet::any_of`]. Only [`scan_codebase`] touches the filesystem.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;

use super::FeatureSet;
use crate::errors::{StoreError, StoreResult};
use crate::ticket::TaskGraph;

/// Lower-case substrings that signal a feature in free text.
const TEXT_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "has_frontend",
        &["react", "next", "vue", "angular", "component", "ui", "page", "layout", "css", "tailwind"],
    ),
    (
        "has_backend",
        &["express", "fastify", "hono", "route", "endpoint", "controller", "middleware", "api"],
    ),
    (
        "has_database",
        &["prisma", "drizzle", "sequelize", "sql", "migration", "schema", "postgres", "mongo"],
    ),
    (
        "has_auth",
        &["login", "signup", "jwt", "oauth", "session", "password", "authentication", "authorization"],
    ),
    (
        "has_api_endpoints",
        &["endpoint", "route", "api", "rest", "graphql", "controller", "handler"],
    ),
    (
        "has_realtime",
        &["websocket", "socket.io", "sse", "realtime", "live", "stream", "pubsub"],
    ),
    (
        "has_file_uploads",
        &["upload", "multipart", "formdata", "file upload", "multer", "s3", "storage"],
    ),
    (
        "has_payments",
        &["stripe", "payment", "billing", "subscription", "checkout", "invoice"],
    ),
];

const CI_MARKERS: &[&str] = &[".github/workflows", ".gitlab-ci.yml", "Jenkinsfile", ".circleci"];

const DOCKER_MARKERS: &[&str] = &[
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".dockerignore",
];

const LIBRARY_ENTRY_KEYS: &[&str] = &["main", "module", "types", "exports", "typings"];

// Dependency names that mark a package as a command-line tool
static CLI_DEPENDENCY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(bin|commander|yargs|meow|cli|oclif|inquirer)\b")
        .expect("CLI marker pattern is a valid static regex")
});

/// Keyword scan of free text (PRD, package manifest, task titles).
pub fn scan_text(text: &str) -> FeatureSet {
    let lower = text.to_lowercase();
    let mut features = FeatureSet::default();
    for (flag, keywords) in TEXT_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            features.set(flag, true);
        }
    }
    features
}

/// Inspect a project directory for CI, containers, package shape and
/// conventional source folders.
pub fn scan_codebase(project_dir: &Path) -> FeatureSet {
    let mut features = FeatureSet {
        has_ci_cd: CI_MARKERS.iter().any(|m| project_dir.join(m).exists()),
        has_docker: DOCKER_MARKERS.iter().any(|m| project_dir.join(m).exists()),
        ..Default::default()
    };

    if let Some(manifest) = read_manifest(&project_dir.join("package.json")) {
        features = features.union(&scan_manifest(&manifest));
    }

    if project_dir.join("src/components").exists() || project_dir.join("app").exists() {
        features.has_frontend = true;
    }
    if project_dir.join("src/routes").exists() || project_dir.join("src/controllers").exists() {
        features.has_backend = true;
    }
    if project_dir.join("prisma").exists() || project_dir.join("migrations").exists() {
        features.has_database = true;
    }
    features
}

fn read_manifest(path: &Path) -> Option<serde_json::Value> {
    let content = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "ignoring unreadable package.json");
            None
        }
    }
}

/// Shape of a parsed `package.json`.
fn scan_manifest(manifest: &serde_json::Value) -> FeatureSet {
    let dependency_names: String = ["dependencies", "devDependencies"]
        .iter()
        .filter_map(|key| manifest.get(key).and_then(|d| d.as_object()))
        .flat_map(|deps| deps.keys())
        .map(|name| name.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let is_cli_tool = manifest.get("bin").is_some() || CLI_DEPENDENCY.is_match(&dependency_names);

    let has_entry = LIBRARY_ENTRY_KEYS.iter().any(|k| manifest.get(k).is_some());
    let scripts = manifest.get("scripts");
    let has_script = |name: &str| scripts.and_then(|s| s.get(name)).is_some();
    let is_library = has_entry && !has_script("start") && !has_script("dev") && !is_cli_tool;

    let mut features = scan_text(&manifest.to_string());
    features.is_cli_tool = is_cli_tool;
    features.is_library = is_library;
    features
}

/// Keyword scan over every task's title, description and files.
pub fn scan_task_graph(graph: &TaskGraph) -> FeatureSet {
    let blob = graph
        .tasks
        .iter()
        .map(|t| format!("{} {} {}", t.title, t.description, t.files.join(" ")))
        .collect::<Vec<_>>()
        .join(" ");
    scan_text(&blob)
}

/// Load an explicit feature file: a JSON map of flag name to bool.
pub fn load_feature_file(path: &Path) -> StoreResult<FeatureSet> {
    let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
    let map: BTreeMap<String, bool> =
        serde_json::from_str(&content).map_err(|e| StoreError::json(path, e))?;
    for name in map.keys() {
        if FeatureSet::NAMES.iter().all(|known| known != name) {
            debug!(flag = %name, "ignoring unknown feature flag");
        }
    }
    Ok(FeatureSet::from_map(&map))
}
