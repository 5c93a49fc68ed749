//! Integration tests for neo
//!
//! These tests drive the `neo` binary against temporary stores.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

/// Helper to create a neo Command isolated from the caller's environment
fn neo() -> Command {
    let mut cmd = cargo_bin_cmd!("neo");
    cmd.env_remove("MATRIX_DIR")
        .env_remove("NEO_DEFAULT_MODEL")
        .env_remove("RUST_LOG");
    cmd
}

/// Helper to create a temporary project directory
fn create_temp_project() -> TempDir {
    TempDir::new().unwrap()
}

/// Helper to initialize a store in a temp directory
fn init_store(dir: &TempDir) {
    neo().current_dir(dir.path()).arg("init").assert().success();
}

/// Run a command in `dir` that must succeed and parse its stdout as JSON
fn run_json(dir: &TempDir, args: &[&str]) -> Value {
    let output = neo().current_dir(dir.path()).args(args).output().unwrap();
    assert!(
        output.status.success(),
        "neo {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// Basic CLI Tests
// =============================================================================

mod cli_basics {
    use super::*;

    #[test]
    fn test_neo_help() {
        neo().arg("--help").assert().success();
    }

    #[test]
    fn test_neo_version() {
        neo().arg("--version").assert().success();
    }

    #[test]
    fn test_neo_init_creates_structure() {
        let dir = create_temp_project();

        neo()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("Initialized neo store"));

        assert!(dir.path().join(".matrix/tickets/index.json").exists());
        assert!(dir.path().join(".matrix/tickets/reservations.json").exists());
        assert!(dir.path().join(".matrix/construct").is_dir());
        assert!(dir.path().join(".matrix/matrix.toml").exists());
    }

    #[test]
    fn test_neo_init_idempotent() {
        let dir = create_temp_project();
        init_store(&dir);

        neo()
            .current_dir(dir.path())
            .arg("init")
            .assert()
            .success()
            .stdout(predicate::str::contains("already initialized"));
    }

    #[test]
    fn test_missing_store_is_an_error() {
        let dir = create_temp_project();

        neo()
            .current_dir(dir.path())
            .args(["ticket", "list"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("not found. Run `neo init` first."));
    }
}

// =============================================================================
// Ticket Tests
// =============================================================================

mod tickets {
    use super::*;

    #[test]
    fn test_create_and_get() {
        let dir = create_temp_project();
        init_store(&dir);

        let ticket = run_json(
            &dir,
            &[
                "ticket",
                "create",
                "Prisma schema",
                "Define the user model",
                "dozer",
                "--priority",
                "high",
                "--files",
                "prisma/schema.prisma",
            ],
        );
        assert_eq!(ticket["id"], "TICKET-001");
        assert_eq!(ticket["status"], "pending");
        assert_eq!(ticket["priority"], "high");
        assert_eq!(ticket["model"], "sonnet");
        assert_eq!(ticket["files"][0], "prisma/schema.prisma");
        assert!(ticket["rarv"].is_object());

        let fetched = run_json(&dir, &["ticket", "get", "TICKET-001"]);
        assert_eq!(fetched, ticket);
    }

    #[test]
    fn test_dependency_blocks_until_completed() {
        let dir = create_temp_project();
        init_store(&dir);

        run_json(&dir, &["ticket", "create", "Schema", "", "dozer"]);
        let routes = run_json(
            &dir,
            &["ticket", "create", "Routes", "", "dozer", "--deps", "TICKET-001"],
        );
        assert_eq!(routes["status"], "blocked");
        assert_eq!(routes["blocked_by"], serde_json::json!(["TICKET-001"]));

        let schema = run_json(&dir, &["ticket", "get", "TICKET-001"]);
        assert_eq!(schema["blocks"], serde_json::json!(["TICKET-002"]));

        let next = run_json(&dir, &["ticket", "next"]);
        assert_eq!(next["id"], "TICKET-001");

        neo()
            .current_dir(dir.path())
            .args(["ticket", "update", "TICKET-001", "--status", "completed"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Unblocked: TICKET-002"));

        let routes = run_json(&dir, &["ticket", "get", "TICKET-002"]);
        assert_eq!(routes["status"], "pending");
        assert_eq!(run_json(&dir, &["ticket", "next"])["id"], "TICKET-002");
    }

    #[test]
    fn test_blocked_ticket_cannot_start() {
        let dir = create_temp_project();
        init_store(&dir);
        run_json(&dir, &["ticket", "create", "Schema", "", "dozer"]);
        run_json(
            &dir,
            &["ticket", "create", "Routes", "", "dozer", "--deps", "TICKET-001"],
        );

        neo()
            .current_dir(dir.path())
            .args(["ticket", "update", "TICKET-002", "--status", "in_progress"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("still blocked by TICKET-001"));
    }

    #[test]
    fn test_unknown_dependency_rejected() {
        let dir = create_temp_project();
        init_store(&dir);

        neo()
            .current_dir(dir.path())
            .args(["ticket", "create", "Routes", "", "dozer", "--deps", "TICKET-009"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("unknown ticket TICKET-009"));

        assert_eq!(run_json(&dir, &["ticket", "list"]), serde_json::json!([]));
    }

    #[test]
    fn test_invalid_status_rejected_by_parser() {
        let dir = create_temp_project();
        init_store(&dir);
        run_json(&dir, &["ticket", "create", "Schema", "", "dozer"]);

        neo()
            .current_dir(dir.path())
            .args(["ticket", "update", "TICKET-001", "--status", "done"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid status"));
    }

    #[test]
    fn test_get_missing_ticket() {
        let dir = create_temp_project();
        init_store(&dir);

        neo()
            .current_dir(dir.path())
            .args(["ticket", "get", "TICKET-404"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("TICKET-404 not found."));
    }

    #[test]
    fn test_next_with_nothing_runnable_is_null() {
        let dir = create_temp_project();
        init_store(&dir);
        assert_eq!(run_json(&dir, &["ticket", "next"]), Value::Null);
    }

    #[test]
    fn test_create_from_graph_and_list() {
        let dir = create_temp_project();
        init_store(&dir);
        let graph = dir.path().join("task-graph.json");
        fs::write(
            &graph,
            r#"{"tasks": [
                {"title": "Schema", "agent": "dozer", "priority": "high"},
                {"title": "Login form", "agent": "niobe", "dependencies": ["TICKET-001"]},
                {"title": "Docs"}
            ]}"#,
        )
        .unwrap();

        neo()
            .current_dir(dir.path())
            .args(["ticket", "create-from-graph", "task-graph.json"])
            .assert()
            .success()
            .stderr(predicate::str::contains("Created 3 tickets"));

        let blocked = run_json(&dir, &["ticket", "list", "--status", "blocked"]);
        assert_eq!(blocked.as_array().unwrap().len(), 1);
        assert_eq!(blocked[0]["id"], "TICKET-002");

        let dozer = run_json(&dir, &["ticket", "list", "--agent", "dozer"]);
        assert_eq!(dozer.as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_graph_and_stats() {
        let dir = create_temp_project();
        init_store(&dir);
        run_json(&dir, &["ticket", "create", "Schema", "", "dozer"]);
        run_json(
            &dir,
            &["ticket", "create", "Login form", "", "niobe", "--deps", "TICKET-001"],
        );

        neo()
            .current_dir(dir.path())
            .args(["ticket", "graph"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[ ] TICKET-001: Schema (dozer) -> TICKET-002"))
            .stdout(predicate::str::contains("[#] TICKET-002: Login form (niobe) <- TICKET-001"));

        let nodes = run_json(&dir, &["ticket", "graph", "--json"]);
        assert_eq!(nodes[1]["dependencies"], serde_json::json!(["TICKET-001"]));

        let stats = run_json(&dir, &["ticket", "stats"]);
        assert_eq!(stats["total"], 2);
        assert_eq!(stats["completion"], "0/2");
        assert_eq!(stats["by_status"]["blocked"], 1);
        assert_eq!(stats["by_agent"]["niobe"], 1);
        assert_eq!(stats["active_reservations"], 0);
    }

    #[test]
    fn test_model_from_config() {
        let dir = create_temp_project();
        init_store(&dir);
        fs::write(
            dir.path().join(".matrix/matrix.toml"),
            "[models]\ndefault = \"haiku\"\noracle = \"opus\"\n",
        )
        .unwrap();

        let plan = run_json(&dir, &["ticket", "create", "Plan", "", "oracle"]);
        assert_eq!(plan["model"], "opus");
        let build = run_json(&dir, &["ticket", "create", "Build", "", "dozer"]);
        assert_eq!(build["model"], "haiku");

        let env_default = neo()
            .current_dir(dir.path())
            .env("NEO_DEFAULT_MODEL", "sonnet")
            .args(["ticket", "create", "Ship", "", "dozer"])
            .output()
            .unwrap();
        let ticket: Value = serde_json::from_slice(&env_default.stdout).unwrap();
        assert_eq!(ticket["model"], "sonnet");
    }
}

// =============================================================================
// Reservation Tests
// =============================================================================

mod reservations {
    use super::*;

    fn setup() -> TempDir {
        let dir = create_temp_project();
        init_store(&dir);
        run_json(
            &dir,
            &["ticket", "create", "API", "", "dozer", "--files", "src/a.ts,src/b.ts"],
        );
        run_json(
            &dir,
            &["ticket", "create", "UI", "", "niobe", "--files", "src/b.ts,src/c.ts"],
        );
        dir
    }

    #[test]
    fn test_conflict_then_release_then_retry() {
        let dir = setup();

        let reserved = run_json(&dir, &["ticket", "reserve", "TICKET-001", "dozer"]);
        assert_eq!(reserved["status"], "ok");
        assert_eq!(reserved["reserved"], serde_json::json!(["src/a.ts", "src/b.ts"]));

        let output = neo()
            .current_dir(dir.path())
            .args(["ticket", "reserve", "TICKET-002", "niobe"])
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(2));
        let conflict: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(conflict["status"], "conflict");
        assert_eq!(conflict["conflicts"][0]["file"], "src/b.ts");
        assert_eq!(conflict["conflicts"][0]["held_by"], "TICKET-001");
        assert_eq!(conflict["conflicts"][0]["agent"], "dozer");

        let unheld = run_json(&dir, &["ticket", "check-reservation", "src/c.ts"]);
        assert_eq!(unheld["reserved"], false);

        let released = run_json(&dir, &["ticket", "release", "TICKET-001"]);
        assert_eq!(released["released"], serde_json::json!(["src/a.ts", "src/b.ts"]));
        let freed = run_json(&dir, &["ticket", "check-reservation", "src/a.ts"]);
        assert_eq!(freed["reserved"], false);

        let retried = run_json(&dir, &["ticket", "reserve", "TICKET-002", "niobe"]);
        assert_eq!(retried["status"], "ok");
        let held = run_json(&dir, &["ticket", "check-reservation", "src/b.ts"]);
        assert_eq!(held["reserved"], true);
        assert_eq!(held["ticket"], "TICKET-002");

        assert_eq!(run_json(&dir, &["ticket", "stats"])["active_reservations"], 2);
    }

    #[test]
    fn test_reserve_without_files() {
        let dir = setup();
        run_json(&dir, &["ticket", "create", "Plan", "", "oracle"]);
        let out = run_json(&dir, &["ticket", "reserve", "TICKET-003", "oracle"]);
        assert_eq!(out["message"], "No files to reserve");
    }

    #[test]
    fn test_release_without_reservations_is_ok() {
        let dir = setup();
        let out = run_json(&dir, &["ticket", "release", "TICKET-002"]);
        assert_eq!(out["released"], serde_json::json!([]));
    }

    #[test]
    fn test_reserve_unknown_ticket() {
        let dir = setup();
        neo()
            .current_dir(dir.path())
            .args(["ticket", "reserve", "TICKET-404", "dozer"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("TICKET-404 not found."));
    }
}

// =============================================================================
// Pipeline Tests
// =============================================================================

mod pipeline {
    use super::*;

    fn write_features(dir: &TempDir, json: &str) {
        fs::write(dir.path().join("features.json"), json).unwrap();
    }

    #[test]
    fn test_show_before_generate_fails() {
        let dir = create_temp_project();
        init_store(&dir);

        neo()
            .current_dir(dir.path())
            .args(["pipeline", "agents"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("No pipeline generated yet"));
    }

    #[test]
    fn test_generate_backend_payments() {
        let dir = create_temp_project();
        init_store(&dir);
        write_features(&dir, r#"{"has_backend": true, "has_payments": true}"#);

        let plan = run_json(&dir, &["pipeline", "generate", "--features", "features.json"]);
        assert_eq!(plan["project_type"], "backend-api");
        assert_eq!(plan["gate_config"]["switch-coverage"]["threshold"], 90);
        assert_eq!(plan["optimizations"][0], "Skipped niobe: no frontend detected");
        assert!(dir.path().join(".matrix/construct/pipeline.json").exists());

        let agents = run_json(&dir, &["pipeline", "agents"]);
        let agents: Vec<&str> = agents
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a.as_str().unwrap())
            .collect();
        assert!(agents.contains(&"dozer"));
        assert!(!agents.contains(&"niobe"));
        let mut sorted = agents.clone();
        sorted.sort();
        assert_eq!(agents, sorted);

        let gates = run_json(&dir, &["pipeline", "gates"]);
        assert_eq!(
            gates,
            serde_json::json!(["smith-review", "trinity-security", "switch-coverage"])
        );
    }

    #[test]
    fn test_generate_scans_codebase_and_prd() {
        let dir = create_temp_project();
        init_store(&dir);
        fs::create_dir_all(dir.path().join("src/components")).unwrap();
        fs::write(dir.path().join("Dockerfile"), "FROM node:20\n").unwrap();
        fs::write(dir.path().join("PRD.md"), "Users chat over websockets.\n").unwrap();

        let plan = run_json(&dir, &["pipeline", "generate", ".", "--prd", "PRD.md"]);
        assert_eq!(plan["features_detected"]["has_frontend"], true);
        assert_eq!(plan["features_detected"]["has_docker"], true);
        assert_eq!(plan["features_detected"]["has_realtime"], true);
        let sentinel_gates = plan["phases"][5]["gates"].as_array().unwrap();
        assert!(sentinel_gates.contains(&Value::String("stress-test".into())));
    }

    #[test]
    fn test_missing_prd_is_a_warning() {
        let dir = create_temp_project();
        init_store(&dir);

        neo()
            .current_dir(dir.path())
            .args(["pipeline", "generate", "--prd", "nope.md"])
            .assert()
            .success()
            .stderr(predicate::str::contains("PRD file not found"));
    }

    #[test]
    fn test_gate_overrides_from_config() {
        let dir = create_temp_project();
        init_store(&dir);
        fs::write(
            dir.path().join(".matrix/matrix.toml"),
            "[pipeline.gate_overrides.switch-coverage]\nthreshold = 95\n",
        )
        .unwrap();

        let plan = run_json(&dir, &["pipeline", "generate"]);
        assert_eq!(plan["gate_config"]["switch-coverage"]["threshold"], 95);
    }

    #[test]
    fn test_show_renders_plan() {
        let dir = create_temp_project();
        init_store(&dir);
        run_json(&dir, &["pipeline", "generate"]);

        neo()
            .current_dir(dir.path())
            .args(["pipeline", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("THE SOURCE"))
            .stdout(predicate::str::contains("Optimizations:"));

        let raw = run_json(&dir, &["pipeline", "show", "--json"]);
        assert_eq!(raw["phases"].as_array().unwrap().len(), 7);
    }
}

// =============================================================================
// Configuration Tests
// =============================================================================

mod configuration {
    use super::*;

    #[test]
    fn test_config_show_defaults() {
        let dir = create_temp_project();
        init_store(&dir);

        neo()
            .current_dir(dir.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("default = \"sonnet\""));
    }

    #[test]
    fn test_config_validate_warns_on_unknown_gate() {
        let dir = create_temp_project();
        init_store(&dir);
        fs::write(
            dir.path().join(".matrix/matrix.toml"),
            "[pipeline.gate_overrides.lint]\nenabled = false\n",
        )
        .unwrap();

        neo()
            .current_dir(dir.path())
            .args(["config", "validate"])
            .assert()
            .success()
            .stdout(predicate::str::contains("does not name a known gate"));
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = create_temp_project();
        init_store(&dir);
        fs::write(dir.path().join(".matrix/matrix.toml"), "[models\n").unwrap();

        neo()
            .current_dir(dir.path())
            .args(["ticket", "list"])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("Failed to parse config file"));
    }
}

// =============================================================================
// Global Flag Tests
// =============================================================================

mod global_flags {
    use super::*;

    #[test]
    fn test_matrix_dir_flag() {
        let dir = create_temp_project();
        let store = dir.path().join("custom-store");

        neo()
            .current_dir(dir.path())
            .args(["--matrix-dir", "custom-store", "init"])
            .assert()
            .success();
        assert!(store.join("tickets/index.json").exists());

        neo()
            .current_dir(dir.path())
            .args(["ticket", "create", "A", "", "dozer", "--matrix-dir", "custom-store"])
            .assert()
            .success();
        assert!(store.join("tickets/TICKET-001.json").exists());
    }

    #[test]
    fn test_matrix_dir_env() {
        let dir = create_temp_project();
        let store = dir.path().join("env-store");

        neo()
            .env("MATRIX_DIR", &store)
            .arg("init")
            .assert()
            .success();

        neo()
            .env("MATRIX_DIR", &store)
            .args(["ticket", "create", "A", "", "dozer"])
            .assert()
            .success();
        assert!(store.join("tickets/TICKET-001.json").exists());
    }

    #[test]
    fn test_verbose_logs_go_to_stderr() {
        let dir = create_temp_project();
        init_store(&dir);

        let output = neo()
            .current_dir(dir.path())
            .args(["-v", "ticket", "create", "A", "", "dozer"])
            .output()
            .unwrap();
        assert!(output.status.success());
        let ticket: Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(ticket["id"], "TICKET-001");
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert_eq!(stderr.matches("ticket created").count(), 1);
    }
}
