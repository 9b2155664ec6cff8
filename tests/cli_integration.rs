//! CLI integration tests for tkn-graph
//!
//! These tests run the binary against the fixtures in `tests/fixtures` and
//! check both the text tables and the JSON output.

use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Get a command instance with an isolated, empty configuration
fn tkn_graph_cmd(config_dir: &TempDir) -> assert_cmd::Command {
    let config = config_dir.path().join("config.toml");
    if !config.exists() {
        fs::write(&config, "").unwrap();
    }

    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("tkn-graph"));
    cmd.env("TKN_GRAPH_CONFIG", &config).env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
        .display()
        .to_string()
}

fn json_stdout(cmd: &mut assert_cmd::Command) -> serde_json::Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).unwrap()
}

// =============================================================================
// Kinds
// =============================================================================

#[test]
fn test_kinds_lists_all_documents() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["kinds", &fixture("multitype.yaml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("PipelineResource"))
        .stdout(predicate::str::contains("skaffold-git"))
        .stdout(predicate::str::contains("pipeline-with-parameters"));
}

#[test]
fn test_kinds_filters_by_kind() {
    let dir = TempDir::new().unwrap();

    let docs = json_stdout(tkn_graph_cmd(&dir).args([
        "--format",
        "json",
        "kinds",
        &fixture("multitype.yaml"),
        "--kind",
        "PipelineResource",
    ]));

    let docs = docs.as_array().unwrap();
    assert_eq!(docs.len(), 4);
    assert!(docs.iter().all(|d| d["kind"] == "PipelineResource"));
}

#[test]
fn test_kinds_accepts_lowercase_kind() {
    let dir = TempDir::new().unwrap();

    let docs = json_stdout(tkn_graph_cmd(&dir).args([
        "-f",
        "json",
        "kinds",
        &fixture("multitype.yaml"),
        "--kind",
        "pipeline",
    ]));

    assert_eq!(docs.as_array().unwrap().len(), 1);
}

#[test]
fn test_kinds_rejects_unknown_kind() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["kinds", &fixture("multitype.yaml"), "--kind", "PipeFoo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown document kind"));
}

#[test]
fn test_kinds_reads_stdin() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["kinds", "-"])
        .write_stdin("apiVersion: tekton.dev/v1beta1\nkind: Task\nmetadata:\n  name: echo\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Task"))
        .stdout(predicate::str::contains("echo"));
}

#[test]
fn test_kinds_reports_plain_text() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["kinds", "-"])
        .write_stdin("Some string")
        .assert()
        .success()
        .stdout(predicate::str::contains("No Tekton documents found in <stdin>"));
}

#[test]
fn test_missing_file_fails() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["kinds", "does-not-exist.yaml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to read"));
}

// =============================================================================
// Tasks and resources
// =============================================================================

#[test]
fn test_tasks_infers_order_from_resources() {
    let dir = TempDir::new().unwrap();

    let reports = json_stdout(tkn_graph_cmd(&dir).args([
        "--format",
        "json",
        "tasks",
        &fixture("pipeline-ordering.yaml"),
    ]));

    let tasks = reports[0]["tasks"].as_array().unwrap();
    let deploy = tasks.iter().find(|t| t["name"] == "deploy-web").unwrap();
    assert_eq!(deploy["runAfter"], serde_json::json!(["build-skaffold-web"]));
    assert_eq!(deploy["taskRef"], "deploy-using-kubectl");
    assert_eq!(deploy["kind"], "Task");
}

#[test]
fn test_tasks_text_shows_conditions() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["tasks", &fixture("conditional-pipeline.yaml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pipeline: conditional-pipeline"))
        .stdout(predicate::str::contains("then-check"))
        .stdout(predicate::str::contains("file-exists"));
}

#[test]
fn test_tasks_keeps_scripts_with_embedded_manifests() {
    let dir = TempDir::new().unwrap();
    let yaml = "\
apiVersion: tekton.dev/v1beta1
kind: Pipeline
metadata:
  name: apply-and-verify
  generation: \"3\"
spec:
  tasks:
    - name: apply
      taskSpec:
        steps:
          - name: apply
            image: bitnami/kubectl
            script: |
              kubectl apply -f - <<EOF
              apiVersion: v1
              kind: ConfigMap
              ---
              apiVersion: v1
              kind: Secret
              EOF
    - name: verify
      taskRef:
        name: verify
      runAfter: apply
";

    let reports = json_stdout(
        tkn_graph_cmd(&dir)
            .args(["--format", "json", "tasks", "-"])
            .write_stdin(yaml),
    );

    let tasks = reports[0]["tasks"].as_array().unwrap();
    let names: Vec<_> = tasks.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["apply", "verify"]);
    assert_eq!(tasks[1]["runAfter"], serde_json::json!(["apply"]));
}

#[test]
fn test_tasks_unknown_pipeline_fails() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["tasks", &fixture("pipeline-ordering.yaml"), "--pipeline", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Pipeline 'nope' not found"));
}

#[test]
fn test_resources_lists_declared_resources() {
    let dir = TempDir::new().unwrap();

    let reports = json_stdout(tkn_graph_cmd(&dir).args([
        "--format",
        "json",
        "resources",
        &fixture("multitype.yaml"),
    ]));

    assert_eq!(reports[0]["pipeline"], "pipeline-with-parameters");
    assert_eq!(
        reports[0]["resources"],
        serde_json::json!([
            { "name": "source-repo", "type": "git" },
            { "name": "web-image", "type": "image" }
        ])
    );
}

#[test]
fn test_resources_without_pipeline_fails() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["resources", &fixture("pipelinerun.yaml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No Pipeline documents found"));
}

// =============================================================================
// Graph
// =============================================================================

#[test]
fn test_graph_orders_tasks() {
    let dir = TempDir::new().unwrap();

    let reports = json_stdout(tkn_graph_cmd(&dir).args([
        "--format",
        "json",
        "graph",
        &fixture("pipeline-ordering.yaml"),
    ]));

    assert_eq!(
        reports[0]["order"],
        serde_json::json!(["build-skaffold-web", "deploy-web"])
    );
    assert_eq!(reports[0]["roots"], serde_json::json!(["build-skaffold-web"]));
    assert_eq!(reports[0]["edges"], serde_json::json!([["build-skaffold-web", "deploy-web"]]));
    assert!(reports[0]["cycle"].is_null());
}

#[test]
fn test_graph_reports_cycle() {
    let dir = TempDir::new().unwrap();
    let yaml = "\
apiVersion: tekton.dev/v1beta1
kind: Pipeline
metadata:
  name: loop
spec:
  tasks:
    - name: a
      taskRef:
        name: t
      runAfter: [b]
    - name: b
      taskRef:
        name: t
      runAfter: [a]
";

    tkn_graph_cmd(&dir)
        .args(["graph", "-"])
        .write_stdin(yaml)
        .assert()
        .success()
        .stdout(predicate::str::contains("cycle through: a, b"));
}

#[test]
fn test_graph_dot_output() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["graph", &fixture("pipeline-ordering.yaml"), "--dot"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph"))
        .stdout(predicate::str::contains("deploy-web"));
}

// =============================================================================
// Run
// =============================================================================

#[test]
fn test_run_merges_task_states() {
    let dir = TempDir::new().unwrap();

    let runs = json_stdout(tkn_graph_cmd(&dir).args([
        "--format",
        "json",
        "run",
        &fixture("pipelinerun.yaml"),
        "--pipeline-file",
        &fixture("pipeline-nodejs.yaml"),
    ]));

    let runs = runs.as_array().unwrap();
    assert_eq!(runs.len(), 3);

    let first = &runs[0];
    assert_eq!(first["name"], "nodejs-ex-git-twbd85-nlhww");
    assert_eq!(first["pipeline"], "nodejs-ex-git-twbd85");
    assert_eq!(first["state"], "Failed");

    let tasks = first["tasks"].as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0]["name"], "build");
    assert_eq!(tasks[0]["state"], "Finished");
    assert_eq!(tasks[0]["startTime"], "2020-03-30T08:03:42Z");
    assert_eq!(tasks[1]["state"], "Failed");

    assert_eq!(runs[1]["state"], "Started");
    assert_eq!(runs[1]["tasks"][0]["state"], "Started");
}

#[test]
fn test_run_text_shows_durations() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args([
            "run",
            &fixture("pipelinerun.yaml"),
            "--pipeline-file",
            &fixture("pipeline-nodejs.yaml"),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("PipelineRun: nodejs-ex-git-twbd85-nlhww"))
        .stdout(predicate::str::contains("2m08s"))
        .stdout(predicate::str::contains("State:       Cancelled"));
}

#[test]
fn test_run_without_pipeline_definition_warns() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["run", &fixture("pipelinerun.yaml")])
        .assert()
        .success()
        .stdout(predicate::str::contains("(no task runs recorded)"))
        .stderr(predicate::str::contains("pipeline definition not found"));
}

#[test]
fn test_run_reports_unnamed_runs() {
    let dir = TempDir::new().unwrap();
    let yaml = "\
apiVersion: tekton.dev/v1beta1
kind: PipelineRun
metadata:
  generateName: build-
spec:
  pipelineRef:
    name: build
---
apiVersion: tekton.dev/v1beta1
kind: PipelineRun
metadata:
  name: build-x7k2p
spec:
  pipelineRef:
    name: build
";

    let runs = json_stdout(
        tkn_graph_cmd(&dir)
            .args(["--format", "json", "run", "-"])
            .write_stdin(yaml),
    );

    let names: Vec<_> = runs.as_array().unwrap().iter().map(|r| r["name"].clone()).collect();
    assert_eq!(names, vec![serde_json::json!("<unnamed>"), serde_json::json!("build-x7k2p")]);

    tkn_graph_cmd(&dir)
        .args(["run", "-"])
        .write_stdin(yaml)
        .assert()
        .success()
        .stdout(predicate::str::contains("PipelineRun: <unnamed>"))
        .stdout(predicate::str::contains("PipelineRun: build-x7k2p"));
}

#[test]
fn test_run_without_runs_fails() {
    let dir = TempDir::new().unwrap();

    tkn_graph_cmd(&dir)
        .args(["run", &fixture("multitype.yaml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No PipelineRun documents found"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_default_format_json() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.toml"), "default_format = \"json\"\n").unwrap();

    let docs = json_stdout(tkn_graph_cmd(&dir).args(["kinds", &fixture("multitype.yaml")]));
    assert_eq!(docs.as_array().unwrap().len(), 5);
}

#[test]
fn test_config_invalid_filter_fails() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.toml"), "log_filter = \"tkn_graph=notalevel\"\n").unwrap();

    tkn_graph_cmd(&dir)
        .args(["kinds", &fixture("multitype.yaml")])
        .assert()
        .failure()
        .stderr(predicate::str::contains("log_filter"));
}
