use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

fn trellis() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("trellis").unwrap()
}

fn run_json(dir: &TempDir, args: &[&str]) -> Value {
    let output = trellis()
        .args(args)
        .arg("--json")
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "{:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn ok(dir: &TempDir, args: &[&str]) {
    trellis().args(args).current_dir(dir.path()).assert().success();
}

/// An initialized, enabled workspace with the four standard agents.
fn session() -> TempDir {
    let dir = TempDir::new().unwrap();
    ok(&dir, &["init"]);
    ok(&dir, &["enable"]);
    ok(&dir, &["agent", "register", "coder-1", "--role", "coder"]);
    ok(&dir, &["agent", "register", "coder-2", "--role", "coder"]);
    ok(&dir, &["agent", "register", "reviewer-1", "--role", "reviewer"]);
    ok(&dir, &["agent", "register", "tester-1", "--role", "tester"]);
    dir
}

#[test]
fn init_creates_trellis_dir() {
    let dir = TempDir::new().unwrap();
    trellis()
        .arg("init")
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains(".trellis"));

    assert!(dir.path().join(".trellis/config.json").exists());
    assert!(dir.path().join(".trellis/session.json").exists());
}

#[test]
fn init_twice_fails() {
    let dir = TempDir::new().unwrap();
    ok(&dir, &["init"]);
    trellis().arg("init").current_dir(dir.path()).assert().failure();
}

#[test]
fn commands_outside_workspace_fail() {
    let dir = TempDir::new().unwrap();
    trellis()
        .args(["agent", "list"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("not a Trellis workspace"));
}

#[test]
fn mutations_before_enable_fail() {
    let dir = TempDir::new().unwrap();
    ok(&dir, &["init"]);
    trellis()
        .args(["agent", "register", "coder-1", "--role", "coder"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("not enabled"));
}

#[test]
fn list_agents_in_registration_order() {
    let dir = session();
    let agents = run_json(&dir, &["agent", "list"]);
    let ids: Vec<_> = agents
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["coder-1", "coder-2", "reviewer-1", "tester-1"]);
    assert_eq!(agents[0]["reputation"], 0.5);
}

#[test]
fn invalid_role_rejected() {
    let dir = session();
    trellis()
        .args(["agent", "register", "x", "--role", "wizard"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("invalid role"));
}

#[test]
fn same_file_edit_conflicts() {
    let dir = session();
    let first = run_json(
        &dir,
        &["op", "propose", "--agent", "coder-1", "--id", "op-conflict-1", "--file", "src/main.js"],
    );
    assert_eq!(first["operation"]["status"], "proposed");
    assert_eq!(first["conflicts"]["hasConflicts"], false);

    let report = run_json(
        &dir,
        &["op", "check", "--id", "op-conflict-2", "--action", "Edit", "--file", "src/main.js"],
    );
    assert_eq!(report["hasConflicts"], true);
    assert_eq!(report["conflicts"][0]["operationId"], "op-conflict-1");
    assert_eq!(report["conflicts"][0]["overlappingFiles"][0], "src/main.js");

    let second = run_json(
        &dir,
        &["op", "propose", "--agent", "coder-2", "--id", "op-conflict-2", "--file", "src/main.js"],
    );
    assert_eq!(second["conflicts"]["conflicts"][0]["operationId"], "op-conflict-1");
}

#[test]
fn different_files_do_not_conflict() {
    let dir = session();
    ok(&dir, &["op", "propose", "--agent", "coder-1", "--id", "op-1", "--file", "src/main.js"]);
    let report = run_json(
        &dir,
        &["op", "check", "--id", "op-3", "--action", "edit", "--file", "src/other.js"],
    );
    assert_eq!(report["hasConflicts"], false);
    assert_eq!(report["conflicts"].as_array().unwrap().len(), 0);

    trellis()
        .args(["op", "check", "--id", "op-3", "--file", "src/other.js"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("No conflicts"));
}

#[test]
fn duplicate_operation_fails() {
    let dir = session();
    ok(&dir, &["op", "propose", "--agent", "coder-1", "--id", "op-1", "--file", "a"]);
    trellis()
        .args(["op", "propose", "--agent", "coder-2", "--id", "op-1", "--file", "b"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("already exists"));
}

#[test]
fn coordination_stats() {
    let dir = session();
    ok(&dir, &["op", "propose", "--agent", "coder-1", "--id", "op-1", "--file", "a"]);
    ok(&dir, &["op", "propose", "--agent", "coder-2", "--id", "op-2", "--file", "b"]);
    ok(&dir, &["op", "commit", "op-1"]);

    let stats = run_json(&dir, &["stats"]);
    assert_eq!(stats["totalAgents"], 4);
    assert_eq!(stats["totalOperations"], 2);
    assert_eq!(stats["dagVertices"], stats["totalOperations"]);
    assert_eq!(stats["inFlight"], 1);
}

#[test]
fn agent_stats_track_outcomes() {
    let dir = session();
    ok(&dir, &["op", "propose", "--agent", "coder-1", "--id", "op-1", "--file", "a"]);
    ok(&dir, &["op", "commit", "op-1"]);

    let stats = run_json(&dir, &["agent", "stats", "coder-1"]);
    assert_eq!(stats["agentId"], "coder-1");
    assert_eq!(stats["operationsCount"], 1);
    let reputation = stats["reputation"].as_f64().unwrap();
    assert!((reputation - 0.6).abs() < 1e-9);

    trellis()
        .args(["op", "abort", "op-1"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("invalid status transition"));

    let outcomes = run_json(&dir, &["outcomes", "--agent", "coder-1"]);
    assert_eq!(outcomes.as_array().unwrap().len(), 1);
    assert_eq!(outcomes[0]["outcome"], "committed");
}

#[test]
fn unknown_agent_stats_fail() {
    let dir = session();
    trellis()
        .args(["agent", "stats", "ghost"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("agent not found"));
}

#[test]
fn ancestors_follow_parents() {
    let dir = session();
    ok(&dir, &["op", "propose", "--agent", "coder-1", "--id", "op-1", "--file", "a"]);
    ok(&dir, &["op", "propose", "--agent", "coder-2", "--id", "op-2", "--file", "b"]);
    ok(&dir, &["op", "propose", "--agent", "tester-1", "--id", "op-3", "--file", "c", "--action", "read", "--parent", "op-1"]);

    let ancestors = run_json(&dir, &["op", "ancestors", "op-2"]);
    assert_eq!(ancestors, serde_json::json!(["op-1"]));
    let ancestors = run_json(&dir, &["op", "ancestors", "op-3"]);
    assert_eq!(ancestors, serde_json::json!(["op-1"]));

    trellis()
        .args(["op", "propose", "--agent", "coder-1", "--id", "op-4", "--file", "d", "--parent", "op-9"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("not created earlier"));
}

#[test]
fn sign_and_verify_round_trip() {
    let dir = TempDir::new().unwrap();
    let keypair = run_json(&dir, &["key", "generate"]);
    let secret = keypair["secretKey"].as_str().unwrap().to_string();
    let public = keypair["publicKey"].as_str().unwrap().to_string();
    assert_eq!(keypair["keyId"].as_str().unwrap().len(), 16);

    let signed = run_json(
        &dir,
        &["key", "sign", "--secret-key", &secret, "--message", "Test operation signature"],
    );
    let signature = signed["signature"].as_str().unwrap().to_string();

    let valid = run_json(
        &dir,
        &["key", "verify", "--public-key", &public, "--signature", &signature, "--message", "Test operation signature"],
    );
    assert_eq!(valid["valid"], true);

    let wrong = run_json(
        &dir,
        &["key", "verify", "--public-key", &public, "--signature", &signature, "--message", "Wrong message"],
    );
    assert_eq!(wrong["valid"], false);
}

#[test]
fn sign_with_malformed_key_fails() {
    let dir = TempDir::new().unwrap();
    trellis()
        .args(["key", "sign", "--secret-key", "abcd", "--message", "hi"])
        .current_dir(dir.path())
        .assert()
        .failure()
        .stderr(predicates::str::contains("invalid key"));
}

#[test]
fn signed_operation_verifies() {
    let dir = session();
    ok(&dir, &["op", "propose", "--agent", "coder-1", "--id", "op-1", "--file", "a"]);
    let keypair = run_json(&dir, &["key", "generate"]);
    let secret = keypair["secretKey"].as_str().unwrap().to_string();
    let public = keypair["publicKey"].as_str().unwrap().to_string();

    let unsigned = run_json(&dir, &["op", "verify", "op-1", "--public-key", &public]);
    assert_eq!(unsigned["valid"], false);

    let signed = run_json(&dir, &["op", "sign", "op-1", "--secret-key", &secret]);
    assert!(signed["signature"].is_string());

    let valid = run_json(&dir, &["op", "verify", "op-1", "--public-key", &public]);
    assert_eq!(valid["valid"], true);

    let other = run_json(&dir, &["key", "generate"]);
    let other_public = other["publicKey"].as_str().unwrap().to_string();
    let wrong = run_json(&dir, &["op", "verify", "op-1", "--public-key", &other_public]);
    assert_eq!(wrong["valid"], false);
}

#[test]
fn list_operations_filters_by_agent() {
    let dir = session();
    ok(&dir, &["op", "propose", "--agent", "coder-1", "--id", "op-1", "--file", "a"]);
    ok(&dir, &["op", "propose", "--agent", "coder-2", "--id", "op-2", "--file", "b"]);

    let all = run_json(&dir, &["op", "list"]);
    assert_eq!(all.as_array().unwrap().len(), 2);
    let mine = run_json(&dir, &["op", "list", "--agent", "coder-2"]);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["id"], "op-2");

    trellis()
        .args(["op", "show", "op-1"])
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicates::str::contains("Content: "));
}
