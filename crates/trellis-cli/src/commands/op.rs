use super::{print_json, workspace};
use anyhow::{anyhow, Context, Result};
use serde_json::json;
use trellis_core::session::ProposeOperation;
use trellis_core::signing::{decode_hex, sign_message};
use trellis_core::{ActionType, ConflictReport, Outcome};

fn print_conflicts(report: &ConflictReport) {
    if !report.has_conflicts {
        println!("No conflicts");
        return;
    }
    println!("Conflicts: {}", report.conflicts.len());
    for c in &report.conflicts {
        println!(
            "  {} ({}, {}): {}",
            c.operation_id,
            c.agent_id,
            c.action_type,
            c.overlapping_files.join(", ")
        );
    }
}

pub fn propose(
    agent: String,
    id: String,
    files: Vec<String>,
    action: String,
    parents: Vec<String>,
    json: bool,
) -> Result<()> {
    let action: ActionType = action.parse()?;
    let mut request = ProposeOperation::new(agent, id, files).action(action);
    if !parents.is_empty() {
        request = request.parents(parents);
    }

    let ws = workspace()?;
    let guard = ws.lock_session()?;
    let registered = guard
        .coordinator()
        .register_agent_operation(request)
        .context("failed to register operation")?;
    guard.commit()?;

    if json {
        return print_json(&registered);
    }
    let op = &registered.operation;
    println!(
        "Registered operation {} ({}) by {} [{}]",
        op.id, op.action_type, op.agent_id, op.status
    );
    print_conflicts(&registered.conflicts);
    Ok(())
}

pub fn check(id: String, action: String, files: Vec<String>, json: bool) -> Result<()> {
    let action: ActionType = action.parse()?;
    let report = workspace()?
        .load()?
        .check_agent_conflicts(&id, &action, &files)
        .context("failed to check conflicts")?;
    if json {
        return print_json(&report);
    }
    print_conflicts(&report);
    Ok(())
}

pub fn resolve(id: String, outcome: &str, json: bool) -> Result<()> {
    let outcome: Outcome = outcome.parse().map_err(|e: String| anyhow!(e))?;
    let ws = workspace()?;
    let guard = ws.lock_session()?;
    let stats = guard
        .coordinator()
        .resolve_operation(&id, outcome)
        .with_context(|| format!("failed to mark {} {}", id, outcome))?;
    guard.commit()?;

    if json {
        return print_json(&stats);
    }
    println!(
        "Operation {} {}; {} reputation is now {:.3}",
        id, outcome, stats.agent_id, stats.reputation
    );
    Ok(())
}

pub fn show(id: String, json: bool) -> Result<()> {
    let op = workspace()?.load()?.get_operation(&id)?;
    if json {
        return print_json(&op);
    }
    println!("operation {}", op.id);
    println!("Content: {}", op.content_id()?.hex());
    println!("Agent:   {}", op.agent_id);
    println!("Action:  {}", op.action_type);
    println!("Status:  {}", op.status);
    println!("Date:    {}", op.created_at.format("%Y-%m-%d %H:%M:%S %Z"));
    println!("Seq:     {}", op.sequence);
    if !op.parent_ids.is_empty() {
        println!("Parents: {}", op.parent_ids.join(", "));
    }
    for file in &op.files {
        println!("    {}", file);
    }
    if let Some(sig) = &op.signature {
        println!("Signature: {}", hex::encode(sig));
    }
    Ok(())
}

pub fn list(agent: Option<String>, json: bool) -> Result<()> {
    let operations = workspace()?.load()?.list_operations(agent.as_deref())?;
    if json {
        return print_json(&operations);
    }
    if operations.is_empty() {
        println!("No operations");
    }
    for op in operations {
        println!(
            "{:<16} {:<12} {:<8} {:<10} {}",
            op.id,
            op.agent_id,
            op.action_type,
            op.status,
            op.files.iter().cloned().collect::<Vec<_>>().join(", ")
        );
    }
    Ok(())
}

pub fn ancestors(id: String, json: bool) -> Result<()> {
    let ancestors = workspace()?.load()?.ancestors_of(&id)?;
    if json {
        return print_json(&ancestors);
    }
    if ancestors.is_empty() {
        println!("{} has no ancestors", id);
    }
    for ancestor in ancestors {
        println!("{}", ancestor);
    }
    Ok(())
}

pub fn sign(id: String, secret_key: String, json: bool) -> Result<()> {
    let secret_key = decode_hex("secret key", &secret_key)?;
    let ws = workspace()?;
    let guard = ws.lock_session()?;
    let coord = guard.coordinator();
    let payload = coord.get_operation(&id)?.signing_payload()?;
    let signature = sign_message(&payload, &secret_key)?;
    let op = coord.attach_signature(&id, signature.clone())?;
    guard.commit()?;

    if json {
        return print_json(&op);
    }
    println!("Signed {}: {}", op.id, hex::encode(signature));
    Ok(())
}

pub fn verify(id: String, public_key: String, json: bool) -> Result<()> {
    let public_key = decode_hex("public key", &public_key)?;
    let valid = workspace()?.load()?.verify_operation(&id, &public_key)?;
    if json {
        return print_json(&json!({ "operationId": id, "valid": valid }));
    }
    println!("{}", if valid { "valid" } else { "invalid" });
    Ok(())
}
