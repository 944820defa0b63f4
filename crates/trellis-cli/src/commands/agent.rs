use super::{print_json, workspace};
use anyhow::{Context, Result};

pub fn register(id: String, role: String, json: bool) -> Result<()> {
    let ws = workspace()?;
    let guard = ws.lock_session()?;
    let agent = guard
        .coordinator()
        .register_agent(&id, &role)
        .context("failed to register agent")?;
    guard.commit()?;

    if json {
        print_json(&agent)
    } else {
        println!("Registered agent {} ({})", agent.id, agent.role);
        Ok(())
    }
}

pub fn list(json: bool) -> Result<()> {
    let agents = workspace()?.load()?.list_agents()?;
    if json {
        return print_json(&agents);
    }
    if agents.is_empty() {
        println!("No agents registered");
    }
    for agent in agents {
        println!(
            "{:<20} {:<12} ops={:<4} reputation={:.3}{}",
            agent.id,
            agent.role,
            agent.operations_count,
            agent.reputation,
            if agent.active { "" } else { " (inactive)" }
        );
    }
    Ok(())
}

pub fn stats(id: String, json: bool) -> Result<()> {
    let stats = workspace()?.load()?.get_agent_stats(&id)?;
    if json {
        return print_json(&stats);
    }
    println!("Agent:       {} ({})", stats.agent_id, stats.role);
    println!("Operations:  {}", stats.operations_count);
    println!("In flight:   {}", stats.in_flight);
    println!("Reputation:  {:.3}", stats.reputation);
    println!(
        "Outcomes:    {} committed, {} conflicted, {} aborted",
        stats.committed, stats.conflicted, stats.aborted
    );
    Ok(())
}

pub fn deactivate(id: String, json: bool) -> Result<()> {
    let ws = workspace()?;
    let guard = ws.lock_session()?;
    let agent = guard.coordinator().deactivate_agent(&id)?;
    guard.commit()?;
    if json {
        print_json(&agent)
    } else {
        println!("Deactivated agent {}", agent.id);
        Ok(())
    }
}
