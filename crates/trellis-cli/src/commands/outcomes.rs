use super::{print_json, workspace};
use anyhow::Result;

pub fn run(agent: Option<String>, json: bool) -> Result<()> {
    let journal = workspace()?.journal();
    let records = match agent {
        Some(ref id) => journal.for_agent(id)?,
        None => journal.read_all()?,
    };
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No outcomes recorded");
    }
    for r in records {
        println!(
            "{} {:<12} {:<16} {:<10} reputation={:.3}",
            r.recorded_at.format("%Y-%m-%d %H:%M:%S"),
            r.agent_id,
            r.operation_id,
            r.outcome,
            r.reputation
        );
    }
    Ok(())
}
