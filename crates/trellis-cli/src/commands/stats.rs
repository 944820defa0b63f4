use super::{print_json, workspace};
use anyhow::Result;

pub fn run(json: bool) -> Result<()> {
    let stats = workspace()?.load()?.get_coordination_stats()?;
    if json {
        return print_json(&stats);
    }
    println!("Total agents:     {}", stats.total_agents);
    println!("Total operations: {}", stats.total_operations);
    println!("DAG vertices:     {}", stats.dag_vertices);
    println!("In flight:        {}", stats.in_flight);
    Ok(())
}
