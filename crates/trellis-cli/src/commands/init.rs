use anyhow::{Context, Result};
use std::env;
use std::time::Duration;
use trellis_core::CoordinationConfig;
use trellis_store::Workspace;

pub fn run(conflict_window: Option<u64>) -> Result<()> {
    let cwd = env::current_dir()?;
    let mut config = CoordinationConfig::default();
    if let Some(secs) = conflict_window {
        config = config.with_conflict_window(Duration::from_secs(secs));
    }
    let ws = Workspace::init(&cwd, config).context("failed to initialize workspace")?;
    println!(
        "Initialized Trellis workspace in {}",
        ws.root().join(".trellis").display()
    );
    Ok(())
}

pub fn enable() -> Result<()> {
    let ws = super::workspace()?;
    let guard = ws.lock_session()?;
    guard.coordinator().enable();
    guard.commit()?;
    println!("Agent coordination enabled");
    Ok(())
}
