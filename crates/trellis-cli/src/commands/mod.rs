pub mod agent;
pub mod init;
pub mod key;
pub mod op;
pub mod outcomes;
pub mod stats;

use anyhow::{Context, Result};
use serde::Serialize;
use std::env;
use tracing::debug;
use trellis_store::Workspace;

pub(crate) fn workspace() -> Result<Workspace> {
    let cwd = env::current_dir()?;
    let ws = Workspace::discover(&cwd).context("not a Trellis workspace")?;
    debug!(root = %ws.root().display(), "using workspace");
    Ok(ws)
}

pub(crate) fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
