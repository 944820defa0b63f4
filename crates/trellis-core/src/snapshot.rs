use crate::operation::Operation;
use crate::registry::Agent;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable image of a coordination session.
///
/// Agents are listed in registration order and operations in clock order,
/// which is also the order they must be restored in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub version: u32,
    pub enabled: bool,
    #[serde(default)]
    pub agents: Vec<Agent>,
    #[serde(default)]
    pub operations: Vec<Operation>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            enabled: false,
            agents: Vec::new(),
            operations: Vec::new(),
        }
    }
}
