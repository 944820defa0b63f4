//! Outbound port for recorded outcomes.
//!
//! The engine only writes to it. Whatever sits behind (a learning store, a
//! journal file) is outside the engine.

use crate::operation::ActionType;
use crate::reputation::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutcomeRecord {
    pub agent_id: String,
    pub operation_id: String,
    pub action_type: ActionType,
    pub files: Vec<String>,
    pub outcome: Outcome,
    /// Agent reputation after the outcome was applied.
    pub reputation: f64,
    pub recorded_at: DateTime<Utc>,
}

pub trait OutcomeSink: Send + Sync {
    fn record(&self, record: &OutcomeRecord) -> Result<(), Box<dyn Error + Send + Sync>>;
}
