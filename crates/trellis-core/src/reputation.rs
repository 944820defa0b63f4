//! Reputation tracking.
//!
//! Reputation is a bounded exponential moving average of outcome scores,
//! so a single recent success or failure cannot swing it to an extreme.

use crate::operation::OperationStatus;
use crate::registry::{Agent, AgentRole};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Committed,
    Conflicted,
    Aborted,
}

impl Outcome {
    pub fn score(&self) -> f64 {
        match self {
            Self::Committed => 1.0,
            Self::Conflicted => 0.3,
            Self::Aborted => 0.0,
        }
    }

    /// The status an operation moves to when this outcome is recorded.
    pub fn status(&self) -> OperationStatus {
        match self {
            Self::Committed => OperationStatus::Committed,
            Self::Conflicted => OperationStatus::Conflicted,
            Self::Aborted => OperationStatus::Aborted,
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.status().as_str()
    }
}

impl FromStr for Outcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "committed" | "commit" => Ok(Self::Committed),
            "conflicted" | "conflict" => Ok(Self::Conflicted),
            "aborted" | "abort" => Ok(Self::Aborted),
            other => Err(format!("unknown outcome '{}'", other)),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// `clamp(current * (1 - alpha) + score * alpha, 0, 1)`
pub fn smoothed(current: f64, outcome: Outcome, alpha: f64) -> f64 {
    (current * (1.0 - alpha) + outcome.score() * alpha).clamp(0.0, 1.0)
}

/// Fold one outcome into the agent's record.
pub fn apply_outcome(agent: &mut Agent, outcome: Outcome, alpha: f64) {
    agent.operations_count += 1;
    match outcome {
        Outcome::Committed => agent.outcomes.committed += 1,
        Outcome::Conflicted => agent.outcomes.conflicted += 1,
        Outcome::Aborted => agent.outcomes.aborted += 1,
    }
    agent.reputation = smoothed(agent.reputation, outcome, alpha);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStats {
    pub agent_id: String,
    pub role: AgentRole,
    pub active: bool,
    pub operations_count: u64,
    pub reputation: f64,
    pub in_flight: usize,
    pub committed: u64,
    pub conflicted: u64,
    pub aborted: u64,
}

impl AgentStats {
    pub fn from_agent(agent: &Agent, in_flight: usize) -> Self {
        Self {
            agent_id: agent.id.clone(),
            role: agent.role,
            active: agent.active,
            operations_count: agent.operations_count,
            reputation: agent.reputation,
            in_flight,
            committed: agent.outcomes.committed,
            conflicted: agent.outcomes.conflicted,
            aborted: agent.outcomes.aborted,
        }
    }
}
