//! Agent registry.
//!
//! Agents are kept in first-registration order so listings are stable.
//! Re-registering an id updates the existing record in place.

use crate::error::CoordError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Coder,
    Reviewer,
    Tester,
    Architect,
    Coordinator,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coder => "coder",
            Self::Reviewer => "reviewer",
            Self::Tester => "tester",
            Self::Architect => "architect",
            Self::Coordinator => "coordinator",
        }
    }
}

impl FromStr for AgentRole {
    type Err = CoordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "coder" => Ok(Self::Coder),
            "reviewer" => Ok(Self::Reviewer),
            "tester" => Ok(Self::Tester),
            "architect" => Ok(Self::Architect),
            "coordinator" => Ok(Self::Coordinator),
            _ => Err(CoordError::InvalidRole(s.to_string())),
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-outcome tallies for an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub committed: u64,
    pub conflicted: u64,
    pub aborted: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Agent {
    pub id: String,
    pub role: AgentRole,
    pub registered_at: DateTime<Utc>,
    pub reputation: f64,
    pub operations_count: u64,
    pub active: bool,
    #[serde(default)]
    pub outcomes: OutcomeCounts,
}

#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: Vec<Agent>,
    index: HashMap<String, usize>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new agent or update the role of an existing one.
    ///
    /// Updating reactivates the agent but leaves its history alone.
    pub fn register(
        &mut self,
        id: &str,
        role: AgentRole,
        initial_reputation: f64,
    ) -> Result<&Agent, CoordError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(CoordError::InvalidAgentId(id.to_string()));
        }
        let slot = match self.index.get(id) {
            Some(&slot) => {
                let agent = &mut self.agents[slot];
                agent.role = role;
                agent.active = true;
                slot
            }
            None => {
                self.agents.push(Agent {
                    id: id.to_string(),
                    role,
                    registered_at: Utc::now(),
                    reputation: initial_reputation,
                    operations_count: 0,
                    active: true,
                    outcomes: OutcomeCounts::default(),
                });
                let slot = self.agents.len() - 1;
                self.index.insert(id.to_string(), slot);
                slot
            }
        };
        Ok(&self.agents[slot])
    }

    pub fn get(&self, id: &str) -> Result<&Agent, CoordError> {
        self.index
            .get(id)
            .map(|&slot| &self.agents[slot])
            .ok_or_else(|| CoordError::AgentNotFound(id.to_string()))
    }

    pub fn get_mut(&mut self, id: &str) -> Result<&mut Agent, CoordError> {
        match self.index.get(id) {
            Some(&slot) => Ok(&mut self.agents[slot]),
            None => Err(CoordError::AgentNotFound(id.to_string())),
        }
    }

    pub fn deactivate(&mut self, id: &str) -> Result<&Agent, CoordError> {
        let agent = self.get_mut(id)?;
        agent.active = false;
        Ok(agent)
    }

    pub fn list(&self) -> &[Agent] {
        &self.agents
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Re-insert a previously serialized agent as is.
    pub(crate) fn restore(&mut self, agent: Agent) -> Result<(), CoordError> {
        if agent.id.trim().is_empty() {
            return Err(CoordError::InvalidAgentId(agent.id));
        }
        if self.index.contains_key(&agent.id) {
            return Err(CoordError::InvalidConfig(format!(
                "snapshot lists agent {} twice",
                agent.id
            )));
        }
        self.index.insert(agent.id.clone(), self.agents.len());
        self.agents.push(agent);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_is_case_insensitive() {
        assert_eq!("Coder".parse::<AgentRole>().unwrap(), AgentRole::Coder);
        assert_eq!(" tester ".parse::<AgentRole>().unwrap(), AgentRole::Tester);
        assert!(matches!(
            "janitor".parse::<AgentRole>(),
            Err(CoordError::InvalidRole(_))
        ));
    }

    #[test]
    fn register_starts_at_prior() {
        let mut reg = AgentRegistry::new();
        let agent = reg.register("coder-1", AgentRole::Coder, 0.5).unwrap();
        assert_eq!(agent.reputation, 0.5);
        assert_eq!(agent.operations_count, 0);
        assert!(agent.active);
    }

    #[test]
    fn reregister_updates_in_place() {
        let mut reg = AgentRegistry::new();
        reg.register("a", AgentRole::Coder, 0.5).unwrap();
        reg.get_mut("a").unwrap().reputation = 0.9;
        reg.deactivate("a").unwrap();

        let agent = reg.register("a", AgentRole::Reviewer, 0.5).unwrap();
        assert_eq!(agent.role, AgentRole::Reviewer);
        assert_eq!(agent.reputation, 0.9);
        assert!(agent.active);
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn list_keeps_registration_order() {
        let mut reg = AgentRegistry::new();
        for id in ["coder-2", "coder-1", "reviewer-1", "tester-1"] {
            reg.register(id, AgentRole::Coder, 0.5).unwrap();
        }
        reg.register("coder-2", AgentRole::Tester, 0.5).unwrap();
        let ids: Vec<_> = reg.list().iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["coder-2", "coder-1", "reviewer-1", "tester-1"]);
    }

    #[test]
    fn unknown_agent() {
        let reg = AgentRegistry::new();
        assert!(matches!(reg.get("ghost"), Err(CoordError::AgentNotFound(_))));
    }

    #[test]
    fn empty_id_rejected() {
        let mut reg = AgentRegistry::new();
        assert!(matches!(
            reg.register("  ", AgentRole::Coder, 0.5),
            Err(CoordError::InvalidAgentId(_))
        ));
    }
}
