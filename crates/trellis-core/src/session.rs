//! Coordination session.
//!
//! [`Coordinator`] owns the registry, the operation graph and the enabled
//! flag behind a single lock. Every mutation runs as one write-locked unit
//! of work, so checking a proposal for conflicts and recording it can never
//! interleave with another proposal. Read-only queries share the lock.

use crate::config::CoordinationConfig;
use crate::conflict::{check_conflicts, Candidate, ConflictReport};
use crate::error::CoordError;
use crate::graph::{NewOperation, OperationGraph};
use crate::operation::{normalize_files, ActionType, Operation};
use crate::registry::{Agent, AgentRegistry, AgentRole};
use crate::reputation::{apply_outcome, AgentStats, Outcome};
use crate::signing::verify_signature;
use crate::sink::{OutcomeRecord, OutcomeSink};
use crate::snapshot::{SessionSnapshot, SNAPSHOT_VERSION};
use chrono::Utc;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct SessionState {
    enabled: bool,
    registry: AgentRegistry,
    graph: OperationGraph,
}

/// A request to record a new operation for an agent.
#[derive(Debug, Clone)]
pub struct ProposeOperation {
    pub agent_id: String,
    pub operation_id: String,
    pub files: BTreeSet<String>,
    /// Defaults to `edit`.
    pub action_type: Option<ActionType>,
    /// Defaults to the current frontier.
    pub parent_ids: Option<Vec<String>>,
}

impl ProposeOperation {
    pub fn new<I, S>(agent_id: impl Into<String>, operation_id: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            agent_id: agent_id.into(),
            operation_id: operation_id.into(),
            files: normalize_files(files),
            action_type: None,
            parent_ids: None,
        }
    }

    pub fn action(mut self, action_type: ActionType) -> Self {
        self.action_type = Some(action_type);
        self
    }

    pub fn parents<I, S>(mut self, parent_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parent_ids = Some(parent_ids.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisteredOperation {
    pub operation: Operation,
    pub conflicts: ConflictReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoordinationStats {
    pub total_agents: usize,
    pub total_operations: usize,
    /// Always equal to `total_operations`: one vertex per operation.
    pub dag_vertices: usize,
    pub in_flight: usize,
}

pub struct Coordinator {
    config: CoordinationConfig,
    state: RwLock<SessionState>,
    sink: Option<Arc<dyn OutcomeSink>>,
}

impl Coordinator {
    pub fn new(config: CoordinationConfig) -> Result<Self, CoordError> {
        config.validate()?;
        Ok(Self {
            config,
            state: RwLock::new(SessionState::default()),
            sink: None,
        })
    }

    /// Forward every recorded outcome to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn OutcomeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &CoordinationConfig {
        &self.config
    }

    pub fn enable(&self) {
        let mut state = self.state.write();
        if !state.enabled {
            state.enabled = true;
            info!("agent coordination enabled");
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    /// Drop all agents and operations and disable coordination.
    pub fn teardown(&self) {
        *self.state.write() = SessionState::default();
        info!("coordination session torn down");
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, SessionState>, CoordError> {
        let state = self.state.read();
        if state.enabled {
            Ok(state)
        } else {
            Err(CoordError::CoordinationDisabled)
        }
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, SessionState>, CoordError> {
        let state = self.state.write();
        if state.enabled {
            Ok(state)
        } else {
            Err(CoordError::CoordinationDisabled)
        }
    }

    // --- Agents ---

    pub fn register_agent(&self, id: &str, role: &str) -> Result<Agent, CoordError> {
        let mut state = self.write()?;
        let role: AgentRole = role.parse()?;
        let agent = state
            .registry
            .register(id, role, self.config.initial_reputation)?
            .clone();
        info!(agent_id = %agent.id, role = %agent.role, "agent registered");
        Ok(agent)
    }

    pub fn list_agents(&self) -> Result<Vec<Agent>, CoordError> {
        Ok(self.read()?.registry.list().to_vec())
    }

    pub fn get_agent(&self, id: &str) -> Result<Agent, CoordError> {
        self.read()?.registry.get(id).cloned()
    }

    pub fn deactivate_agent(&self, id: &str) -> Result<Agent, CoordError> {
        let mut state = self.write()?;
        let agent = state.registry.deactivate(id)?.clone();
        info!(agent_id = %agent.id, "agent deactivated");
        Ok(agent)
    }

    // --- Operations ---

    /// Check a proposal against everything in flight and record it, as one
    /// unit of work.
    ///
    /// Conflicts are reported, not enforced: the operation is recorded
    /// either way.
    pub fn register_agent_operation(
        &self,
        request: ProposeOperation,
    ) -> Result<RegisteredOperation, CoordError> {
        let mut state = self.write()?;
        let SessionState {
            registry, graph, ..
        } = &mut *state;

        let agent = registry.get(&request.agent_id)?;
        if !agent.active {
            return Err(CoordError::AgentInactive(agent.id.clone()));
        }
        if graph.contains(&request.operation_id) {
            return Err(CoordError::DuplicateOperation(request.operation_id));
        }

        let action_type = request.action_type.unwrap_or(ActionType::Edit);
        let now = Utc::now();
        let conflicts = check_conflicts(
            Candidate {
                action_type: &action_type,
                files: &request.files,
            },
            graph.in_flight(now, self.config.conflict_window),
        );

        let operation = graph
            .add_operation(
                agent,
                NewOperation {
                    id: request.operation_id,
                    action_type,
                    files: request.files,
                    parent_ids: request.parent_ids,
                },
                now,
            )?
            .clone();

        if conflicts.has_conflicts {
            warn!(
                agent_id = %operation.agent_id,
                operation_id = %operation.id,
                conflicts = conflicts.conflicts.len(),
                "operation registered with conflicts"
            );
        } else {
            info!(
                agent_id = %operation.agent_id,
                operation_id = %operation.id,
                action = %operation.action_type,
                "operation registered"
            );
        }
        Ok(RegisteredOperation {
            operation,
            conflicts,
        })
    }

    /// Check a prospective operation without recording anything.
    pub fn check_agent_conflicts<I, S>(
        &self,
        operation_id: &str,
        action_type: &ActionType,
        files: I,
    ) -> Result<ConflictReport, CoordError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let files = normalize_files(files);
        let state = self.read()?;
        let report = check_conflicts(
            Candidate {
                action_type,
                files: &files,
            },
            state.graph.in_flight(Utc::now(), self.config.conflict_window),
        );
        debug!(
            operation_id,
            action = %action_type,
            conflicts = report.conflicts.len(),
            "conflict check"
        );
        Ok(report)
    }

    pub fn get_operation(&self, id: &str) -> Result<Operation, CoordError> {
        self.read()?.graph.get(id).cloned()
    }

    /// Operations in insertion order, optionally only those of one agent.
    pub fn list_operations(&self, agent_id: Option<&str>) -> Result<Vec<Operation>, CoordError> {
        let state = self.read()?;
        let operations = match agent_id {
            Some(id) => {
                state.registry.get(id)?;
                state.graph.operations_by_agent(id).cloned().collect()
            }
            None => state.graph.iter().cloned().collect(),
        };
        Ok(operations)
    }

    pub fn ancestors_of(&self, id: &str) -> Result<Vec<String>, CoordError> {
        let state = self.read()?;
        let ancestors = state.graph.ancestors(id)?.map(str::to_string).collect();
        Ok(ancestors)
    }

    /// Record how an operation ended and fold it into the agent's
    /// reputation.
    pub fn record_outcome(
        &self,
        agent_id: &str,
        operation_id: &str,
        outcome: Outcome,
    ) -> Result<AgentStats, CoordError> {
        let (stats, record) = {
            let mut state = self.write()?;
            let SessionState {
                registry, graph, ..
            } = &mut *state;

            registry.get(agent_id)?;
            let owner = &graph.get(operation_id)?.agent_id;
            if owner != agent_id {
                return Err(CoordError::AgentMismatch {
                    operation: operation_id.to_string(),
                    owner: owner.clone(),
                    agent: agent_id.to_string(),
                });
            }
            let operation = graph.mark_status(operation_id, outcome.status())?;
            let agent = registry.get_mut(agent_id)?;
            apply_outcome(agent, outcome, self.config.reputation_alpha);

            let record = OutcomeRecord {
                agent_id: agent.id.clone(),
                operation_id: operation.id.clone(),
                action_type: operation.action_type.clone(),
                files: operation.files.iter().cloned().collect(),
                outcome,
                reputation: agent.reputation,
                recorded_at: Utc::now(),
            };
            let in_flight = graph
                .in_flight(record.recorded_at, self.config.conflict_window)
                .filter(|op| op.agent_id == agent_id)
                .count();
            (AgentStats::from_agent(agent, in_flight), record)
        };

        info!(
            agent_id,
            operation_id,
            outcome = %outcome,
            reputation = stats.reputation,
            "outcome recorded"
        );
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.record(&record) {
                warn!(agent_id, operation_id, error = %e, "outcome sink rejected record");
            }
        }
        Ok(stats)
    }

    /// Record an outcome for whichever agent owns the operation.
    pub fn resolve_operation(
        &self,
        operation_id: &str,
        outcome: Outcome,
    ) -> Result<AgentStats, CoordError> {
        let agent_id = self.get_operation(operation_id)?.agent_id;
        self.record_outcome(&agent_id, operation_id, outcome)
    }

    pub fn commit_operation(&self, operation_id: &str) -> Result<AgentStats, CoordError> {
        self.resolve_operation(operation_id, Outcome::Committed)
    }

    pub fn abort_operation(&self, operation_id: &str) -> Result<AgentStats, CoordError> {
        self.resolve_operation(operation_id, Outcome::Aborted)
    }

    // --- Signatures ---

    pub fn attach_signature(
        &self,
        operation_id: &str,
        signature: Vec<u8>,
    ) -> Result<Operation, CoordError> {
        let mut state = self.write()?;
        let operation = state.graph.set_signature(operation_id, signature)?.clone();
        debug!(operation_id, "signature attached");
        Ok(operation)
    }

    /// Whether the operation carries a valid signature by `public_key`.
    pub fn verify_operation(&self, operation_id: &str, public_key: &[u8]) -> Result<bool, CoordError> {
        let state = self.read()?;
        let operation = state.graph.get(operation_id)?;
        let Some(signature) = &operation.signature else {
            return Ok(false);
        };
        Ok(verify_signature(
            &operation.signing_payload()?,
            signature,
            public_key,
        ))
    }

    // --- Statistics ---

    pub fn get_coordination_stats(&self) -> Result<CoordinationStats, CoordError> {
        let state = self.read()?;
        let total_operations = state.graph.len();
        Ok(CoordinationStats {
            total_agents: state.registry.len(),
            total_operations,
            dag_vertices: total_operations,
            in_flight: state
                .graph
                .in_flight(Utc::now(), self.config.conflict_window)
                .count(),
        })
    }

    pub fn get_agent_stats(&self, agent_id: &str) -> Result<AgentStats, CoordError> {
        let state = self.read()?;
        let agent = state.registry.get(agent_id)?;
        let in_flight = state
            .graph
            .in_flight(Utc::now(), self.config.conflict_window)
            .filter(|op| op.agent_id == agent_id)
            .count();
        Ok(AgentStats::from_agent(agent, in_flight))
    }

    // --- Snapshots ---

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.read();
        SessionSnapshot {
            version: SNAPSHOT_VERSION,
            enabled: state.enabled,
            agents: state.registry.list().to_vec(),
            operations: state.graph.iter().cloned().collect(),
        }
    }

    /// Rebuild a session from a snapshot, re-validating every invariant.
    pub fn restore(
        snapshot: SessionSnapshot,
        config: CoordinationConfig,
    ) -> Result<Self, CoordError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(CoordError::InvalidConfig(format!(
                "unsupported snapshot version {}",
                snapshot.version
            )));
        }
        let coordinator = Self::new(config)?;
        {
            let mut state = coordinator.state.write();
            state.enabled = snapshot.enabled;
            for agent in snapshot.agents {
                state.registry.restore(agent)?;
            }
            for operation in snapshot.operations {
                state.registry.get(&operation.agent_id)?;
                state.graph.restore(operation)?;
            }
            debug!(
                agents = state.registry.len(),
                operations = state.graph.len(),
                "session restored"
            );
        }
        Ok(coordinator)
    }
}
