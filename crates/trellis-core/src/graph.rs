//! Operation graph.
//!
//! An append-only arena of operations. Parent links are stored as ids and
//! every vertex carries the logical clock tick it was inserted at; a parent
//! must always carry a strictly smaller tick, which keeps the graph acyclic
//! without ever walking it.

use crate::error::CoordError;
use crate::operation::{ActionType, Operation, OperationStatus};
use crate::registry::Agent;
use chrono::{DateTime, Duration as TimeDelta, Utc};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::time::Duration;

/// Input for [`OperationGraph::add_operation`].
#[derive(Debug, Clone)]
pub struct NewOperation {
    pub id: String,
    pub action_type: ActionType,
    pub files: BTreeSet<String>,
    /// Explicit parents; `None` builds on the current frontier.
    pub parent_ids: Option<Vec<String>>,
}

#[derive(Debug, Default)]
pub struct OperationGraph {
    operations: Vec<Operation>,
    index: HashMap<String, usize>,
    frontier: Vec<String>,
    clock: u64,
}

impl OperationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Insert a new `proposed` vertex for `agent`.
    pub fn add_operation(
        &mut self,
        agent: &Agent,
        new: NewOperation,
        now: DateTime<Utc>,
    ) -> Result<&Operation, CoordError> {
        if self.index.contains_key(&new.id) {
            return Err(CoordError::DuplicateOperation(new.id));
        }
        let sequence = self.clock + 1;
        let parent_ids = match new.parent_ids {
            Some(parents) => dedup(parents),
            None => self.frontier.clone(),
        };
        for parent in &parent_ids {
            self.check_parent(&new.id, parent, sequence)?;
        }

        let operation = Operation {
            id: new.id,
            agent_id: agent.id.clone(),
            action_type: new.action_type,
            files: new.files,
            parent_ids,
            status: OperationStatus::Proposed,
            created_at: now,
            sequence,
            signature: None,
        };
        self.clock = sequence;
        Ok(self.push(operation))
    }

    fn check_parent(&self, id: &str, parent: &str, sequence: u64) -> Result<(), CoordError> {
        let earlier = parent != id
            && self
                .index
                .get(parent)
                .is_some_and(|&slot| self.operations[slot].sequence < sequence);
        if earlier {
            Ok(())
        } else {
            Err(CoordError::CyclicDependency {
                operation: id.to_string(),
                parent: parent.to_string(),
            })
        }
    }

    fn push(&mut self, operation: Operation) -> &Operation {
        self.frontier.retain(|tip| !operation.parent_ids.contains(tip));
        self.frontier.push(operation.id.clone());
        self.index.insert(operation.id.clone(), self.operations.len());
        self.operations.push(operation);
        &self.operations[self.operations.len() - 1]
    }

    pub fn get(&self, id: &str) -> Result<&Operation, CoordError> {
        self.index
            .get(id)
            .map(|&slot| &self.operations[slot])
            .ok_or_else(|| CoordError::OperationNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Operation, CoordError> {
        match self.index.get(id) {
            Some(&slot) => Ok(&mut self.operations[slot]),
            None => Err(CoordError::OperationNotFound(id.to_string())),
        }
    }

    /// Move an operation to `status`. Terminal operations never move again.
    pub fn mark_status(
        &mut self,
        id: &str,
        status: OperationStatus,
    ) -> Result<&Operation, CoordError> {
        let operation = self.get_mut(id)?;
        if operation.status.is_terminal() {
            return Err(CoordError::InvalidTransition {
                operation: id.to_string(),
                from: operation.status.to_string(),
                to: status.to_string(),
            });
        }
        operation.status = status;
        Ok(&*operation)
    }

    pub fn set_signature(&mut self, id: &str, signature: Vec<u8>) -> Result<&Operation, CoordError> {
        let operation = self.get_mut(id)?;
        operation.signature = Some(signature);
        Ok(&*operation)
    }

    /// Walk every ancestor of `id`, breadth-first, each exactly once.
    pub fn ancestors(&self, id: &str) -> Result<Ancestors<'_>, CoordError> {
        let start = self.get(id)?;
        Ok(Ancestors::new(self, start))
    }

    /// Operations with no children, oldest first.
    pub fn frontier(&self) -> &[String] {
        &self.frontier
    }

    /// All operations in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn operations_by_agent<'a>(
        &'a self,
        agent_id: &'a str,
    ) -> impl Iterator<Item = &'a Operation> + 'a {
        self.operations.iter().filter(move |op| op.agent_id == agent_id)
    }

    /// Operations still competing for their files at `now`.
    ///
    /// A proposed operation drops out once its age reaches `window`.
    pub fn in_flight(
        &self,
        now: DateTime<Utc>,
        window: Option<Duration>,
    ) -> impl Iterator<Item = &Operation> + '_ {
        let window = window.map(|w| TimeDelta::from_std(w).unwrap_or(TimeDelta::MAX));
        self.operations.iter().filter(move |op| {
            op.status.is_open()
                && window.map_or(true, |w| now.signed_duration_since(op.created_at) < w)
        })
    }

    /// Re-insert a serialized operation, re-checking every invariant.
    pub(crate) fn restore(&mut self, operation: Operation) -> Result<(), CoordError> {
        if self.index.contains_key(&operation.id) {
            return Err(CoordError::DuplicateOperation(operation.id));
        }
        if operation.sequence <= self.clock {
            return Err(CoordError::InvalidConfig(format!(
                "operation {} is out of clock order",
                operation.id
            )));
        }
        for parent in &operation.parent_ids {
            self.check_parent(&operation.id, parent, operation.sequence)?;
        }
        self.clock = operation.sequence;
        self.push(operation);
        Ok(())
    }
}

fn dedup(ids: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Lazy breadth-first walk over `parent_ids` links.
pub struct Ancestors<'a> {
    graph: &'a OperationGraph,
    queue: VecDeque<&'a str>,
    visited: HashSet<&'a str>,
}

impl<'a> Ancestors<'a> {
    fn new(graph: &'a OperationGraph, start: &'a Operation) -> Self {
        let mut walker = Self {
            graph,
            queue: VecDeque::new(),
            visited: HashSet::new(),
        };
        walker.visited.insert(start.id.as_str());
        walker.enqueue_parents(start);
        walker
    }

    fn enqueue_parents(&mut self, op: &'a Operation) {
        for parent in &op.parent_ids {
            if self.visited.insert(parent.as_str()) {
                self.queue.push_back(parent.as_str());
            }
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.queue.pop_front()?;
        // Parents are validated on insertion, so the lookup cannot miss.
        if let Ok(op) = self.graph.get(id) {
            self.enqueue_parents(op);
        }
        Some(id)
    }
}
