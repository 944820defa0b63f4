use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordError {
    #[error("coordination is not enabled")]
    CoordinationDisabled,

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("invalid agent id: {0:?}")]
    InvalidAgentId(String),

    #[error("invalid role '{0}' (expected coder, reviewer, tester, architect or coordinator)")]
    InvalidRole(String),

    #[error("agent {0} is inactive")]
    AgentInactive(String),

    #[error("operation {operation} belongs to agent {owner}, not {agent}")]
    AgentMismatch {
        operation: String,
        owner: String,
        agent: String,
    },

    #[error("invalid action type: {0:?}")]
    InvalidAction(String),

    #[error("operation already exists: {0}")]
    DuplicateOperation(String),

    #[error("operation not found: {0}")]
    OperationNotFound(String),

    #[error("operation {operation} cannot depend on {parent}: parent was not created earlier")]
    CyclicDependency { operation: String, parent: String },

    #[error("invalid status transition for {operation}: {from} -> {to}")]
    InvalidTransition {
        operation: String,
        from: String,
        to: String,
    },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
