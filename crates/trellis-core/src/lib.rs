//! Coordination engine for concurrent agents proposing file operations
//! against a shared workspace.

pub mod config;
pub mod conflict;
pub mod error;
pub mod graph;
pub mod hash;
pub mod operation;
pub mod registry;
pub mod reputation;
pub mod serialize;
pub mod session;
pub mod signing;
pub mod sink;
pub mod snapshot;

pub use config::CoordinationConfig;
pub use conflict::{ConflictEntry, ConflictReport};
pub use error::CoordError;
pub use operation::{ActionType, Operation, OperationStatus};
pub use registry::{Agent, AgentRole};
pub use reputation::{AgentStats, Outcome};
pub use session::{CoordinationStats, Coordinator, RegisteredOperation};
pub use signing::SigningKeypair;
