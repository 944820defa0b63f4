//! On-disk home for a coordination session: `.trellis/` with the config,
//! the current session snapshot and the outcome journal.

pub mod error;
pub mod journal;
pub mod lockfile;
pub mod workspace;

pub use error::StoreError;
pub use journal::OutcomeJournal;
pub use workspace::{SessionGuard, Workspace};
