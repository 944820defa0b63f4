use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Coord(#[from] trellis_core::CoordError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("workspace not found (searched upward from {0})")]
    WorkspaceNotFound(String),

    #[error("workspace already exists at {0}")]
    WorkspaceExists(String),

    #[error("session is locked by another process: {0}")]
    LockConflict(String),

    #[error("unsupported {what} version {found}")]
    UnsupportedVersion { what: &'static str, found: u32 },
}
