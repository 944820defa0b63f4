use crate::error::StoreError;
use crate::journal::OutcomeJournal;
use crate::lockfile::Lockfile;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use trellis_core::sink::{OutcomeRecord, OutcomeSink};
use trellis_core::snapshot::SessionSnapshot;
use trellis_core::{CoordinationConfig, Coordinator};

const TRELLIS_DIR: &str = ".trellis";
const CONFIG_FILE: &str = "config.json";
const SESSION_FILE: &str = "session.json";
const JOURNAL_FILE: &str = "outcomes.jsonl";
const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceConfig {
    version: u32,
    created_at: DateTime<Utc>,
    #[serde(default)]
    coordination: CoordinationConfig,
}

/// A directory holding a `.trellis/` session.
///
/// Layout:
/// - `config.json`: format version and [`CoordinationConfig`]
/// - `session.json`: the latest [`SessionSnapshot`]
/// - `outcomes.jsonl`: the [`OutcomeJournal`]
pub struct Workspace {
    root: PathBuf,
    dir: PathBuf,
}

impl Workspace {
    /// Create `.trellis/` under `path` with a fresh, disabled session.
    pub fn init(path: impl AsRef<Path>, config: CoordinationConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let root = path.as_ref().to_path_buf();
        let dir = root.join(TRELLIS_DIR);
        if dir.exists() {
            return Err(StoreError::WorkspaceExists(dir.display().to_string()));
        }
        fs::create_dir_all(&dir)?;

        let workspace = Self { root, dir };
        let file = WorkspaceConfig {
            version: CONFIG_VERSION,
            created_at: Utc::now(),
            coordination: config,
        };
        fs::write(
            workspace.dir.join(CONFIG_FILE),
            serde_json::to_string_pretty(&file)?,
        )?;
        fs::write(
            workspace.session_path(),
            serde_json::to_string_pretty(&SessionSnapshot::default())?,
        )?;
        debug!(path = %workspace.dir.display(), "workspace initialized");
        Ok(workspace)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        let dir = root.join(TRELLIS_DIR);
        if !dir.is_dir() {
            return Err(StoreError::WorkspaceNotFound(root.display().to_string()));
        }
        Ok(Self { root, dir })
    }

    /// Search upward from `start` for a `.trellis/` directory.
    pub fn discover(start: impl AsRef<Path>) -> Result<Self, StoreError> {
        let mut current = start.as_ref().to_path_buf();
        loop {
            if current.join(TRELLIS_DIR).is_dir() {
                return Self::open(&current);
            }
            if !current.pop() {
                return Err(StoreError::WorkspaceNotFound(
                    start.as_ref().display().to_string(),
                ));
            }
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    pub fn config(&self) -> Result<CoordinationConfig, StoreError> {
        let data = fs::read_to_string(self.dir.join(CONFIG_FILE))?;
        let file: WorkspaceConfig = serde_json::from_str(&data)?;
        if file.version != CONFIG_VERSION {
            return Err(StoreError::UnsupportedVersion {
                what: "config",
                found: file.version,
            });
        }
        file.coordination.validate()?;
        Ok(file.coordination)
    }

    pub fn journal(&self) -> OutcomeJournal {
        OutcomeJournal::new(self.dir.join(JOURNAL_FILE))
    }

    fn read_snapshot(&self) -> Result<SessionSnapshot, StoreError> {
        let data = fs::read_to_string(self.session_path())?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Load the session for reading. Changes made to it are not saved, and
    /// outcomes recorded on it never reach the journal.
    pub fn load(&self) -> Result<Coordinator, StoreError> {
        Ok(Coordinator::restore(self.read_snapshot()?, self.config()?)?)
    }

    /// Load the session for a change.
    ///
    /// The session file stays locked until the guard is committed or
    /// dropped, so concurrent processes take turns.
    pub fn lock_session(&self) -> Result<SessionGuard, StoreError> {
        let lock = Lockfile::acquire(self.session_path())?;
        let pending = Arc::new(PendingOutcomes::default());
        let coordinator = Coordinator::restore(self.read_snapshot()?, self.config()?)?
            .with_sink(pending.clone());
        Ok(SessionGuard {
            lock,
            coordinator,
            pending,
            journal: self.journal(),
        })
    }
}

/// Outcomes recorded under a [`SessionGuard`], held until the session is
/// saved.
#[derive(Default)]
struct PendingOutcomes {
    records: Mutex<Vec<OutcomeRecord>>,
}

impl OutcomeSink for PendingOutcomes {
    fn record(&self, record: &OutcomeRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// A locked, loaded session.
pub struct SessionGuard {
    lock: Lockfile,
    coordinator: Coordinator,
    pending: Arc<PendingOutcomes>,
    journal: OutcomeJournal,
}

impl SessionGuard {
    pub fn coordinator(&self) -> &Coordinator {
        &self.coordinator
    }

    /// Persist the session, release the lock, then journal the outcomes
    /// recorded under it.
    ///
    /// Outcomes are only journaled once the session that produced them is
    /// on disk. A dropped or failed guard journals nothing.
    pub fn commit(self) -> Result<(), StoreError> {
        let Self {
            mut lock,
            coordinator,
            pending,
            journal,
        } = self;
        let json = serde_json::to_string_pretty(&coordinator.snapshot())?;
        lock.write_all(json.as_bytes())?;
        let path = lock.target().to_path_buf();
        lock.commit()?;
        debug!(path = %path.display(), "session saved");

        let records = std::mem::take(&mut *pending.records.lock());
        for record in &records {
            journal.append(record)?;
        }
        Ok(())
    }
}
