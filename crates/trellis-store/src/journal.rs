//! Append-only outcome journal, one JSON record per line.
//!
//! This is the file-backed stand-in for the learning store: the engine
//! writes every recorded outcome here and never reads it back.

use crate::error::StoreError;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use trellis_core::sink::{OutcomeRecord, OutcomeSink};

pub struct OutcomeJournal {
    path: PathBuf,
}

impl OutcomeJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, record: &OutcomeRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&line)?;
        Ok(())
    }

    /// All records, oldest first. A missing journal is empty.
    pub fn read_all(&self) -> Result<Vec<OutcomeRecord>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Io(e)),
        };
        let mut records = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    pub fn for_agent(&self, agent_id: &str) -> Result<Vec<OutcomeRecord>, StoreError> {
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.agent_id == agent_id)
            .collect())
    }
}

impl OutcomeSink for OutcomeJournal {
    fn record(&self, record: &OutcomeRecord) -> Result<(), Box<dyn Error + Send + Sync>> {
        self.append(record)?;
        Ok(())
    }
}
