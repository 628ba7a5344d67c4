//! Persistence of the holder and hysteresis streak between runs.
//!
//! Needed when the watcher is started once per check (e.g. from cron):
//! without it the streak could never reach its confirmation count.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::failover::state::{FailoverState, PendingSwitch};
use crate::node::ServerId;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("state file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// On-disk form of [`FailoverState`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub holder: ServerId,
    pub pending: Option<PendingSwitch>,
    pub last_switch: Option<DateTime<Utc>>,
}

impl From<&FailoverState> for PersistedState {
    fn from(state: &FailoverState) -> Self {
        Self {
            holder: state.holder(),
            pending: state.pending(),
            last_switch: state.last_switch(),
        }
    }
}

/// JSON file holding a [`PersistedState`].
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
}

impl StateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted state, or `None` if nothing was saved yet.
    pub fn load(&self) -> Result<Option<PersistedState>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file = File::open(&self.path).map_err(|source| self.io(source))?;
        let state = serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(state))
    }

    /// Save through a temporary file so a crash never leaves a truncated state.
    pub fn save(&self, state: &FailoverState) -> Result<(), StoreError> {
        let tmp = self.path.with_extension("tmp");
        let file = File::create(&tmp).map_err(|source| self.io(source))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &PersistedState::from(state)).map_err(|source| {
            StoreError::Corrupt {
                path: tmp.clone(),
                source,
            }
        })?;
        writer.flush().map_err(|source| self.io(source))?;
        drop(writer);
        fs::rename(&tmp, &self.path).map_err(|source| self.io(source))?;
        tracing::debug!(path = ?self.path, holder = %state.holder(), "Saved failover state");
        Ok(())
    }

    fn io(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn saved_state_loads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = StateStore::new(dir.path().join("state.json"));

        let mut state = FailoverState::new(ServerId::A);
        state.begin_migration(ServerId::B);
        state.finish_migration(true, Utc::now());
        store.save(&state).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.holder, ServerId::B);
        assert_eq!(loaded.last_switch, state.last_switch());
        assert!(!dir.path().join("state.tmp").exists());
    }

    #[test]
    fn corrupt_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(StateStore::new(path).load(), Err(StoreError::Corrupt { .. })));
    }
}
