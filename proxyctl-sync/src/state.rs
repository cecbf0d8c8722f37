//! Local record of provisioned entities.
//!
//! Persists a [`StateFile`] JSON document at `<home>/.proxyctl/state.json`.
//! Entries are keyed `<kind>/<id>`. Keys are recorded by hashed token only.
//! Writes use the atomic `.tmp` + rename pattern of the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use proxyctl_core::config::root_dir_at;
use proxyctl_core::EntityRef;

use crate::error::{io_err, SyncError};

/// One provisioned entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateEntry {
    #[serde(flatten)]
    pub entity: EntityRef,
    /// Human-facing name (alias, email, model name), if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Last time a read confirmed the entity exists.
    pub verified_at: DateTime<Utc>,
}

/// On-disk state payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateFile {
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub entities: BTreeMap<String, StateEntry>,
}

impl Default for StateFile {
    fn default() -> Self {
        Self {
            updated_at: Utc::now(),
            entities: BTreeMap::new(),
        }
    }
}

impl StateFile {
    /// Insert or replace the entry for `entity`, stamped now.
    pub fn record(&mut self, entity: EntityRef, label: Option<String>) {
        let now = Utc::now();
        let created_at = self
            .entities
            .get(&entity.to_string())
            .map(|e| e.created_at)
            .unwrap_or(now);
        self.entities.insert(
            entity.to_string(),
            StateEntry {
                entity,
                label,
                created_at,
                verified_at: now,
            },
        );
    }

    pub fn remove(&mut self, entity: &EntityRef) -> Option<StateEntry> {
        self.entities.remove(&entity.to_string())
    }

    pub fn get(&self, entity: &EntityRef) -> Option<&StateEntry> {
        self.entities.get(&entity.to_string())
    }

    /// Bump `verified_at`. Returns false if there is no entry.
    pub fn mark_verified(&mut self, entity: &EntityRef) -> bool {
        match self.entities.get_mut(&entity.to_string()) {
            Some(entry) => {
                entry.verified_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &StateEntry> {
        self.entities.values()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// `<home>/.proxyctl/state.json`
pub fn state_path_at(home: &Path) -> PathBuf {
    root_dir_at(home).join("state.json")
}

/// Load the state file; empty state if it does not exist yet.
pub fn load_at(home: &Path) -> Result<StateFile, SyncError> {
    let path = state_path_at(home);
    if !path.exists() {
        return Ok(StateFile::default());
    }
    let contents = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
    if contents.trim().is_empty() {
        return Ok(StateFile::default());
    }
    Ok(serde_json::from_str(&contents)?)
}

/// Save atomically: `state.json.tmp` then rename. Stamps `updated_at`.
pub fn save_at(home: &Path, state: &mut StateFile) -> Result<(), SyncError> {
    let path = state_path_at(home);
    let Some(dir) = path.parent() else {
        return Err(io_err(path, std::io::Error::other("invalid state path")));
    };
    std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

    state.updated_at = Utc::now();
    let json = serde_json::to_string_pretty(state)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, &json).map_err(|e| io_err(&tmp, e))?;
    std::fs::rename(&tmp, &path).map_err(|e| io_err(&path, e))?;
    Ok(())
}

/// Load, apply `f`, save.
pub fn update_at<F>(home: &Path, f: F) -> Result<(), SyncError>
where
    F: FnOnce(&mut StateFile),
{
    let mut state = load_at(home)?;
    f(&mut state);
    save_at(home, &mut state)
}
