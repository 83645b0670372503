//! Persistence of the learning state
//!
//! The whole state is one JSON document. Loading never fails: a missing,
//! unreadable or corrupt document yields the default state. Saving writes a
//! sibling temporary file and renames it over the document, so the next load
//! sees either the previous or the new document, never half of one.

use super::{HISTORY_LIMIT, LearningState};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot serialize learning state: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait StateStore {
    /// Load the saved state, or the default state when there is none
    fn load(&self) -> LearningState;

    fn save(&mut self, state: &LearningState) -> Result<(), StoreError>;
}

/// Serialize with the history cut to [`HISTORY_LIMIT`]
fn to_document(state: &LearningState) -> Result<String, serde_json::Error> {
    if state.command_history.len() > HISTORY_LIMIT {
        let mut pruned = state.clone();
        pruned.prune_history();
        serde_json::to_string_pretty(&pruned)
    } else {
        serde_json::to_string_pretty(state)
    }
}

fn from_document(document: &str) -> Result<LearningState, serde_json::Error> {
    let mut state: LearningState = serde_json::from_str(document)?;
    state.user_preferences.sanitize();
    state.prune_history();
    Ok(state)
}

/// JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonStore {
    path: PathBuf,
}

impl JsonStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default location: `<data_dir>/pika/learning.json`
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pika")
            .join("learning.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "learning.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn io_error(&self, source: io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// Keep a copy of a document that failed to parse before it gets
    /// overwritten by the next save
    fn set_aside(&self) {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".corrupt");
        if let Err(e) = fs::copy(&self.path, PathBuf::from(&name)) {
            warn!("could not keep a copy of the unreadable state: {}", e);
        }
    }
}

impl StateStore for JsonStore {
    fn load(&self) -> LearningState {
        let document = match fs::read_to_string(&self.path) {
            Ok(document) => document,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "no saved learning state, starting fresh");
                return LearningState::default();
            }
            Err(e) => {
                warn!(path = %self.path.display(), "cannot read learning state ({}), starting fresh", e);
                self.set_aside();
                return LearningState::default();
            }
        };

        match from_document(&document) {
            Ok(state) => {
                debug!(
                    records = state.command_history.len(),
                    patterns = state.pattern_count(),
                    "loaded learning state"
                );
                state
            }
            Err(e) => {
                warn!(path = %self.path.display(), "learning state is corrupt ({}), starting fresh", e);
                self.set_aside();
                LearningState::default()
            }
        }
    }

    fn save(&mut self, state: &LearningState) -> Result<(), StoreError> {
        let document = to_document(state)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let temp = self.temp_path();
        fs::write(&temp, document).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&temp);
            self.io_error(e)
        })
    }
}

/// In-memory document, for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    document: Option<String>,
    saves: usize,
    fail_saves: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose saves always fail, as an unwritable medium would
    pub fn failing() -> Self {
        Self {
            fail_saves: true,
            ..Self::default()
        }
    }

    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn saves(&self) -> usize {
        self.saves
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> LearningState {
        self.document
            .as_deref()
            .and_then(|d| from_document(d).ok())
            .unwrap_or_default()
    }

    fn save(&mut self, state: &LearningState) -> Result<(), StoreError> {
        if self.fail_saves {
            return Err(StoreError::Io {
                path: PathBuf::from("<memory>"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "read-only medium"),
            });
        }
        self.document = Some(to_document(state)?);
        self.saves += 1;
        Ok(())
    }
}
