//! Adaptive learning state
//!
//! Everything the assistant remembers between sessions lives in one
//! [`LearningState`] value: the recent command history, the utterances that
//! resolved to each action, an hour-of-day usage table, and the tunable
//! preferences. It is loaded once at startup, passed by reference into every
//! turn, and saved after every resolved command.

pub mod adapt;
pub mod history;
pub mod matcher;
pub mod store;
mod table;

pub use adapt::{Preferences, ResponseStyle, Sensitivity};
pub use matcher::Prediction;
pub use store::{JsonStore, MemoryStore, StateStore, StoreError};
pub use table::OrderedTable;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Number of command records kept
pub const HISTORY_LIMIT: usize = 100;

/// Current persisted document version
pub const STATE_VERSION: u32 = 1;

/// Action tag -> utterances that resolved to it, oldest first
pub type PatternTable = OrderedTable<Vec<String>>;

/// Hour of day ("0".."23") -> action tag -> occurrences
pub type ContextTable = OrderedTable<OrderedTable<u64>>;

/// One classified utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub command: String,
    pub action: String,
    pub timestamp: DateTime<Local>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningState {
    #[serde(default = "default_version")]
    pub version: u32,
    /// Most recent last
    #[serde(default)]
    pub command_history: Vec<CommandRecord>,
    #[serde(default)]
    pub user_preferences: Preferences,
    #[serde(default)]
    pub command_patterns: PatternTable,
    #[serde(default)]
    pub context_memory: ContextTable,
}

fn default_version() -> u32 {
    STATE_VERSION
}

impl Default for LearningState {
    fn default() -> Self {
        Self {
            version: STATE_VERSION,
            command_history: Vec::new(),
            user_preferences: Preferences::default(),
            command_patterns: PatternTable::new(),
            context_memory: ContextTable::new(),
        }
    }
}

impl LearningState {
    /// Drop the oldest records beyond [`HISTORY_LIMIT`]
    pub fn prune_history(&mut self) {
        let len = self.command_history.len();
        if len > HISTORY_LIMIT {
            self.command_history.drain(..len - HISTORY_LIMIT);
        }
    }

    /// Forget history, patterns and context; preferences are kept
    pub fn forget(&mut self) {
        self.command_history.clear();
        self.command_patterns.clear();
        self.context_memory.clear();
    }

    /// Number of utterances remembered across all actions
    pub fn pattern_count(&self) -> usize {
        self.command_patterns.iter().map(|(_, p)| p.len()).sum()
    }

    /// Action with the most remembered utterances, first seen wins ties
    pub fn most_used_action(&self) -> Option<&str> {
        let mut best: Option<(&str, usize)> = None;
        for (action, utterances) in self.command_patterns.iter() {
            if best.is_none_or(|(_, count)| utterances.len() > count) {
                best = Some((action, utterances.len()));
            }
        }
        best.map(|(action, _)| action)
    }
}
