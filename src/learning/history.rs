//! History tracking
//!
//! Every classified turn is recorded, including unknown commands, so that
//! unmatched utterances still feed later predictions.

use super::{CommandRecord, LearningState};
use crate::command::{Action, describe_tag};
use chrono::{DateTime, Local, Timelike};

impl LearningState {
    /// Record a classified utterance at the current time
    pub fn record(&mut self, utterance: &str, action: &str) {
        self.record_at(utterance, action, Local::now());
    }

    /// Append the record, remember the utterance under its action, count the
    /// action for the hour of `at`, then prune the history
    pub fn record_at(&mut self, utterance: &str, action: &str, at: DateTime<Local>) {
        self.command_history.push(CommandRecord {
            command: utterance.to_string(),
            action: action.to_string(),
            timestamp: at,
        });

        self.command_patterns
            .entry_or_default(action)
            .push(utterance.to_string());

        let hour = at.hour().to_string();
        *self
            .context_memory
            .entry_or_default(&hour)
            .entry_or_default(action) += 1;

        self.prune_history();
    }

    /// Most frequent action at `hour`; the first maximal action in insertion
    /// order wins ties. Unknown commands are never suggested.
    pub fn busiest_action_at(&self, hour: u32) -> Option<&str> {
        let counts = self.context_memory.get(&hour.to_string())?;
        let mut best: Option<(&str, u64)> = None;
        for (action, &count) in counts.iter() {
            if action == Action::Unknown.tag() {
                continue;
            }
            if best.is_none_or(|(_, top)| count > top) {
                best = Some((action, count));
            }
        }
        best.map(|(action, _)| action)
    }

    /// Hint for the current hour of day
    pub fn suggest(&self) -> Option<String> {
        self.suggest_at(Local::now().hour())
    }

    pub fn suggest_at(&self, hour: u32) -> Option<String> {
        self.busiest_action_at(hour).map(|action| {
            format!(
                "Around this time you usually ask me to {}.",
                describe_tag(action)
            )
        })
    }
}
