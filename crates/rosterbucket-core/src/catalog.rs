//! Canonical state catalog.
//!
//! The catalog is the configuration snapshot one aggregation run reads:
//! canonical state names with their category, group and paid flag, the
//! negative exception phrases used by the matcher, and the vocabulary that
//! marks the day-off/time-off family. It is deserialized from settings and
//! borrowed immutably for the whole run.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RosterError};
use crate::matcher::{StateMatcher, normalize};

/// One configured canonical state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalState {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub is_paid: bool,
    #[serde(default)]
    pub is_default: bool,
    /// Phrases that veto a fuzzy match against this state.
    #[serde(default)]
    pub exceptions: Vec<String>,
}

impl CanonicalState {
    fn builtin(name: &str, category: &str, group: &str, is_paid: bool) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            group: group.to_string(),
            is_paid,
            is_default: true,
            exceptions: Vec::new(),
        }
    }

    fn with_exceptions(mut self, phrases: &[&str]) -> Self {
        self.exceptions = phrases.iter().map(|p| p.to_string()).collect();
        self
    }
}

/// Snapshot of the canonical state configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateCatalog {
    pub states: Vec<CanonicalState>,
    pub groups: Vec<String>,
    /// Tokens ignored by the matcher (time units, prepositions).
    pub stopwords: Vec<String>,
    /// Categories that make a state part of the day-off family.
    pub time_off_categories: Vec<String>,
    /// Phrases that mark an unmatched label as day-off family.
    pub time_off_keywords: Vec<String>,
}

impl Default for StateCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

const DEFAULT_STOPWORDS: &[&str] = &[
    "min", "mins", "minute", "minutes", "hr", "hrs", "hour", "hours", "sec", "secs", "second",
    "seconds", "am", "pm", "to", "for", "of", "the", "an", "and", "in", "on", "at", "with",
    "from", "by",
];

impl StateCatalog {
    /// Default workforce vocabulary.
    pub fn builtin() -> Self {
        Self {
            states: vec![
                CanonicalState::builtin("Available", "Productive", "Productive", true),
                CanonicalState::builtin("Break", "Break", "Shrinkage", true)
                    .with_exceptions(&["medical", "healthy living"]),
                CanonicalState::builtin("Lunch", "Meal", "Shrinkage", false),
                CanonicalState::builtin("Meeting", "Meeting", "Shrinkage", true),
                CanonicalState::builtin("Training", "Training", "Shrinkage", true),
                CanonicalState::builtin("Coaching", "Coaching", "Shrinkage", true),
                CanonicalState::builtin("Offline", "Offline", "Shrinkage", true),
                CanonicalState::builtin("Day Off", "Time Off", "Time Off", false),
                CanonicalState::builtin("PTO", "Time Off", "Time Off", true),
                CanonicalState::builtin("Sick", "Time Off", "Time Off", false),
            ],
            groups: vec![
                "Productive".to_string(),
                "Shrinkage".to_string(),
                "Time Off".to_string(),
            ],
            stopwords: DEFAULT_STOPWORDS.iter().map(|w| w.to_string()).collect(),
            time_off_categories: vec!["Time Off".to_string()],
            time_off_keywords: ["day off", "time off", "pto", "vacation", "leave"]
                .iter()
                .map(|w| w.to_string())
                .collect(),
        }
    }

    /// All configured states, in declaration order.
    pub fn get_all_states(&self) -> &[CanonicalState] {
        &self.states
    }

    /// Declared groups followed by any group only referenced by a state.
    pub fn get_all_groups(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.groups
            .iter()
            .chain(self.states.iter().map(|s| &s.group))
            .filter(|g| !g.trim().is_empty())
            .filter(|g| seen.insert(g.to_lowercase()))
            .cloned()
            .collect()
    }

    /// Case-insensitive lookup by canonical name.
    pub fn state(&self, name: &str) -> Option<&CanonicalState> {
        let name = name.trim();
        self.states.iter().find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Names of the states in `group`.
    pub fn states_in_group(&self, group: &str) -> Vec<String> {
        self.states
            .iter()
            .filter(|s| s.group.eq_ignore_ascii_case(group.trim()))
            .map(|s| s.name.clone())
            .collect()
    }

    /// Whether `name` belongs to the day-off/time-off family.
    ///
    /// Configured states decide by category; anything else (an unmatched
    /// label) is checked against the keyword list.
    pub fn is_time_off(&self, name: &str) -> bool {
        if let Some(state) = self.state(name) {
            return self
                .time_off_categories
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&state.category));
        }

        let padded = format!(" {} ", normalize(name));
        self.time_off_keywords
            .iter()
            .any(|kw| padded.contains(&format!(" {} ", normalize(kw))))
    }

    /// Resolve a free-text label to a canonical name.
    ///
    /// Builds a matcher per call; aggregation runs build one matcher and
    /// reuse it.
    pub fn find_matching_state(&self, label: &str) -> String {
        StateMatcher::new(self).match_label(label)
    }

    /// Reject empty or duplicate state names.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for state in &self.states {
            let name = state.name.trim();
            if name.is_empty() {
                return Err(RosterError::Config("state with empty name".to_string()));
            }
            if !seen.insert(name.to_lowercase()) {
                return Err(RosterError::Config(format!("duplicate state '{}'", name)));
            }
        }
        Ok(())
    }
}
