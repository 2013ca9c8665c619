//! Free-text state label matching.
//!
//! Labels are resolved against the catalog in a fixed order: exact name,
//! subset of the name's tokens (longest names first), then a Jaccard
//! best-score fallback. Exception phrases veto the fuzzy steps for the
//! state that declares them. A label nothing matches is returned as-is so
//! it stays visible in the output.

use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::catalog::{CanonicalState, StateCatalog};

/// Minimum Jaccard similarity for the best-score fallback.
pub const MIN_JACCARD: f64 = 0.5;

static CLOCK_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}:\d{2}$").expect("clock token regex is valid"));

/// Lowercase, replace punctuation (except `_`, `-`, `/`) with spaces and
/// collapse whitespace.
pub fn normalize(label: &str) -> String {
    let cleaned: String = label
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() || matches!(c, '_' | '-' | '/') {
                c
            } else {
                ' '
            }
        })
        .collect();
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Debug)]
struct Candidate<'a> {
    state: &'a CanonicalState,
    lowered: String,
    normalized: String,
    tokens: BTreeSet<String>,
    exceptions: Vec<String>,
}

impl Candidate<'_> {
    fn is_vetoed(&self, normalized_label: &str) -> bool {
        self.exceptions
            .iter()
            .any(|phrase| !phrase.is_empty() && normalized_label.contains(phrase.as_str()))
    }
}

/// Matcher bound to one catalog snapshot.
#[derive(Debug)]
pub struct StateMatcher<'a> {
    stopwords: HashSet<String>,
    /// Longest names first.
    candidates: Vec<Candidate<'a>>,
}

impl<'a> StateMatcher<'a> {
    pub fn new(catalog: &'a StateCatalog) -> Self {
        let stopwords: HashSet<String> = catalog.stopwords.iter().map(|w| normalize(w)).collect();

        let mut candidates: Vec<Candidate<'a>> = catalog
            .states
            .iter()
            .map(|state| Candidate {
                state,
                lowered: state.name.trim().to_lowercase(),
                normalized: normalize(&state.name),
                tokens: tokenize_with(&state.name, &stopwords),
                exceptions: state.exceptions.iter().map(|e| normalize(e)).collect(),
            })
            .collect();
        candidates.sort_by(|a, b| {
            b.state
                .name
                .chars()
                .count()
                .cmp(&a.state.name.chars().count())
                .then_with(|| a.state.name.cmp(&b.state.name))
        });

        Self {
            stopwords,
            candidates,
        }
    }

    /// Meaningful tokens of `label`.
    pub fn tokenize(&self, label: &str) -> BTreeSet<String> {
        tokenize_with(label, &self.stopwords)
    }

    /// Resolve `label` to a canonical state name, or return it unchanged.
    pub fn match_label(&self, label: &str) -> String {
        let lowered = label.trim().to_lowercase();
        let normalized = normalize(label);

        if let Some(candidate) = self
            .candidates
            .iter()
            .find(|c| c.lowered == lowered || c.normalized == normalized)
        {
            return candidate.state.name.clone();
        }

        let tokens = self.tokenize(label);

        if let Some(candidate) = self.candidates.iter().find(|c| {
            !c.tokens.is_empty() && c.tokens.is_subset(&tokens) && !c.is_vetoed(&normalized)
        }) {
            return candidate.state.name.clone();
        }

        let mut best: Option<(f64, usize, &Candidate<'a>)> = None;
        for candidate in &self.candidates {
            if candidate.tokens.is_empty() || candidate.is_vetoed(&normalized) {
                continue;
            }
            let shared = candidate.tokens.intersection(&tokens).count();
            if shared == 0 {
                continue;
            }
            let union = candidate.tokens.union(&tokens).count();
            let jaccard = shared as f64 / union as f64;
            if jaccard < MIN_JACCARD && candidate.tokens.len() != 1 {
                continue;
            }
            let better = match best {
                None => true,
                Some((best_jaccard, best_shared, _)) => {
                    jaccard > best_jaccard || (jaccard == best_jaccard && shared > best_shared)
                }
            };
            if better {
                best = Some((jaccard, shared, candidate));
            }
        }

        match best {
            Some((_, _, candidate)) => candidate.state.name.clone(),
            None => label.to_string(),
        }
    }
}

fn tokenize_with(label: &str, stopwords: &HashSet<String>) -> BTreeSet<String> {
    normalize(label)
        .split_whitespace()
        .map(|token| token.trim_matches(|c: char| matches!(c, '_' | '-' | '/')))
        .filter(|token| token.chars().count() > 1)
        .filter(|token| !token.chars().all(|c| c.is_ascii_digit()))
        .filter(|token| !CLOCK_TOKEN_RE.is_match(token))
        .filter(|token| !stopwords.contains(*token))
        .map(str::to_string)
        .collect()
}
