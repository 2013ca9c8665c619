//! Before/after comparison of two reports.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::models::Report;

/// Minutes on both sides and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MinutesDelta {
    pub before: f64,
    pub after: f64,
    pub delta: f64,
}

impl MinutesDelta {
    fn new(before: f64, after: f64) -> Self {
        Self {
            before,
            after,
            delta: after - before,
        }
    }
}

/// Agent counts on both sides and their difference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CountDelta {
    pub before: usize,
    pub after: usize,
    pub delta: i64,
}

impl CountDelta {
    fn new(before: usize, after: usize) -> Self {
        Self {
            before,
            after,
            delta: after as i64 - before as i64,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StateComparison {
    pub minutes: MinutesDelta,
    pub agents: CountDelta,
}

/// Total minutes of one bucket over all states.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketComparison {
    pub index: usize,
    pub label: String,
    #[serde(flatten)]
    pub minutes: MinutesDelta,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    /// Union of both reports' states; a missing side counts as zero.
    pub states: BTreeMap<String, StateComparison>,
    pub buckets: Vec<BucketComparison>,
}

impl Comparison {
    /// States whose minutes or agent count changed.
    pub fn changed_states(&self) -> impl Iterator<Item = (&String, &StateComparison)> {
        self.states
            .iter()
            .filter(|(_, c)| c.minutes.delta != 0.0 || c.agents.delta != 0)
    }
}

/// Compare `before` against `after`.
pub fn compare_reports(before: &Report, after: &Report) -> Comparison {
    let names: BTreeSet<&String> = before
        .state_totals
        .keys()
        .chain(after.state_totals.keys())
        .collect();

    let states = names
        .into_iter()
        .map(|name| {
            let old = before.state_totals.get(name);
            let new = after.state_totals.get(name);
            let comparison = StateComparison {
                minutes: MinutesDelta::new(
                    old.map_or(0.0, |t| t.total_duration),
                    new.map_or(0.0, |t| t.total_duration),
                ),
                agents: CountDelta::new(
                    old.map_or(0, |t| t.total_agents),
                    new.map_or(0, |t| t.total_agents),
                ),
            };
            (name.clone(), comparison)
        })
        .collect();

    let buckets = before
        .intervals
        .iter()
        .zip(&after.intervals)
        .map(|(old, new)| BucketComparison {
            index: old.interval.index,
            label: old.interval.label.clone(),
            minutes: MinutesDelta::new(bucket_minutes(old), bucket_minutes(new)),
        })
        .collect();

    Comparison { states, buckets }
}

fn bucket_minutes(summary: &crate::models::IntervalSummary) -> f64 {
    summary.states.values().map(|s| s.total_duration).sum()
}
