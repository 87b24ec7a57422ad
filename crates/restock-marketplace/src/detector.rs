// SPDX-FileCopyrightText: 2026 Restock Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Diffing of acceptance coefficient snapshots.

use std::collections::HashMap;

use serde::Serialize;

use crate::api::AcceptanceCoefficient;

/// Cost factor used for tuples never seen before.
pub const UNAVAILABLE: i64 = -1;

/// `(warehouse_id, date) -> cost factor`.
pub type Snapshot = HashMap<(i64, String), i64>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CoefficientChange {
    pub warehouse_id: i64,
    pub date: String,
    pub old_factor: i64,
    pub new_factor: i64,
    pub score: i64,
}

/// Build a snapshot from API rows. When several box types share a
/// `(warehouse, date)`, the cheapest available factor wins.
pub fn snapshot(coefficients: &[AcceptanceCoefficient]) -> Snapshot {
    let mut snap = Snapshot::new();
    for c in coefficients {
        let factor = c.cost_factor();
        snap.entry((c.warehouse_id, c.date.clone()))
            .and_modify(|current| {
                if factor >= 0 && (*current < 0 || factor < *current) {
                    *current = factor;
                }
            })
            .or_insert(factor);
    }
    snap
}

/// Priority of a change from `old` to `new`. Assumes `old != new`.
pub fn score(old: i64, new: i64) -> i64 {
    let regressed = new < 0 || (old >= 0 && new > old);
    match new {
        _ if regressed => 10,
        0 => 100,
        1 => 90,
        2 => 80,
        _ if old < 0 => 70,
        _ => 50,
    }
}

/// Changes between two snapshots, most promising first.
///
/// Tuples missing from `new` are ignored; tuples missing from `old` are
/// compared against [`UNAVAILABLE`].
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<CoefficientChange> {
    let mut changes: Vec<CoefficientChange> = new
        .iter()
        .filter_map(|((warehouse_id, date), &new_factor)| {
            let old_factor = old
                .get(&(*warehouse_id, date.clone()))
                .copied()
                .unwrap_or(UNAVAILABLE);
            (old_factor != new_factor).then(|| CoefficientChange {
                warehouse_id: *warehouse_id,
                date: date.clone(),
                old_factor,
                new_factor,
                score: score(old_factor, new_factor),
            })
        })
        .collect();
    changes.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.warehouse_id.cmp(&b.warehouse_id))
            .then(a.date.cmp(&b.date))
    });
    changes
}

/// Keeps the last snapshot and reports what changed on each observation.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last: Snapshot,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, coefficients: &[AcceptanceCoefficient]) -> Vec<CoefficientChange> {
        let next = snapshot(coefficients);
        let changes = diff(&self.last, &next);
        self.last = next;
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn coefficient(warehouse_id: i64, date: &str, value: f64) -> AcceptanceCoefficient {
        AcceptanceCoefficient {
            date: date.into(),
            coefficient: value,
            warehouse_id,
            warehouse_name: String::new(),
            allow_unload: true,
            box_type_id: None,
        }
    }

    #[test]
    fn scoring_table() {
        assert_eq!(score(5, 0), 100);
        assert_eq!(score(-1, 0), 100);
        assert_eq!(score(3, 1), 90);
        assert_eq!(score(-1, 2), 80);
        assert_eq!(score(-1, 5), 70);
        assert_eq!(score(8, 5), 50);
        assert_eq!(score(1, 3), 10);
        assert_eq!(score(0, -1), 10);
        assert_eq!(score(0, 1), 10);
    }

    #[test]
    fn first_sighting_is_compared_against_unavailable() {
        let mut detector = ChangeDetector::new();
        let changes = detector.observe(&[coefficient(1, "d1", 0.0), coefficient(2, "d1", -1.0)]);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].warehouse_id, 1);
        assert_eq!(changes[0].old_factor, UNAVAILABLE);
        assert_eq!(changes[0].score, 100);
    }

    #[test]
    fn unchanged_tuples_are_silent() {
        let mut detector = ChangeDetector::new();
        detector.observe(&[coefficient(1, "d1", 3.0)]);
        assert!(detector.observe(&[coefficient(1, "d1", 3.0)]).is_empty());
        let changes = detector.observe(&[coefficient(1, "d1", 1.0)]);
        assert_eq!(changes[0].score, 90);
        assert_eq!(changes[0].old_factor, 3);
    }

    #[test]
    fn disallowed_unload_is_a_regression() {
        let mut detector = ChangeDetector::new();
        detector.observe(&[coefficient(1, "d1", 1.0)]);
        let mut closed = coefficient(1, "d1", 1.0);
        closed.allow_unload = false;
        let changes = detector.observe(&[closed]);
        assert_eq!(changes[0].new_factor, -1);
        assert_eq!(changes[0].score, 10);
    }

    #[test]
    fn changes_are_ordered_by_score() {
        let old = snapshot(&[coefficient(1, "d1", 5.0), coefficient(2, "d1", 5.0)]);
        let new = snapshot(&[coefficient(1, "d1", 7.0), coefficient(2, "d1", 0.0)]);
        let changes = diff(&old, &new);
        assert_eq!(changes[0].warehouse_id, 2);
        assert_eq!(changes[1].score, 10);
    }

    #[test]
    fn cheapest_box_type_wins() {
        let snap = snapshot(&[
            coefficient(1, "d1", -1.0),
            coefficient(1, "d1", 4.0),
            coefficient(1, "d1", 2.0),
        ]);
        assert_eq!(snap[&(1, "d1".to_string())], 2);
    }

    proptest! {
        #[test]
        fn score_is_one_of_the_known_levels(old in -1i64..20, new in -1i64..20) {
            prop_assume!(old != new);
            let s = score(old, new);
            prop_assert!([10, 50, 70, 80, 90, 100].contains(&s));
            if new < 0 {
                prop_assert_eq!(s, 10);
            }
        }
    }
}
