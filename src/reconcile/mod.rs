//! Reconciliation: mapping validated rows to storage actions.
//!
//! The planner classifies each [`ValidatedRecord`] as create, update or
//! skip against the identifiers known to storage and the ids already seen
//! in the current file. It is stateful within one import (duplicate
//! tracking) and stateless across imports: build a fresh planner per
//! invocation.

use std::collections::HashSet;

use crate::models::{Plan, SkipReason, ValidatedRecord};

/// Classifies validated records in row order.
pub struct Planner {
    known_ids: HashSet<u64>,
    seen_ids: HashSet<u64>,
    upsert: bool,
}

impl Planner {
    /// `known_ids` is the identifier set snapshot taken once per import.
    pub fn new(known_ids: HashSet<u64>, upsert: bool) -> Self {
        Self {
            known_ids,
            seen_ids: HashSet::new(),
            upsert,
        }
    }

    /// Produce the plan for one record.
    ///
    /// - no id: create
    /// - id seen earlier in this file: skip, regardless of upsert
    /// - id known to storage: update when upsert, else skip
    /// - explicit unknown id: create-with-id when upsert, else skip
    pub fn plan(&mut self, record: ValidatedRecord) -> Plan {
        let id = match record.id {
            None => return Plan::Create(record),
            Some(id) => id,
        };

        if !self.seen_ids.insert(id) {
            return Plan::Skip {
                row: record.row,
                id,
                reason: SkipReason::DuplicateInFile,
            };
        }

        if self.known_ids.contains(&id) {
            if self.upsert {
                Plan::Update(id, record)
            } else {
                Plan::Skip {
                    row: record.row,
                    id,
                    reason: SkipReason::ExistsUpsertDisabled,
                }
            }
        } else if self.upsert {
            Plan::Create(record)
        } else {
            Plan::Skip {
                row: record.row,
                id,
                reason: SkipReason::UnknownIdUpsertDisabled,
            }
        }
    }

    /// Plan a whole batch, one plan per record, preserving order.
    pub fn plan_all(&mut self, records: impl IntoIterator<Item = ValidatedRecord>) -> Vec<Plan> {
        records.into_iter().map(|r| self.plan(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, id: Option<u64>) -> ValidatedRecord {
        ValidatedRecord {
            row,
            id,
            name: format!("Item {}", row),
            inventory: 10,
            category_id: None,
            description: None,
        }
    }

    #[test]
    fn test_absent_id_creates() {
        let mut planner = Planner::new(HashSet::new(), true);
        assert!(matches!(planner.plan(record(1, None)), Plan::Create(_)));
    }

    #[test]
    fn test_known_id_updates_with_upsert() {
        let mut planner = Planner::new(HashSet::from([2]), true);
        match planner.plan(record(1, Some(2))) {
            Plan::Update(id, r) => {
                assert_eq!(id, 2);
                assert_eq!(r.row, 1);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_known_id_skips_without_upsert() {
        let mut planner = Planner::new(HashSet::from([2]), false);
        match planner.plan(record(1, Some(2))) {
            Plan::Skip { reason, .. } => assert_eq!(reason, SkipReason::ExistsUpsertDisabled),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_id_creates_with_upsert() {
        // Explicit id that storage has never seen: create with that id.
        let mut planner = Planner::new(HashSet::from([2]), true);
        match planner.plan(record(1, Some(9))) {
            Plan::Create(r) => assert_eq!(r.id, Some(9)),
            other => panic!("expected create, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_id_skips_without_upsert() {
        let mut planner = Planner::new(HashSet::new(), false);
        match planner.plan(record(1, Some(9))) {
            Plan::Skip { reason, .. } => assert_eq!(reason, SkipReason::UnknownIdUpsertDisabled),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_in_file_skips_after_first() {
        let mut planner = Planner::new(HashSet::from([5]), true);
        assert!(matches!(planner.plan(record(1, Some(5))), Plan::Update(5, _)));
        // Every later occurrence skips, upsert notwithstanding.
        for row in 2..=4 {
            match planner.plan(record(row, Some(5))) {
                Plan::Skip { row: r, id, reason } => {
                    assert_eq!(r, row);
                    assert_eq!(id, 5);
                    assert_eq!(reason, SkipReason::DuplicateInFile);
                }
                other => panic!("expected skip, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_duplicate_tracking_is_per_planner() {
        let known = HashSet::from([5]);
        let mut first = Planner::new(known.clone(), true);
        assert!(matches!(first.plan(record(1, Some(5))), Plan::Update(..)));

        // A fresh planner carries no memory of the previous import.
        let mut second = Planner::new(known, true);
        assert!(matches!(second.plan(record(1, Some(5))), Plan::Update(..)));
    }

    #[test]
    fn test_plan_all_preserves_order() {
        let mut planner = Planner::new(HashSet::from([2]), true);
        let plans = planner.plan_all(vec![record(1, None), record(2, Some(2)), record(3, Some(2))]);
        assert!(matches!(plans[0], Plan::Create(_)));
        assert!(matches!(plans[1], Plan::Update(2, _)));
        assert!(matches!(plans[2], Plan::Skip { reason: SkipReason::DuplicateInFile, .. }));
    }
}
