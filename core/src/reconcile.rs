//! Diff planning for parent/child collections.
//!
//! A client submits the complete desired child list for a parent (optionally
//! restricted to a day window); the plan splits it into creates, updates, and
//! deletes against what is persisted. The store applies creates and updates
//! first and deletes last, so a partial failure never leaves conflicting rows
//! visible before cleanup.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::models::{ExerciseInput, ExerciseSet, ListItemInput, SetInput, StatSetInput};

/// Incoming child records carry an optional persisted id. `None`, or an id
/// the parent does not own, means "create" — never an error.
pub trait HasChildId {
    fn child_id(&self) -> Option<i64>;
}

impl HasChildId for ListItemInput {
    fn child_id(&self) -> Option<i64> {
        self.id
    }
}

impl HasChildId for ExerciseInput {
    fn child_id(&self) -> Option<i64> {
        self.id
    }
}

impl HasChildId for SetInput {
    fn child_id(&self) -> Option<i64> {
        self.id
    }
}

impl HasChildId for StatSetInput {
    fn child_id(&self) -> Option<i64> {
        self.id
    }
}

#[derive(Debug)]
pub struct Plan<I> {
    pub create: Vec<I>,
    pub update: Vec<(i64, I)>,
    pub delete: Vec<i64>,
}

impl<I> Plan<I> {
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.create.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Partition `incoming` against the parent's existing child ids.
///
/// An empty `incoming` list deletes every existing child in scope — that is
/// the documented contract (explicit clear), not a no-op. A duplicated id in
/// the input matches once; later duplicates fall through to `create`.
pub fn plan<I: HasChildId>(existing_ids: &[i64], incoming: Vec<I>) -> Plan<I> {
    let existing: HashSet<i64> = existing_ids.iter().copied().collect();
    let mut matched: HashSet<i64> = HashSet::new();
    let mut create = Vec::new();
    let mut update = Vec::new();

    for item in incoming {
        match item.child_id() {
            Some(id) if existing.contains(&id) && matched.insert(id) => update.push((id, item)),
            _ => create.push(item),
        }
    }

    let delete: Vec<i64> = existing_ids
        .iter()
        .copied()
        .filter(|id| !matched.contains(id))
        .collect();

    Plan {
        create,
        update,
        delete,
    }
}

// --- Day window ---

/// One calendar day, start-of-day inclusive to next midnight exclusive (UTC).
///
/// Children whose `created_at` falls outside the window never participate in
/// a date-scoped reconciliation, regardless of the incoming list.
#[derive(Debug, Clone, Copy)]
pub struct DayWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl DayWindow {
    #[must_use]
    pub fn for_date(date: NaiveDate) -> Self {
        let start = date.and_hms_opt(0, 0, 0).expect("midnight is valid").and_utc();
        Self {
            start,
            end: start + TimeDelta::days(1),
        }
    }

    /// Start of day, as the timestamp to stamp onto children created for
    /// this window.
    #[must_use]
    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339()
    }

    /// Whether an RFC 3339 timestamp falls inside the window.
    /// Unparseable timestamps are treated as outside (left untouched).
    #[must_use]
    pub fn contains(&self, created_at: &str) -> bool {
        DateTime::parse_from_rfc3339(created_at).is_ok_and(|ts| {
            let ts = ts.with_timezone(&Utc);
            ts >= self.start && ts < self.end
        })
    }
}

// --- Derived max ---

#[derive(Debug, Clone, PartialEq)]
pub struct MaxObservation {
    pub weight: f64,
    pub date: Option<String>,
}

impl MaxObservation {
    #[must_use]
    pub fn zero() -> Self {
        Self {
            weight: 0.0,
            date: None,
        }
    }
}

/// Scan surviving sets and take the largest parseable weight, recording when
/// it was logged. Strictly-greater comparison: the first occurrence wins ties.
/// No parseable weights → zero sentinel.
#[must_use]
pub fn derive_max_weight(sets: &[ExerciseSet]) -> MaxObservation {
    let mut max = MaxObservation::zero();
    let mut seen = false;
    for set in sets {
        let Ok(weight) = set.weight.trim().parse::<f64>() else {
            continue;
        };
        if !seen || weight > max.weight {
            max = MaxObservation {
                weight,
                date: Some(set.created_at.clone()),
            };
            seen = true;
        }
    }
    max
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_in(id: Option<i64>, rep: &str, weight: &str) -> SetInput {
        SetInput {
            id,
            rep: rep.to_string(),
            weight: weight.to_string(),
        }
    }

    fn persisted_set(id: i64, weight: &str, created_at: &str) -> ExerciseSet {
        ExerciseSet {
            id,
            exercise_id: 1,
            rep: "10".to_string(),
            weight: weight.to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_plan_matches_updates_creates_deletes() {
        // "Leg Day": existing set a updated, a new id-less set created.
        let plan = plan(
            &[1],
            vec![set_in(Some(1), "12", "50"), set_in(None, "10", "55")],
        );
        assert_eq!(plan.update.len(), 1);
        assert_eq!(plan.update[0].0, 1);
        assert_eq!(plan.update[0].1.rep, "12");
        assert_eq!(plan.create.len(), 1);
        assert_eq!(plan.create[0].weight, "55");
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_plan_unrecognized_id_creates() {
        let plan = plan(&[1, 2], vec![set_in(Some(999), "8", "60")]);
        assert_eq!(plan.create.len(), 1);
        assert!(plan.update.is_empty());
        assert_eq!(plan.delete, vec![1, 2]);
    }

    #[test]
    fn test_plan_empty_incoming_deletes_all() {
        let plan: Plan<SetInput> = plan(&[1, 2, 3], vec![]);
        assert!(plan.create.is_empty());
        assert!(plan.update.is_empty());
        assert_eq!(plan.delete, vec![1, 2, 3]);
    }

    #[test]
    fn test_plan_noop_roundtrip() {
        let plan = plan(&[4, 7], vec![set_in(Some(4), "10", "50"), set_in(Some(7), "8", "60")]);
        assert!(plan.create.is_empty());
        assert!(plan.delete.is_empty());
        assert_eq!(plan.update.len(), 2);
    }

    #[test]
    fn test_plan_completeness() {
        // Resulting id count always equals the incoming count.
        let incoming = vec![
            set_in(Some(1), "a", "1"),
            set_in(None, "b", "2"),
            set_in(Some(42), "c", "3"),
        ];
        let n = incoming.len();
        let plan = plan(&[1, 2], incoming);
        assert_eq!(plan.create.len() + plan.update.len(), n);
        assert_eq!(plan.delete, vec![2]);
    }

    #[test]
    fn test_plan_duplicate_incoming_id() {
        let plan = plan(
            &[5],
            vec![set_in(Some(5), "10", "50"), set_in(Some(5), "12", "55")],
        );
        assert_eq!(plan.update.len(), 1);
        assert_eq!(plan.create.len(), 1);
        assert!(plan.delete.is_empty());
    }

    #[test]
    fn test_day_window_contains() {
        let window = DayWindow::for_date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert!(window.contains("2024-06-15T00:00:00Z"));
        assert!(window.contains("2024-06-15T23:59:59Z"));
        assert!(!window.contains("2024-06-16T00:00:00Z"));
        assert!(!window.contains("2024-06-14T23:59:59Z"));
        // Offset timestamps are normalized to UTC first.
        assert!(window.contains("2024-06-14T22:00:00-03:00"));
        assert!(!window.contains("not-a-date"));
    }

    #[test]
    fn test_derive_max_weight() {
        let sets = vec![
            persisted_set(1, "10", "2024-06-01T10:00:00Z"),
            persisted_set(2, "25", "2024-06-02T10:00:00Z"),
            persisted_set(3, "7", "2024-06-03T10:00:00Z"),
        ];
        let max = derive_max_weight(&sets);
        assert!((max.weight - 25.0).abs() < f64::EPSILON);
        assert_eq!(max.date.as_deref(), Some("2024-06-02T10:00:00Z"));

        // After deleting the max, recompute over the remainder.
        let remaining = vec![sets[0].clone(), sets[2].clone()];
        let max = derive_max_weight(&remaining);
        assert!((max.weight - 10.0).abs() < f64::EPSILON);
        assert_eq!(max.date.as_deref(), Some("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn test_derive_max_weight_tie_first_wins() {
        let sets = vec![
            persisted_set(1, "50", "2024-06-01T10:00:00Z"),
            persisted_set(2, "50", "2024-06-02T10:00:00Z"),
        ];
        let max = derive_max_weight(&sets);
        assert_eq!(max.date.as_deref(), Some("2024-06-01T10:00:00Z"));
    }

    #[test]
    fn test_derive_max_weight_empty_resets() {
        assert_eq!(derive_max_weight(&[]), MaxObservation::zero());
    }

    #[test]
    fn test_derive_max_weight_skips_unparseable() {
        let sets = vec![
            persisted_set(1, "heavy", "2024-06-01T10:00:00Z"),
            persisted_set(2, "12.5", "2024-06-02T10:00:00Z"),
        ];
        let max = derive_max_weight(&sets);
        assert!((max.weight - 12.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_derive_max_weight_all_unparseable_is_zero() {
        let sets = vec![persisted_set(1, "heavy", "2024-06-01T10:00:00Z")];
        assert_eq!(derive_max_weight(&sets), MaxObservation::zero());
    }
}
