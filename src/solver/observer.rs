//! Per-repair notifications.

use super::PassMode;
use crate::models::{Constraint, Span};

/// A single applied repair.
#[derive(Debug, Clone, Copy)]
pub struct RepairEvent<'a> {
    /// The constraint whose rule fired.
    pub constraint: &'a Constraint,
    /// Which pass applied it.
    pub mode: PassMode,
    /// 1-based round number within the pass.
    pub round: usize,
    /// The moved item (always `constraint.item_a`).
    pub item_id: &'a str,
    /// Interval before the repair.
    pub before: Span,
    /// Interval after the repair.
    pub after: Span,
}

/// Receives every repair applied during a pass.
///
/// The solver is busy while observers run, so an observer that tries to
/// start another pass on the same solver gets a no-op.
pub trait RepairObserver {
    /// Called after each applied repair.
    fn on_repair(&mut self, event: &RepairEvent<'_>);
}

impl<F> RepairObserver for F
where
    F: FnMut(&RepairEvent<'_>),
{
    fn on_repair(&mut self, event: &RepairEvent<'_>) {
        self(event)
    }
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RepairObserver for NoopObserver {
    fn on_repair(&mut self, _event: &RepairEvent<'_>) {}
}

/// An owned copy of a [`RepairEvent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairRecord {
    /// Constraint ID.
    pub constraint_id: String,
    /// Moved item ID.
    pub item_id: String,
    /// Pass mode.
    pub mode: PassMode,
    /// Round number.
    pub round: usize,
    /// Interval before.
    pub before: Span,
    /// Interval after.
    pub after: Span,
}

/// Collects repairs in the order they were applied.
#[derive(Debug, Default, Clone)]
pub struct RepairLog {
    records: Vec<RepairRecord>,
}

impl RepairLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded repairs.
    pub fn records(&self) -> &[RepairRecord] {
        &self.records
    }

    /// Repairs applied by one constraint.
    pub fn for_constraint<'a>(
        &'a self,
        constraint_id: &'a str,
    ) -> impl Iterator<Item = &'a RepairRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| r.constraint_id == constraint_id)
    }

    /// Number of recorded repairs.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drops all records.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl RepairObserver for RepairLog {
    fn on_repair(&mut self, event: &RepairEvent<'_>) {
        self.records.push(RepairRecord {
            constraint_id: event.constraint.id.clone(),
            item_id: event.item_id.to_string(),
            mode: event.mode,
            round: event.round,
            before: event.before,
            after: event.after,
        });
    }
}
