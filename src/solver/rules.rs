//! Repair rules, one per constraint kind.
//!
//! A rule fires only when [`relation_holds`](crate::validation::relation_holds)
//! would report the constraint as violated, so a converged pass leaves
//! every satisfiable constraint valid. Rules move `item_a` only; `item_b`
//! is read as a [`Span`] snapshot.

use crate::models::{ConstraintKind, Item, Span, MINUTE_MS};
use crate::validation::offset_target;

/// Numeric parameters shared by all rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleParams {
    /// Tolerance window (ms) for duration and offset relations.
    pub tolerance_ms: i64,
    /// Gap (ms) left by the "before" repairs.
    pub buffer_ms: i64,
}

impl Default for RuleParams {
    fn default() -> Self {
        Self {
            tolerance_ms: MINUTE_MS,
            buffer_ms: MINUTE_MS,
        }
    }
}

/// Why a rule declined to touch an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// `item_a` is not in the store.
    MissingItemA,
    /// `item_b` is absent or not in the store.
    MissingItemB,
    /// An interval is reversed, or a target instant overflowed.
    MalformedTime,
    /// The kind is not understood.
    UnknownKind,
}

/// Result of applying one rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairOutcome {
    /// Relation already held; nothing changed.
    Unchanged,
    /// `item_a` was moved or resized.
    Repaired {
        /// Interval before the repair.
        before: Span,
        /// Interval after the repair.
        after: Span,
    },
    /// The rule was not applied.
    Skipped(SkipReason),
}

impl RepairOutcome {
    /// Whether the item changed.
    pub fn is_change(&self) -> bool {
        matches!(self, Self::Repaired { .. })
    }
}

/// Applies the repair rule of `kind` to `a`, with `b` as reference.
pub fn apply_rule(
    kind: &ConstraintKind,
    offset_min: i64,
    a: &mut Item,
    b: Option<Span>,
    params: RuleParams,
) -> RepairOutcome {
    let before = a.span();

    let result = match kind {
        ConstraintKind::FixedDuration => fixed_duration(a, offset_min, params),
        ConstraintKind::Unknown(_) => Err(SkipReason::UnknownKind),
        relational => {
            let Some(b) = b else {
                return RepairOutcome::Skipped(SkipReason::MissingItemB);
            };
            if !a.is_well_formed() || b.start_ms > b.end_ms {
                return RepairOutcome::Skipped(SkipReason::MalformedTime);
            }
            match relational {
                ConstraintKind::StartAfterEnd => start_after_end(a, b),
                ConstraintKind::StartBeforeStart => start_before_start(a, b, params),
                ConstraintKind::StartBeforeEnd => start_before_end(a, b, params),
                ConstraintKind::EndBeforeStart => end_before_start(a, b, params),
                // StartOffset and StartExact share one relation.
                _ => start_offset(a, b, offset_min, params),
            }
        }
    };

    match result {
        Ok(false) => RepairOutcome::Unchanged,
        Ok(true) => RepairOutcome::Repaired {
            before,
            after: a.span(),
        },
        Err(reason) => RepairOutcome::Skipped(reason),
    }
}

type RuleResult = Result<bool, SkipReason>;

fn fixed_duration(a: &mut Item, minutes: i64, params: RuleParams) -> RuleResult {
    if minutes < 0 {
        return Err(SkipReason::MalformedTime);
    }
    let target = minutes.checked_mul(MINUTE_MS).ok_or(SkipReason::MalformedTime)?;
    let diff = a
        .end_ms
        .checked_sub(a.start_ms)
        .and_then(|d| d.checked_sub(target));
    if let Some(diff) = diff {
        if diff.unsigned_abs() < params.tolerance_ms.unsigned_abs() {
            return Ok(false);
        }
    }
    a.end_ms = a
        .start_ms
        .checked_add(target)
        .ok_or(SkipReason::MalformedTime)?;
    Ok(true)
}

fn start_after_end(a: &mut Item, b: Span) -> RuleResult {
    if a.start_ms >= b.end_ms {
        return Ok(false);
    }
    a.shift_to_start(b.end_ms).ok_or(SkipReason::MalformedTime)?;
    Ok(true)
}

fn start_before_start(a: &mut Item, b: Span, params: RuleParams) -> RuleResult {
    if a.start_ms <= b.start_ms {
        return Ok(false);
    }
    let start = b
        .start_ms
        .checked_sub(params.buffer_ms)
        .ok_or(SkipReason::MalformedTime)?;
    a.shift_to_start(start).ok_or(SkipReason::MalformedTime)?;
    Ok(true)
}

fn start_before_end(a: &mut Item, b: Span, params: RuleParams) -> RuleResult {
    if a.start_ms <= b.end_ms {
        return Ok(false);
    }
    let start = b
        .end_ms
        .checked_sub(params.buffer_ms)
        .ok_or(SkipReason::MalformedTime)?;
    a.shift_to_start(start).ok_or(SkipReason::MalformedTime)?;
    Ok(true)
}

// Anchored at the end, unlike the start-anchored rules above.
fn end_before_start(a: &mut Item, b: Span, params: RuleParams) -> RuleResult {
    if a.end_ms <= b.start_ms {
        return Ok(false);
    }
    let end = b
        .start_ms
        .checked_sub(params.buffer_ms)
        .ok_or(SkipReason::MalformedTime)?;
    a.shift_to_end(end).ok_or(SkipReason::MalformedTime)?;
    Ok(true)
}

fn start_offset(a: &mut Item, b: Span, minutes: i64, params: RuleParams) -> RuleResult {
    let target = offset_target(b.start_ms, minutes).ok_or(SkipReason::MalformedTime)?;
    if let Some(diff) = a.start_ms.checked_sub(target) {
        if diff.unsigned_abs() < params.tolerance_ms.unsigned_abs() {
            return Ok(false);
        }
    }
    a.shift_to_start(target).ok_or(SkipReason::MalformedTime)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    const M: i64 = MINUTE_MS;

    fn item(start_min: i64, end_min: i64) -> Item {
        Item::new("A", start_min * M, end_min * M)
    }

    fn span(start_min: i64, end_min: i64) -> Span {
        Span::new(start_min * M, end_min * M)
    }

    fn apply(kind: ConstraintKind, offset: i64, a: &mut Item, b: Option<Span>) -> RepairOutcome {
        apply_rule(&kind, offset, a, b, RuleParams::default())
    }

    #[test]
    fn test_fixed_duration_restores_end() {
        let mut a = item(540, 540);
        let outcome = apply(ConstraintKind::FixedDuration, 120, &mut a, None);
        assert!(outcome.is_change());
        assert_eq!(a.span(), span(540, 660));
    }

    #[test]
    fn test_fixed_duration_within_tolerance_is_unchanged() {
        let mut a = Item::new("A", 0, 120 * M + 30_000);
        let outcome = apply(ConstraintKind::FixedDuration, 120, &mut a, None);
        assert_eq!(outcome, RepairOutcome::Unchanged);
    }

    #[test]
    fn test_fixed_duration_exactly_one_minute_off_is_repaired() {
        let mut a = item(0, 121);
        assert!(apply(ConstraintKind::FixedDuration, 120, &mut a, None).is_change());
        assert_eq!(a.span(), span(0, 120));
    }

    #[test]
    fn test_fixed_duration_fixes_reversed_interval() {
        let mut a = item(600, 500);
        assert!(apply(ConstraintKind::FixedDuration, 30, &mut a, None).is_change());
        assert_eq!(a.span(), span(600, 630));
    }

    #[test]
    fn test_fixed_duration_negative_offset_is_skipped() {
        let mut a = item(0, 60);
        let outcome = apply(ConstraintKind::FixedDuration, -10, &mut a, None);
        assert_eq!(outcome, RepairOutcome::Skipped(SkipReason::MalformedTime));
        assert_eq!(a.span(), span(0, 60));
    }

    #[test]
    fn test_start_after_end_moves_to_b_end() {
        let mut a = item(600, 660);
        let outcome = apply(ConstraintKind::StartAfterEnd, 0, &mut a, Some(span(620, 700)));
        assert_eq!(
            outcome,
            RepairOutcome::Repaired {
                before: span(600, 660),
                after: span(700, 760),
            }
        );
    }

    #[test]
    fn test_start_before_start_leaves_buffer() {
        let mut a = item(700, 730);
        apply(ConstraintKind::StartBeforeStart, 0, &mut a, Some(span(650, 800)));
        assert_eq!(a.span(), span(649, 679));
    }

    #[test]
    fn test_start_before_end_leaves_buffer() {
        let mut a = item(900, 960);
        apply(ConstraintKind::StartBeforeEnd, 0, &mut a, Some(span(600, 800)));
        assert_eq!(a.span(), span(799, 859));
    }

    #[test]
    fn test_end_before_start_anchors_end() {
        // A = 09:00-10:00, B = 09:30-10:30 → A = 08:29-09:29
        let mut a = item(540, 600);
        apply(ConstraintKind::EndBeforeStart, 0, &mut a, Some(span(570, 630)));
        assert_eq!(a.span(), span(509, 569));
    }

    #[test]
    fn test_start_offset_preserves_duration() {
        // A (ref) starts 10:00, B (moved) 11:15-12:45 with +15 → 10:15-11:45
        let mut moved = Item::new("B", 675 * M, 765 * M);
        let outcome = apply(ConstraintKind::StartOffset, 15, &mut moved, Some(span(600, 720)));
        assert!(outcome.is_change());
        assert_eq!(moved.span(), span(615, 705));
    }

    #[test]
    fn test_start_exact_matches_start_offset() {
        let mut x = item(0, 30);
        let mut y = item(0, 30);
        apply(ConstraintKind::StartOffset, -20, &mut x, Some(span(100, 200)));
        apply(ConstraintKind::StartExact, -20, &mut y, Some(span(100, 200)));
        assert_eq!(x.span(), y.span());
        assert_eq!(x.span(), span(80, 110));
    }

    #[test]
    fn test_satisfied_relations_are_unchanged() {
        let b = Some(span(100, 200));
        let cases = [
            (ConstraintKind::StartAfterEnd, item(200, 210)),
            (ConstraintKind::StartBeforeStart, item(100, 300)),
            (ConstraintKind::StartBeforeEnd, item(200, 300)),
            (ConstraintKind::EndBeforeStart, item(0, 100)),
        ];
        for (kind, mut a) in cases {
            assert_eq!(apply(kind, 0, &mut a, b), RepairOutcome::Unchanged);
        }
    }

    #[test]
    fn test_missing_b_is_skipped() {
        let mut a = item(0, 10);
        let outcome = apply(ConstraintKind::EndBeforeStart, 0, &mut a, None);
        assert_eq!(outcome, RepairOutcome::Skipped(SkipReason::MissingItemB));
    }

    #[test]
    fn test_reversed_intervals_are_skipped() {
        let mut a = item(50, 10);
        let outcome = apply(ConstraintKind::StartAfterEnd, 0, &mut a, Some(span(100, 200)));
        assert_eq!(outcome, RepairOutcome::Skipped(SkipReason::MalformedTime));
        assert_eq!(a.span(), span(50, 10));

        let mut a = item(0, 10);
        let outcome = apply(ConstraintKind::StartAfterEnd, 0, &mut a, Some(span(200, 100)));
        assert_eq!(outcome, RepairOutcome::Skipped(SkipReason::MalformedTime));
    }

    #[test]
    fn test_unknown_kind_is_noop() {
        let mut a = item(0, 10);
        let outcome = apply(ConstraintKind::parse("overlaps"), 0, &mut a, Some(span(0, 10)));
        assert_eq!(outcome, RepairOutcome::Skipped(SkipReason::UnknownKind));
        assert_eq!(a.span(), span(0, 10));
    }

    #[test]
    fn test_overflow_is_skipped() {
        let mut a = item(0, 10);
        let outcome = apply(ConstraintKind::StartOffset, i64::MAX / 2, &mut a, Some(span(0, 10)));
        assert_eq!(outcome, RepairOutcome::Skipped(SkipReason::MalformedTime));
        assert_eq!(a.span(), span(0, 10));
    }
}
