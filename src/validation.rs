//! Constraint satisfaction checks and input validation.
//!
//! Two kinds of checks live here:
//! - [`validate_constraint`] / [`validate_constraints`]: the relation
//!   predicate evaluated after every full pass to refresh cached validity.
//!   It uses the same tolerance window as the repair rules.
//! - [`validate_input`]: structural integrity of an item/constraint set
//!   (duplicate IDs, dangling references, missing `item_b`, reversed
//!   intervals). The solver tolerates all of these; this is for callers
//!   that want to reject bad input up front.
//!
//! Cycle and conflict detection are deliberately absent. A cyclic network
//! shows up as a full pass that does not converge.

use crate::models::{Constraint, ConstraintKind, Item, MINUTE_MS};
use std::collections::{BTreeMap, HashSet};

// ================================
// Relation Predicate
// ================================

/// Evaluates whether `constraint` holds for the given items.
///
/// `a` and `b` are the resolved `item_a` / `item_b` (`None` if missing
/// from the store). Rules:
/// - missing `item_a` → `false` for every kind
/// - `FixedDuration`: `|duration(A) - offset| < tolerance`; a negative
///   offset never holds
/// - ordering kinds: exact comparison, no tolerance
/// - `StartOffset` / `StartExact`: `|A.start - (B.start + offset)| < tolerance`
/// - missing `item_b` for a relational kind → `false`
/// - `Unknown` → `false`
pub fn relation_holds(
    constraint: &Constraint,
    a: Option<&Item>,
    b: Option<&Item>,
    tolerance_ms: i64,
) -> bool {
    let Some(a) = a else {
        return false;
    };

    if constraint.kind == ConstraintKind::FixedDuration {
        if constraint.offset_min < 0 {
            return false;
        }
        return match constraint.offset_min.checked_mul(MINUTE_MS) {
            Some(target) => within(a.end_ms.checked_sub(a.start_ms), target, tolerance_ms),
            None => false,
        };
    }

    let Some(b) = b else {
        return false;
    };

    match &constraint.kind {
        ConstraintKind::StartAfterEnd => a.start_ms >= b.end_ms,
        ConstraintKind::StartBeforeStart => a.start_ms <= b.start_ms,
        ConstraintKind::StartBeforeEnd => a.start_ms <= b.end_ms,
        ConstraintKind::EndBeforeStart => a.end_ms <= b.start_ms,
        ConstraintKind::StartOffset | ConstraintKind::StartExact => {
            match offset_target(b.start_ms, constraint.offset_min) {
                Some(target) => within(Some(a.start_ms), target, tolerance_ms),
                None => false,
            }
        }
        ConstraintKind::FixedDuration | ConstraintKind::Unknown(_) => false,
    }
}

/// `B.start + offset minutes`, or `None` on overflow.
pub(crate) fn offset_target(start_ms: i64, offset_min: i64) -> Option<i64> {
    start_ms.checked_add(offset_min.checked_mul(MINUTE_MS)?)
}

fn within(value: Option<i64>, target: i64, tolerance_ms: i64) -> bool {
    match value.and_then(|v| v.checked_sub(target)) {
        Some(diff) => diff.unsigned_abs() < tolerance_ms.unsigned_abs(),
        None => false,
    }
}

/// Evaluates one constraint against an item list (linear lookup).
pub fn validate_constraint(constraint: &Constraint, items: &[Item], tolerance_ms: i64) -> bool {
    let a = items.iter().find(|i| i.id == constraint.item_a);
    let b = constraint
        .item_b
        .as_deref()
        .and_then(|id| items.iter().find(|i| i.id == id));
    relation_holds(constraint, a, b, tolerance_ms)
}

/// Evaluates every constraint; returns constraint ID → validity.
pub fn validate_constraints(
    constraints: &[Constraint],
    items: &[Item],
    tolerance_ms: i64,
) -> BTreeMap<String, bool> {
    constraints
        .iter()
        .map(|c| (c.id.clone(), validate_constraint(c, items, tolerance_ms)))
        .collect()
}

// ================================
// Structural Validation
// ================================

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two items or two constraints share the same ID.
    DuplicateId,
    /// A constraint references an item that doesn't exist.
    DanglingReference,
    /// A relational constraint has no `item_b`.
    MissingItemB,
    /// A relational constraint relates an item to itself.
    SelfReference,
    /// An item starts after it ends.
    ReversedInterval,
    /// A constraint kind this version does not understand.
    UnknownKind,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates an item/constraint set.
///
/// Checks:
/// 1. No duplicate item IDs
/// 2. No duplicate constraint IDs
/// 3. Every item has `start <= end`
/// 4. Every `item_a` / `item_b` reference points to an existing item
/// 5. Relational kinds carry an `item_b` that differs from `item_a`
/// 6. Every kind is known
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(items: &[Item], constraints: &[Constraint]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut item_ids = HashSet::new();
    for item in items {
        if !item_ids.insert(item.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate item ID: {}", item.id),
            ));
        }
        if !item.is_well_formed() {
            errors.push(ValidationError::new(
                ValidationErrorKind::ReversedInterval,
                format!(
                    "Item '{}' starts at {} after it ends at {}",
                    item.id, item.start_ms, item.end_ms
                ),
            ));
        }
    }

    let mut constraint_ids = HashSet::new();
    for c in constraints {
        if !constraint_ids.insert(c.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate constraint ID: {}", c.id),
            ));
        }

        if let ConstraintKind::Unknown(name) = &c.kind {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownKind,
                format!("Constraint '{}' has unknown type '{name}'", c.id),
            ));
        }

        if !item_ids.contains(c.item_a.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DanglingReference,
                format!("Constraint '{}' references unknown item '{}'", c.id, c.item_a),
            ));
        }

        if !c.kind.is_relational() {
            continue;
        }
        match c.item_b.as_deref() {
            None => errors.push(ValidationError::new(
                ValidationErrorKind::MissingItemB,
                format!("Constraint '{}' of type '{}' has no item B", c.id, c.kind),
            )),
            Some(b) if b == c.item_a => errors.push(ValidationError::new(
                ValidationErrorKind::SelfReference,
                format!("Constraint '{}' relates item '{b}' to itself", c.id),
            )),
            Some(b) if !item_ids.contains(b) => errors.push(ValidationError::new(
                ValidationErrorKind::DanglingReference,
                format!("Constraint '{}' references unknown item '{b}'", c.id),
            )),
            Some(_) => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
