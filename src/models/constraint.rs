//! Relational constraints between timeline items.
//!
//! Each constraint names a directional relation between `item_a` and
//! `item_b` (or a property of `item_a` alone) together with a repair
//! target that the solver moves `item_a` towards when the relation
//! does not hold.
//!
//! | kind | must hold | repair |
//! |------|-----------|--------|
//! | `fixed-duration` | duration(A) ≈ offset | A.end = A.start + offset |
//! | `start-after-end` | A.start ≥ B.end | A starts at B.end |
//! | `start-before-start` | A.start ≤ B.start | A starts 1 min before B.start |
//! | `start-before-end` | A.start ≤ B.end | A starts 1 min before B.end |
//! | `end-before-start` | A.end ≤ B.start | A ends 1 min before B.start |
//! | `start-offset` | A.start ≈ B.start + offset | A starts at B.start + offset |
//! | `start-exact` | same as `start-offset` | same as `start-offset` |
//!
//! Only `item_a` is ever moved. Positional repairs preserve its duration.

use serde::{Deserialize, Serialize};
use std::fmt;

// ================================
// Constraint Kind
// ================================

/// The closed set of relation kinds understood by the solver.
///
/// Unrecognized names are kept as [`ConstraintKind::Unknown`] so that
/// records written by a newer producer still load; such constraints
/// never validate and their repair is a no-op.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConstraintKind {
    /// duration(A) equals `offset` minutes (±1 min).
    FixedDuration,
    /// A starts at or after B ends.
    StartAfterEnd,
    /// A starts at or before B starts.
    StartBeforeStart,
    /// A starts at or before B ends.
    StartBeforeEnd,
    /// A ends at or before B starts.
    EndBeforeStart,
    /// A starts `offset` minutes after B starts (±1 min).
    StartOffset,
    /// Alias of `StartOffset`, kept as its own kind for display.
    StartExact,
    /// A kind this version does not know about.
    Unknown(String),
}

impl ConstraintKind {
    /// Every known kind, in priority order.
    pub const KNOWN: [ConstraintKind; 7] = [
        ConstraintKind::FixedDuration,
        ConstraintKind::EndBeforeStart,
        ConstraintKind::StartAfterEnd,
        ConstraintKind::StartBeforeStart,
        ConstraintKind::StartBeforeEnd,
        ConstraintKind::StartOffset,
        ConstraintKind::StartExact,
    ];

    /// Wire name (kebab-case).
    pub fn as_str(&self) -> &str {
        match self {
            Self::FixedDuration => "fixed-duration",
            Self::StartAfterEnd => "start-after-end",
            Self::StartBeforeStart => "start-before-start",
            Self::StartBeforeEnd => "start-before-end",
            Self::EndBeforeStart => "end-before-start",
            Self::StartOffset => "start-offset",
            Self::StartExact => "start-exact",
            Self::Unknown(name) => name,
        }
    }

    /// Parses a wire name. Unrecognized names become `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name {
            "fixed-duration" => Self::FixedDuration,
            "start-after-end" => Self::StartAfterEnd,
            "start-before-start" => Self::StartBeforeStart,
            "start-before-end" => Self::StartBeforeEnd,
            "end-before-start" => Self::EndBeforeStart,
            "start-offset" => Self::StartOffset,
            "start-exact" => Self::StartExact,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Priority rank; lower ranks are applied earlier in each round.
    ///
    /// Durations settle an item's shape first, hard ordering relations
    /// come next, and soft positional offsets last.
    pub fn rank(&self) -> u8 {
        match self {
            Self::FixedDuration => 1,
            Self::EndBeforeStart | Self::StartAfterEnd => 2,
            Self::StartBeforeStart | Self::StartBeforeEnd => 3,
            Self::StartOffset | Self::StartExact => 4,
            Self::Unknown(_) => 5,
        }
    }

    /// Whether the kind relates two items (needs `item_b`).
    pub fn is_relational(&self) -> bool {
        !matches!(self, Self::FixedDuration)
    }

    /// Whether the `offset` field carries meaning for this kind.
    pub fn uses_offset(&self) -> bool {
        matches!(
            self,
            Self::FixedDuration | Self::StartOffset | Self::StartExact
        )
    }
}

impl From<String> for ConstraintKind {
    fn from(name: String) -> Self {
        Self::parse(&name)
    }
}

impl From<ConstraintKind> for String {
    fn from(kind: ConstraintKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ================================
// Constraint Record
// ================================

/// A constraint record as held by the constraint store.
///
/// `is_valid` is a cache: it is refreshed after every full solve pass
/// and left alone by realtime passes, so it may be briefly stale while
/// items are being dragged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
    /// Unique constraint identifier.
    pub id: String,
    /// Relation kind.
    #[serde(rename = "type")]
    pub kind: ConstraintKind,
    /// The item the solver moves.
    pub item_a: String,
    /// The reference item. Required for every kind except `FixedDuration`.
    #[serde(default)]
    pub item_b: Option<String>,
    /// Signed offset in minutes (duration for `FixedDuration`).
    #[serde(default, rename = "offset")]
    pub offset_min: i64,
    /// Cached validity from the last full pass.
    #[serde(default = "default_valid")]
    pub is_valid: bool,
    /// Human-readable description for display.
    #[serde(default)]
    pub description: String,
}

fn default_valid() -> bool {
    true
}

impl Constraint {
    /// Creates a constraint with an empty description.
    pub fn new(
        id: impl Into<String>,
        kind: ConstraintKind,
        item_a: impl Into<String>,
        item_b: Option<String>,
        offset_min: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            item_a: item_a.into(),
            item_b,
            offset_min,
            is_valid: true,
            description: String::new(),
        }
    }

    /// `A` must last exactly `minutes`.
    pub fn fixed_duration(id: impl Into<String>, item: impl Into<String>, minutes: i64) -> Self {
        Self::new(id, ConstraintKind::FixedDuration, item, None, minutes)
    }

    /// `A` must start after `B` ends.
    pub fn start_after_end(
        id: impl Into<String>,
        item_a: impl Into<String>,
        item_b: impl Into<String>,
    ) -> Self {
        Self::new(id, ConstraintKind::StartAfterEnd, item_a, Some(item_b.into()), 0)
    }

    /// `A` must start before `B` starts.
    pub fn start_before_start(
        id: impl Into<String>,
        item_a: impl Into<String>,
        item_b: impl Into<String>,
    ) -> Self {
        Self::new(id, ConstraintKind::StartBeforeStart, item_a, Some(item_b.into()), 0)
    }

    /// `A` must start before `B` ends.
    pub fn start_before_end(
        id: impl Into<String>,
        item_a: impl Into<String>,
        item_b: impl Into<String>,
    ) -> Self {
        Self::new(id, ConstraintKind::StartBeforeEnd, item_a, Some(item_b.into()), 0)
    }

    /// `A` must end before `B` starts.
    pub fn end_before_start(
        id: impl Into<String>,
        item_a: impl Into<String>,
        item_b: impl Into<String>,
    ) -> Self {
        Self::new(id, ConstraintKind::EndBeforeStart, item_a, Some(item_b.into()), 0)
    }

    /// `A` must start `minutes` after `B` starts (negative = before).
    pub fn start_offset(
        id: impl Into<String>,
        item_a: impl Into<String>,
        item_b: impl Into<String>,
        minutes: i64,
    ) -> Self {
        Self::new(id, ConstraintKind::StartOffset, item_a, Some(item_b.into()), minutes)
    }

    /// Same relation as [`Constraint::start_offset`], displayed as exact.
    pub fn start_exact(
        id: impl Into<String>,
        item_a: impl Into<String>,
        item_b: impl Into<String>,
        minutes: i64,
    ) -> Self {
        Self::new(id, ConstraintKind::StartExact, item_a, Some(item_b.into()), minutes)
    }

    /// Sets an explicit description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether the constraint references `item_id` as `item_a` or `item_b`.
    pub fn references(&self, item_id: &str) -> bool {
        self.item_a == item_id || self.item_b.as_deref() == Some(item_id)
    }

    /// Builds the display string for a constraint.
    ///
    /// `name_a` / `name_b` are the item display names; `None` stands for
    /// an item that is not in the store.
    pub fn describe(
        kind: &ConstraintKind,
        name_a: Option<&str>,
        name_b: Option<&str>,
        offset_min: i64,
    ) -> String {
        let a = name_a.unwrap_or("item A");
        let b = name_b.unwrap_or("item B");
        match kind {
            ConstraintKind::FixedDuration => {
                format!("{a} must last exactly {offset_min} minutes")
            }
            ConstraintKind::StartAfterEnd => format!("{a} must start after {b} ends"),
            ConstraintKind::StartBeforeStart => format!("{a} must start before {b} starts"),
            ConstraintKind::StartBeforeEnd => format!("{a} must start before {b} ends"),
            ConstraintKind::EndBeforeStart => format!("{a} must end before {b} starts"),
            ConstraintKind::StartOffset => {
                if offset_min >= 0 {
                    format!("{a} must start {offset_min} minutes after {b} starts")
                } else {
                    format!("{a} must start {} minutes before {b} starts", -offset_min)
                }
            }
            ConstraintKind::StartExact => {
                format!("{a} must start exactly {offset_min} minutes after {b} starts")
            }
            ConstraintKind::Unknown(name) => format!("unknown constraint type '{name}'"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ConstraintKind::KNOWN {
            assert_eq!(ConstraintKind::parse(kind.as_str()), kind);
        }
        assert_eq!(
            ConstraintKind::parse("must-overlap"),
            ConstraintKind::Unknown("must-overlap".into())
        );
    }

    #[test]
    fn test_rank_order() {
        assert_eq!(ConstraintKind::FixedDuration.rank(), 1);
        assert_eq!(ConstraintKind::EndBeforeStart.rank(), 2);
        assert_eq!(ConstraintKind::StartAfterEnd.rank(), 2);
        assert_eq!(ConstraintKind::StartBeforeStart.rank(), 3);
        assert_eq!(ConstraintKind::StartBeforeEnd.rank(), 3);
        assert_eq!(ConstraintKind::StartOffset.rank(), 4);
        assert_eq!(ConstraintKind::StartExact.rank(), 4);
        assert_eq!(ConstraintKind::Unknown("x".into()).rank(), 5);

        let ranks: Vec<u8> = ConstraintKind::KNOWN.iter().map(|k| k.rank()).collect();
        let mut sorted = ranks.clone();
        sorted.sort();
        assert_eq!(ranks, sorted);
    }

    #[test]
    fn test_relational_and_offset_flags() {
        assert!(!ConstraintKind::FixedDuration.is_relational());
        assert!(ConstraintKind::StartAfterEnd.is_relational());
        assert!(ConstraintKind::FixedDuration.uses_offset());
        assert!(ConstraintKind::StartExact.uses_offset());
        assert!(!ConstraintKind::EndBeforeStart.uses_offset());
    }

    #[test]
    fn test_constructors() {
        let c = Constraint::start_offset("c1", "design", "analysis", 15);
        assert_eq!(c.kind, ConstraintKind::StartOffset);
        assert_eq!(c.item_a, "design");
        assert_eq!(c.item_b.as_deref(), Some("analysis"));
        assert_eq!(c.offset_min, 15);
        assert!(c.is_valid);

        let d = Constraint::fixed_duration("c2", "analysis", 120);
        assert!(d.item_b.is_none());
        assert!(d.references("analysis"));
        assert!(!d.references("design"));
    }

    #[test]
    fn test_describe() {
        let text = Constraint::describe(
            &ConstraintKind::StartOffset,
            Some("Design"),
            Some("Analysis"),
            15,
        );
        assert_eq!(text, "Design must start 15 minutes after Analysis starts");

        let text = Constraint::describe(&ConstraintKind::StartOffset, Some("Design"), None, -30);
        assert_eq!(text, "Design must start 30 minutes before item B starts");

        let text = Constraint::describe(&ConstraintKind::FixedDuration, Some("Analysis"), None, 120);
        assert_eq!(text, "Analysis must last exactly 120 minutes");
    }

    #[test]
    fn test_serde_wire_names() {
        let c = Constraint::end_before_start("c1", "A", "B");
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "end-before-start");
        assert_eq!(json["offset"], 0);

        let parsed: Constraint = serde_json::from_str(
            r#"{"id":"c9","type":"overlaps","item_a":"A","item_b":"B"}"#,
        )
        .unwrap();
        assert_eq!(parsed.kind, ConstraintKind::Unknown("overlaps".into()));
        assert!(parsed.is_valid);
        assert_eq!(parsed.offset_min, 0);
    }
}
