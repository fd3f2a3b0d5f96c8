//! Item (time-boxed interval) model.
//!
//! An item is a named interval on the timeline. The solver only ever
//! touches `start_ms` and `end_ms`; everything else is opaque metadata
//! owned by the consumer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Milliseconds in one minute. Offsets and tolerances are expressed in minutes.
pub const MINUTE_MS: i64 = 60_000;

/// A time-boxed item on the timeline.
///
/// # Time Representation
/// All times are in milliseconds relative to an epoch (t=0) chosen by
/// the consumer (e.g., project start, midnight UTC).
///
/// # Invariant
/// `start_ms <= end_ms` is expected but not enforced. A `FixedDuration`
/// constraint with a negative offset, or a direct edit, may reverse the
/// interval; positional repairs skip reversed items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item identifier.
    pub id: String,
    /// Human-readable name (used in constraint descriptions).
    pub name: String,
    /// Start instant (ms).
    pub start_ms: i64,
    /// End instant (ms).
    pub end_ms: i64,
    /// Domain-specific key-value metadata. Never read by the solver.
    pub attributes: HashMap<String, String>,
}

impl Item {
    /// Creates a new item spanning `[start_ms, end_ms]`.
    pub fn new(id: impl Into<String>, start_ms: i64, end_ms: i64) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            start_ms,
            end_ms,
            attributes: HashMap::new(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a domain-specific attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Duration (end - start) in ms. Negative for a reversed interval.
    #[inline]
    pub fn duration_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    /// Whether `start_ms <= end_ms`.
    #[inline]
    pub fn is_well_formed(&self) -> bool {
        self.start_ms <= self.end_ms
    }

    /// Name for display; falls back to the id when no name is set.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Current interval as a snapshot.
    pub fn span(&self) -> Span {
        Span {
            start_ms: self.start_ms,
            end_ms: self.end_ms,
        }
    }

    /// Moves the item so it starts at `start_ms`, keeping its duration.
    ///
    /// Returns `None` (and leaves the item untouched) on overflow.
    pub(crate) fn shift_to_start(&mut self, start_ms: i64) -> Option<()> {
        let end_ms = start_ms.checked_add(self.end_ms.checked_sub(self.start_ms)?)?;
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        Some(())
    }

    /// Moves the item so it ends at `end_ms`, keeping its duration.
    ///
    /// Returns `None` (and leaves the item untouched) on overflow.
    pub(crate) fn shift_to_end(&mut self, end_ms: i64) -> Option<()> {
        let start_ms = end_ms.checked_sub(self.end_ms.checked_sub(self.start_ms)?)?;
        self.start_ms = start_ms;
        self.end_ms = end_ms;
        Some(())
    }
}

/// A `{start, end}` snapshot of an item's interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Start instant (ms).
    pub start_ms: i64,
    /// End instant (ms).
    pub end_ms: i64,
}

impl Span {
    /// Creates a span.
    pub fn new(start_ms: i64, end_ms: i64) -> Self {
        Self { start_ms, end_ms }
    }
}
