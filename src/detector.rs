//! Poll-based change detection.
//!
//! Remembers a `{start, end}` snapshot per item and reports the items
//! whose interval differs from it. This is the fallback change source
//! for hosts that cannot guarantee a notification on every mutation;
//! [`Timeline`](crate::models::Timeline) edits already journal their
//! changes explicitly.

use std::collections::{HashMap, HashSet};

use crate::models::{Item, Span};

/// Diff-based detector of item interval changes.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    known: HashMap<String, Span>,
}

impl ChangeDetector {
    /// Creates a detector with no remembered state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detector primed with the current state of `items`.
    pub fn primed(items: &[Item]) -> Self {
        let mut detector = Self::new();
        detector.update_known_states(items);
        detector
    }

    /// Returns IDs of items whose interval differs from the remembered
    /// snapshot (or that were never seen), in item order, and updates
    /// those snapshots in place.
    pub fn detect_changes(&mut self, items: &[Item]) -> Vec<String> {
        let mut changed = Vec::new();
        for item in items {
            let current = item.span();
            if self.known.get(&item.id) != Some(&current) {
                self.known.insert(item.id.clone(), current);
                changed.push(item.id.clone());
            }
        }
        changed
    }

    /// Overwrites the remembered snapshots with the current state of
    /// `items`, and forgets items that no longer exist.
    pub fn update_known_states(&mut self, items: &[Item]) {
        let live: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        self.known.retain(|id, _| live.contains(id.as_str()));
        for item in items {
            self.known.insert(item.id.clone(), item.span());
        }
    }

    /// Forgets one item.
    pub fn forget(&mut self, item_id: &str) {
        self.known.remove(item_id);
    }

    /// Remembered snapshot for an item.
    pub fn known_state(&self, item_id: &str) -> Option<Span> {
        self.known.get(item_id).copied()
    }

    /// Number of remembered items.
    pub fn len(&self) -> usize {
        self.known.len()
    }

    /// Whether nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}
