//! Item and constraint stores.
//!
//! A [`Timeline`] owns the items and the constraints between them.
//! Every external edit goes through it, so it can keep referential
//! integrity (removing an item removes its constraints) and journal
//! which items changed for the next realtime pass.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Constraint, Item};
use crate::error::TimelineError;

/// Items plus the constraints between them.
///
/// Items and constraints keep insertion order; constraint order breaks
/// ties between constraints of equal priority during solving.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timeline {
    items: Vec<Item>,
    constraints: Vec<Constraint>,
    #[serde(skip)]
    journal: Vec<String>,
}

impl Timeline {
    /// Creates an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    // ================================
    // Items
    // ================================

    /// All items in insertion order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Finds an item by ID.
    pub fn item(&self, id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Number of items.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Adds an item.
    ///
    /// # Errors
    /// Duplicate ID, or `start_ms > end_ms`.
    pub fn insert_item(&mut self, item: Item) -> Result<(), TimelineError> {
        if self.item(&item.id).is_some() {
            return Err(TimelineError::DuplicateItem(item.id));
        }
        if !item.is_well_formed() {
            return Err(TimelineError::ReversedInterval {
                id: item.id,
                start_ms: item.start_ms,
                end_ms: item.end_ms,
            });
        }
        self.record_change(&item.id);
        self.items.push(item);
        Ok(())
    }

    /// Builder: adds an item and returns self.
    pub fn with_item(mut self, item: Item) -> Result<Self, TimelineError> {
        self.insert_item(item)?;
        Ok(self)
    }

    /// Sets an item's interval.
    ///
    /// Reversed intervals are accepted here, since interactive resizing
    /// can pass through them; positional repairs skip such items until a
    /// duration repair or another edit fixes them.
    pub fn set_interval(
        &mut self,
        id: &str,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<(), TimelineError> {
        let item = self.item_mut(id)?;
        if item.start_ms == start_ms && item.end_ms == end_ms {
            return Ok(());
        }
        item.start_ms = start_ms;
        item.end_ms = end_ms;
        self.record_change(id);
        Ok(())
    }

    /// Moves an item to start at `start_ms`, keeping its duration.
    ///
    /// # Errors
    /// Unknown ID, or a new end that does not fit in `i64`.
    pub fn move_item(&mut self, id: &str, start_ms: i64) -> Result<(), TimelineError> {
        let item = self.item_mut(id)?;
        let end_ms = item
            .end_ms
            .checked_sub(item.start_ms)
            .and_then(|duration| start_ms.checked_add(duration))
            .ok_or_else(|| TimelineError::TimeOverflow(id.to_string()))?;
        self.set_interval(id, start_ms, end_ms)
    }

    /// Renames an item and refreshes the generated descriptions of its
    /// constraints. Descriptions set explicitly are kept.
    pub fn rename_item(&mut self, id: &str, name: impl Into<String>) -> Result<(), TimelineError> {
        let generated: Vec<bool> = self
            .constraints
            .iter()
            .map(|c| c.references(id) && c.description == self.describe(c))
            .collect();
        self.item_mut(id)?.name = name.into();
        for (pos, refresh) in generated.into_iter().enumerate() {
            if refresh {
                let text = self.describe(&self.constraints[pos]);
                self.constraints[pos].description = text;
            }
        }
        Ok(())
    }

    /// Removes an item and every constraint that references it.
    ///
    /// Returns the removed item and the IDs of the removed constraints.
    pub fn remove_item(&mut self, id: &str) -> Result<(Item, Vec<String>), TimelineError> {
        let pos = self
            .items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| TimelineError::UnknownItem(id.to_string()))?;
        let item = self.items.remove(pos);

        let mut removed = Vec::new();
        self.constraints.retain(|c| {
            if c.references(id) {
                removed.push(c.id.clone());
                false
            } else {
                true
            }
        });
        self.journal.retain(|j| j != id);

        Ok((item, removed))
    }

    fn item_mut(&mut self, id: &str) -> Result<&mut Item, TimelineError> {
        self.items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| TimelineError::UnknownItem(id.to_string()))
    }

    // ================================
    // Constraints
    // ================================

    /// All constraints in insertion order.
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    /// Finds a constraint by ID.
    pub fn constraint(&self, id: &str) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.id == id)
    }

    /// Number of constraints.
    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Constraints that reference an item as `item_a` or `item_b`.
    pub fn constraints_for_item<'a>(
        &'a self,
        item_id: &'a str,
    ) -> impl Iterator<Item = &'a Constraint> + 'a {
        self.constraints.iter().filter(move |c| c.references(item_id))
    }

    /// Adds a constraint.
    ///
    /// An empty description is filled in from the item names. Referenced
    /// items are journaled so the next pass checks the new relation.
    /// Dangling item references are accepted; the solver treats such
    /// constraints as unsatisfiable.
    ///
    /// # Errors
    /// Duplicate ID, empty `item_a`, or a relational kind without `item_b`.
    pub fn add_constraint(&mut self, mut constraint: Constraint) -> Result<(), TimelineError> {
        if self.constraint(&constraint.id).is_some() {
            return Err(TimelineError::DuplicateConstraint(constraint.id));
        }
        check_shape(&constraint)?;
        if constraint.description.is_empty() {
            constraint.description = self.describe(&constraint);
        }
        self.journal_references(&constraint);
        self.constraints.push(constraint);
        Ok(())
    }

    /// Builder: adds a constraint and returns self.
    pub fn with_constraint(mut self, constraint: Constraint) -> Result<Self, TimelineError> {
        self.add_constraint(constraint)?;
        Ok(self)
    }

    /// Replaces the constraint with the same ID, keeping its position
    /// and its cached validity.
    ///
    /// The description is regenerated unless `updated` carries one.
    pub fn update_constraint(&mut self, mut updated: Constraint) -> Result<(), TimelineError> {
        let pos = self
            .constraints
            .iter()
            .position(|c| c.id == updated.id)
            .ok_or_else(|| TimelineError::UnknownConstraint(updated.id.clone()))?;
        check_shape(&updated)?;
        if updated.description.is_empty() {
            updated.description = self.describe(&updated);
        }
        updated.is_valid = self.constraints[pos].is_valid;
        self.journal_references(&updated);
        self.constraints[pos] = updated;
        Ok(())
    }

    /// Removes a constraint.
    pub fn remove_constraint(&mut self, id: &str) -> Result<Constraint, TimelineError> {
        let pos = self
            .constraints
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| TimelineError::UnknownConstraint(id.to_string()))?;
        Ok(self.constraints.remove(pos))
    }

    /// Display string for a constraint, using current item names.
    pub fn describe(&self, constraint: &Constraint) -> String {
        let name_a = self.item(&constraint.item_a).map(Item::display_name);
        let name_b = constraint
            .item_b
            .as_deref()
            .and_then(|id| self.item(id))
            .map(Item::display_name);
        Constraint::describe(&constraint.kind, name_a, name_b, constraint.offset_min)
    }

    /// Writes validity from a full pass into the cached `is_valid` flags.
    ///
    /// Constraints missing from the map keep their cached value.
    pub fn apply_validity(&mut self, validity: &BTreeMap<String, bool>) {
        for c in &mut self.constraints {
            if let Some(&valid) = validity.get(&c.id) {
                c.is_valid = valid;
            }
        }
    }

    /// IDs of constraints whose cached validity is `false`.
    pub fn invalid_constraints(&self) -> Vec<&str> {
        self.constraints
            .iter()
            .filter(|c| !c.is_valid)
            .map(|c| c.id.as_str())
            .collect()
    }

    // ================================
    // Solving & Change Journal
    // ================================

    /// Mutable items and shared constraints, for handing to the solver.
    ///
    /// Writes through this borrow are not journaled.
    pub fn split_mut(&mut self) -> (&mut [Item], &[Constraint]) {
        (&mut self.items, &self.constraints)
    }

    /// Drains the IDs of items edited since the last call, in edit order.
    pub fn take_changes(&mut self) -> Vec<String> {
        std::mem::take(&mut self.journal)
    }

    /// Whether any edits are waiting in the journal.
    pub fn has_changes(&self) -> bool {
        !self.journal.is_empty()
    }

    fn record_change(&mut self, id: &str) {
        if !self.journal.iter().any(|j| j == id) {
            self.journal.push(id.to_string());
        }
    }

    fn journal_references(&mut self, constraint: &Constraint) {
        let ids: Vec<String> = std::iter::once(constraint.item_a.clone())
            .chain(constraint.item_b.clone())
            .filter(|id| self.item(id).is_some())
            .collect();
        for id in ids {
            self.record_change(&id);
        }
    }
}

fn check_shape(constraint: &Constraint) -> Result<(), TimelineError> {
    if constraint.item_a.is_empty() {
        return Err(TimelineError::MissingItemA(constraint.id.clone()));
    }
    if constraint.kind.is_relational() && constraint.item_b.as_deref().map_or(true, str::is_empty)
    {
        return Err(TimelineError::MissingItemB {
            id: constraint.id.clone(),
            kind: constraint.kind.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConstraintKind, Span, MINUTE_MS};

    fn sample() -> Timeline {
        Timeline::new()
            .with_item(Item::new("A", 0, 60 * MINUTE_MS).with_name("Analysis"))
            .unwrap()
            .with_item(Item::new("B", 60 * MINUTE_MS, 120 * MINUTE_MS).with_name("Build"))
            .unwrap()
            .with_item(Item::new("C", 0, 10 * MINUTE_MS))
            .unwrap()
    }

    #[test]
    fn test_insert_and_lookup() {
        let timeline = sample();
        assert_eq!(timeline.item_count(), 3);
        assert_eq!(timeline.item("B").unwrap().name, "Build");
        assert!(timeline.item("Z").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicates_and_reversed() {
        let mut timeline = sample();
        assert_eq!(
            timeline.insert_item(Item::new("A", 0, 1)),
            Err(TimelineError::DuplicateItem("A".into()))
        );
        assert!(matches!(
            timeline.insert_item(Item::new("R", 10, 0)),
            Err(TimelineError::ReversedInterval { .. })
        ));
    }

    #[test]
    fn test_edits_are_journaled() {
        let mut timeline = sample();
        assert_eq!(timeline.take_changes(), vec!["A", "B", "C"]);
        assert!(!timeline.has_changes());

        timeline.move_item("B", 30 * MINUTE_MS).unwrap();
        timeline.set_interval("A", 0, 5).unwrap();
        timeline.move_item("B", 40 * MINUTE_MS).unwrap();
        assert_eq!(timeline.take_changes(), vec!["B", "A"]);
        assert_eq!(
            timeline.item("B").unwrap().span(),
            Span::new(40 * MINUTE_MS, 100 * MINUTE_MS)
        );
    }

    #[test]
    fn test_noop_edit_is_not_journaled() {
        let mut timeline = sample();
        timeline.take_changes();
        timeline.set_interval("C", 0, 10 * MINUTE_MS).unwrap();
        assert!(!timeline.has_changes());
    }

    #[test]
    fn test_edit_unknown_item() {
        let mut timeline = sample();
        assert_eq!(
            timeline.move_item("Z", 0),
            Err(TimelineError::UnknownItem("Z".into()))
        );
    }

    #[test]
    fn test_add_constraint_generates_description() {
        let mut timeline = sample();
        timeline
            .add_constraint(Constraint::start_after_end("c1", "B", "A"))
            .unwrap();
        assert_eq!(
            timeline.constraint("c1").unwrap().description,
            "Build must start after Analysis ends"
        );

        timeline
            .add_constraint(Constraint::fixed_duration("c2", "C", 10).with_description("custom"))
            .unwrap();
        assert_eq!(timeline.constraint("c2").unwrap().description, "custom");
    }

    #[test]
    fn test_add_constraint_shape_errors() {
        let mut timeline = sample();
        timeline
            .add_constraint(Constraint::fixed_duration("c1", "A", 60))
            .unwrap();

        assert_eq!(
            timeline.add_constraint(Constraint::fixed_duration("c1", "B", 60)),
            Err(TimelineError::DuplicateConstraint("c1".into()))
        );
        assert!(matches!(
            timeline.add_constraint(Constraint::new("c2", ConstraintKind::StartOffset, "A", None, 5)),
            Err(TimelineError::MissingItemB { .. })
        ));
        assert_eq!(
            timeline.add_constraint(Constraint::fixed_duration("c3", "", 5)),
            Err(TimelineError::MissingItemA("c3".into()))
        );
    }

    #[test]
    fn test_add_constraint_journals_referenced_items() {
        let mut timeline = sample();
        timeline.take_changes();
        timeline
            .add_constraint(Constraint::start_offset("c1", "C", "A", 15))
            .unwrap();
        assert_eq!(timeline.take_changes(), vec!["C", "A"]);
    }

    #[test]
    fn test_dangling_constraint_is_accepted() {
        let mut timeline = sample();
        timeline.take_changes();
        timeline
            .add_constraint(Constraint::end_before_start("c1", "A", "ghost"))
            .unwrap();
        assert_eq!(timeline.take_changes(), vec!["A"]);
        assert_eq!(
            timeline.constraint("c1").unwrap().description,
            "Analysis must end before item B starts"
        );
    }

    #[test]
    fn test_remove_item_cascades() {
        let mut timeline = sample()
            .with_constraint(Constraint::start_after_end("c1", "B", "A"))
            .unwrap()
            .with_constraint(Constraint::fixed_duration("c2", "A", 60))
            .unwrap()
            .with_constraint(Constraint::start_offset("c3", "C", "B", 0))
            .unwrap();

        let (item, removed) = timeline.remove_item("A").unwrap();
        assert_eq!(item.id, "A");
        assert_eq!(removed, vec!["c1", "c2"]);
        assert_eq!(timeline.constraint_count(), 1);
        assert!(timeline.constraint("c3").is_some());
        assert!(timeline.constraints_for_item("A").next().is_none());
        assert!(!timeline.take_changes().contains(&"A".to_string()));
    }

    #[test]
    fn test_update_constraint_keeps_position() {
        let mut timeline = sample()
            .with_constraint(Constraint::start_after_end("c1", "B", "A"))
            .unwrap()
            .with_constraint(Constraint::fixed_duration("c2", "A", 60))
            .unwrap();

        timeline
            .update_constraint(Constraint::start_offset("c1", "B", "A", 30))
            .unwrap();

        let ids: Vec<&str> = timeline.constraints().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        let c1 = timeline.constraint("c1").unwrap();
        assert_eq!(c1.kind, ConstraintKind::StartOffset);
        assert_eq!(c1.description, "Build must start 30 minutes after Analysis starts");

        assert_eq!(
            timeline.update_constraint(Constraint::fixed_duration("zz", "A", 1)),
            Err(TimelineError::UnknownConstraint("zz".into()))
        );
    }

    #[test]
    fn test_rename_refreshes_descriptions() {
        let mut timeline = sample()
            .with_constraint(Constraint::fixed_duration("c1", "A", 60))
            .unwrap();
        timeline.rename_item("A", "Requirements").unwrap();
        assert_eq!(
            timeline.constraint("c1").unwrap().description,
            "Requirements must last exactly 60 minutes"
        );
    }

    #[test]
    fn test_rename_keeps_explicit_descriptions() {
        let mut timeline = sample()
            .with_constraint(Constraint::fixed_duration("c1", "A", 1).with_description("custom"))
            .unwrap()
            .with_constraint(Constraint::start_after_end("c2", "B", "A"))
            .unwrap();

        timeline.rename_item("A", "Req").unwrap();

        assert_eq!(timeline.constraint("c1").unwrap().description, "custom");
        assert_eq!(
            timeline.constraint("c2").unwrap().description,
            "Build must start after Req ends"
        );
    }

    #[test]
    fn test_update_constraint_keeps_cached_validity() {
        let mut timeline = sample()
            .with_constraint(Constraint::start_after_end("c1", "B", "A"))
            .unwrap();
        timeline.apply_validity(&BTreeMap::from([("c1".to_string(), false)]));

        timeline
            .update_constraint(Constraint::start_offset("c1", "B", "A", 30))
            .unwrap();

        assert!(!timeline.constraint("c1").unwrap().is_valid);
        assert_eq!(timeline.invalid_constraints(), vec!["c1"]);
    }

    #[test]
    fn test_move_item_overflow_is_an_error() {
        let mut timeline = sample();
        timeline.take_changes();

        assert_eq!(
            timeline.move_item("A", i64::MAX),
            Err(TimelineError::TimeOverflow("A".into()))
        );
        assert_eq!(timeline.item("A").unwrap().span(), Span::new(0, 60 * MINUTE_MS));
        assert!(!timeline.has_changes());

        timeline.move_item("A", 30 * MINUTE_MS).unwrap();
        assert_eq!(
            timeline.item("A").unwrap().span(),
            Span::new(30 * MINUTE_MS, 90 * MINUTE_MS)
        );
    }

    #[test]
    fn test_apply_validity() {
        let mut timeline = sample()
            .with_constraint(Constraint::start_after_end("c1", "B", "A"))
            .unwrap()
            .with_constraint(Constraint::fixed_duration("c2", "A", 60))
            .unwrap();

        let validity = BTreeMap::from([("c1".to_string(), false)]);
        timeline.apply_validity(&validity);

        assert_eq!(timeline.invalid_constraints(), vec!["c1"]);
        assert!(timeline.constraint("c2").unwrap().is_valid);
    }

    #[test]
    fn test_serde_skips_journal() {
        let timeline = sample();
        let json = serde_json::to_string(&timeline).unwrap();
        let restored: Timeline = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.item_count(), 3);
        assert!(!restored.has_changes());
    }
}
