//! Timeline domain models.
//!
//! Provides the data types the solver works on: time-boxed items, the
//! relational constraints between them, and the store that owns both.
//!
//! # Domain Mappings
//!
//! | u-timeline | Project Planning | Media Editing | Operations |
//! |------------|------------------|---------------|------------|
//! | Item | Task | Clip | Shift |
//! | Constraint | Dependency | Sync Point | Handover Rule |
//! | Timeline | Project Plan | Sequence | Roster |

mod constraint;
mod item;
mod timeline;

pub use constraint::{Constraint, ConstraintKind};
pub use item::{Item, Span, MINUTE_MS};
pub use timeline::Timeline;
