//! Interval constraint propagation for interactive timelines.
//!
//! Keeps a set of time-boxed items consistent with the relational
//! constraints between them (precedence, fixed offsets, fixed durations)
//! by repeatedly repairing violated constraints until nothing moves.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Item`, `Constraint`, `ConstraintKind`,
//!   and the `Timeline` store that owns them
//! - **`solver`**: Greedy fixed-point repair in full and realtime passes
//! - **`validation`**: Constraint predicates and input integrity checks
//! - **`detector`**: Snapshot-diff change detection
//! - **`propagator`**: Debounced, clock-injected driver tying edits to passes
//! - **`config`**: Solver tuning, loadable from TOML
//! - **`scenario`**: Demo and random constraint networks
//!
//! # Architecture
//!
//! The solver is a local-repair heuristic, not a complete constraint
//! solver: it never backtracks, and unsatisfiable or cyclic networks stop
//! at the iteration cap and are reported through per-constraint validity.
//!
//! # References
//!
//! - Dechter, Meiri & Pearl (1991), "Temporal Constraint Networks"
//! - Allen (1983), "Maintaining Knowledge about Temporal Intervals"

pub mod config;
pub mod detector;
pub mod error;
pub mod models;
pub mod propagator;
pub mod scenario;
pub mod solver;
pub mod validation;

pub use config::SolverConfig;
pub use error::{ConfigError, TimelineError};
pub use models::{Constraint, ConstraintKind, Item, Timeline};
pub use propagator::Propagator;
pub use solver::{ConstraintSolver, PassMode, SolveReport};
