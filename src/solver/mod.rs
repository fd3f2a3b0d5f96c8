//! Fixed-point constraint solver over timeline items.
//!
//! # Algorithm
//!
//! 1. Order the constraints by [`ConstraintKind::rank`] (stable, so
//!    insertion order breaks ties).
//! 2. Each round, apply every constraint's repair rule in that order.
//!    Repairs are greedy and local: only `item_a` moves.
//! 3. Stop after a round with no repairs (converged) or when the round
//!    cap is hit. Hitting the cap is not an error; it means the network
//!    is over-constrained or cyclic and the result is best-effort.
//!
//! Two pass flavours share the loop:
//! - **Full pass** ([`ConstraintSolver::solve`]): every constraint,
//!   `max_iterations` rounds, validity recomputed at the end.
//! - **Realtime pass** ([`ConstraintSolver::solve_realtime`]): only
//!   constraints touching a changed item, `realtime_iterations` rounds,
//!   no validity. Cheap enough to run on every drag tick.
//!
//! # Re-entrancy
//!
//! A solver owns a busy flag. While a pass runs, any other pass on the
//! same solver returns `None` immediately. Dropped passes are safe: the
//! next notification or poll rediscovers whatever is still unresolved.
//!
//! # Complexity
//! O(r * (c log c + c)) where r = rounds, c = constraints considered.

mod observer;
pub mod rules;

pub use observer::{NoopObserver, RepairEvent, RepairLog, RepairObserver, RepairRecord};
pub use rules::{RepairOutcome, RuleParams, SkipReason};

use std::cell::Cell;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SolverConfig;
use crate::error::ConfigError;
use crate::models::{Constraint, Item};
use crate::validation::relation_holds;

/// Which kind of pass produced a report or repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassMode {
    /// Exhaustive pass over every constraint.
    Full,
    /// Scoped, low-latency pass over constraints touching changed items.
    Realtime,
}

/// Summary of one solver pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveReport {
    /// Pass flavour.
    pub mode: PassMode,
    /// Rounds executed (at least 1).
    pub rounds: usize,
    /// Total repairs applied across all rounds.
    pub repairs: usize,
    /// Whether the last round applied no repairs.
    pub converged: bool,
    /// Number of constraints the pass looked at.
    pub considered: usize,
    /// IDs of items moved by the pass.
    pub moved: BTreeSet<String>,
    /// IDs of constraints whose rule was skipped (missing items,
    /// malformed times, unknown kinds).
    pub skipped: BTreeSet<String>,
    /// Constraint ID → validity after the pass. Full passes only.
    pub validity: Option<BTreeMap<String, bool>>,
}

impl SolveReport {
    /// Whether the pass hit its round cap without converging.
    pub fn hit_cap(&self) -> bool {
        !self.converged
    }
}

/// Releases the busy flag when a pass ends, including on unwind.
struct BusyGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}

/// Greedy, order-dependent local-repair solver.
///
/// Holds its own configuration and busy flag, so independent solvers
/// never interfere with each other.
///
/// # Example
///
/// ```
/// use u_timeline::models::{Constraint, Item, MINUTE_MS};
/// use u_timeline::solver::ConstraintSolver;
///
/// let mut items = vec![
///     Item::new("A", 600 * MINUTE_MS, 720 * MINUTE_MS),
///     Item::new("B", 675 * MINUTE_MS, 765 * MINUTE_MS),
/// ];
/// let constraints = vec![Constraint::start_offset("c1", "B", "A", 15)];
///
/// let solver = ConstraintSolver::new();
/// let report = solver.solve(&mut items, &constraints).unwrap();
///
/// assert!(report.converged);
/// assert_eq!(items[1].start_ms, 615 * MINUTE_MS);
/// assert_eq!(report.validity.unwrap()["c1"], true);
/// ```
#[derive(Debug, Default)]
pub struct ConstraintSolver {
    config: SolverConfig,
    busy: Cell<bool>,
}

impl ConstraintSolver {
    /// Creates a solver with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a solver with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration fails
    /// [`SolverConfig::validate`].
    pub fn with_config(config: SolverConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            busy: Cell::new(false),
        })
    }

    /// The solver's configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Whether a pass is currently running.
    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    fn params(&self) -> RuleParams {
        RuleParams {
            tolerance_ms: self.config.tolerance_ms,
            buffer_ms: self.config.buffer_ms,
        }
    }

    /// Runs a full pass.
    ///
    /// Returns `None` without touching anything if a pass is already
    /// running on this solver.
    pub fn solve(&self, items: &mut [Item], constraints: &[Constraint]) -> Option<SolveReport> {
        self.solve_observed(items, constraints, &mut NoopObserver)
    }

    /// Runs a full pass, reporting each repair to `observer`.
    pub fn solve_observed(
        &self,
        items: &mut [Item],
        constraints: &[Constraint],
        observer: &mut dyn RepairObserver,
    ) -> Option<SolveReport> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!(event = "full_pass_dropped", reason = "busy");
            return None;
        };

        let scope: Vec<&Constraint> = constraints.iter().collect();
        let mut report = self.run(
            PassMode::Full,
            items,
            scope,
            self.config.max_iterations,
            observer,
        );

        if !report.converged {
            warn!(
                event = "full_pass_not_converged",
                rounds = report.rounds,
                repairs = report.repairs,
                "iteration cap reached; constraints may conflict or form a cycle"
            );
        }

        let index = index_items(items);
        let tolerance_ms = self.config.tolerance_ms;
        let validity = constraints
            .iter()
            .map(|c| {
                let (a, b) = resolve(c, items, &index);
                (c.id.clone(), relation_holds(c, a, b, tolerance_ms))
            })
            .collect();
        report.validity = Some(validity);

        info!(
            event = "full_pass_end",
            rounds = report.rounds,
            repairs = report.repairs,
            converged = report.converged,
        );
        Some(report)
    }

    /// Runs a realtime pass limited to constraints that reference one of
    /// `changed` as `item_a` or `item_b`.
    ///
    /// Validity is not recomputed. Returns `None` if a pass is already
    /// running on this solver.
    pub fn solve_realtime<S: AsRef<str>>(
        &self,
        items: &mut [Item],
        constraints: &[Constraint],
        changed: &[S],
    ) -> Option<SolveReport> {
        self.solve_realtime_observed(items, constraints, changed, &mut NoopObserver)
    }

    /// Realtime pass with a repair observer.
    pub fn solve_realtime_observed<S: AsRef<str>>(
        &self,
        items: &mut [Item],
        constraints: &[Constraint],
        changed: &[S],
        observer: &mut dyn RepairObserver,
    ) -> Option<SolveReport> {
        let Some(_guard) = BusyGuard::acquire(&self.busy) else {
            debug!(event = "realtime_pass_dropped", reason = "busy");
            return None;
        };

        let changed: HashSet<&str> = changed.iter().map(AsRef::as_ref).collect();
        let scope: Vec<&Constraint> = constraints
            .iter()
            .filter(|c| {
                changed.contains(c.item_a.as_str())
                    || c.item_b.as_deref().is_some_and(|b| changed.contains(b))
            })
            .collect();

        let report = self.run(
            PassMode::Realtime,
            items,
            scope,
            self.config.realtime_iterations,
            observer,
        );

        debug!(
            event = "realtime_pass_end",
            considered = report.considered,
            rounds = report.rounds,
            repairs = report.repairs,
            converged = report.converged,
        );
        Some(report)
    }

    fn run(
        &self,
        mode: PassMode,
        items: &mut [Item],
        mut scope: Vec<&Constraint>,
        max_rounds: usize,
        observer: &mut dyn RepairObserver,
    ) -> SolveReport {
        // The set is fixed for the whole pass, so one stable sort serves every round.
        scope.sort_by_key(|c| c.kind.rank());

        let index = index_items(items);
        let params = self.params();
        let mut report = SolveReport {
            mode,
            rounds: 0,
            repairs: 0,
            converged: false,
            considered: scope.len(),
            moved: BTreeSet::new(),
            skipped: BTreeSet::new(),
            validity: None,
        };

        while report.rounds < max_rounds.max(1) {
            report.rounds += 1;
            let mut changed = false;

            for &constraint in &scope {
                let outcome = apply_one(constraint, items, &index, params);
                match outcome {
                    RepairOutcome::Unchanged => {}
                    RepairOutcome::Repaired { before, after } => {
                        changed = true;
                        report.repairs += 1;
                        report.moved.insert(constraint.item_a.clone());
                        debug!(
                            event = "repair",
                            mode = ?mode,
                            round = report.rounds,
                            constraint = %constraint.id,
                            kind = %constraint.kind,
                            item = %constraint.item_a,
                            before_start = before.start_ms,
                            before_end = before.end_ms,
                            after_start = after.start_ms,
                            after_end = after.end_ms,
                        );
                        observer.on_repair(&RepairEvent {
                            constraint,
                            mode,
                            round: report.rounds,
                            item_id: &constraint.item_a,
                            before,
                            after,
                        });
                    }
                    RepairOutcome::Skipped(reason) => {
                        if report.skipped.insert(constraint.id.clone()) {
                            warn!(
                                event = "repair_skipped",
                                constraint = %constraint.id,
                                kind = %constraint.kind,
                                reason = ?reason,
                            );
                        }
                    }
                }
            }

            if !changed {
                report.converged = true;
                break;
            }
        }

        report
    }
}

/// Item ID → position. The first occurrence wins for duplicate IDs.
fn index_items(items: &[Item]) -> HashMap<String, usize> {
    let mut index = HashMap::with_capacity(items.len());
    for (pos, item) in items.iter().enumerate() {
        index.entry(item.id.clone()).or_insert(pos);
    }
    index
}

fn resolve<'a>(
    constraint: &Constraint,
    items: &'a [Item],
    index: &HashMap<String, usize>,
) -> (Option<&'a Item>, Option<&'a Item>) {
    let a = index.get(&constraint.item_a).map(|&i| &items[i]);
    let b = constraint
        .item_b
        .as_ref()
        .and_then(|id| index.get(id))
        .map(|&i| &items[i]);
    (a, b)
}

fn apply_one(
    constraint: &Constraint,
    items: &mut [Item],
    index: &HashMap<String, usize>,
    params: RuleParams,
) -> RepairOutcome {
    let Some(&a_pos) = index.get(&constraint.item_a) else {
        return RepairOutcome::Skipped(SkipReason::MissingItemA);
    };
    let b_span = constraint
        .item_b
        .as_ref()
        .and_then(|id| index.get(id))
        .map(|&i| items[i].span());

    rules::apply_rule(
        &constraint.kind,
        constraint.offset_min,
        &mut items[a_pos],
        b_span,
        params,
    )
}
