//! Single-threaded propagation driver.
//!
//! Wires the two change sources to the two solver passes:
//!
//! 1. **Notifications** ([`Propagator::notify_changed`] and journaled
//!    [`Timeline`] edits) are debounced by `notify_debounce_ms`, then fed
//!    to a realtime pass.
//! 2. **Polling** diffs item intervals against remembered snapshots every
//!    `poll_interval_ms` and feeds what moved to a realtime pass. It is a
//!    fallback for hosts that mutate items without notifying; turn it off
//!    with `polling = false` when every edit goes through the timeline.
//! 3. Every realtime pass (re)arms a full pass `full_pass_delay_ms` later,
//!    so a burst of drag ticks ends in one full pass, which refreshes the
//!    cached validity flags.
//!
//! Time is injected: callers pass `now_ms` to [`Propagator::notify_changed`]
//! and [`Propagator::tick`], and ask [`Propagator::next_deadline`] when to
//! call `tick` next. Nothing blocks and nothing is cancelled except by
//! re-arming a deadline.

use tracing::{debug, info};

use crate::config::SolverConfig;
use crate::detector::ChangeDetector;
use crate::error::ConfigError;
use crate::models::Timeline;
use crate::solver::{ConstraintSolver, RepairObserver, SolveReport};

/// What a call to [`Propagator::tick`] did.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    /// Items the poll-based detector found moved.
    pub detected: Vec<String>,
    /// Realtime passes run during this tick.
    pub realtime: Vec<SolveReport>,
    /// The full pass, if one was due.
    pub full: Option<SolveReport>,
}

impl TickReport {
    /// Whether the tick ran any pass.
    pub fn is_idle(&self) -> bool {
        self.realtime.is_empty() && self.full.is_none()
    }
}

/// Drives a [`ConstraintSolver`] over a [`Timeline`].
///
/// # Example
///
/// ```
/// use u_timeline::models::{Constraint, Item, Timeline, MINUTE_MS};
/// use u_timeline::propagator::Propagator;
///
/// let timeline = Timeline::new()
///     .with_item(Item::new("A", 0, 60 * MINUTE_MS)).unwrap()
///     .with_item(Item::new("B", 60 * MINUTE_MS, 90 * MINUTE_MS)).unwrap()
///     .with_constraint(Constraint::start_after_end("c1", "B", "A")).unwrap();
/// let mut propagator = Propagator::new(timeline);
///
/// // Drag A forward; the realtime pass pushes B along.
/// propagator.timeline_mut().move_item("A", 30 * MINUTE_MS).unwrap();
/// propagator.tick(0);
/// propagator.tick(10);
/// assert_eq!(propagator.timeline().item("B").unwrap().start_ms, 90 * MINUTE_MS);
///
/// // The full pass follows once movement settles.
/// let report = propagator.tick(60);
/// assert!(report.full.is_some());
/// ```
#[derive(Debug)]
pub struct Propagator {
    timeline: Timeline,
    solver: ConstraintSolver,
    detector: ChangeDetector,
    pending: Vec<String>,
    notify_due_ms: Option<i64>,
    next_poll_ms: Option<i64>,
    full_pass_due_ms: Option<i64>,
    last_full: Option<SolveReport>,
}

impl Propagator {
    /// Creates a driver with the default configuration.
    ///
    /// The current item state is taken as known; call
    /// [`Propagator::solve_now`] to reconcile an initial network.
    pub fn new(timeline: Timeline) -> Self {
        Self::with_solver(timeline, ConstraintSolver::new())
    }

    /// Creates a driver with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if the configuration fails
    /// [`SolverConfig::validate`].
    pub fn with_config(timeline: Timeline, config: SolverConfig) -> Result<Self, ConfigError> {
        let solver = ConstraintSolver::with_config(config)?;
        Ok(Self::with_solver(timeline, solver))
    }

    fn with_solver(mut timeline: Timeline, solver: ConstraintSolver) -> Self {
        timeline.take_changes();
        let detector = ChangeDetector::primed(timeline.items());
        Self {
            timeline,
            solver,
            detector,
            pending: Vec::new(),
            notify_due_ms: None,
            next_poll_ms: None,
            full_pass_due_ms: None,
            last_full: None,
        }
    }

    /// The managed timeline.
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    /// Mutable access to the timeline. Edits are journaled and picked
    /// up by the next [`Propagator::tick`] as notifications.
    pub fn timeline_mut(&mut self) -> &mut Timeline {
        &mut self.timeline
    }

    /// Consumes the driver and returns the timeline.
    pub fn into_timeline(self) -> Timeline {
        self.timeline
    }

    /// The underlying solver.
    pub fn solver(&self) -> &ConstraintSolver {
        &self.solver
    }

    /// The most recent full-pass report.
    pub fn last_full_report(&self) -> Option<&SolveReport> {
        self.last_full.as_ref()
    }

    /// Queues item IDs reported as changed and re-arms the debounce.
    pub fn notify_changed<I, S>(&mut self, ids: I, now_ms: i64)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut any = false;
        for id in ids {
            let id = id.into();
            if !self.pending.contains(&id) {
                self.pending.push(id);
            }
            any = true;
        }
        if any {
            let due = now_ms.saturating_add(self.config().notify_debounce_ms);
            self.notify_due_ms = Some(due);
            debug!(event = "change_notified", pending = self.pending.len(), due_ms = due);
        }
    }

    /// Earliest instant at which [`Propagator::tick`] has work to do.
    pub fn next_deadline(&self) -> Option<i64> {
        let poll = if self.config().polling {
            self.next_poll_ms
        } else {
            None
        };
        [self.notify_due_ms, poll, self.full_pass_due_ms]
            .into_iter()
            .flatten()
            .min()
    }

    /// Runs whatever is due at `now_ms`.
    ///
    /// Order: debounced notifications, then the poll, then the delayed
    /// full pass.
    pub fn tick(&mut self, now_ms: i64) -> TickReport {
        let mut report = TickReport::default();

        let journaled = self.timeline.take_changes();
        if !journaled.is_empty() {
            self.notify_changed(journaled, now_ms);
        }

        if self.notify_due_ms.is_some_and(|due| due <= now_ms) {
            self.notify_due_ms = None;
            let changed = std::mem::take(&mut self.pending);
            if let Some(pass) = self.run_realtime(&changed, now_ms) {
                report.realtime.push(pass);
            }
        }

        if self.config().polling {
            let next_poll = self.next_poll_ms;
            match next_poll {
                None => {
                    self.next_poll_ms =
                        Some(now_ms.saturating_add(self.config().poll_interval_ms));
                }
                Some(due) if due <= now_ms => {
                    self.next_poll_ms =
                        Some(now_ms.saturating_add(self.config().poll_interval_ms));
                    let detected = self.detector.detect_changes(self.timeline.items());
                    if !detected.is_empty() {
                        info!(event = "poll_detected_changes", items = ?detected);
                        if let Some(pass) = self.run_realtime(&detected, now_ms) {
                            report.realtime.push(pass);
                        }
                        report.detected = detected;
                    }
                }
                Some(_) => {}
            }
        }

        if self.full_pass_due_ms.is_some_and(|due| due <= now_ms) {
            report.full = self.solve_now();
        }

        report
    }

    /// Runs a full pass immediately and refreshes cached validity.
    ///
    /// Cancels any scheduled full pass. Returns `None` if the solver was
    /// busy.
    pub fn solve_now(&mut self) -> Option<SolveReport> {
        self.solve_now_observed(&mut crate::solver::NoopObserver)
    }

    /// [`Propagator::solve_now`] with a repair observer.
    pub fn solve_now_observed(
        &mut self,
        observer: &mut dyn RepairObserver,
    ) -> Option<SolveReport> {
        let (items, constraints) = self.timeline.split_mut();
        let report = self.solver.solve_observed(items, constraints, observer)?;
        self.full_pass_due_ms = None;
        if let Some(validity) = &report.validity {
            self.timeline.apply_validity(validity);
        }
        self.detector.update_known_states(self.timeline.items());
        self.last_full = Some(report.clone());
        Some(report)
    }

    fn run_realtime(&mut self, changed: &[String], now_ms: i64) -> Option<SolveReport> {
        if changed.is_empty() {
            return None;
        }
        let (items, constraints) = self.timeline.split_mut();
        let report = self.solver.solve_realtime(items, constraints, changed)?;
        self.detector.update_known_states(self.timeline.items());
        self.full_pass_due_ms = Some(now_ms.saturating_add(self.config().full_pass_delay_ms));
        Some(report)
    }

    fn config(&self) -> &SolverConfig {
        self.solver.config()
    }
}
