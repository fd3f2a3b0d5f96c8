//! Ready-made constraint networks.
//!
//! - [`project_demo`]: a five-task software project with twelve
//!   constraints, handy for demos and end-to-end tests.
//! - [`random_acyclic`]: random but always-satisfiable networks for
//!   convergence testing.

use rand::prelude::*;

use crate::error::TimelineError;
use crate::models::{Constraint, ConstraintKind, Item, Timeline, MINUTE_MS};

/// Builds the demo project, starting at `epoch_ms`.
///
/// | id | name | span (from epoch) | duration |
/// |----|------|-------------------|----------|
/// | `task_analysis` | Requirements analysis | 0:00–2:00 | 120 min |
/// | `task_design` | System design | 2:15–3:45 | 90 min |
/// | `task_frontend` | Frontend development | 2:45–5:45 | 180 min |
/// | `task_backend` | Backend development | 3:45–7:45 | 240 min |
/// | `task_testing` | Testing and acceptance | 7:45–9:45 | 120 min |
///
/// Every task has a fixed duration. Design starts 15 minutes after
/// analysis, frontend 30 minutes after design; backend follows design,
/// frontend starts before backend ends, testing follows both frontend
/// and backend, and analysis ends before testing starts.
pub fn project_demo(epoch_ms: i64) -> Result<Timeline, TimelineError> {
    let at = |minutes: i64| epoch_ms + minutes * MINUTE_MS;

    let tasks = [
        ("task_analysis", "Requirements analysis", 0, 120),
        ("task_design", "System design", 135, 90),
        ("task_frontend", "Frontend development", 165, 180),
        ("task_backend", "Backend development", 225, 240),
        ("task_testing", "Testing and acceptance", 465, 120),
    ];

    let mut timeline = Timeline::new();
    for (id, name, start, minutes) in tasks {
        timeline.insert_item(Item::new(id, at(start), at(start + minutes)).with_name(name))?;
    }
    for (id, _, _, minutes) in tasks {
        timeline.add_constraint(Constraint::fixed_duration(
            format!("duration_{id}"),
            id,
            minutes,
        ))?;
    }

    timeline
        .with_constraint(Constraint::start_offset(
            "design_after_analysis",
            "task_design",
            "task_analysis",
            15,
        ))?
        .with_constraint(Constraint::start_offset(
            "frontend_after_design",
            "task_frontend",
            "task_design",
            30,
        ))?
        .with_constraint(Constraint::start_after_end(
            "backend_after_design",
            "task_backend",
            "task_design",
        ))?
        .with_constraint(Constraint::start_before_end(
            "frontend_parallel_backend",
            "task_frontend",
            "task_backend",
        ))?
        .with_constraint(Constraint::start_after_end(
            "testing_after_frontend",
            "task_testing",
            "task_frontend",
        ))?
        .with_constraint(Constraint::start_after_end(
            "testing_after_backend",
            "task_testing",
            "task_backend",
        ))?
        .with_constraint(Constraint::end_before_start(
            "analysis_before_testing",
            "task_analysis",
            "task_testing",
        ))
}

/// Configuration for [`random_acyclic`].
#[derive(Debug, Clone)]
pub struct NetworkGeneratorConfig {
    /// Number of items.
    pub num_items: usize,
    /// Maximum dependency depth; bounds the rounds needed to converge.
    pub max_depth: usize,
    /// Probability that an item gets a fixed-duration constraint.
    pub fixed_duration_probability: f64,
    /// Initial start range in minutes from the epoch (min, max).
    pub start_range_min: (i64, i64),
    /// Duration range in minutes (min, max).
    pub duration_range_min: (i64, i64),
    /// Offset range in minutes for offset kinds (min, max).
    pub offset_range_min: (i64, i64),
}

impl Default for NetworkGeneratorConfig {
    fn default() -> Self {
        Self {
            num_items: 20,
            max_depth: 8,
            fixed_duration_probability: 0.5,
            start_range_min: (0, 1_440),
            duration_range_min: (10, 180),
            offset_range_min: (-60, 120),
        }
    }
}

const RELATIONAL: [ConstraintKind; 6] = [
    ConstraintKind::StartAfterEnd,
    ConstraintKind::StartBeforeStart,
    ConstraintKind::StartBeforeEnd,
    ConstraintKind::EndBeforeStart,
    ConstraintKind::StartOffset,
    ConstraintKind::StartExact,
];

/// Generates a random network that a full pass can always satisfy.
///
/// Items form a forest: every item except the first is `item_a` of
/// exactly one relational constraint whose `item_b` has a lower index,
/// so no item is pulled two ways and there are no cycles. Depth is
/// capped at `max_depth`, which keeps convergence within
/// `max_depth + 2` rounds.
pub fn random_acyclic(
    config: &NetworkGeneratorConfig,
    seed: u64,
    epoch_ms: i64,
) -> Result<Timeline, TimelineError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut timeline = Timeline::new();
    let mut depth = Vec::with_capacity(config.num_items);

    for i in 0..config.num_items {
        let start = rng.random_range(config.start_range_min.0..=config.start_range_min.1);
        let minutes = rng.random_range(config.duration_range_min.0..=config.duration_range_min.1);
        let id = format!("item_{i}");
        timeline.insert_item(
            Item::new(
                id.clone(),
                epoch_ms + start * MINUTE_MS,
                epoch_ms + (start + minutes) * MINUTE_MS,
            )
            .with_name(format!("Item {i}")),
        )?;

        if rng.random_bool(config.fixed_duration_probability.clamp(0.0, 1.0)) {
            let target = rng.random_range(config.duration_range_min.0..=config.duration_range_min.1);
            timeline.add_constraint(Constraint::fixed_duration(
                format!("duration_{i}"),
                id.clone(),
                target,
            ))?;
        }

        if i == 0 {
            depth.push(0);
            continue;
        }

        let mut parent = rng.random_range(0..i);
        if depth[parent] >= config.max_depth {
            parent = 0;
        }
        depth.push(depth[parent] + 1);

        let kind = RELATIONAL[rng.random_range(0..RELATIONAL.len())].clone();
        let offset = if kind.uses_offset() {
            rng.random_range(config.offset_range_min.0..=config.offset_range_min.1)
        } else {
            0
        };
        timeline.add_constraint(Constraint::new(
            format!("rel_{i}"),
            kind,
            id,
            Some(format!("item_{parent}")),
            offset,
        ))?;
    }

    Ok(timeline)
}
