//! Path search and path cost estimation over a [`WorldModel`].
//!
//! Two cost models share the same risk weighting:
//!
//! - [`PathCostEstimator::find_path`]: exact 6-connected A* search, used for
//!   final reporting and the baseline comparison.
//! - [`PathCostEstimator::estimate_cost`]: sampled line-of-sight
//!   approximation, cheap enough to run for every GA fitness evaluation.
//!
//! The risk-weighted edge cost (`1 + 0.5 × risk`) is not matched by the
//! Euclidean heuristic in any proven way, so exact search is
//! "best effort optimal" with respect to risk-weighted cost.
//!
//! # Reference
//! Hart, Nilsson & Raphael (1968), "A Formal Basis for the Heuristic
//! Determination of Minimum Cost Paths"

mod astar;
mod estimate;

pub use estimate::{
    DETOUR_WEIGHT, MAX_SAMPLES, MIN_SAMPLES, OBSTACLE_PENALTY, RISK_WEIGHT,
};

use crate::models::{Node, Path};
use crate::world::WorldModel;

/// Additional cost per risk level when entering a cell.
pub const RISK_STEP_COST: f64 = 0.5;

/// Pathfinding and cost estimation bound to an optional world.
///
/// Without a world, estimates degrade to Manhattan distance and exact
/// search always fails.
#[derive(Debug, Clone, Copy)]
pub struct PathCostEstimator<'w> {
    world: Option<&'w dyn WorldModel>,
}

impl<'w> PathCostEstimator<'w> {
    /// Creates an estimator over a world.
    pub fn new(world: &'w dyn WorldModel) -> Self {
        Self { world: Some(world) }
    }

    /// Creates an estimator with no world attached.
    pub fn detached() -> Self {
        Self { world: None }
    }

    /// Creates an estimator from an optional world.
    pub fn from_option(world: Option<&'w dyn WorldModel>) -> Self {
        Self { world }
    }

    /// The attached world, if any.
    pub fn world(&self) -> Option<&'w dyn WorldModel> {
        self.world
    }

    /// In bounds and not an obstacle. Always false without a world.
    pub fn is_valid(&self, node: Node) -> bool {
        self.world.is_some_and(|w| w.is_valid(node))
    }

    /// Exact risk-weighted shortest path from `start` to `goal`.
    ///
    /// See [`astar::find_path`] for tie-breaking and truncation rules.
    pub fn find_path(&self, start: Node, goal: Node) -> Path {
        match self.world {
            Some(world) => astar::find_path(world, start, goal),
            None => Path::invalid(),
        }
    }

    /// Sampled approximation of the travel cost from `start` to `end`.
    pub fn estimate_cost(&self, start: Node, end: Node) -> f64 {
        match self.world {
            Some(world) => estimate::estimate_cost(world, start, end),
            None => start.manhattan(end),
        }
    }

    /// Sum of cell risks at `samples + 1` evenly spaced points on the
    /// segment, skipping points outside the grid.
    pub fn sampled_risk(&self, start: Node, end: Node, samples: usize) -> f64 {
        match self.world {
            Some(world) => estimate::sampled_risk(world, start, end, samples),
            None => 0.0,
        }
    }
}

/// Cost of stepping into `node`.
pub(crate) fn step_cost(world: &dyn WorldModel, node: Node) -> f64 {
    1.0 + RISK_STEP_COST * world.cell_risk(node) as f64
}
