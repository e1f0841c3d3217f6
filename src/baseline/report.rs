//! Final mission report.
//!
//! Expands the best chromosome into concrete per-robot routes using exact
//! A* paths and sets it beside the baseline solution.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Route | start, then for each reachable survivor the outbound path and its reverse |
//! | Steps | Σ 2 × path length over reachable survivors |
//! | Rescued | assigned survivors with a valid path |
//! | Path length | Σ steps over all robots |
//!
//! Routes are truncated at [`MAX_PATH_LEN`] nodes; step counts are not.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use super::solver::BaselineSolution;
use crate::ga::Chromosome;
use crate::models::{MAX_PATH_LEN, Node, Path, Survivor, SurvivorId};
use crate::pathfinding::{PathCostEstimator, step_cost};
use crate::world::WorldModel;

/// One robot's expanded mission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RobotRoute {
    /// Robot index.
    pub robot: usize,
    /// Start cell.
    pub start: Node,
    /// Survivors in visiting order, as assigned.
    pub survivors: Vec<SurvivorId>,
    /// Assigned survivors without a valid path.
    pub unreachable: Vec<SurvivorId>,
    /// Combined round-trip route.
    pub path: Path,
    /// Σ 2 × path length over reachable survivors.
    pub steps: usize,
}

impl RobotRoute {
    /// Reachable survivors on this route.
    pub fn rescued(&self) -> usize {
        self.survivors.len() - self.unreachable.len()
    }
}

/// GA result expanded for output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RescueReport {
    /// Per-robot routes.
    pub routes: Vec<RobotRoute>,
    /// Survivors detected in the world.
    pub survivors_total: usize,
    /// Survivors reached by the GA plan.
    pub survivors_rescued: usize,
    /// Σ steps over all robots.
    pub total_path_length: usize,
    /// Fitness of the GA plan.
    pub fitness: f64,
    /// Baseline for comparison, when computed.
    pub baseline: Option<BaselineSolution>,
}

impl RescueReport {
    /// Builds the report for `best`.
    pub fn build(
        world: &dyn WorldModel,
        best: &Chromosome,
        survivors: &[Survivor],
        baseline: Option<BaselineSolution>,
    ) -> Self {
        let estimator = PathCostEstimator::new(world);
        let routes: Vec<RobotRoute> = best
            .missions
            .iter()
            .enumerate()
            .map(|(robot, mission)| {
                let mut route = RobotRoute {
                    robot,
                    start: mission.start,
                    survivors: mission.sequence.clone(),
                    unreachable: Vec::new(),
                    path: Path::trivial(mission.start),
                    steps: 0,
                };
                let mut truncated = false;
                for &sid in &mission.sequence {
                    let Some(survivor) = survivors.get(sid) else {
                        route.unreachable.push(sid);
                        continue;
                    };
                    let leg = estimator.find_path(mission.start, survivor.position);
                    if !leg.valid || leg.is_empty() {
                        route.unreachable.push(sid);
                        continue;
                    }
                    route.steps += 2 * leg.len();
                    let outbound = leg.steps[1..].iter();
                    let inbound = leg.steps[..leg.len() - 1].iter().rev();
                    for &node in outbound.chain(inbound) {
                        if route.path.steps.len() >= MAX_PATH_LEN {
                            truncated = true;
                            break;
                        }
                        route.path.cost += step_cost(world, node);
                        route.path.steps.push(node);
                    }
                }
                if truncated {
                    warn!(robot, cap = MAX_PATH_LEN, "route truncated");
                }
                route.path.valid = !truncated && route.unreachable.is_empty();
                route
            })
            .collect();

        let survivors_rescued = routes.iter().map(RobotRoute::rescued).sum();
        let total_path_length = routes.iter().map(|r| r.steps).sum();
        Self {
            routes,
            survivors_total: survivors.len(),
            survivors_rescued,
            total_path_length,
            fitness: best.fitness,
            baseline,
        }
    }
}

impl fmt::Display for RescueReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Rescue plan ===")?;
        for route in &self.routes {
            let ids: Vec<String> = route.survivors.iter().map(|s| s.to_string()).collect();
            write!(
                f,
                "robot {} @ {}: [{}] steps={}",
                route.robot,
                route.start,
                ids.join(", "),
                route.steps
            )?;
            if !route.unreachable.is_empty() {
                write!(f, " unreachable={:?}", route.unreachable)?;
            }
            writeln!(f)?;
        }
        writeln!(
            f,
            "GA: {}/{} survivors, path length {}, fitness {:.2}",
            self.survivors_rescued, self.survivors_total, self.total_path_length, self.fitness
        )?;
        if let Some(baseline) = &self.baseline {
            writeln!(
                f,
                "baseline ({:?}): {}/{} survivors, path length {}",
                baseline.strategy,
                baseline.survivors_rescued,
                self.survivors_total,
                baseline.total_path_length
            )?;
        }
        Ok(())
    }
}
