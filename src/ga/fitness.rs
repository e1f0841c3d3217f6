//! Mission fitness.
//!
//! # Scoring
//!
//! Each survivor in a robot's sequence is one leg: start → survivor → start.
//! A leg is valid when neither endpoint is an obstacle; valid legs add their
//! estimated cost and sampled risk, invalid legs add a Manhattan penalty.
//!
//! ```text
//! fitness = 100 × unique + 200 × [all covered]
//!         − 0.5 × path cost − 5 × risk
//!         − 50 × collisions − 150 × duplicates
//!         + 200 × valid legs + 150 × [all robots active]
//! ```
//!
//! "All covered" means `unique ≥ min(S, max_per_robot × R)`. Collisions are
//! pairs of robots sharing a start cell; duplicates count every assignment
//! of an id beyond its first.
//!
//! Scoring is a pure function of the chromosome and the evaluator, so any
//! number of threads may score against one shared evaluator.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::chromosome::Chromosome;
use crate::models::{Node, Survivor};
use crate::pathfinding::PathCostEstimator;
use crate::world::WorldModel;

/// Manhattan multiplier for legs that touch an obstacle.
pub const INVALID_LEG_MULTIPLIER: f64 = 3.0;

/// Sample intervals used for per-leg risk.
pub const RISK_SAMPLES: usize = 10;

/// Weights of the fitness terms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitnessWeights {
    /// Reward per distinct survivor assigned.
    pub unique_survivor: f64,
    /// Bonus when every reachable survivor slot is filled.
    pub full_coverage: f64,
    /// Penalty per unit of estimated path cost.
    pub path_cost: f64,
    /// Penalty per unit of sampled risk.
    pub risk: f64,
    /// Penalty per pair of robots sharing a start cell.
    pub collision: f64,
    /// Penalty per duplicated assignment.
    pub duplicate: f64,
    /// Reward per valid leg.
    pub valid_leg: f64,
    /// Bonus when every robot has work.
    pub all_active: f64,
}

impl Default for FitnessWeights {
    fn default() -> Self {
        Self {
            unique_survivor: 100.0,
            full_coverage: 200.0,
            path_cost: 0.5,
            risk: 5.0,
            collision: 50.0,
            duplicate: 150.0,
            valid_leg: 200.0,
            all_active: 150.0,
        }
    }
}

/// Raw fitness terms of one chromosome.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct FitnessBreakdown {
    /// Distinct survivors assigned to any robot.
    pub unique_survivors: usize,
    /// Whether every reachable survivor slot is covered.
    pub full_coverage: bool,
    /// Estimated round-trip cost over all legs, penalized for blocked ends.
    pub path_cost: f64,
    /// Sampled risk along every round trip.
    pub risk: f64,
    /// Pairs of robots sharing a start cell.
    pub collisions: usize,
    /// Assignments of an already assigned survivor.
    pub duplicates: usize,
    /// Legs whose start and survivor cells are both free.
    pub valid_legs: usize,
    /// Whether every robot has at least one survivor.
    pub all_active: bool,
}

impl FitnessBreakdown {
    /// Combines the terms into a single fitness value.
    pub fn total(&self, w: &FitnessWeights) -> f64 {
        w.unique_survivor * self.unique_survivors as f64
            + if self.full_coverage { w.full_coverage } else { 0.0 }
            - w.path_cost * self.path_cost
            - w.risk * self.risk
            - w.collision * self.collisions as f64
            - w.duplicate * self.duplicates as f64
            + w.valid_leg * self.valid_legs as f64
            + if self.all_active { w.all_active } else { 0.0 }
    }
}

/// Scores chromosomes against a fixed world and survivor list.
///
/// Cheap to share: wrap in an `Arc` and hand clones to worker threads.
#[derive(Debug, Clone)]
pub struct FitnessEvaluator {
    world: Option<Arc<dyn WorldModel>>,
    survivors: Vec<Survivor>,
    max_per_robot: usize,
    weights: FitnessWeights,
}

impl FitnessEvaluator {
    /// Creates an evaluator over a world.
    pub fn new(world: Arc<dyn WorldModel>, survivors: Vec<Survivor>, max_per_robot: usize) -> Self {
        Self {
            world: Some(world),
            survivors,
            max_per_robot,
            weights: FitnessWeights::default(),
        }
    }

    /// Creates an evaluator with no world; costs fall back to Manhattan
    /// distance and every leg is valid.
    pub fn detached(survivors: Vec<Survivor>, max_per_robot: usize) -> Self {
        Self {
            world: None,
            survivors,
            max_per_robot,
            weights: FitnessWeights::default(),
        }
    }

    /// Sets the term weights.
    pub fn with_weights(mut self, weights: FitnessWeights) -> Self {
        self.weights = weights;
        self
    }

    /// The world snapshot, if any.
    pub fn world(&self) -> Option<&Arc<dyn WorldModel>> {
        self.world.as_ref()
    }

    /// The survivor list; ids index into it.
    pub fn survivors(&self) -> &[Survivor] {
        &self.survivors
    }

    /// Number of survivors.
    pub fn survivor_count(&self) -> usize {
        self.survivors.len()
    }

    /// Per-robot assignment cap.
    pub fn max_per_robot(&self) -> usize {
        self.max_per_robot
    }

    /// Term weights.
    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    /// Fitness of a chromosome; higher is better.
    pub fn score(&self, chromosome: &Chromosome) -> f64 {
        self.breakdown(chromosome).total(&self.weights)
    }

    /// Raw fitness terms of a chromosome.
    pub fn breakdown(&self, chromosome: &Chromosome) -> FitnessBreakdown {
        let estimator = self.estimator();
        let survivor_count = self.survivors.len();
        let robots = chromosome.robot_count();

        let mut b = FitnessBreakdown::default();
        let mut seen = HashSet::new();

        for mission in &chromosome.missions {
            let start = mission.start;
            for &sid in &mission.sequence {
                let Some(survivor) = self.survivors.get(sid) else {
                    continue;
                };
                if !seen.insert(sid) {
                    b.duplicates += 1;
                }

                let pos = survivor.position;
                if self.is_blocked(start) || self.is_blocked(pos) {
                    b.path_cost += start.manhattan(pos) * INVALID_LEG_MULTIPLIER;
                    continue;
                }

                b.valid_legs += 1;
                b.path_cost += estimator.estimate_cost(start, pos) + estimator.estimate_cost(pos, start);
                b.risk += estimator.sampled_risk(start, pos, RISK_SAMPLES)
                    + estimator.sampled_risk(pos, start, RISK_SAMPLES);
            }
        }

        b.unique_survivors = seen.len();
        b.full_coverage = b.unique_survivors >= survivor_count.min(self.max_per_robot * robots);
        b.collisions = start_collisions(chromosome);
        b.all_active = robots > 0 && chromosome.missions.iter().all(|m| !m.is_empty());
        b
    }

    fn estimator(&self) -> PathCostEstimator<'_> {
        match &self.world {
            Some(world) => PathCostEstimator::new(world.as_ref()),
            None => PathCostEstimator::detached(),
        }
    }

    fn is_blocked(&self, node: Node) -> bool {
        self.world
            .as_ref()
            .is_some_and(|w| w.in_bounds(node) && w.cell_obstacle(node))
    }
}

/// Pairs of robots with identical start cells.
fn start_collisions(chromosome: &Chromosome) -> usize {
    let starts: Vec<Node> = chromosome.missions.iter().map(|m| m.start).collect();
    let mut pairs = 0;
    for i in 0..starts.len() {
        for j in (i + 1)..starts.len() {
            if starts[i] == starts[j] {
                pairs += 1;
            }
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::chromosome::RobotMission;
    use crate::world::Grid;

    fn corridor() -> Grid {
        Grid::new(5, 1, 1).unwrap()
    }

    fn one_leg(start: Node, sid: usize) -> Chromosome {
        Chromosome {
            missions: vec![RobotMission::with_sequence(start, vec![sid])],
            fitness: 0.0,
        }
    }

    #[test]
    fn test_single_clean_leg() {
        let world: Arc<dyn WorldModel> = Arc::new(corridor());
        let survivors = vec![Survivor::new(0, Node::new(2, 0, 0), 3)];
        let eval = FitnessEvaluator::new(world, survivors, 20);

        let b = eval.breakdown(&one_leg(Node::new(0, 0, 0), 0));
        assert_eq!(b.unique_survivors, 1);
        assert!(b.full_coverage);
        assert!((b.path_cost - 4.0).abs() < 1e-9);
        assert_eq!(b.risk, 0.0);
        assert_eq!(b.valid_legs, 1);
        assert!(b.all_active);

        // 100 + 200 - 0.5*4 + 200 + 150
        let f = eval.score(&one_leg(Node::new(0, 0, 0), 0));
        assert!((f - 648.0).abs() < 1e-9, "f = {f}");
    }

    #[test]
    fn test_obstacle_endpoint_invalidates_leg() {
        let world: Arc<dyn WorldModel> = Arc::new(corridor().with_obstacle(Node::new(2, 0, 0)));
        let survivors = vec![Survivor::new(0, Node::new(2, 0, 0), 3)];
        let eval = FitnessEvaluator::new(world, survivors, 20);

        let b = eval.breakdown(&one_leg(Node::new(0, 0, 0), 0));
        assert_eq!(b.valid_legs, 0);
        assert!((b.path_cost - 6.0).abs() < 1e-9);
        assert_eq!(b.unique_survivors, 1);
    }

    #[test]
    fn test_risk_is_sampled_on_both_legs() {
        let mut grid = corridor();
        for x in 0..5 {
            grid = grid.with_risk(Node::new(x, 0, 0), 1);
        }
        let world: Arc<dyn WorldModel> = Arc::new(grid);
        let survivors = vec![Survivor::new(0, Node::new(4, 0, 0), 2)];
        let eval = FitnessEvaluator::new(world, survivors, 20);

        let b = eval.breakdown(&one_leg(Node::new(0, 0, 0), 0));
        // 11 in-bounds samples of risk 1 per direction.
        assert!((b.risk - 22.0).abs() < 1e-9);
    }

    #[test]
    fn test_duplicates_and_collisions_penalized() {
        let world: Arc<dyn WorldModel> = Arc::new(corridor());
        let survivors = vec![
            Survivor::new(0, Node::new(2, 0, 0), 3),
            Survivor::new(1, Node::new(4, 0, 0), 3),
        ];
        let eval = FitnessEvaluator::new(world, survivors, 20);

        let start = Node::new(0, 0, 0);
        let clean = Chromosome {
            missions: vec![
                RobotMission::with_sequence(start, vec![0]),
                RobotMission::with_sequence(Node::new(1, 0, 0), vec![1]),
            ],
            fitness: 0.0,
        };
        let dup = Chromosome {
            missions: vec![
                RobotMission::with_sequence(start, vec![0, 1]),
                RobotMission::with_sequence(start, vec![1]),
            ],
            fitness: 0.0,
        };

        let bc = eval.breakdown(&clean);
        assert_eq!(bc.duplicates, 0);
        assert_eq!(bc.collisions, 0);

        let bd = eval.breakdown(&dup);
        assert_eq!(bd.duplicates, 1);
        assert_eq!(bd.collisions, 1);
        assert_eq!(bd.unique_survivors, 2);
        assert_eq!(bd.valid_legs, 3);
    }

    #[test]
    fn test_idle_robot_loses_bonus() {
        let survivors = vec![Survivor::new(0, Node::new(2, 0, 0), 3)];
        let eval = FitnessEvaluator::detached(survivors, 20);
        let c = Chromosome {
            missions: vec![
                RobotMission::with_sequence(Node::new(0, 0, 0), vec![0]),
                RobotMission::new(Node::new(4, 0, 0)),
            ],
            fitness: 0.0,
        };
        let b = eval.breakdown(&c);
        assert!(!b.all_active);
        assert!(b.full_coverage);
    }

    #[test]
    fn test_detached_uses_manhattan() {
        let survivors = vec![Survivor::new(0, Node::new(1, 2, 0), 3)];
        let eval = FitnessEvaluator::detached(survivors, 20);
        let b = eval.breakdown(&one_leg(Node::new(0, 0, 0), 0));
        assert!((b.path_cost - 6.0).abs() < 1e-9);
        assert_eq!(b.valid_legs, 1);
        assert_eq!(b.risk, 0.0);
    }

    #[test]
    fn test_unknown_ids_ignored() {
        let eval = FitnessEvaluator::detached(vec![], 20);
        let b = eval.breakdown(&one_leg(Node::new(0, 0, 0), 5));
        assert_eq!(b.unique_survivors, 0);
        assert_eq!(b.valid_legs, 0);
    }

    #[test]
    fn test_score_is_deterministic() {
        let world: Arc<dyn WorldModel> = Arc::new(corridor().with_risk(Node::new(1, 0, 0), 2));
        let survivors = vec![Survivor::new(0, Node::new(3, 0, 0), 1)];
        let eval = FitnessEvaluator::new(world, survivors, 20);
        let c = one_leg(Node::new(0, 0, 0), 0);
        assert_eq!(eval.score(&c), eval.score(&c));
    }

    #[test]
    fn test_weights_deserialize_with_defaults() {
        let w: FitnessWeights = serde_json::from_str(r#"{"risk": 1.0}"#).unwrap();
        assert_eq!(w.risk, 1.0);
        assert_eq!(w.duplicate, 150.0);
    }
}
