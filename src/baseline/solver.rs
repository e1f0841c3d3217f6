//! Exact-path baseline assignment.
//!
//! # Algorithm
//!
//! Every survivor is rescued by exactly one robot as an independent round
//! trip, costing `2 × |A* path|` (path length in cells).
//!
//! - **Exhaustive** (survivors and robots both within the limit):
//!   iterative depth-first backtracking over robot-per-survivor choices,
//!   pruning unreachable legs and partial costs that cannot beat the
//!   incumbent, bounded by an iteration cap. A survivor no robot can reach
//!   makes every assignment invalid; the solver then falls back to greedy.
//! - **Greedy**: each survivor goes to the robot with the shortest exact
//!   path (first robot on ties); unreachable survivors are skipped.
//!
//! # Complexity
//! Path table: O(S × R) A* searches. Exhaustive search: O(R^S) nodes in the
//! worst case, capped. Greedy: O(S × R).

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{Node, Survivor, SurvivorId};
use crate::pathfinding::PathCostEstimator;
use crate::world::WorldModel;

/// Largest survivor or robot count searched exhaustively.
pub const EXHAUSTIVE_LIMIT: usize = 10;
/// Default bound on exhaustive search nodes.
pub const ITERATION_CAP: u64 = 1_000_000;

/// How a baseline solution was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BaselineStrategy {
    Exhaustive,
    Greedy,
}

/// Best assignment found by the baseline solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineSolution {
    /// Strategy that produced the assignment.
    pub strategy: BaselineStrategy,
    /// Robot per survivor, `None` when unreachable.
    pub assignment: Vec<Option<usize>>,
    /// Survivor ids per robot, ascending.
    pub routes: Vec<Vec<SurvivorId>>,
    /// Σ round-trip path lengths.
    pub total_path_length: usize,
    /// Survivors with a robot.
    pub survivors_rescued: usize,
    /// Search nodes visited (0 for greedy).
    pub iterations: u64,
    /// Exhaustive search stopped at the iteration cap.
    pub capped: bool,
}

/// Reference solver used to judge GA quality.
#[derive(Debug, Clone)]
pub struct BaselineSolver {
    exhaustive_limit: usize,
    iteration_cap: u64,
}

impl Default for BaselineSolver {
    fn default() -> Self {
        Self {
            exhaustive_limit: EXHAUSTIVE_LIMIT,
            iteration_cap: ITERATION_CAP,
        }
    }
}

impl BaselineSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the largest instance searched exhaustively.
    pub fn with_exhaustive_limit(mut self, limit: usize) -> Self {
        self.exhaustive_limit = limit;
        self
    }

    /// Sets the exhaustive search node bound.
    pub fn with_iteration_cap(mut self, cap: u64) -> Self {
        self.iteration_cap = cap;
        self
    }

    /// Solves the assignment for the given robots and survivors.
    pub fn solve(
        &self,
        world: &dyn WorldModel,
        starts: &[Node],
        survivors: &[Survivor],
    ) -> BaselineSolution {
        let estimator = PathCostEstimator::new(world);
        let lengths: Vec<Vec<Option<usize>>> = survivors
            .iter()
            .map(|s| {
                starts
                    .iter()
                    .map(|&start| {
                        let path = estimator.find_path(start, s.position);
                        (path.valid && !path.is_empty()).then_some(path.len())
                    })
                    .collect()
            })
            .collect();

        let exhaustive = survivors.len() <= self.exhaustive_limit
            && starts.len() <= self.exhaustive_limit
            && !starts.is_empty();
        if exhaustive {
            match self.search(&lengths, starts.len()) {
                (Some(assignment), iterations, capped) => {
                    let solution = build(
                        BaselineStrategy::Exhaustive,
                        assignment,
                        &lengths,
                        starts.len(),
                        iterations,
                        capped,
                    );
                    info!(
                        total_path_length = solution.total_path_length,
                        iterations, capped, "exhaustive baseline solved"
                    );
                    return solution;
                }
                (None, iterations, capped) => {
                    warn!(
                        iterations,
                        capped, "no complete assignment reachable; using greedy baseline"
                    );
                }
            }
        }

        let assignment = greedy(&lengths);
        let solution = build(
            BaselineStrategy::Greedy,
            assignment,
            &lengths,
            starts.len(),
            0,
            false,
        );
        info!(
            total_path_length = solution.total_path_length,
            rescued = solution.survivors_rescued,
            "greedy baseline solved"
        );
        solution
    }

    /// Depth-first branch and bound. Returns the best full assignment, the
    /// nodes visited, and whether the cap was hit.
    fn search(
        &self,
        lengths: &[Vec<Option<usize>>],
        robots: usize,
    ) -> (Option<Vec<Option<usize>>>, u64, bool) {
        let survivors = lengths.len();
        if survivors == 0 {
            return (Some(Vec::new()), 0, false);
        }

        let mut next_choice = vec![0usize; survivors];
        let mut partial = vec![0usize; survivors + 1];
        let mut best: Option<(usize, Vec<Option<usize>>)> = None;
        let mut iterations = 0u64;
        let mut capped = false;
        let mut depth = 0usize;

        loop {
            if depth == survivors {
                let cost = partial[survivors];
                if !best.as_ref().is_some_and(|(c, _)| cost >= *c) {
                    let chosen = next_choice.iter().map(|&n| Some(n - 1)).collect();
                    best = Some((cost, chosen));
                }
                depth -= 1;
                continue;
            }
            if next_choice[depth] == robots {
                next_choice[depth] = 0;
                if depth == 0 {
                    break;
                }
                depth -= 1;
                continue;
            }

            let robot = next_choice[depth];
            next_choice[depth] += 1;
            iterations += 1;
            if iterations > self.iteration_cap {
                capped = true;
                break;
            }

            let Some(len) = lengths[depth][robot] else {
                continue;
            };
            let cost = partial[depth] + 2 * len;
            if best.as_ref().is_some_and(|(c, _)| cost >= *c) {
                continue;
            }
            partial[depth + 1] = cost;
            depth += 1;
        }

        debug!(iterations, capped, "exhaustive search finished");
        (best.map(|(_, a)| a), iterations.min(self.iteration_cap), capped)
    }
}

fn greedy(lengths: &[Vec<Option<usize>>]) -> Vec<Option<usize>> {
    lengths
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .filter_map(|(r, len)| len.map(|l| (l, r)))
                .min()
                .map(|(_, r)| r)
        })
        .collect()
}

fn build(
    strategy: BaselineStrategy,
    assignment: Vec<Option<usize>>,
    lengths: &[Vec<Option<usize>>],
    robots: usize,
    iterations: u64,
    capped: bool,
) -> BaselineSolution {
    let mut routes = vec![Vec::new(); robots];
    let mut total_path_length = 0;
    let mut survivors_rescued = 0;
    for (sid, robot) in assignment.iter().enumerate() {
        let Some(r) = *robot else { continue };
        if let Some(len) = lengths[sid][r] {
            routes[r].push(sid);
            total_path_length += 2 * len;
            survivors_rescued += 1;
        }
    }
    BaselineSolution {
        strategy,
        assignment,
        routes,
        total_path_length,
        survivors_rescued,
        iterations,
        capped,
    }
}
