//! Baseline comparison and reporting.
//!
//! # Submodules
//!
//! - [`BaselineSolver`]: exhaustive (small instances) or greedy assignment
//!   by exact path length, used to judge the GA plan
//! - [`RescueReport`]: per-robot routes of the GA plan beside the baseline

mod report;
mod solver;

pub use report::{RescueReport, RobotRoute};
pub use solver::{
    BaselineSolution, BaselineSolver, BaselineStrategy, EXHAUSTIVE_LIMIT, ITERATION_CAP,
};
