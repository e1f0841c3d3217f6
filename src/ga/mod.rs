//! GA-based mission assignment.
//!
//! # Encoding
//!
//! One chromosome holds one mission per robot; a mission is the ordered
//! list of survivor ids the robot rescues, returning to its start cell
//! after each one. A per-robot cap bounds every mission.
//!
//! # Submodules
//!
//! - [`operators`]: tournament selection, robot-split crossover, and the
//!   four per-robot mutations
//! - [`GeneticOptimizer`]: elitist generational loop over a pluggable
//!   [`PopulationEvaluator`](crate::parallel::PopulationEvaluator)
//!
//! # Reference
//! - Goldberg (1989), "Genetic Algorithms in Search, Optimization and
//!   Machine Learning"
//! - Tang, Man, Kwong & He (1996), "Genetic algorithms and their
//!   applications"

mod chromosome;
mod fitness;
pub mod operators;
mod optimizer;
mod population;

pub use chromosome::{Chromosome, RobotMission};
pub use fitness::{
    FitnessBreakdown, FitnessEvaluator, FitnessWeights, INVALID_LEG_MULTIPLIER, RISK_SAMPLES,
};
pub use optimizer::{GaConfig, GaResult, GeneticOptimizer, OptimizerState};
pub use population::Population;
