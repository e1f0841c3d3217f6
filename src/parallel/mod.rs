//! Parallel fitness evaluation.
//!
//! # Submodules
//!
//! - [`WorkerPool`]: persistent threads fed one generation at a time
//! - [`PopulationEvaluator`]: the seam the optimizer scores through, with a
//!   sequential and a pooled implementation
//!
//! The pooled evaluator is interchangeable with the sequential one: fitness
//! is a pure function of the chromosome and a read-only world snapshot, so
//! both produce identical values.

mod evaluator;
mod pool;

pub use evaluator::{PooledEvaluator, PopulationEvaluator, SequentialEvaluator};
pub use pool::{
    DEFAULT_RESULT_TIMEOUT, DEFAULT_SHUTDOWN_TIMEOUT, PoolFault, PoolStats, ShutdownReport,
    WorkerPool,
};
