//! Population scoring strategies.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use tracing::warn;

use super::pool::{PoolStats, ShutdownReport, WorkerPool};
use crate::ga::{Chromosome, FitnessEvaluator};

/// Writes a fitness value into every chromosome of a population.
pub trait PopulationEvaluator: Send + Debug {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Scores every chromosome in place.
    fn evaluate(&mut self, fitness: &Arc<FitnessEvaluator>, population: &mut [Chromosome]);

    /// Worker pool counters, for pooled evaluators.
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }

    /// Releases background resources; the next call may re-acquire them.
    fn release(&mut self) {}
}

/// Scores chromosomes one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialEvaluator;

impl PopulationEvaluator for SequentialEvaluator {
    fn name(&self) -> &'static str {
        "sequential"
    }

    fn evaluate(&mut self, fitness: &Arc<FitnessEvaluator>, population: &mut [Chromosome]) {
        for chromosome in population {
            chromosome.fitness = fitness.score(chromosome);
        }
    }
}

/// Scores chromosomes on a lazily created [`WorkerPool`].
///
/// Falls back to sequential scoring when the evaluator has no world
/// snapshot or the pool cannot be created; the fallback is logged once.
/// After a pool fault the missing results are computed sequentially, the
/// pool is discarded and a fresh one is created on the next call.
#[derive(Debug)]
pub struct PooledEvaluator {
    pool_size: usize,
    result_timeout: Duration,
    pool: Option<WorkerPool>,
    disabled: bool,
    fallback_logged: bool,
    restarts: u64,
    retired: PoolStats,
}

impl PooledEvaluator {
    /// Creates an evaluator; no threads start until the first call.
    pub fn new(pool_size: usize, result_timeout: Duration) -> Self {
        Self {
            pool_size: pool_size.max(1),
            result_timeout,
            pool: None,
            disabled: false,
            fallback_logged: false,
            restarts: 0,
            retired: PoolStats::default(),
        }
    }

    /// Configured number of workers.
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Whether a pool is currently running.
    pub fn is_active(&self) -> bool {
        self.pool.is_some()
    }

    /// Pools discarded after a fault.
    pub fn restarts(&self) -> u64 {
        self.restarts
    }

    /// Totals across the current and every discarded pool.
    pub fn stats(&self) -> PoolStats {
        let mut stats = self.retired;
        if let Some(pool) = &self.pool {
            stats.absorb(pool.stats());
        }
        stats
    }

    /// Stops the running pool, if any.
    pub fn shutdown(&mut self) -> Option<ShutdownReport> {
        let mut pool = self.pool.take()?;
        self.retired.absorb(pool.stats());
        Some(pool.shutdown())
    }

    fn fall_back(
        &mut self,
        reason: &str,
        fitness: &Arc<FitnessEvaluator>,
        population: &mut [Chromosome],
    ) {
        if !self.fallback_logged {
            warn!(reason, "parallel evaluation unavailable; scoring sequentially");
            self.fallback_logged = true;
        }
        SequentialEvaluator.evaluate(fitness, population);
    }
}

impl PopulationEvaluator for PooledEvaluator {
    fn name(&self) -> &'static str {
        "pooled"
    }

    fn pool_stats(&self) -> Option<PoolStats> {
        Some(self.stats())
    }

    fn release(&mut self) {
        self.shutdown();
    }

    fn evaluate(&mut self, fitness: &Arc<FitnessEvaluator>, population: &mut [Chromosome]) {
        if population.is_empty() {
            return;
        }
        if fitness.world().is_none() {
            return self.fall_back("no world snapshot", fitness, population);
        }
        if self.disabled {
            return self.fall_back("worker pool could not be created", fitness, population);
        }
        if self.pool.is_none() {
            match WorkerPool::new(self.pool_size, self.result_timeout) {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    warn!(error = %e, "failed to create worker pool");
                    self.disabled = true;
                    return self.fall_back("worker pool could not be created", fitness, population);
                }
            }
        }
        let Some(pool) = self.pool.as_mut() else {
            return;
        };

        match pool.evaluate(fitness, population) {
            Ok(values) => {
                for (chromosome, value) in population.iter_mut().zip(values) {
                    chromosome.fitness = value;
                }
            }
            Err(fault) => {
                warn!(
                    reason = %fault.reason,
                    missing = fault.missing(),
                    "scoring missing chromosomes sequentially; pool will restart"
                );
                for (chromosome, slot) in population.iter_mut().zip(fault.partial) {
                    let value = match slot {
                        Some(value) => value,
                        None => fitness.score(chromosome),
                    };
                    chromosome.fitness = value;
                }
                self.shutdown();
                self.restarts += 1;
            }
        }
    }
}
