//! Generational GA driver.
//!
//! # Algorithm
//!
//! ```text
//! evaluate + sort initial population
//! for g in 1..=G:
//!     next = top E elites (unchanged)
//!     fill next with mutate(crossover(tournament, tournament))
//!     evaluate + sort next
//! ```
//!
//! `E = clamp(⌊P × elitism% / 100⌋, 1, P − 1)`. Because elites are copied
//! unchanged and fitness is deterministic, the best fitness never decreases
//! from one generation to the next.
//!
//! Progress is logged every `log_interval` generations and whenever the best
//! fitness has improved by more than `log_improvement` since the last log.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use super::chromosome::Chromosome;
use super::fitness::FitnessEvaluator;
use super::operators::GeneticOperators;
use super::population::Population;
use crate::models::Node;
use crate::parallel::{
    DEFAULT_RESULT_TIMEOUT, PoolStats, PooledEvaluator, PopulationEvaluator, SequentialEvaluator,
};

/// GA parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GaConfig {
    /// Chromosomes per generation.
    pub population_size: usize,
    /// Generations after the initial one.
    pub generations: usize,
    /// Per-robot mutation probability.
    pub mutation_rate: f64,
    /// Share of the population carried over unchanged, in percent.
    pub elitism_percent: usize,
    /// Tournament draws per selection.
    pub tournament_size: usize,
    /// Per-robot survivor cap, bounded by the evaluator's own cap.
    pub max_per_robot: usize,
    /// Score on a worker pool instead of the calling thread.
    pub parallel: bool,
    /// Worker threads in the pool.
    pub pool_size: usize,
    /// Longest wait for a single pooled result.
    pub result_timeout: Duration,
    /// RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Log every this many generations.
    pub log_interval: usize,
    /// Also log when the best fitness improved by more than this.
    pub log_improvement: f64,
}

impl Default for GaConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generations: 100,
            mutation_rate: 0.1,
            elitism_percent: 10,
            tournament_size: 3,
            max_per_robot: 20,
            parallel: true,
            pool_size: 4,
            result_timeout: DEFAULT_RESULT_TIMEOUT,
            seed: None,
            log_interval: 25,
            log_improvement: 5.0,
        }
    }
}

impl GaConfig {
    pub fn with_population_size(mut self, size: usize) -> Self {
        self.population_size = size;
        self
    }

    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations;
        self
    }

    pub fn with_mutation_rate(mut self, rate: f64) -> Self {
        self.mutation_rate = rate;
        self
    }

    pub fn with_elitism_percent(mut self, percent: usize) -> Self {
        self.elitism_percent = percent;
        self
    }

    pub fn with_max_per_robot(mut self, cap: usize) -> Self {
        self.max_per_robot = cap;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    pub fn with_result_timeout(mut self, timeout: Duration) -> Self {
        self.result_timeout = timeout;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Number of elites carried into each generation.
    ///
    /// Populations of one keep their single chromosome; empty populations
    /// have no elites.
    pub fn elite_count(&self) -> usize {
        elites_for(self.population_size, self.elitism_percent)
    }
}

fn elites_for(size: usize, percent: usize) -> usize {
    if size <= 1 {
        return size;
    }
    (size * percent / 100).clamp(1, size - 1)
}

/// Lifecycle of a [`GeneticOptimizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizerState {
    /// Nothing evaluated yet.
    Init,
    /// Generation `generation` evaluated and sorted (0 = initial population).
    Evaluated { generation: usize },
    /// Run finished after `generation` generations.
    Done { generation: usize },
}

/// Outcome of [`GeneticOptimizer::run`].
#[derive(Debug, Clone)]
pub struct GaResult {
    /// Best chromosome of the final population.
    pub best: Chromosome,
    /// Its fitness.
    pub best_fitness: f64,
    /// Generations completed after the initial one.
    pub generations: usize,
    /// Best fitness of the initial population and of every generation.
    pub history: Vec<f64>,
    /// The run stopped early on request.
    pub cancelled: bool,
}

/// Evolves mission assignments against a fixed fitness evaluator.
#[derive(Debug)]
pub struct GeneticOptimizer {
    config: GaConfig,
    operators: GeneticOperators,
    fitness: Arc<FitnessEvaluator>,
    evaluator: Box<dyn PopulationEvaluator>,
    rng: SmallRng,
    state: OptimizerState,
}

impl GeneticOptimizer {
    /// Creates an optimizer; the evaluator is pooled when `config.parallel`.
    pub fn new(config: GaConfig, fitness: Arc<FitnessEvaluator>) -> Self {
        let rng = match config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let evaluator: Box<dyn PopulationEvaluator> = if config.parallel {
            Box::new(PooledEvaluator::new(config.pool_size, config.result_timeout))
        } else {
            Box::new(SequentialEvaluator)
        };
        let operators = GeneticOperators {
            tournament_size: config.tournament_size,
            ..GeneticOperators::default()
        };
        Self {
            config,
            operators,
            fitness,
            evaluator,
            rng,
            state: OptimizerState::Init,
        }
    }

    /// Replaces the population evaluator.
    pub fn with_evaluator(mut self, evaluator: Box<dyn PopulationEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Replaces the genetic operators.
    pub fn with_operators(mut self, operators: GeneticOperators) -> Self {
        self.operators = operators;
        self
    }

    pub fn config(&self) -> &GaConfig {
        &self.config
    }

    pub fn state(&self) -> OptimizerState {
        self.state
    }

    pub fn fitness(&self) -> &Arc<FitnessEvaluator> {
        &self.fitness
    }

    /// Worker pool counters, when scoring on a pool.
    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.evaluator.pool_stats()
    }

    /// Seeds a random population for the given robot starts.
    pub fn seed_population(&mut self, starts: &[Node]) -> Population {
        Population::seed(
            self.config.population_size,
            starts,
            self.fitness.survivor_count(),
            self.cap(),
            &mut self.rng,
        )
    }

    fn cap(&self) -> usize {
        self.config.max_per_robot.min(self.fitness.max_per_robot())
    }

    /// Scores every chromosome and sorts by descending fitness.
    pub fn evaluate(&mut self, population: &mut Population) {
        self.evaluator
            .evaluate(&self.fitness, population.as_mut_slice());
        population.sort_by_fitness();
    }

    /// Builds the next (unscored) generation from a sorted population.
    pub fn breed(&mut self, current: &Population) -> Population {
        let parents = current.as_slice();
        let size = parents.len();
        let survivors = self.fitness.survivor_count();
        let cap = self.cap();
        let elites = elites_for(size, self.config.elitism_percent);

        let mut next = Vec::with_capacity(size);
        next.extend(parents[..elites].iter().cloned());
        while next.len() < size {
            let a = self.operators.select(parents, &mut self.rng);
            let b = self.operators.select(parents, &mut self.rng);
            let mut child =
                self.operators
                    .crossover(&parents[a], &parents[b], survivors, cap, &mut self.rng);
            self.operators.mutate(
                &mut child,
                self.config.mutation_rate,
                survivors,
                cap,
                &mut self.rng,
            );
            next.push(child);
        }
        Population::from_chromosomes(next)
    }

    /// Runs the GA from `population`.
    ///
    /// Checks `cancel` before each generation; a set flag ends the run with
    /// the best chromosome found so far.
    pub fn run(&mut self, mut population: Population, cancel: Option<&AtomicBool>) -> GaResult {
        if population.is_empty() {
            warn!("empty population; nothing to evolve");
            self.state = OptimizerState::Done { generation: 0 };
            return GaResult {
                best: Chromosome::empty(&[]),
                best_fitness: 0.0,
                generations: 0,
                history: Vec::new(),
                cancelled: false,
            };
        }

        self.evaluate(&mut population);
        self.state = OptimizerState::Evaluated { generation: 0 };
        let mut logged_best = population.as_slice()[0].fitness;
        let mut history = vec![logged_best];

        if self.fitness.survivor_count() == 0 {
            warn!("no survivors detected; skipping evolution");
            return self.finish(population, history, 0, false);
        }

        info!(
            evaluator = self.evaluator.name(),
            population = population.len(),
            generations = self.config.generations,
            best_fitness = logged_best,
            "initial population evaluated"
        );

        let mut completed = 0;
        let mut cancelled = false;
        for generation in 1..=self.config.generations {
            if cancel.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
                info!(generation, "evolution cancelled");
                cancelled = true;
                break;
            }

            let mut next = self.breed(&population);
            self.evaluate(&mut next);
            population = next;
            completed = generation;
            self.state = OptimizerState::Evaluated { generation };

            let best = population.as_slice()[0].fitness;
            history.push(best);
            let improvement = best - logged_best;
            if generation % self.config.log_interval.max(1) == 0
                || improvement > self.config.log_improvement
            {
                info!(generation, best_fitness = best, improvement, "generation");
                logged_best = best;
            } else {
                debug!(generation, best_fitness = best, "generation");
            }
        }

        self.finish(population, history, completed, cancelled)
    }

    fn finish(
        &mut self,
        population: Population,
        history: Vec<f64>,
        generations: usize,
        cancelled: bool,
    ) -> GaResult {
        self.state = OptimizerState::Done {
            generation: generations,
        };
        self.evaluator.release();
        let best = population
            .into_inner()
            .into_iter()
            .next()
            .unwrap_or_else(|| Chromosome::empty(&[]));
        info!(
            generations,
            best_fitness = best.fitness,
            cancelled,
            "evolution finished"
        );
        GaResult {
            best_fitness: best.fitness,
            best,
            generations,
            history,
            cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Survivor;
    use crate::parallel::testing::fixture;

    fn config() -> GaConfig {
        GaConfig::default()
            .with_population_size(30)
            .with_generations(20)
            .with_parallel(false)
            .with_seed(42)
    }

    fn run(config: GaConfig) -> GaResult {
        let (fitness, chromosomes) = fixture(config.population_size);
        let mut ga = GeneticOptimizer::new(config, fitness);
        ga.run(Population::from_chromosomes(chromosomes), None)
    }

    #[test]
    fn test_elite_count() {
        let c = GaConfig::default();
        assert_eq!(c.elite_count(), 10);
        assert_eq!(c.clone().with_population_size(5).elite_count(), 1);
        assert_eq!(c.clone().with_elitism_percent(100).elite_count(), 99);
        assert_eq!(c.clone().with_population_size(1).elite_count(), 1);
        assert_eq!(c.with_population_size(0).elite_count(), 0);
    }

    #[test]
    fn test_best_fitness_never_decreases() {
        let result = run(config());
        assert_eq!(result.history.len(), 21);
        for pair in result.history.windows(2) {
            assert!(pair[1] >= pair[0], "{pair:?}");
        }
        assert_eq!(result.generations, 20);
        assert!(!result.cancelled);
    }

    #[test]
    fn test_result_is_valid_assignment() {
        let (fitness, chromosomes) = fixture(20);
        let count = fitness.survivor_count();
        let cap = fitness.max_per_robot();
        let mut ga = GeneticOptimizer::new(config().with_population_size(20), Arc::clone(&fitness));
        let result = ga.run(Population::from_chromosomes(chromosomes), None);
        assert!(result.best.is_valid(count, cap));
        assert_eq!(result.best_fitness, fitness.score(&result.best));
    }

    #[test]
    fn test_configured_cap_holds_after_breeding() {
        let survivors: Vec<Survivor> = (0..9)
            .map(|id| Survivor::new(id, Node::new(id as i32 + 1, 0, 0), 3))
            .collect();
        let fitness = Arc::new(FitnessEvaluator::detached(survivors, 20));
        let mut ga = GeneticOptimizer::new(
            config().with_max_per_robot(2).with_generations(5),
            Arc::clone(&fitness),
        );
        let starts = [Node::new(0, 0, 0), Node::new(0, 1, 0), Node::new(0, 2, 0)];
        let population = ga.seed_population(&starts);
        let result = ga.run(population, None);
        assert!(result.best.missions.iter().all(|m| m.count() <= 2));
        assert!(result.best.is_valid(9, 2));
        assert_eq!(result.best.assignment_count(), 6);
    }

    #[test]
    fn test_elites_follow_actual_population_size() {
        let (fitness, chromosomes) = fixture(4);
        let mut ga = GeneticOptimizer::new(
            config().with_population_size(100).with_elitism_percent(50),
            fitness,
        );
        let mut population = Population::from_chromosomes(chromosomes);
        ga.evaluate(&mut population);
        let next = ga.breed(&population);
        assert_eq!(next.len(), 4);
        assert_eq!(next.as_slice()[..2], population.as_slice()[..2]);
        assert!(next.as_slice()[2..].iter().all(|c| c.fitness == 0.0));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let a = run(config());
        let b = run(config());
        assert_eq!(a.history, b.history);
        assert_eq!(a.best, b.best);
    }

    #[test]
    fn test_pooled_run_matches_sequential() {
        let seq = run(config());
        let par = run(config().with_parallel(true).with_pool_size(3));
        assert_eq!(seq.history, par.history);
        assert_eq!(seq.best, par.best);
    }

    #[test]
    fn test_pool_released_after_run() {
        let (fitness, chromosomes) = fixture(12);
        let mut ga = GeneticOptimizer::new(
            config().with_parallel(true).with_pool_size(2).with_generations(4),
            fitness,
        );
        ga.run(Population::from_chromosomes(chromosomes), None);
        let stats = ga.pool_stats().unwrap();
        assert_eq!(stats.generations, 5);
        assert_eq!(stats.evaluations, 60);
        assert_eq!(stats.faults, 0);
    }

    #[test]
    fn test_cancel_stops_before_next_generation() {
        let (fitness, chromosomes) = fixture(10);
        let mut ga = GeneticOptimizer::new(config(), fitness);
        let cancel = AtomicBool::new(true);
        let result = ga.run(Population::from_chromosomes(chromosomes), Some(&cancel));
        assert!(result.cancelled);
        assert_eq!(result.generations, 0);
        assert_eq!(result.history.len(), 1);
        assert_eq!(ga.state(), OptimizerState::Done { generation: 0 });
    }

    #[test]
    fn test_zero_survivors_skips_evolution() {
        let fitness = Arc::new(FitnessEvaluator::detached(Vec::new(), 20));
        let mut ga = GeneticOptimizer::new(config(), fitness);
        let starts = [Node::new(0, 0, 0), Node::new(1, 0, 0)];
        let population = ga.seed_population(&starts);
        let result = ga.run(population, None);
        assert_eq!(result.generations, 0);
        assert!(result.best.missions.iter().all(|m| m.is_empty()));
        assert_eq!(result.best.robot_count(), 2);
    }

    #[test]
    fn test_single_chromosome_population() {
        let result = run(config().with_population_size(1).with_generations(5));
        assert_eq!(result.history.len(), 6);
        assert!(result.history.windows(2).all(|p| p[0] == p[1]));
    }

    #[test]
    fn test_state_progression() {
        let (fitness, chromosomes) = fixture(10);
        let mut ga = GeneticOptimizer::new(config().with_generations(3), fitness);
        assert_eq!(ga.state(), OptimizerState::Init);
        ga.run(Population::from_chromosomes(chromosomes), None);
        assert_eq!(ga.state(), OptimizerState::Done { generation: 3 });
    }
}
