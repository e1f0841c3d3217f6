//! End-to-end rescue planning.
//!
//! # Pipeline
//!
//! 1. Place robots on the ground floor.
//! 2. List survivors, at most `max_per_robot × robots`.
//! 3. Validate the problem.
//! 4. Seed and evolve the GA (skipped when there are no survivors).
//! 5. Optionally solve the baseline.
//! 6. Expand the best plan into a [`RescueReport`].

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{info, warn};

use crate::baseline::{BaselineSolver, RescueReport};
use crate::config::RescueConfig;
use crate::error::{RescueError, Result};
use crate::ga::{Chromosome, FitnessEvaluator, GaResult, GeneticOptimizer};
use crate::models::{Node, Survivor};
use crate::parallel::PoolStats;
use crate::validation::validate_problem;
use crate::world::{Grid, WorldModel, place_robots};

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct MissionOutcome {
    /// Robot start cells.
    pub starts: Vec<Node>,
    /// Survivors considered, ids sequential.
    pub survivors: Vec<Survivor>,
    /// GA outcome; `None` when there was nothing to assign.
    pub ga: Option<GaResult>,
    /// Expanded best plan with the baseline beside it.
    pub report: RescueReport,
    /// Worker pool counters, when the GA scored on a pool.
    pub pool_stats: Option<PoolStats>,
}

impl MissionOutcome {
    /// Whether the GA stopped early on request.
    pub fn cancelled(&self) -> bool {
        self.ga.as_ref().is_some_and(|r| r.cancelled)
    }
}

/// A configured rescue planning run.
#[derive(Debug, Clone)]
pub struct RescueMission {
    config: RescueConfig,
}

impl RescueMission {
    /// Creates a run; the configuration is normalized.
    pub fn new(config: RescueConfig) -> Self {
        Self {
            config: config.normalized(),
        }
    }

    pub fn config(&self) -> &RescueConfig {
        &self.config
    }

    /// Generates the configured world, seeded from the configuration.
    pub fn generate_world(&self) -> Result<Grid> {
        let mut rng = match self.config.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => SmallRng::from_os_rng(),
        };
        let c = &self.config;
        let grid = c
            .world_generator()
            .generate(c.grid_x, c.grid_y, c.grid_z, &mut rng)?;
        info!(
            dims = ?(c.grid_x, c.grid_y, c.grid_z),
            obstacles = grid.obstacle_count(),
            survivors = grid.survivor_count(),
            "world generated"
        );
        Ok(grid)
    }

    /// Plans the rescue over `world`.
    ///
    /// `cancel` is checked between GA generations; a cancelled run still
    /// reports the best plan found so far.
    ///
    /// # Errors
    /// [`RescueError::NoRobotPlacement`] when a robot cannot be placed and
    /// [`RescueError::InvalidProblem`] when validation fails.
    pub fn run(
        &self,
        world: Arc<dyn WorldModel>,
        cancel: Option<&AtomicBool>,
    ) -> Result<MissionOutcome> {
        let robots = self.config.robot_count;
        let cap = self.config.max_per_robot();
        let starts = place_robots(world.as_ref(), robots)?;
        let survivors = world.list_survivors(cap.saturating_mul(robots));

        validate_problem(
            world.as_ref(),
            &starts,
            &survivors,
            self.config.population_size,
        )
        .map_err(RescueError::InvalidProblem)?;
        info!(robots, survivors = survivors.len(), cap, "rescue problem ready");

        let (best, ga, pool_stats) = if survivors.is_empty() {
            warn!("no survivors detected; nothing to plan");
            (Chromosome::empty(&starts), None, None)
        } else {
            let fitness = Arc::new(FitnessEvaluator::new(
                Arc::clone(&world),
                survivors.clone(),
                cap,
            ));
            let mut optimizer = GeneticOptimizer::new(self.config.to_ga_config(), fitness);
            let population = optimizer.seed_population(&starts);
            let result = optimizer.run(population, cancel);
            (result.best.clone(), Some(result), optimizer.pool_stats())
        };

        let baseline = self
            .config
            .baseline
            .then(|| BaselineSolver::new().solve(world.as_ref(), &starts, &survivors));
        let report = RescueReport::build(world.as_ref(), &best, &survivors, baseline);

        Ok(MissionOutcome {
            starts,
            survivors,
            ga,
            report,
            pool_stats,
        })
    }
}
