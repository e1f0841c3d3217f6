//! Randomized world construction.
//!
//! # Pipeline
//!
//! 1. Obstacles: shuffle every cell, mark the first `cells × density` as debris.
//! 2. Risk: derived from obstacle proximity ([`Grid::assign_risk_from_obstacles`]).
//! 3. Sensors: uniform heat and CO2 readings on free cells.
//! 4. Survivors: free cells where both readings reach their thresholds.

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

use super::Grid;
use crate::error::Result;
use crate::models::Node;

/// Builds randomized rescue worlds.
///
/// # Example
/// ```
/// use rand::SeedableRng;
/// use rand::rngs::SmallRng;
/// use u_rescue::world::WorldGenerator;
///
/// let mut rng = SmallRng::seed_from_u64(7);
/// let grid = WorldGenerator::new()
///     .with_obstacle_density(0.2)
///     .generate(10, 10, 2, &mut rng)
///     .unwrap();
/// assert_eq!(grid.obstacle_count(), 40);
/// ```
#[derive(Debug, Clone)]
pub struct WorldGenerator {
    /// Fraction of cells turned into debris, `0.0..=1.0`.
    pub obstacle_density: f64,
    /// Minimum heat reading for a survivor detection.
    pub heat_threshold: f32,
    /// Minimum CO2 reading for a survivor detection.
    pub co2_threshold: f32,
}

impl Default for WorldGenerator {
    fn default() -> Self {
        Self {
            obstacle_density: 0.2,
            heat_threshold: 0.7,
            co2_threshold: 0.7,
        }
    }
}

impl WorldGenerator {
    /// Creates a generator with default density and thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the obstacle density (clamped to `0.0..=1.0`).
    pub fn with_obstacle_density(mut self, density: f64) -> Self {
        self.obstacle_density = if density.is_finite() {
            density.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    /// Sets the heat and CO2 detection thresholds.
    pub fn with_thresholds(mut self, heat: f32, co2: f32) -> Self {
        self.heat_threshold = heat;
        self.co2_threshold = co2;
        self
    }

    /// Generates a grid of the given size.
    ///
    /// # Errors
    /// [`crate::RescueError::EmptyGrid`] for non-positive dimensions.
    pub fn generate<R: Rng>(&self, x: i32, y: i32, z: i32, rng: &mut R) -> Result<Grid> {
        let mut grid = Grid::new(x, y, z)?;
        self.place_obstacles(&mut grid, rng);
        grid.assign_risk_from_obstacles();
        self.simulate_sensors(&mut grid, rng);
        self.detect_survivors(&mut grid);
        debug!(
            obstacles = grid.obstacle_count(),
            survivors = grid.survivor_count(),
            "world generated"
        );
        Ok(grid)
    }

    fn place_obstacles<R: Rng>(&self, grid: &mut Grid, rng: &mut R) {
        let mut cells: Vec<Node> = grid.nodes().collect();
        let count = if self.obstacle_density >= 1.0 {
            cells.len()
        } else {
            ((cells.len() as f64 * self.obstacle_density) as usize).min(cells.len())
        };
        cells.shuffle(rng);
        for node in cells.into_iter().take(count) {
            if let Some(cell) = grid.cell_mut(node) {
                cell.obstacle = true;
            }
        }
    }

    fn simulate_sensors<R: Rng>(&self, grid: &mut Grid, rng: &mut R) {
        let nodes: Vec<Node> = grid.nodes().collect();
        for node in nodes {
            if let Some(cell) = grid.cell_mut(node) {
                if cell.obstacle {
                    cell.heat = 0.0;
                    cell.co2 = 0.0;
                } else {
                    cell.heat = rng.random::<f32>();
                    cell.co2 = rng.random::<f32>();
                }
            }
        }
    }

    fn detect_survivors(&self, grid: &mut Grid) {
        let nodes: Vec<Node> = grid.nodes().collect();
        for node in nodes {
            if let Some(cell) = grid.cell_mut(node) {
                cell.survivor = !cell.obstacle
                    && cell.heat >= self.heat_threshold
                    && cell.co2 >= self.co2_threshold;
            }
        }
    }
}
