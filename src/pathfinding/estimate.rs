//! Sampled line-of-sight cost approximation.
//!
//! # Model
//!
//! ```text
//! samples  = clamp(⌊2 × d⌋ + 3, ≤ 50)        d = Euclidean distance
//! density  = obstacle samples / samples taken
//! cost     = d × (1 + 0.8 × density) + 0.5 × (2.0 × obstacle samples) + 0.3 × mean risk
//! ```
//!
//! Sample points are rounded to the nearest cell and clamped into the grid.

use crate::models::Node;
use crate::world::WorldModel;

/// Fewest sample intervals along a segment.
pub const MIN_SAMPLES: usize = 3;
/// Most sample intervals along a segment.
pub const MAX_SAMPLES: usize = 50;
/// Penalty per sampled obstacle cell.
pub const OBSTACLE_PENALTY: f64 = 2.0;
/// Extra distance fraction at full obstacle density.
pub const DETOUR_WEIGHT: f64 = 0.8;
/// Weight of the mean sampled risk.
pub const RISK_WEIGHT: f64 = 0.3;

const OBSTACLE_PENALTY_SCALE: f64 = 0.5;

/// Approximates the cost of travelling from `start` to `end`.
pub fn estimate_cost(world: &dyn WorldModel, start: Node, end: Node) -> f64 {
    let base = start.euclidean(end);
    if base < 0.1 {
        return base;
    }

    let samples = ((base * 2.0) as usize + MIN_SAMPLES).min(MAX_SAMPLES);
    let mut obstacles = 0usize;
    let mut risk_sum = 0.0;
    for i in 0..=samples {
        let t = i as f64 / samples as f64;
        let cell = world.clamp(start.lerp(end, t));
        if world.cell_obstacle(cell) {
            obstacles += 1;
        }
        risk_sum += world.cell_risk(cell) as f64;
    }

    let taken = (samples + 1) as f64;
    let density = obstacles as f64 / taken;
    let detour = 1.0 + density * DETOUR_WEIGHT;
    let penalty = obstacles as f64 * OBSTACLE_PENALTY;
    base * detour + penalty * OBSTACLE_PENALTY_SCALE + (risk_sum / taken) * RISK_WEIGHT
}

/// Sums risk at `samples + 1` points on the segment; out-of-grid points are skipped.
pub fn sampled_risk(world: &dyn WorldModel, start: Node, end: Node, samples: usize) -> f64 {
    let samples = samples.max(1);
    (0..=samples)
        .map(|i| start.lerp(end, i as f64 / samples as f64))
        .filter(|&n| world.in_bounds(n))
        .map(|n| world.cell_risk(n) as f64)
        .sum()
}
