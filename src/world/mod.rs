//! Read-only occupancy grid and its construction.
//!
//! The optimizer never touches a global grid: every component that needs
//! obstacle or risk information receives a [`WorldModel`] explicitly, and
//! the worker pool shares it behind an `Arc`.
//!
//! # Submodules
//!
//! - [`Grid`]: dense in-memory grid, the standard [`WorldModel`]
//! - [`WorldGenerator`]: obstacle placement, risk, sensors, survivor detection
//! - [`place_robots`]: start-cell selection on the ground floor perimeter

mod generator;
mod grid;
mod placement;

pub use generator::WorldGenerator;
pub use grid::{Cell, Grid};
pub use placement::{has_free_neighbor, place_robots};

use std::fmt::Debug;

use crate::models::{Node, Survivor};

/// Highest risk level a cell can carry.
pub const MAX_RISK: u8 = 3;

/// Read-only view of the 3-D world consumed by pathfinding and fitness.
///
/// Implementations must be shareable across worker threads.
pub trait WorldModel: Send + Sync + Debug {
    /// Grid extent `(x, y, z)`.
    fn dims(&self) -> (i32, i32, i32);

    /// Whether the cell is an obstacle. Out-of-bounds nodes are not obstacles.
    fn cell_obstacle(&self, node: Node) -> bool;

    /// Risk level `0..=3` of the cell. Out-of-bounds nodes have risk 0.
    fn cell_risk(&self, node: Node) -> u8;

    /// Whether a survivor was detected in the cell.
    fn cell_survivor(&self, node: Node) -> bool;

    /// Whether the node lies inside the grid.
    fn in_bounds(&self, node: Node) -> bool {
        let (x, y, z) = self.dims();
        (0..x).contains(&node.x) && (0..y).contains(&node.y) && (0..z).contains(&node.z)
    }

    /// In bounds and not an obstacle.
    fn is_valid(&self, node: Node) -> bool {
        self.in_bounds(node) && !self.cell_obstacle(node)
    }

    /// Clamps a node into the grid.
    fn clamp(&self, node: Node) -> Node {
        let (x, y, z) = self.dims();
        Node::new(
            node.x.clamp(0, (x - 1).max(0)),
            node.y.clamp(0, (y - 1).max(0)),
            node.z.clamp(0, (z - 1).max(0)),
        )
    }

    /// Lists up to `max` survivors in scan order (z, then y, then x).
    ///
    /// Ids are sequential in scan order; priority is `3 - risk`.
    fn list_survivors(&self, max: usize) -> Vec<Survivor> {
        let (gx, gy, gz) = self.dims();
        let mut out = Vec::new();
        'scan: for z in 0..gz {
            for y in 0..gy {
                for x in 0..gx {
                    if out.len() >= max {
                        break 'scan;
                    }
                    let node = Node::new(x, y, z);
                    if self.cell_survivor(node) {
                        let priority = MAX_RISK as i32 - self.cell_risk(node) as i32;
                        out.push(Survivor::new(out.len(), node, priority));
                    }
                }
            }
        }
        out
    }
}
