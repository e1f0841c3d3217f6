//! Dense occupancy grid.

use serde::{Deserialize, Serialize};

use super::{MAX_RISK, WorldModel};
use crate::error::{RescueError, Result};
use crate::models::Node;

/// One grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Cell {
    /// Debris: not traversable.
    pub obstacle: bool,
    /// Simulated heat reading in `[0, 1)`.
    pub heat: f32,
    /// Simulated CO2 reading in `[0, 1)`.
    pub co2: f32,
    /// A survivor was detected here.
    pub survivor: bool,
    /// Hazard level `0..=3` derived from obstacle proximity.
    pub risk: u8,
}

/// Dense 3-D grid stored z-major (`z * X * Y + y * X + x`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grid {
    dims: (i32, i32, i32),
    cells: Vec<Cell>,
}

impl Grid {
    /// Creates an obstacle-free grid.
    ///
    /// # Errors
    /// [`RescueError::EmptyGrid`] if any dimension is not positive.
    pub fn new(x: i32, y: i32, z: i32) -> Result<Self> {
        if x <= 0 || y <= 0 || z <= 0 {
            return Err(RescueError::EmptyGrid { x, y, z });
        }
        let len = x as usize * y as usize * z as usize;
        Ok(Self {
            dims: (x, y, z),
            cells: vec![Cell::default(); len],
        })
    }

    /// Marks a cell as an obstacle.
    pub fn with_obstacle(mut self, node: Node) -> Self {
        if let Some(cell) = self.cell_mut(node) {
            cell.obstacle = true;
        }
        self
    }

    /// Marks a free cell as holding a survivor.
    pub fn with_survivor(mut self, node: Node) -> Self {
        if let Some(cell) = self.cell_mut(node) {
            if !cell.obstacle {
                cell.survivor = true;
            }
        }
        self
    }

    /// Sets the risk of a cell directly.
    pub fn with_risk(mut self, node: Node, risk: u8) -> Self {
        if let Some(cell) = self.cell_mut(node) {
            cell.risk = risk.min(MAX_RISK);
        }
        self
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always false for a constructed grid.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell at a node, `None` when out of bounds.
    pub fn cell(&self, node: Node) -> Option<&Cell> {
        self.index(node).map(|i| &self.cells[i])
    }

    /// Mutable cell at a node, `None` when out of bounds.
    pub fn cell_mut(&mut self, node: Node) -> Option<&mut Cell> {
        match self.index(node) {
            Some(i) => Some(&mut self.cells[i]),
            None => None,
        }
    }

    /// Iterates all nodes in scan order (z, then y, then x).
    pub fn nodes(&self) -> impl Iterator<Item = Node> {
        let (gx, gy, gz) = self.dims;
        (0..gz).flat_map(move |z| {
            (0..gy).flat_map(move |y| (0..gx).map(move |x| Node::new(x, y, z)))
        })
    }

    /// Number of obstacle cells.
    pub fn obstacle_count(&self) -> usize {
        self.cells.iter().filter(|c| c.obstacle).count()
    }

    /// Number of cells with a detected survivor.
    pub fn survivor_count(&self) -> usize {
        self.cells.iter().filter(|c| c.survivor).count()
    }

    /// Recomputes every cell's risk from obstacle proximity.
    ///
    /// Obstacle cells get the maximum risk; free cells count obstacles in
    /// their 26-neighbourhood: none → 0, one → 1, two or three → 2, more → 3.
    pub fn assign_risk_from_obstacles(&mut self) {
        let nodes: Vec<Node> = self.nodes().collect();
        for node in nodes {
            let risk = if self.is_obstacle(node) {
                MAX_RISK
            } else {
                match self.nearby_obstacles(node) {
                    0 => 0,
                    1 => 1,
                    2..=3 => 2,
                    _ => MAX_RISK,
                }
            };
            if let Some(cell) = self.cell_mut(node) {
                cell.risk = risk;
            }
        }
    }

    fn nearby_obstacles(&self, node: Node) -> usize {
        let mut count = 0;
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dx, dy, dz) != (0, 0, 0) && self.is_obstacle(node.offset(dx, dy, dz)) {
                        count += 1;
                    }
                }
            }
        }
        count
    }

    fn is_obstacle(&self, node: Node) -> bool {
        self.cell(node).is_some_and(|c| c.obstacle)
    }

    fn index(&self, node: Node) -> Option<usize> {
        let (gx, gy, gz) = self.dims;
        if node.x < 0 || node.y < 0 || node.z < 0 || node.x >= gx || node.y >= gy || node.z >= gz {
            return None;
        }
        Some((node.z as usize * gy as usize + node.y as usize) * gx as usize + node.x as usize)
    }
}

impl WorldModel for Grid {
    fn dims(&self) -> (i32, i32, i32) {
        self.dims
    }

    fn cell_obstacle(&self, node: Node) -> bool {
        self.is_obstacle(node)
    }

    fn cell_risk(&self, node: Node) -> u8 {
        self.cell(node).map_or(0, |c| c.risk)
    }

    fn cell_survivor(&self, node: Node) -> bool {
        self.cell(node).is_some_and(|c| c.survivor)
    }
}
