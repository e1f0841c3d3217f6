//! Integer 3-D grid coordinate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate in the occupancy grid.
///
/// Value type without identity; `z` is the floor index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Node {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Node {
    /// The six axis-aligned moves: up, down, north, south, east, west.
    pub const NEIGHBOR_OFFSETS: [(i32, i32, i32); 6] = [
        (0, 0, 1),
        (0, 0, -1),
        (0, 1, 0),
        (0, -1, 0),
        (1, 0, 0),
        (-1, 0, 0),
    ];

    /// Creates a node.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Returns this node shifted by an offset.
    pub fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The six axis-aligned neighbours, in [`Self::NEIGHBOR_OFFSETS`] order.
    ///
    /// Bounds are not checked.
    pub fn neighbors(self) -> impl Iterator<Item = Node> {
        Self::NEIGHBOR_OFFSETS
            .into_iter()
            .map(move |(dx, dy, dz)| self.offset(dx, dy, dz))
    }

    /// L1 distance.
    pub fn manhattan(self, other: Node) -> f64 {
        ((self.x - other.x).abs() + (self.y - other.y).abs() + (self.z - other.z).abs()) as f64
    }

    /// Straight-line distance.
    pub fn euclidean(self, other: Node) -> f64 {
        let dx = (self.x - other.x) as f64;
        let dy = (self.y - other.y) as f64;
        let dz = (self.z - other.z) as f64;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Point at fraction `t` of the segment `self → other`, rounded half-up
    /// to the nearest cell.
    pub fn lerp(self, other: Node, t: f64) -> Node {
        let round = |a: i32, b: i32| (a as f64 + t * (b - a) as f64 + 0.5).floor() as i32;
        Node::new(
            round(self.x, other.x),
            round(self.y, other.y),
            round(self.z, other.z),
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}
