//! 6-connected A* over the occupancy grid.
//!
//! # Algorithm
//!
//! Open set is a binary heap keyed by `(f, insertion order)`, so among
//! equal `f` scores the node pushed first is expanded first. Improved
//! `g` scores push a fresh entry; stale entries are skipped when popped.
//! Heuristic is the Euclidean distance to the goal.
//!
//! # Complexity
//! O(V log V) for V grid cells.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::step_cost;
use crate::models::{MAX_PATH_LEN, Node, Path};
use crate::world::WorldModel;

#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f64,
    seq: u64,
    index: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    // BinaryHeap is a max-heap: invert so the lowest (f, seq) pops first.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

struct Layout {
    dims: (i32, i32, i32),
}

impl Layout {
    fn len(&self) -> usize {
        self.dims.0 as usize * self.dims.1 as usize * self.dims.2 as usize
    }

    fn index(&self, n: Node) -> usize {
        (n.z as usize * self.dims.1 as usize + n.y as usize) * self.dims.0 as usize + n.x as usize
    }

    fn node(&self, index: usize) -> Node {
        let gx = self.dims.0 as usize;
        let gy = self.dims.1 as usize;
        Node::new(
            (index % gx) as i32,
            ((index / gx) % gy) as i32,
            (index / (gx * gy)) as i32,
        )
    }
}

/// Finds the minimum risk-weighted path from `start` to `goal`.
///
/// Returns an invalid path when either endpoint is invalid or the goal is
/// unreachable, and a one-node path when `start == goal`. A path longer
/// than [`MAX_PATH_LEN`] nodes is reported invalid (with the retained
/// prefix) rather than silently shortened.
pub fn find_path(world: &dyn WorldModel, start: Node, goal: Node) -> Path {
    if !world.is_valid(start) || !world.is_valid(goal) {
        return Path::invalid();
    }
    if start == goal {
        return Path::trivial(start);
    }

    let layout = Layout { dims: world.dims() };
    let cells = layout.len();
    let mut g_score = vec![f64::INFINITY; cells];
    let mut parent: Vec<Option<usize>> = vec![None; cells];
    let mut closed = vec![false; cells];
    let mut open = BinaryHeap::new();
    let mut seq = 0u64;

    let start_idx = layout.index(start);
    let goal_idx = layout.index(goal);
    g_score[start_idx] = 0.0;
    open.push(OpenEntry {
        f: start.euclidean(goal),
        seq,
        index: start_idx,
    });

    while let Some(entry) = open.pop() {
        let current_idx = entry.index;
        if closed[current_idx] {
            continue;
        }
        closed[current_idx] = true;

        if current_idx == goal_idx {
            return reconstruct(&layout, &parent, start_idx, goal_idx, g_score[goal_idx]);
        }

        let current = layout.node(current_idx);
        let g_current = g_score[current_idx];
        for neighbor in current.neighbors() {
            if !world.is_valid(neighbor) {
                continue;
            }
            let n_idx = layout.index(neighbor);
            if closed[n_idx] {
                continue;
            }
            let tentative = g_current + step_cost(world, neighbor);
            if tentative < g_score[n_idx] {
                g_score[n_idx] = tentative;
                parent[n_idx] = Some(current_idx);
                seq += 1;
                open.push(OpenEntry {
                    f: tentative + neighbor.euclidean(goal),
                    seq,
                    index: n_idx,
                });
            }
        }
    }

    Path::invalid()
}

fn reconstruct(
    layout: &Layout,
    parent: &[Option<usize>],
    start_idx: usize,
    goal_idx: usize,
    cost: f64,
) -> Path {
    let mut reversed = vec![goal_idx];
    let mut cursor = goal_idx;
    while cursor != start_idx {
        match parent[cursor] {
            Some(p) => {
                reversed.push(p);
                cursor = p;
            }
            None => return Path::invalid(),
        }
    }

    let mut steps: Vec<Node> = reversed.into_iter().rev().map(|i| layout.node(i)).collect();
    if steps.len() > MAX_PATH_LEN {
        steps.truncate(MAX_PATH_LEN);
        return Path {
            steps,
            cost,
            valid: false,
        };
    }
    Path {
        steps,
        cost,
        valid: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Grid;

    #[test]
    fn test_exact_grid_case() {
        let grid = Grid::new(3, 3, 1).unwrap();
        let path = find_path(&grid, Node::new(0, 0, 0), Node::new(2, 2, 0));
        assert!(path.valid);
        assert_eq!(path.len(), 5);
        assert!((path.cost - 4.0).abs() < 1e-12);
        assert_eq!(path.start(), Some(Node::new(0, 0, 0)));
        assert_eq!(path.end(), Some(Node::new(2, 2, 0)));
    }

    #[test]
    fn test_trivial_path() {
        let grid = Grid::new(4, 4, 2).unwrap();
        for node in grid.nodes() {
            let path = find_path(&grid, node, node);
            assert!(path.valid);
            assert_eq!(path.steps, vec![node]);
        }
    }

    #[test]
    fn test_steps_are_adjacent_and_free() {
        let grid = Grid::new(5, 5, 2)
            .unwrap()
            .with_obstacle(Node::new(1, 0, 0))
            .with_obstacle(Node::new(1, 1, 0))
            .with_obstacle(Node::new(1, 2, 0));
        let path = find_path(&grid, Node::new(0, 0, 0), Node::new(4, 0, 0));
        assert!(path.valid);
        for w in path.steps.windows(2) {
            assert_eq!(w[0].manhattan(w[1]), 1.0);
            assert!(grid.is_valid(w[1]));
        }
    }

    #[test]
    fn test_invalid_endpoints() {
        let grid = Grid::new(3, 3, 1).unwrap().with_obstacle(Node::new(2, 2, 0));
        assert!(!find_path(&grid, Node::new(0, 0, 0), Node::new(2, 2, 0)).valid);
        assert!(!find_path(&grid, Node::new(-1, 0, 0), Node::new(1, 1, 0)).valid);
    }

    #[test]
    fn test_unreachable_goal() {
        // Wall across x = 1 on a single floor.
        let grid = Grid::new(3, 3, 1)
            .unwrap()
            .with_obstacle(Node::new(1, 0, 0))
            .with_obstacle(Node::new(1, 1, 0))
            .with_obstacle(Node::new(1, 2, 0));
        let path = find_path(&grid, Node::new(0, 0, 0), Node::new(2, 2, 0));
        assert!(!path.valid);
        assert!(path.is_empty());
    }

    #[test]
    fn test_prefers_low_risk_among_equal_length_routes() {
        let grid = Grid::new(3, 3, 1)
            .unwrap()
            .with_risk(Node::new(1, 0, 0), 3);
        let path = find_path(&grid, Node::new(0, 0, 0), Node::new(1, 1, 0));
        assert!(path.valid);
        assert_eq!(path.len(), 3);
        assert!(!path.steps.contains(&Node::new(1, 0, 0)));
        assert!((path.cost - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_risky_corridor_still_used_when_shorter() {
        // Detour costs two extra steps; entering risk 3 costs only 1.5 extra.
        let grid = Grid::new(3, 2, 1)
            .unwrap()
            .with_risk(Node::new(1, 0, 0), 3);
        let path = find_path(&grid, Node::new(0, 0, 0), Node::new(2, 0, 0));
        assert!(path.valid);
        assert_eq!(path.len(), 3);
        assert!((path.cost - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_deterministic() {
        let grid = Grid::new(6, 6, 2).unwrap();
        let a = find_path(&grid, Node::new(0, 0, 0), Node::new(5, 5, 1));
        let b = find_path(&grid, Node::new(0, 0, 0), Node::new(5, 5, 1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_path_over_cap_is_invalid() {
        // A serpentine corridor longer than the cap.
        let width = 40;
        let height = 60;
        let mut grid = Grid::new(width, height, 1).unwrap();
        for y in (1..height).step_by(2) {
            let gap = if (y / 2) % 2 == 0 { width - 1 } else { 0 };
            for x in 0..width {
                if x != gap {
                    grid = grid.with_obstacle(Node::new(x, y, 0));
                }
            }
        }
        let goal = Node::new(0, height - 1 - 1, 0);
        let path = find_path(&grid, Node::new(0, 0, 0), goal);
        assert!(!path.valid);
        assert_eq!(path.len(), MAX_PATH_LEN);
    }
}
