//! Robot start placement.
//!
//! # Algorithm
//!
//! 1. One robot starts at the origin. Otherwise the first four take the
//!    ground-floor corners and the rest are spread evenly along the z=0
//!    perimeter.
//! 2. A candidate must be free and have at least one free 6-neighbour.
//! 3. A rejected candidate tries ten local offsets (planar, diagonal,
//!    vertical), then a scan of the ground floor, then a scan of the grid.
//! 4. If no cell qualifies the run cannot start.

use tracing::{debug, warn};

use super::WorldModel;
use crate::error::{RescueError, Result};
use crate::models::Node;

const LOCAL_OFFSETS: [(i32, i32, i32); 10] = [
    (0, 1, 0),
    (1, 0, 0),
    (0, -1, 0),
    (-1, 0, 0),
    (1, 1, 0),
    (1, -1, 0),
    (-1, 1, 0),
    (-1, -1, 0),
    (0, 0, 1),
    (0, 0, -1),
];

/// Whether a robot at `node` could move to at least one adjacent cell.
pub fn has_free_neighbor(world: &dyn WorldModel, node: Node) -> bool {
    node.neighbors().any(|n| world.is_valid(n))
}

/// Chooses a start cell for each of `robot_count` robots.
///
/// # Errors
/// [`RescueError::NoRobotPlacement`] when no free cell with a free
/// neighbour exists for some robot.
pub fn place_robots(world: &dyn WorldModel, robot_count: usize) -> Result<Vec<Node>> {
    let (gx, gy, _) = world.dims();
    let mut starts = Vec::with_capacity(robot_count);

    for robot in 0..robot_count {
        let preferred = perimeter_slot(robot, robot_count, gx, gy);
        let preferred = Node::new(
            preferred.x.clamp(0, (gx - 1).max(0)),
            preferred.y.clamp(0, (gy - 1).max(0)),
            0,
        );

        let start = if is_usable(world, preferred) {
            preferred
        } else {
            let replacement = find_replacement(world, preferred)
                .ok_or(RescueError::NoRobotPlacement { robot })?;
            warn!(robot, from = %preferred, to = %replacement, "robot start relocated");
            replacement
        };
        debug!(robot, start = %start, "robot placed");
        starts.push(start);
    }

    Ok(starts)
}

fn is_usable(world: &dyn WorldModel, node: Node) -> bool {
    world.is_valid(node) && has_free_neighbor(world, node)
}

fn perimeter_slot(robot: usize, robot_count: usize, gx: i32, gy: i32) -> Node {
    if robot_count == 1 {
        return Node::new(0, 0, 0);
    }
    match robot {
        0 => Node::new(0, 0, 0),
        1 => Node::new(gx - 1, 0, 0),
        2 => Node::new(0, gy - 1, 0),
        3 => Node::new(gx - 1, gy - 1, 0),
        _ => {
            let edge_idx = (robot - 4) as i64;
            let perimeter = 2 * (gx as i64 + gy as i64 - 2);
            if perimeter <= 0 {
                return Node::new(0, 0, 0);
            }
            let slots = (robot_count - 4 + 1) as i64;
            let pos = (edge_idx * perimeter / slots) as i32;
            if pos < gx {
                Node::new(pos, 0, 0)
            } else if pos < gx + gy - 1 {
                Node::new(gx - 1, pos - gx + 1, 0)
            } else if pos < 2 * gx + gy - 2 {
                Node::new(gx - 1 - (pos - gx - gy + 2), gy - 1, 0)
            } else {
                Node::new(0, gy - 1 - (pos - 2 * gx - gy + 2), 0)
            }
        }
    }
}

fn find_replacement(world: &dyn WorldModel, origin: Node) -> Option<Node> {
    let (gx, gy, gz) = world.dims();

    let local = LOCAL_OFFSETS
        .iter()
        .map(|&(dx, dy, dz)| origin.offset(dx, dy, dz))
        .find(|&n| is_usable(world, n));
    if local.is_some() {
        return local;
    }

    let ground = (0..gy)
        .flat_map(|y| (0..gx).map(move |x| Node::new(x, y, 0)))
        .find(|&n| is_usable(world, n));
    if ground.is_some() {
        return ground;
    }

    (0..gz)
        .flat_map(|z| (0..gy).flat_map(move |y| (0..gx).map(move |x| Node::new(x, y, z))))
        .find(|&n| is_usable(world, n))
}
