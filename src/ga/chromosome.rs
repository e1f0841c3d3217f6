//! Per-robot mission encoding.
//!
//! # Encoding
//!
//! A chromosome holds one [`RobotMission`] per robot. Each mission is the
//! ordered list of survivor ids that robot visits, with a round trip to its
//! start cell after every survivor. A mission never holds more than
//! `max_per_robot` ids.
//!
//! After [`Chromosome::repair`] no survivor id appears in two missions (or
//! twice in one), and every survivor that fits under the per-robot cap is
//! assigned somewhere.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::models::{Node, SurvivorId};

/// One robot's rescue sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct RobotMission {
    /// Robot start cell; every leg returns here.
    pub start: Node,
    /// Survivor ids in visiting order.
    pub sequence: Vec<SurvivorId>,
}

impl RobotMission {
    /// Creates an empty mission.
    pub fn new(start: Node) -> Self {
        Self {
            start,
            sequence: Vec::new(),
        }
    }

    /// Creates a mission with a given sequence.
    pub fn with_sequence(start: Node, sequence: Vec<SurvivorId>) -> Self {
        Self { start, sequence }
    }

    /// Number of assigned survivors.
    pub fn count(&self) -> usize {
        self.sequence.len()
    }

    /// Whether no survivor is assigned.
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }
}

/// A full assignment of survivors to robots plus its fitness.
///
/// Fitness is `0.0` (unscored) until evaluated; higher is better.
#[derive(Debug, Clone, PartialEq)]
pub struct Chromosome {
    /// One mission per robot, indexed by robot.
    pub missions: Vec<RobotMission>,
    /// Fitness value (higher = better).
    pub fitness: f64,
}

impl Chromosome {
    /// Creates a chromosome with empty missions for the given starts.
    pub fn empty(starts: &[Node]) -> Self {
        Self {
            missions: starts.iter().map(|&s| RobotMission::new(s)).collect(),
            fitness: 0.0,
        }
    }

    /// Creates a randomly seeded chromosome.
    ///
    /// # Algorithm
    /// 1. Shuffle the ids `0..survivor_count`.
    /// 2. Robot `r` takes the next `⌊S/R⌋` ids, plus one if `r < S mod R`,
    ///    capped at `max_per_robot`.
    /// 3. Ids left over by the cap go one at a time to the least-loaded
    ///    robot until every id is placed or every robot is full.
    pub fn seeded<R: Rng>(
        starts: &[Node],
        survivor_count: usize,
        max_per_robot: usize,
        rng: &mut R,
    ) -> Self {
        let mut chromosome = Self::empty(starts);
        let robots = starts.len();
        if survivor_count == 0 || robots == 0 {
            return chromosome;
        }

        let mut ids: Vec<SurvivorId> = (0..survivor_count).collect();
        ids.shuffle(rng);

        let base = survivor_count / robots;
        let extra = survivor_count % robots;
        let mut cursor = ids.into_iter();
        for (r, mission) in chromosome.missions.iter_mut().enumerate() {
            let quota = (base + usize::from(r < extra)).min(max_per_robot);
            mission.sequence.extend(cursor.by_ref().take(quota));
        }

        for id in cursor {
            match least_loaded(&chromosome.missions, max_per_robot) {
                Some(r) => chromosome.missions[r].sequence.push(id),
                None => break,
            }
        }

        chromosome
    }

    /// Number of robots.
    pub fn robot_count(&self) -> usize {
        self.missions.len()
    }

    /// All assigned ids, in robot then sequence order (duplicates included).
    pub fn assigned(&self) -> impl Iterator<Item = SurvivorId> + '_ {
        self.missions.iter().flat_map(|m| m.sequence.iter().copied())
    }

    /// Total number of assignment slots in use.
    pub fn assignment_count(&self) -> usize {
        self.missions.iter().map(RobotMission::count).sum()
    }

    /// Number of robots with at least one survivor.
    pub fn active_robots(&self) -> usize {
        self.missions.iter().filter(|m| !m.is_empty()).count()
    }

    /// Assignments beyond the first for every id.
    pub fn duplicate_count(&self) -> usize {
        let mut seen = std::collections::HashSet::new();
        self.assigned().filter(|id| !seen.insert(*id)).count()
    }

    /// Ids in `0..survivor_count` not assigned to any robot.
    pub fn unassigned(&self, survivor_count: usize) -> Vec<SurvivorId> {
        let mut assigned = vec![false; survivor_count];
        for id in self.assigned() {
            if id < survivor_count {
                assigned[id] = true;
            }
        }
        (0..survivor_count).filter(|&id| !assigned[id]).collect()
    }

    /// Checks the post-repair invariants: known ids only, no duplicates,
    /// every mission within the cap.
    pub fn is_valid(&self, survivor_count: usize, max_per_robot: usize) -> bool {
        self.missions.iter().all(|m| m.count() <= max_per_robot)
            && self.assigned().all(|id| id < survivor_count)
            && self.duplicate_count() == 0
    }

    /// Restores the no-duplicate invariant.
    ///
    /// # Algorithm
    /// 1. Scan missions in robot order, keeping the first occurrence of each
    ///    known id and dropping later duplicates, unknown ids, and anything
    ///    beyond the per-robot cap.
    /// 2. Assign each still-unassigned id (ascending) to the least-loaded
    ///    robot that is below the cap.
    ///
    /// Repairing a repaired chromosome changes nothing.
    pub fn repair(&mut self, survivor_count: usize, max_per_robot: usize) {
        if self.missions.is_empty() {
            return;
        }
        let mut assigned = vec![false; survivor_count];
        for mission in &mut self.missions {
            let mut kept = Vec::with_capacity(mission.sequence.len().min(max_per_robot));
            for &id in &mission.sequence {
                if kept.len() >= max_per_robot {
                    break;
                }
                if id < survivor_count && !assigned[id] {
                    assigned[id] = true;
                    kept.push(id);
                }
            }
            mission.sequence = kept;
        }

        for id in 0..survivor_count {
            if assigned[id] {
                continue;
            }
            match least_loaded(&self.missions, max_per_robot) {
                Some(r) => {
                    self.missions[r].sequence.push(id);
                    assigned[id] = true;
                }
                None => break,
            }
        }
    }
}

/// Index of the first robot with the fewest survivors, if it is below the cap.
pub(crate) fn least_loaded(missions: &[RobotMission], max_per_robot: usize) -> Option<usize> {
    missions
        .iter()
        .enumerate()
        .min_by_key(|(r, m)| (m.count(), *r))
        .filter(|(_, m)| m.count() < max_per_robot)
        .map(|(r, _)| r)
}
