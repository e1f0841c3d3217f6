//! Selection, crossover and mutation for mission chromosomes.
//!
//! Every operator that can break the no-duplicate invariant finishes with
//! [`Chromosome::repair`], and every operator resets the child's fitness to
//! the unscored value.
//!
//! # Usage
//!
//! ```
//! use u_rescue::ga::operators::{GeneticOperators, MutationType};
//!
//! let ops = GeneticOperators::default();
//! assert_eq!(ops.tournament_size, 3);
//! assert_eq!(ops.mutation_types.len(), 4);
//! assert!(ops.mutation_types.contains(&MutationType::Transfer));
//! ```

use rand::Rng;

use super::chromosome::Chromosome;

/// Mutation applied to a single robot's mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationType {
    /// Swap two random positions in the sequence (needs 2+ survivors).
    Swap,
    /// Drop a random survivor; repair reassigns it (needs 2+ survivors).
    Remove,
    /// Move the last survivor to another robot below the cap (needs 2+ robots).
    Transfer,
    /// Reverse a random range of the sequence (needs 2+ survivors).
    Reverse,
}

impl MutationType {
    /// All mutation kinds, chosen uniformly by default.
    pub const ALL: [MutationType; 4] = [
        MutationType::Swap,
        MutationType::Remove,
        MutationType::Transfer,
        MutationType::Reverse,
    ];
}

/// Runtime-selectable genetic operators for mission chromosomes.
#[derive(Debug, Clone)]
pub struct GeneticOperators {
    /// Number of draws per tournament.
    pub tournament_size: usize,
    /// Mutation kinds to choose from, uniformly.
    pub mutation_types: Vec<MutationType>,
}

impl Default for GeneticOperators {
    fn default() -> Self {
        Self {
            tournament_size: 3,
            mutation_types: MutationType::ALL.to_vec(),
        }
    }
}

impl GeneticOperators {
    /// Tournament selection; returns the index of the winner.
    ///
    /// Draws `tournament_size` indices with replacement. A later draw
    /// replaces the current winner only with strictly higher fitness.
    ///
    /// # Panics
    /// Panics if `population` is empty.
    pub fn select<R: Rng>(&self, population: &[Chromosome], rng: &mut R) -> usize {
        let mut best = rng.random_range(0..population.len());
        for _ in 1..self.tournament_size.max(1) {
            let candidate = rng.random_range(0..population.len());
            if population[candidate].fitness > population[best].fitness {
                best = candidate;
            }
        }
        best
    }

    /// Robot-split crossover.
    ///
    /// Picks a split point in `0..R`; missions of robots before the split
    /// come from `p1`, the rest from `p2`. The child is repaired and
    /// unscored.
    pub fn crossover<R: Rng>(
        &self,
        p1: &Chromosome,
        p2: &Chromosome,
        survivor_count: usize,
        max_per_robot: usize,
        rng: &mut R,
    ) -> Chromosome {
        let robots = p1.robot_count().min(p2.robot_count());
        let split = if robots == 0 {
            0
        } else {
            rng.random_range(0..robots)
        };
        let missions = (0..robots)
            .map(|r| {
                if r < split {
                    p1.missions[r].clone()
                } else {
                    p2.missions[r].clone()
                }
            })
            .collect();
        let mut child = Chromosome {
            missions,
            fitness: 0.0,
        };
        child.repair(survivor_count, max_per_robot);
        child
    }

    /// Mutates each robot's mission independently with probability `rate`.
    ///
    /// Repairs the chromosome if any robot was selected and always resets
    /// fitness. Returns whether any robot was selected.
    pub fn mutate<R: Rng>(
        &self,
        chromosome: &mut Chromosome,
        rate: f64,
        survivor_count: usize,
        max_per_robot: usize,
        rng: &mut R,
    ) -> bool {
        let mut mutated = false;
        let rate = if rate.is_finite() { rate.clamp(0.0, 1.0) } else { 0.0 };

        for r in 0..chromosome.robot_count() {
            if !rng.random_bool(rate) {
                continue;
            }
            mutated = true;
            if chromosome.missions[r].is_empty() || self.mutation_types.is_empty() {
                continue;
            }
            let kind = self.mutation_types[rng.random_range(0..self.mutation_types.len())];
            match kind {
                MutationType::Swap => swap_mutation(chromosome, r, rng),
                MutationType::Remove => remove_mutation(chromosome, r, rng),
                MutationType::Transfer => transfer_mutation(chromosome, r, max_per_robot, rng),
                MutationType::Reverse => reverse_mutation(chromosome, r, rng),
            }
        }

        if mutated {
            chromosome.repair(survivor_count, max_per_robot);
        }
        chromosome.fitness = 0.0;
        mutated
    }
}

/// Swaps two random positions of robot `r`'s sequence.
pub fn swap_mutation<R: Rng>(chromosome: &mut Chromosome, r: usize, rng: &mut R) {
    let sequence = &mut chromosome.missions[r].sequence;
    if sequence.len() < 2 {
        return;
    }
    let i = rng.random_range(0..sequence.len());
    let j = rng.random_range(0..sequence.len());
    sequence.swap(i, j);
}

/// Removes a random survivor from robot `r`.
pub fn remove_mutation<R: Rng>(chromosome: &mut Chromosome, r: usize, rng: &mut R) {
    let sequence = &mut chromosome.missions[r].sequence;
    if sequence.len() < 2 {
        return;
    }
    let i = rng.random_range(0..sequence.len());
    sequence.remove(i);
}

/// Moves robot `r`'s last survivor to another random robot below the cap.
pub fn transfer_mutation<R: Rng>(
    chromosome: &mut Chromosome,
    r: usize,
    max_per_robot: usize,
    rng: &mut R,
) {
    let robots = chromosome.robot_count();
    if robots < 2 || chromosome.missions[r].is_empty() {
        return;
    }
    let mut target = rng.random_range(0..robots - 1);
    if target >= r {
        target += 1;
    }
    if chromosome.missions[target].count() >= max_per_robot {
        return;
    }
    if let Some(id) = chromosome.missions[r].sequence.pop() {
        chromosome.missions[target].sequence.push(id);
    }
}

/// Reverses a random inclusive range of robot `r`'s sequence.
pub fn reverse_mutation<R: Rng>(chromosome: &mut Chromosome, r: usize, rng: &mut R) {
    let sequence = &mut chromosome.missions[r].sequence;
    if sequence.len() < 2 {
        return;
    }
    let a = rng.random_range(0..sequence.len());
    let b = rng.random_range(0..sequence.len());
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    sequence[lo..=hi].reverse();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::chromosome::RobotMission;
    use crate::models::{Node, SurvivorId};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn starts(n: usize) -> Vec<Node> {
        (0..n).map(|i| Node::new(i as i32, 0, 0)).collect()
    }

    fn sorted_ids(c: &Chromosome) -> Vec<SurvivorId> {
        let mut ids: Vec<SurvivorId> = c.assigned().collect();
        ids.sort_unstable();
        ids
    }

    fn scored(fitness: &[f64]) -> Vec<Chromosome> {
        fitness
            .iter()
            .map(|&f| Chromosome {
                missions: vec![RobotMission::new(Node::new(0, 0, 0))],
                fitness: f,
            })
            .collect()
    }

    #[test]
    fn test_default_operators() {
        let ops = GeneticOperators::default();
        assert_eq!(ops.tournament_size, 3);
        assert_eq!(ops.mutation_types, MutationType::ALL.to_vec());
    }

    #[test]
    fn test_tournament_favours_fitter() {
        let pop = scored(&[1.0, 2.0, 50.0, 3.0]);
        let ops = GeneticOperators::default();
        let mut rng = SmallRng::seed_from_u64(42);
        let wins = (0..1000).filter(|_| ops.select(&pop, &mut rng) == 2).count();
        // P(index 2 drawn at least once in 3 draws) = 1 - (3/4)^3 ≈ 0.58
        assert!(wins > 450, "wins = {wins}");
    }

    #[test]
    fn test_tournament_size_one_is_uniform_draw() {
        let pop = scored(&[1.0, 2.0]);
        let ops = GeneticOperators {
            tournament_size: 1,
            ..GeneticOperators::default()
        };
        let mut rng = SmallRng::seed_from_u64(42);
        let picked_worse = (0..200).any(|_| ops.select(&pop, &mut rng) == 0);
        assert!(picked_worse);
    }

    #[test]
    fn test_crossover_child_is_repaired() {
        let s = starts(3);
        let mut rng = SmallRng::seed_from_u64(42);
        let ops = GeneticOperators::default();
        for _ in 0..100 {
            let p1 = Chromosome::seeded(&s, 12, 6, &mut rng);
            let p2 = Chromosome::seeded(&s, 12, 6, &mut rng);
            let child = ops.crossover(&p1, &p2, 12, 6, &mut rng);
            assert_eq!(child.robot_count(), 3);
            assert_eq!(child.fitness, 0.0);
            assert!(child.is_valid(12, 6));
            assert_eq!(sorted_ids(&child), (0..12).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_crossover_takes_missions_from_parents() {
        let s = starts(2);
        let p1 = Chromosome {
            missions: vec![
                RobotMission::with_sequence(s[0], vec![0, 1]),
                RobotMission::with_sequence(s[1], vec![2, 3]),
            ],
            fitness: 10.0,
        };
        let p2 = Chromosome {
            missions: vec![
                RobotMission::with_sequence(s[0], vec![3, 2]),
                RobotMission::with_sequence(s[1], vec![1, 0]),
            ],
            fitness: 20.0,
        };
        let ops = GeneticOperators::default();
        let mut rng = SmallRng::seed_from_u64(42);
        for _ in 0..20 {
            let child = ops.crossover(&p1, &p2, 4, 5, &mut rng);
            // Split 0 copies p2; split 1 keeps p1's first mission and p2's second.
            let from_p2 = child == Chromosome { fitness: 0.0, ..p2.clone() };
            let mixed = child.missions[0].sequence == vec![0, 1]
                && child.missions[1].sequence == vec![2, 3];
            assert!(from_p2 || mixed, "{child:?}");
        }
    }

    #[test]
    fn test_mutation_preserves_invariants() {
        let s = starts(4);
        let mut rng = SmallRng::seed_from_u64(42);
        let ops = GeneticOperators::default();
        for _ in 0..200 {
            let mut c = Chromosome::seeded(&s, 15, 5, &mut rng);
            c.fitness = 99.0;
            ops.mutate(&mut c, 0.5, 15, 5, &mut rng);
            assert_eq!(c.fitness, 0.0);
            assert!(c.is_valid(15, 5));
            assert_eq!(sorted_ids(&c), (0..15).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_zero_rate_leaves_missions_alone() {
        let s = starts(3);
        let mut rng = SmallRng::seed_from_u64(42);
        let ops = GeneticOperators::default();
        let original = Chromosome::seeded(&s, 9, 5, &mut rng);
        let mut c = original.clone();
        c.fitness = 5.0;
        assert!(!ops.mutate(&mut c, 0.0, 9, 5, &mut rng));
        assert_eq!(c.missions, original.missions);
        assert_eq!(c.fitness, 0.0);
    }

    #[test]
    fn test_swap_and_reverse_keep_elements() {
        let s = starts(1);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut c = Chromosome {
            missions: vec![RobotMission::with_sequence(s[0], vec![0, 1, 2, 3, 4])],
            fitness: 0.0,
        };
        for _ in 0..20 {
            swap_mutation(&mut c, 0, &mut rng);
            reverse_mutation(&mut c, 0, &mut rng);
        }
        assert_eq!(sorted_ids(&c), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_single_survivor_missions_unchanged_by_swap_remove_reverse() {
        let s = starts(1);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut c = Chromosome {
            missions: vec![RobotMission::with_sequence(s[0], vec![7])],
            fitness: 0.0,
        };
        swap_mutation(&mut c, 0, &mut rng);
        remove_mutation(&mut c, 0, &mut rng);
        reverse_mutation(&mut c, 0, &mut rng);
        assert_eq!(c.missions[0].sequence, vec![7]);
    }

    #[test]
    fn test_remove_drops_one() {
        let s = starts(1);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut c = Chromosome {
            missions: vec![RobotMission::with_sequence(s[0], vec![0, 1, 2])],
            fitness: 0.0,
        };
        remove_mutation(&mut c, 0, &mut rng);
        assert_eq!(c.missions[0].count(), 2);
    }

    #[test]
    fn test_transfer_moves_last_survivor() {
        let s = starts(2);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut c = Chromosome {
            missions: vec![
                RobotMission::with_sequence(s[0], vec![0, 1]),
                RobotMission::with_sequence(s[1], vec![]),
            ],
            fitness: 0.0,
        };
        transfer_mutation(&mut c, 0, 5, &mut rng);
        assert_eq!(c.missions[0].sequence, vec![0]);
        assert_eq!(c.missions[1].sequence, vec![1]);
    }

    #[test]
    fn test_transfer_respects_cap_and_single_robot() {
        let s = starts(2);
        let mut rng = SmallRng::seed_from_u64(42);
        let mut full = Chromosome {
            missions: vec![
                RobotMission::with_sequence(s[0], vec![0, 1]),
                RobotMission::with_sequence(s[1], vec![2]),
            ],
            fitness: 0.0,
        };
        transfer_mutation(&mut full, 0, 1, &mut rng);
        assert_eq!(full.missions[0].sequence, vec![0, 1]);

        let mut single = Chromosome {
            missions: vec![RobotMission::with_sequence(s[0], vec![0, 1])],
            fitness: 0.0,
        };
        transfer_mutation(&mut single, 0, 5, &mut rng);
        assert_eq!(single.missions[0].sequence, vec![0, 1]);
    }
}
