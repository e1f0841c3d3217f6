//! Fixed-size population of mission chromosomes.

use rand::Rng;
use tracing::warn;

use super::chromosome::Chromosome;
use crate::models::Node;

/// An ordered collection of chromosomes.
///
/// After [`Population::sort_by_fitness`] index 0 holds the best chromosome.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Population {
    chromosomes: Vec<Chromosome>,
}

impl Population {
    /// Seeds `size` random chromosomes.
    ///
    /// With zero survivors every chromosome has empty missions.
    pub fn seed<R: Rng>(
        size: usize,
        starts: &[Node],
        survivor_count: usize,
        max_per_robot: usize,
        rng: &mut R,
    ) -> Self {
        if survivor_count == 0 {
            warn!("no survivors to assign; seeding empty missions");
        }
        let chromosomes = (0..size)
            .map(|_| Chromosome::seeded(starts, survivor_count, max_per_robot, rng))
            .collect();
        Self { chromosomes }
    }

    /// Wraps existing chromosomes.
    pub fn from_chromosomes(chromosomes: Vec<Chromosome>) -> Self {
        Self { chromosomes }
    }

    pub fn len(&self) -> usize {
        self.chromosomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chromosomes.is_empty()
    }

    pub fn as_slice(&self) -> &[Chromosome] {
        &self.chromosomes
    }

    pub fn as_mut_slice(&mut self) -> &mut [Chromosome] {
        &mut self.chromosomes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Chromosome> {
        self.chromosomes.iter()
    }

    pub fn into_inner(self) -> Vec<Chromosome> {
        self.chromosomes
    }

    /// Sorts by descending fitness. Ties keep their relative order.
    pub fn sort_by_fitness(&mut self) {
        self.chromosomes
            .sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
    }

    /// Highest-fitness chromosome, first one on ties.
    pub fn best(&self) -> Option<&Chromosome> {
        self.chromosomes
            .iter()
            .reduce(|best, c| if c.fitness > best.fitness { c } else { best })
    }
}

impl<'a> IntoIterator for &'a Population {
    type Item = &'a Chromosome;
    type IntoIter = std::slice::Iter<'a, Chromosome>;

    fn into_iter(self) -> Self::IntoIter {
        self.chromosomes.iter()
    }
}
