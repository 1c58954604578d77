// --- File: genome.rs ---
use crate::constants::{GENE_MUTATION_CHANCE, GENE_MUTATION_SPAN, MAX_REACH};
use crate::universe::SimRng;
use glam::Vec3;
use rand::Rng;

pub const GENE_COUNT: usize = 9;

const GENE_SIZE_X: usize = 0;
const GENE_SIZE_Y: usize = 1;
const GENE_SIZE_Z: usize = 2;
const GENE_MAX_SPEED: usize = 3;
const GENE_REACH: usize = 4;
const GENE_METABOLISM: usize = 5;
const GENE_STRENGTH: usize = 6;
const GENE_ENERGY_PCNT: usize = 7;
const GENE_LEARNING_RATE: usize = 8;

/// Legal (min, max) range per gene. Genes are clamped into these ranges at
/// creation and again after every mutation.
const GENE_RANGES: [(f32, f32); GENE_COUNT] = [
    (0.2, 1.2),        // body half-size x
    (0.2, 1.2),        // body half-size y
    (0.2, 1.2),        // body half-size z
    (0.1, 2.0),        // max speed
    (0.0, MAX_REACH),  // reach
    (0.0, 1.0),        // metabolism
    (0.1, 2.0),        // strength
    (0.05, 0.5),       // food fraction spent on mating
    (0.0001, 0.01),    // hebbian learning rate
];

/// Fixed-layout heritable trait vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Genome {
    genes: [f32; GENE_COUNT],
}

impl Genome {
    /// Fresh genome with every gene drawn uniformly from its legal range.
    pub fn random(rng: &mut SimRng) -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for (gene, &(min, max)) in genes.iter_mut().zip(GENE_RANGES.iter()) {
            *gene = rng.gen_range(min..=max);
        }
        Self { genes }
    }

    /// Build a genome from explicit gene values, clamped into range.
    pub fn from_genes(mut genes: [f32; GENE_COUNT]) -> Self {
        for (gene, &(min, max)) in genes.iter_mut().zip(GENE_RANGES.iter()) {
            *gene = gene.clamp(min, max);
        }
        Self { genes }
    }

    /// Child genome: each gene picked from either parent, then perturbed
    /// with `GENE_MUTATION_CHANCE` by a bounded delta and re-clamped.
    pub fn crossover(a: &Genome, b: &Genome, rng: &mut SimRng) -> Self {
        let mut genes = [0.0; GENE_COUNT];
        for i in 0..GENE_COUNT {
            let (min, max) = GENE_RANGES[i];
            let mut gene = if rng.gen_bool(0.5) { a.genes[i] } else { b.genes[i] };
            if rng.gen_bool(GENE_MUTATION_CHANCE) {
                let span = (max - min) * GENE_MUTATION_SPAN;
                gene += rng.gen_range(-span..=span);
            }
            genes[i] = gene.clamp(min, max);
        }
        Self { genes }
    }

    /// Genetic distance: mean squared difference of range-normalized genes.
    /// Symmetric, non-negative, zero for identical genomes.
    pub fn variance(&self, other: &Genome) -> f32 {
        let mut sum = 0.0;
        for i in 0..GENE_COUNT {
            let (min, max) = GENE_RANGES[i];
            let d = (self.genes[i] - other.genes[i]) / (max - min);
            sum += d * d;
        }
        sum / GENE_COUNT as f32
    }

    pub fn size(&self) -> Vec3 {
        Vec3::new(
            self.genes[GENE_SIZE_X],
            self.genes[GENE_SIZE_Y],
            self.genes[GENE_SIZE_Z],
        )
    }

    pub fn max_speed(&self) -> f32 {
        self.genes[GENE_MAX_SPEED]
    }

    pub fn reach(&self) -> f32 {
        self.genes[GENE_REACH]
    }

    pub fn metabolism(&self) -> f32 {
        self.genes[GENE_METABOLISM]
    }

    pub fn strength(&self) -> f32 {
        self.genes[GENE_STRENGTH]
    }

    pub fn energy_pcnt(&self) -> f32 {
        self.genes[GENE_ENERGY_PCNT]
    }

    pub fn learning_rate(&self) -> f32 {
        self.genes[GENE_LEARNING_RATE]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> SimRng {
        SimRng::seed_from_u64(7)
    }

    fn in_range(g: &Genome) -> bool {
        g.genes
            .iter()
            .zip(GENE_RANGES.iter())
            .all(|(v, &(min, max))| (min..=max).contains(v))
    }

    #[test]
    fn random_genomes_stay_in_range() {
        let mut rng = rng();
        for _ in 0..100 {
            assert!(in_range(&Genome::random(&mut rng)));
        }
    }

    #[test]
    fn crossover_stays_in_range() {
        let mut rng = rng();
        let a = Genome::random(&mut rng);
        let b = Genome::random(&mut rng);
        for _ in 0..200 {
            assert!(in_range(&Genome::crossover(&a, &b, &mut rng)));
        }
    }

    #[test]
    fn from_genes_clamps() {
        let g = Genome::from_genes([1e6; GENE_COUNT]);
        assert!(in_range(&g));
        assert_eq!(g.reach(), MAX_REACH);
    }

    #[test]
    fn variance_is_symmetric_and_zero_on_self() {
        let mut rng = rng();
        let a = Genome::random(&mut rng);
        let b = Genome::random(&mut rng);
        assert_eq!(a.variance(&a), 0.0);
        assert_eq!(b.variance(&b), 0.0);
        assert!(a.variance(&b) >= 0.0);
        assert!((a.variance(&b) - b.variance(&a)).abs() < 1e-7);
    }

    #[test]
    fn distinct_genomes_have_positive_variance() {
        let a = Genome::from_genes([0.2, 0.2, 0.2, 0.1, 0.0, 0.0, 0.1, 0.05, 0.0001]);
        let b = Genome::from_genes([1.2, 1.2, 1.2, 2.0, 5.0, 1.0, 2.0, 0.5, 0.01]);
        assert!(a.variance(&b) > 0.1);
    }
}
