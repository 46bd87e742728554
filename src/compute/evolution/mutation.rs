//! Controller generation and polynomial mutation.

use rand::prelude::*;

use crate::schema::{Controller, MutationConfig};

/// Random number generator wrapper for controller operations.
pub struct ControllerRng {
    rng: StdRng,
}

impl ControllerRng {
    /// Create from seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Create with random seed.
    pub fn random() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Seeded generator if `seed` is set, entropy otherwise.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::random, Self::new)
    }

    /// Controller with each gene drawn independently from U[0, 1).
    pub fn random_controller(&mut self, joints: usize) -> Controller {
        Controller::new((0..joints).map(|_| self.rng.r#gen::<f64>()).collect())
    }

    /// Polynomial mutation of a single gene.
    pub fn mutate_gene(&mut self, value: f64, eta: f64) -> f64 {
        let r = self.rng.r#gen::<f64>();
        polynomial_mutation(value, r, eta)
    }

    /// New controller where each gene is mutated with probability `config.rate`.
    pub fn perturb(&mut self, parent: &Controller, config: &MutationConfig) -> Controller {
        let genes = parent
            .genes()
            .iter()
            .map(|&gene| {
                if self.rng.r#gen::<f64>() < config.rate {
                    self.mutate_gene(gene, config.eta)
                } else {
                    gene
                }
            })
            .collect();
        Controller::new(genes)
    }

    /// Uniform index in `0..len`. `len` must be non-zero.
    pub fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    /// Generate next u64 for seeding child RNGs.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.r#gen()
    }
}

/// Deterministic core of polynomial mutation for a draw `r` in [0, 1).
///
/// The result is clamped to [0, 1].
pub fn polynomial_mutation(value: f64, r: f64, eta: f64) -> f64 {
    let exponent = 1.0 / (eta + 1.0);
    let delta = if r < 0.5 {
        (2.0 * r).powf(exponent) - 1.0
    } else {
        1.0 - (2.0 * (1.0 - r)).powf(exponent)
    };
    (value + delta).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_random_controller_in_range() {
        let mut rng = ControllerRng::new(42);
        let controller = rng.random_controller(8);
        assert_eq!(controller.len(), 8);
        assert!(controller.genes().iter().all(|g| (0.0..1.0).contains(g)));
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = ControllerRng::new(7);
        let mut b = ControllerRng::new(7);
        assert_eq!(a.random_controller(8), b.random_controller(8));
        assert_eq!(a.next_seed(), b.next_seed());
    }

    #[test]
    fn test_polynomial_mutation_midpoint_is_identity() {
        // r = 0.5 falls in the upper branch: 1 - 1^(1/11) = 0
        assert_eq!(polynomial_mutation(0.3, 0.5, 10.0), 0.3);
    }

    #[test]
    fn test_polynomial_mutation_extremes_clamp() {
        assert_eq!(polynomial_mutation(0.2, 0.0, 10.0), 0.0);
        let high = polynomial_mutation(0.9, 1.0 - f64::EPSILON, 10.0);
        assert!(high <= 1.0);
        assert!(high > 0.9);
    }

    #[test]
    fn test_polynomial_mutation_direction() {
        assert!(polynomial_mutation(0.5, 0.1, 10.0) < 0.5);
        assert!(polynomial_mutation(0.5, 0.9, 10.0) > 0.5);
    }

    #[test]
    fn test_perturb_rate_zero_copies_parent() {
        let mut rng = ControllerRng::new(1);
        let parent = rng.random_controller(8);
        let config = MutationConfig { eta: 10.0, rate: 0.0 };
        assert_eq!(rng.perturb(&parent, &config), parent);
    }

    #[test]
    fn test_perturb_rate_one_changes_genes() {
        let mut rng = ControllerRng::new(3);
        let parent = Controller::uniform(8, 0.5);
        let config = MutationConfig { eta: 10.0, rate: 1.0 };
        let child = rng.perturb(&parent, &config);
        assert_eq!(child.len(), 8);
        assert_ne!(child, parent);
        assert!(child.genes().iter().all(|g| (0.0..=1.0).contains(g)));
    }

    proptest! {
        #[test]
        fn prop_mutation_stays_in_unit_interval(value in 0.0f64..=1.0, r in 0.0f64..1.0) {
            let mutated = polynomial_mutation(value, r, 10.0);
            prop_assert!((0.0..=1.0).contains(&mutated));
        }

        #[test]
        fn prop_perturb_stays_in_unit_interval(seed in any::<u64>()) {
            let mut rng = ControllerRng::new(seed);
            let parent = rng.random_controller(8);
            let config = MutationConfig { eta: 10.0, rate: 0.5 };
            let child = rng.perturb(&parent, &config);
            prop_assert!(child.genes().iter().all(|g| (0.0..=1.0).contains(g)));
        }
    }
}
