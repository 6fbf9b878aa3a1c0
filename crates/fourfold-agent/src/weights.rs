//! Flat weight tensor operations used by the genetic operators.
//!
//! Every tensor of an [`Agent`](crate::Agent) is stored as a flat row-major
//! `Vec<f32>`, so initialization, crossover and mutation are plain slice
//! operations:
//!
//! - **Initialization**: [`random`] draws uniform values in `[0, max)`
//! - **Crossover**: [`uniform_crossover`] picks each entry from one of two parents
//! - **Mutation**: [`mutate`] scales a random subset of entries by `1 + factor·z`
//!
//! # Multiplicative Mutation
//!
//! Mutation perturbs a value relative to its own magnitude:
//! `v ← v · (1 + factor · z)` with `z ~ N(0, 1)`. Large weights move further than
//! small ones and a weight that is exactly zero stays zero.

use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Creates a weight vector by applying a function to each index.
///
/// # Examples
///
/// ```
/// use fourfold_agent::weights;
///
/// let weights = weights::from_fn(|i| i as f32 * 0.5, 4);
/// assert_eq!(weights, vec![0.0, 0.5, 1.0, 1.5]);
/// ```
pub fn from_fn<F>(f: F, len: usize) -> Vec<f32>
where
    F: FnMut(usize) -> f32,
{
    (0..len).map(f).collect()
}

/// Generates `len` weights uniformly distributed in `[0, max)`.
///
/// A non-positive `max` yields all zeros.
pub fn random<R>(rng: &mut R, max: f32, len: usize) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    from_fn(|_| rng.random::<f32>() * max, len)
}

/// Builds a child vector by taking each entry from `p1` or `p2` with equal
/// probability.
///
/// # Panics
///
/// Panics if the parents have different lengths.
pub fn uniform_crossover<R>(p1: &[f32], p2: &[f32], rng: &mut R) -> Vec<f32>
where
    R: Rng + ?Sized,
{
    assert_eq!(p1.len(), p2.len());
    from_fn(|i| if rng.random_bool(0.5) { p1[i] } else { p2[i] }, p1.len())
}

/// Parameters of the multiplicative mutation operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MutationParams {
    /// Probability of mutating each individual weight.
    pub rate: f32,
    /// Scale of the normal perturbation relative to the weight.
    pub factor: f32,
}

impl Default for MutationParams {
    fn default() -> Self {
        Self {
            rate: 0.05,
            factor: 0.25,
        }
    }
}

/// Mutates weights in place.
///
/// Each weight is independently selected with probability `params.rate`; a
/// selected weight `v` becomes `v · (1 + params.factor · z)` where `z` is drawn
/// from a standard normal distribution. A rate of `0.0` never touches the
/// weights and a rate of `1.0` selects every one of them.
pub fn mutate<R>(weights: &mut [f32], params: MutationParams, rng: &mut R)
where
    R: Rng + ?Sized,
{
    let rate = f64::from(params.rate);
    for w in weights {
        if rng.random::<f64>() < rate {
            let z: f32 = rng.sample(StandardNormal);
            *w *= 1.0 + params.factor * z;
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    #[test]
    fn test_random_range() {
        let mut rng = Pcg32::seed_from_u64(7);
        let weights = random(&mut rng, 2.0, 1000);
        assert_eq!(weights.len(), 1000);
        assert!(weights.iter().all(|w| (0.0..2.0).contains(w)));
    }

    #[test]
    fn test_mutate_rate_zero_is_identity() {
        let mut rng = Pcg32::seed_from_u64(1);
        let original = random(&mut rng, 2.0, 200);
        let mut weights = original.clone();
        let params = MutationParams {
            rate: 0.0,
            factor: 10.0,
        };
        mutate(&mut weights, params, &mut rng);
        assert_eq!(weights, original);
    }

    #[test]
    fn test_mutate_rate_one_touches_every_weight() {
        let mut rng = Pcg32::seed_from_u64(2);
        let mut weights = vec![1.0; 200];
        let params = MutationParams {
            rate: 1.0,
            factor: 0.25,
        };
        mutate(&mut weights, params, &mut rng);
        assert!(weights.iter().all(|&w| w != 1.0));
    }

    #[test]
    fn test_mutate_keeps_zero_weights() {
        let mut rng = Pcg32::seed_from_u64(3);
        let mut weights = vec![0.0; 50];
        let params = MutationParams {
            rate: 1.0,
            factor: 1.0,
        };
        mutate(&mut weights, params, &mut rng);
        assert!(weights.iter().all(|&w| w == 0.0));
    }

    #[test]
    fn test_uniform_crossover_takes_from_both_parents() {
        let mut rng = Pcg32::seed_from_u64(4);
        let p1 = vec![1.0; 100];
        let p2 = vec![-1.0; 100];
        let child = uniform_crossover(&p1, &p2, &mut rng);
        assert_eq!(child.len(), 100);
        assert!(child.iter().all(|&w| w == 1.0 || w == -1.0));
        assert!(child.contains(&1.0));
        assert!(child.contains(&-1.0));
    }
}
