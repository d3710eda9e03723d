//! Synthetic measurement noise.

use rand::Rng;
use rand_distr::StandardNormal;

/// Adds zero-mean Gaussian noise with `sigma = noise_level * max(trace)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseInjector {
    pub noise_level: f64,
}

impl NoiseInjector {
    pub fn new(noise_level: f64) -> Self {
        Self { noise_level }
    }

    /// Standard deviation used for a given trace
    pub fn sigma(&self, values: &[f64]) -> f64 {
        let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        (self.noise_level * max).abs()
    }

    /// Return a noisy copy of `values`, drawing one normal deviate per sample from `rng`.
    pub fn apply<R: Rng + ?Sized>(&self, values: &[f64], rng: &mut R) -> Vec<f64> {
        assert!(!values.is_empty(), "cannot add noise to an empty trace");
        let sigma = self.sigma(values);
        values
            .iter()
            .map(|v| {
                let z: f64 = rng.sample(StandardNormal);
                v + sigma * z
            })
            .collect()
    }
}
