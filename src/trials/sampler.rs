//! Per-trial parameter sampling.
//!
//! Each trial draws its initial ATP uniformly from an integer range and its
//! oxygen-consumption constant from a mixture of uniform distributions. All
//! other constants are shared across trials.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{MixtureComponent, TrialConfig};
use crate::error::ConfigError;

/// Randomized parameters of one trial
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDraw {
    pub atp_mM: f64,
    pub k_oxygen_consumption: f64,
}

pub struct ParameterSampler {
    atp_range_mM: [u32; 2],
    components: Vec<MixtureComponent>,
    selector: WeightedIndex<f64>,
}

impl ParameterSampler {
    pub fn new(config: &TrialConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let selector = WeightedIndex::new(config.k_oxygen_mixture.iter().map(|c| c.weight))
            .map_err(|e| ConfigError::Mixture(e.to_string()))?;
        Ok(Self {
            atp_range_mM: config.atp_range_mM,
            components: config.k_oxygen_mixture.clone(),
            selector,
        })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> ParameterDraw {
        let atp_mM = self.sample_atp(rng);
        let k_oxygen_consumption = self.sample_k_oxygen(rng);
        ParameterDraw {
            atp_mM,
            k_oxygen_consumption,
        }
    }

    /// Integer-valued ATP from the inclusive range
    pub fn sample_atp<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let [low, high] = self.atp_range_mM;
        rng.gen_range(low..=high) as f64
    }

    /// Pick a mixture component by weight, then draw uniformly inside it
    pub fn sample_k_oxygen<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let component = &self.components[self.selector.sample(rng)];
        rng.gen_range(component.low..=component.high)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_atp_is_integer_in_range() {
        let sampler = ParameterSampler::new(&TrialConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..1000 {
            let atp = sampler.sample_atp(&mut rng);
            assert!((1.0..=100.0).contains(&atp));
            assert_eq!(atp.fract(), 0.0);
        }
    }

    #[test]
    fn test_single_component_mixture() {
        let config = TrialConfig {
            k_oxygen_mixture: vec![MixtureComponent::new(1.0, 0.3, 0.3)],
            ..TrialConfig::default()
        };
        let sampler = ParameterSampler::new(&config).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(sampler.sample_k_oxygen(&mut rng), 0.3);
    }

    #[test]
    fn test_zero_weights_rejected() {
        let config = TrialConfig {
            k_oxygen_mixture: vec![MixtureComponent::new(0.0, 0.0, 1.0)],
            ..TrialConfig::default()
        };
        assert!(ParameterSampler::new(&config).is_err());
    }

    #[test]
    fn test_seeded_draws_repeat() {
        let sampler = ParameterSampler::new(&TrialConfig::default()).unwrap();
        let a = sampler.sample(&mut StdRng::seed_from_u64(9));
        let b = sampler.sample(&mut StdRng::seed_from_u64(9));
        assert_eq!(a, b);
    }
}
