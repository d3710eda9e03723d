//! Statistical checks of the per-trial parameter sampler.

use cell_energy_sim::{
    config::TrialConfig,
    trials::ParameterSampler,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

const DRAWS: usize = 10_000;

#[test]
fn test_k_oxygen_mixture_proportions() {
    let sampler = ParameterSampler::new(&TrialConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(2024);

    let draws: Vec<f64> = (0..DRAWS).map(|_| sampler.sample_k_oxygen(&mut rng)).collect();

    assert!(
        draws.iter().all(|k| (0.0..=0.6).contains(k)),
        "every draw should lie in [0, 0.6]"
    );
    let low = draws.iter().filter(|k| **k <= 0.2).count() as f64 / DRAWS as f64;
    assert!(
        (low - 0.8).abs() <= 0.02,
        "fraction in [0, 0.2] should be 0.8 +/- 0.02, got {}",
        low
    );
    let high = draws.iter().filter(|k| **k > 0.2).count() as f64 / DRAWS as f64;
    assert!(
        (high - 0.2).abs() <= 0.02,
        "fraction in (0.2, 0.6] should be 0.2 +/- 0.02, got {}",
        high
    );
}

#[test]
fn test_atp_covers_integer_range() {
    let sampler = ParameterSampler::new(&TrialConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(7);

    let mut seen = [false; 101];
    for _ in 0..DRAWS {
        let atp = sampler.sample_atp(&mut rng);
        assert_eq!(atp.fract(), 0.0, "ATP draws are integers");
        seen[atp as usize] = true;
    }
    assert!(!seen[0], "0 mM is outside the range");
    assert!(seen[1..].iter().all(|s| *s), "every value in 1..=100 should appear");
}

#[test]
fn test_atp_mean_near_midpoint() {
    let sampler = ParameterSampler::new(&TrialConfig::default()).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let mean = (0..DRAWS).map(|_| sampler.sample_atp(&mut rng)).sum::<f64>() / DRAWS as f64;
    // sd of the mean is about 0.29
    assert!((mean - 50.5).abs() < 1.5, "ATP mean {} far from 50.5", mean);
}
