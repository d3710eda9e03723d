//! Normalization and scoring of response curves.

use approx::assert_relative_eq;
use cell_energy_sim::{
    analysis::{baseline_auc, CurveNormalizer, FitFailure, FitModel, FitOutcome, NormalizerConfig},
};

/// 40 min at 0.1 min resolution
fn window_times() -> Vec<f64> {
    (0..401).map(|i| i as f64 * 0.1).collect()
}

fn normalizer(allow_asymptotic: bool) -> CurveNormalizer {
    CurveNormalizer::new(NormalizerConfig {
        allow_asymptotic,
        ..NormalizerConfig::default()
    })
}

// ============================================================================
// Fit and fallback
// ============================================================================

#[test]
fn test_exponential_round_trip() {
    let t = window_times();
    let y: Vec<f64> = t.iter().map(|x| 3.0 * (-0.2 * x).exp()).collect();

    let curve = normalizer(false).normalize(&t, &y);

    assert_eq!(curve.outcome.model(), FitModel::SimpleDecay);
    let params = curve.outcome.params().unwrap();
    assert_relative_eq!(params.y0, 3.0, max_relative = 0.01);
    assert_relative_eq!(params.k, 0.2, max_relative = 0.01);
    for v in &curve.values {
        assert!((v - 1.0).abs() < 0.01, "normalized value {} should be ~1", v);
    }
}

#[test]
fn test_growth_gives_negative_rate() {
    let t = window_times();
    let y: Vec<f64> = t.iter().map(|x| 0.5 * (0.03 * x).exp()).collect();
    let curve = normalizer(false).normalize(&t, &y);
    assert_relative_eq!(curve.outcome.fitted_k().unwrap(), -0.03, max_relative = 0.01);
}

#[test]
fn test_flat_trace_falls_back_to_window_mean() {
    let t = window_times();
    let y = vec![2.5; t.len()];

    let curve = normalizer(true).normalize(&t, &y);

    assert_eq!(curve.outcome.model(), FitModel::None);
    assert_eq!(curve.outcome.fitted_k(), None);
    assert!(matches!(
        curve.outcome,
        FitOutcome::Flat {
            reason: FitFailure::ZeroVariance,
            ..
        }
    ));
    assert!(curve.values.iter().all(|v| *v == 1.0), "flat trace should normalize to exactly 1");
}

#[test]
fn test_short_window_is_a_fit_failure() {
    let t = vec![0.0, 20.0, 40.0];
    let y = vec![1.0, 0.8, 0.6];
    let curve = normalizer(false).normalize(&t, &y);
    assert!(matches!(
        curve.outcome,
        FitOutcome::Flat {
            reason: FitFailure::InsufficientWindow { .. },
            ..
        }
    ));
    // Window holds only the first sample
    assert_eq!(curve.values[0], 1.0);
}

#[test]
fn test_asymptotic_only_when_allowed() {
    let t = window_times();
    let y: Vec<f64> = t.iter().map(|x| -1.0 - 0.5 * (-0.3 * x).exp()).collect();

    let strict = normalizer(false).normalize(&t, &y);
    assert_eq!(strict.outcome.model(), FitModel::None);

    let relaxed = normalizer(true).normalize(&t, &y);
    assert_eq!(relaxed.outcome.model(), FitModel::Asymptotic);
    for v in &relaxed.values {
        assert_relative_eq!(*v, 1.0, max_relative = 0.01);
    }
}

// ============================================================================
// AUC
// ============================================================================

#[test]
fn test_baseline_trace_scores_zero() {
    let t = window_times();
    let y: Vec<f64> = t.iter().map(|x| 4.0 * (-0.1 * x).exp()).collect();
    let curve = normalizer(false).normalize(&t, &y);
    let auc = baseline_auc(&curve.times_min, &curve.values, 1.0);
    assert!(auc.abs() < 1e-4, "baseline-following trace should have AUC ~0, got {}", auc);
}

#[test]
fn test_constant_offset_auc() {
    let t = window_times();
    for d in [-0.3, 0.05, 1.0] {
        let y = vec![1.0 + d; t.len()];
        let auc = baseline_auc(&t, &y, 1.0);
        assert_relative_eq!(auc, d * 40.0 / 401.0, max_relative = 1e-9);
    }
    assert!(baseline_auc(&t, &vec![1.0; t.len()], 1.0).abs() < 1e-12);
}
