//! Baseline-relative normalization of response traces.
//!
//! A decay model is fitted to the early (pre-stimulus) part of a trace and
//! extrapolated over the whole trace to give a reference curve `Y2`. The
//! normalized trace is the ratio `Y3 = Y / Y2`, which stays near 1 where the
//! signal follows its baseline trend. When no model can be used, the trace
//! is divided by the mean of the fit window instead.

use serde::{Deserialize, Serialize};

use super::fitting::{fit_asymptotic, fit_simple_decay, FitFailure, FitModel, FitOptions, FitParameters};

/// Normalizer settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Length of the early fit window, measured from the first sample (min)
    pub fit_window_min: f64,
    /// Try the asymptotic model when the simple decay fit fails
    pub allow_asymptotic: bool,
    pub fit: FitOptions,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            fit_window_min: 10.0,
            allow_asymptotic: false,
            fit: FitOptions::default(),
        }
    }
}

/// Result of the fit stage
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome {
    Fitted {
        model: FitModel,
        params: FitParameters,
    },
    /// Flat normalization by the fit-window mean
    Flat { window_mean: f64, reason: FitFailure },
}

impl FitOutcome {
    pub fn model(&self) -> FitModel {
        match self {
            FitOutcome::Fitted { model, .. } => *model,
            FitOutcome::Flat { .. } => FitModel::None,
        }
    }

    pub fn params(&self) -> Option<&FitParameters> {
        match self {
            FitOutcome::Fitted { params, .. } => Some(params),
            FitOutcome::Flat { .. } => None,
        }
    }

    pub fn fitted_k(&self) -> Option<f64> {
        self.params().map(|p| p.k)
    }
}

/// A trace rescaled to its baseline
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCurve {
    /// Sample times, as given
    pub times_min: Vec<f64>,
    /// Reference curve `Y2` over the whole trace
    pub reference: Vec<f64>,
    /// Normalized trace `Y3 = Y / Y2`
    pub values: Vec<f64>,
    pub outcome: FitOutcome,
}

pub struct CurveNormalizer {
    config: NormalizerConfig,
}

impl CurveNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }

    /// Samples in the fit window, with time measured from the first sample
    pub fn fit_window(&self, times_min: &[f64], values: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let origin = times_min[0];
        // Tolerance so a window edge that sits on a grid point is included
        let limit = self.config.fit_window_min * (1.0 + 1e-9) + 1e-12;
        times_min
            .iter()
            .zip(values)
            .take_while(|(t, _)| *t - origin <= limit)
            .map(|(t, v)| (t - origin, *v))
            .unzip()
    }

    /// Fit the window, trying the simple model first.
    pub fn fit(&self, x: &[f64], y: &[f64]) -> Result<(FitModel, FitParameters), FitFailure> {
        match fit_simple_decay(x, y, &self.config.fit) {
            Ok(params) => Ok((FitModel::SimpleDecay, params)),
            Err(simple_err) if self.config.allow_asymptotic => {
                log::debug!("simple decay fit failed ({}), trying asymptotic model", simple_err);
                fit_asymptotic(x, y, &self.config.fit).map(|params| (FitModel::Asymptotic, params))
            }
            Err(e) => Err(e),
        }
    }

    /// Normalize a whole trace against a fit of its early window.
    ///
    /// Panics on an empty trace, mismatched lengths, or a flat fallback
    /// whose window mean is zero.
    pub fn normalize(&self, times_min: &[f64], values: &[f64]) -> NormalizedCurve {
        assert!(!values.is_empty(), "cannot normalize an empty trace");
        assert_eq!(times_min.len(), values.len(), "time and value lengths differ");

        let (x, y) = self.fit_window(times_min, values);
        let origin = times_min[0];

        let fitted = self
            .fit(&x, &y)
            .and_then(|(model, params)| reference_curve(&params, times_min, origin).map(|r| (model, params, r)));

        match fitted {
            Ok((model, params, reference)) => {
                let values = values.iter().zip(&reference).map(|(v, r)| v / r).collect();
                NormalizedCurve {
                    times_min: times_min.to_vec(),
                    reference,
                    values,
                    outcome: FitOutcome::Fitted { model, params },
                }
            }
            Err(reason) => {
                log::debug!("falling back to flat normalization: {}", reason);
                let window_mean = y.iter().sum::<f64>() / y.len() as f64;
                assert!(
                    window_mean != 0.0 && window_mean.is_finite(),
                    "flat normalization needs a finite non-zero window mean, got {}",
                    window_mean
                );
                NormalizedCurve {
                    times_min: times_min.to_vec(),
                    reference: vec![window_mean; values.len()],
                    values: values.iter().map(|v| v / window_mean).collect(),
                    outcome: FitOutcome::Flat { window_mean, reason },
                }
            }
        }
    }
}

/// Evaluate the fit over the whole trace; reject curves a ratio cannot be taken against.
fn reference_curve(params: &FitParameters, times_min: &[f64], origin: f64) -> Result<Vec<f64>, FitFailure> {
    let reference: Vec<f64> = times_min.iter().map(|t| params.evaluate(t - origin)).collect();
    if let Some(bad) = reference.iter().find(|r| !r.is_finite() || **r == 0.0) {
        return Err(FitFailure::Degenerate(format!("reference curve reaches {}", bad)));
    }
    let positive = reference[0] > 0.0;
    if reference.iter().any(|r| (*r > 0.0) != positive) {
        return Err(FitFailure::Degenerate("reference curve changes sign".to_string()));
    }
    Ok(reference)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn times(n: usize, dt: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dt).collect()
    }

    #[test]
    fn test_fit_window_includes_edge() {
        let normalizer = CurveNormalizer::new(NormalizerConfig::default());
        let t = times(401, 0.1);
        let v = vec![1.0; 401];
        let (x, _) = normalizer.fit_window(&t, &v);
        assert_eq!(x.len(), 101);
        assert!((x[100] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_window_is_relative_to_first_sample() {
        let normalizer = CurveNormalizer::new(NormalizerConfig {
            fit_window_min: 1.0,
            ..NormalizerConfig::default()
        });
        let t: Vec<f64> = (0..30).map(|i| 50.0 + i as f64 * 0.25).collect();
        let v = vec![2.0; 30];
        let (x, _) = normalizer.fit_window(&t, &v);
        assert_eq!(x.len(), 5);
        assert_eq!(x[0], 0.0);
    }

    #[test]
    fn test_flat_trace_falls_back() {
        let normalizer = CurveNormalizer::new(NormalizerConfig::default());
        let t = times(200, 0.1);
        let v = vec![2.5; 200];
        let curve = normalizer.normalize(&t, &v);
        assert_eq!(curve.outcome.model(), FitModel::None);
        assert!(curve.values.iter().all(|&y| y == 1.0));
        assert!(matches!(curve.outcome, FitOutcome::Flat { reason: FitFailure::ZeroVariance, .. }));
    }

    #[test]
    fn test_asymptotic_only_when_allowed() {
        // All-negative trace: no log-linear start for the simple model
        let t = times(300, 0.1);
        let v: Vec<f64> = t.iter().map(|x| -(2.0 * (-0.3 * x).exp() + 1.0)).collect();

        let strict = CurveNormalizer::new(NormalizerConfig::default());
        let curve = strict.normalize(&t, &v);
        assert_eq!(curve.outcome.model(), FitModel::None);

        let lenient = CurveNormalizer::new(NormalizerConfig {
            allow_asymptotic: true,
            ..NormalizerConfig::default()
        });
        let curve = lenient.normalize(&t, &v);
        assert_eq!(curve.outcome.model(), FitModel::Asymptotic);
        assert!(curve.values.iter().all(|y| (y - 1.0).abs() < 1e-6));
    }

    #[test]
    #[should_panic]
    fn test_empty_trace_panics() {
        let normalizer = CurveNormalizer::new(NormalizerConfig::default());
        let _ = normalizer.normalize(&[], &[]);
    }
}
