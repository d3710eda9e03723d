//! Nonlinear least-squares fits of decay models.
//!
//! Models:
//! - Simple decay:  Y = Y0 * exp(-k X)
//! - Asymptotic:    Y = (Y0 - Yf) * exp(-k X) + Yf
//!
//! Both are refined with Levenberg-Marquardt on the untransformed residuals.
//! The simple model is started from a log-linear regression, which needs
//! strictly positive samples.
//!
//! Reference: Marquardt DW. J Soc Ind Appl Math. 1963;11:431-441

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which model produced a normalization reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitModel {
    SimpleDecay,
    Asymptotic,
    /// No model; the flat (window-mean) fallback was used
    None,
}

impl FitModel {
    pub fn name(self) -> &'static str {
        match self {
            FitModel::SimpleDecay => "simple_decay",
            FitModel::Asymptotic => "asymptotic",
            FitModel::None => "none",
        }
    }
}

/// Estimated model parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitParameters {
    /// Value at X = 0
    pub y0: f64,
    /// Decay rate (negative for growth)
    pub k: f64,
    /// Asymptotic floor, present only for the asymptotic model
    pub y_floor: Option<f64>,
}

impl FitParameters {
    #[inline]
    pub fn evaluate(&self, x: f64) -> f64 {
        let decay = (-self.k * x).exp();
        match self.y_floor {
            None => self.y0 * decay,
            Some(yf) => (self.y0 - yf) * decay + yf,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.y0.is_finite() && self.k.is_finite() && self.y_floor.map_or(true, f64::is_finite)
    }
}

/// Why a fit could not be used
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitFailure {
    #[error("fit window has {points} points, model needs at least {required}")]
    InsufficientWindow { points: usize, required: usize },

    #[error("fit window has zero variance")]
    ZeroVariance,

    #[error("log-linear start needs strictly positive samples")]
    NonPositiveSignal,

    #[error("no convergence after {iterations} iterations")]
    DidNotConverge { iterations: usize },

    #[error("degenerate fit: {0}")]
    Degenerate(String),
}

/// Levenberg-Marquardt settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitOptions {
    pub max_iterations: usize,
    /// Relative SSE reduction below which the fit is converged
    pub ftol: f64,
    /// Relative parameter step below which the fit is converged
    pub xtol: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            ftol: 1e-12,
            xtol: 1e-10,
        }
    }
}

const LAMBDA_START: f64 = 1e-3;
const LAMBDA_MAX: f64 = 1e16;

/// Fit `Y = Y0 exp(-k X)`; needs at least 3 points.
pub fn fit_simple_decay(x: &[f64], y: &[f64], opts: &FitOptions) -> Result<FitParameters, FitFailure> {
    check_window(x, y, 3)?;
    let (y0, k) = log_linear_start(x, y).ok_or(FitFailure::NonPositiveSignal)?;

    let p = levenberg_marquardt([y0, k], x, y, opts, |p, xi| {
        let e = (-p[1] * xi).exp();
        (p[0] * e, [e, -xi * p[0] * e])
    })?;

    finish(FitParameters { y0: p[0], k: p[1], y_floor: None })
}

/// Fit `Y = (Y0 - Yf) exp(-k X) + Yf`; needs at least 4 points.
pub fn fit_asymptotic(x: &[f64], y: &[f64], opts: &FitOptions) -> Result<FitParameters, FitFailure> {
    check_window(x, y, 4)?;

    let first = y[0];
    let last = y[y.len() - 1];
    let span = x[x.len() - 1] - x[0];

    // Floor just beyond the last sample keeps (y - floor) single-signed for a monotone trace
    let floor = last - 0.1 * (first - last);
    let shifted: Vec<f64> = y.iter().map(|v| v - floor).collect();
    let sign = if first >= last { 1.0 } else { -1.0 };
    let oriented: Vec<f64> = shifted.iter().map(|v| sign * v).collect();
    let (amplitude, k) = match log_linear_start(x, &oriented) {
        Some((a, k)) => (sign * a, k),
        None => (first - floor, 1.0 / span.max(f64::EPSILON)),
    };

    let p = levenberg_marquardt([amplitude + floor, k, floor], x, y, opts, |p, xi| {
        let e = (-p[1] * xi).exp();
        let amp = p[0] - p[2];
        (amp * e + p[2], [e, -xi * amp * e, 1.0 - e])
    })?;

    finish(FitParameters { y0: p[0], k: p[1], y_floor: Some(p[2]) })
}

fn finish(params: FitParameters) -> Result<FitParameters, FitFailure> {
    if !params.is_finite() {
        return Err(FitFailure::Degenerate(format!("non-finite parameters {:?}", params)));
    }
    if params.y0 == 0.0 {
        return Err(FitFailure::Degenerate("zero amplitude".to_string()));
    }
    Ok(params)
}

fn check_window(x: &[f64], y: &[f64], required: usize) -> Result<(), FitFailure> {
    assert_eq!(x.len(), y.len(), "fit abscissa and ordinate lengths differ");
    if y.len() < required {
        return Err(FitFailure::InsufficientWindow {
            points: y.len(),
            required,
        });
    }
    if y.iter().chain(x.iter()).any(|v| !v.is_finite()) {
        return Err(FitFailure::Degenerate("non-finite samples in fit window".to_string()));
    }
    let first = y[0];
    if y.iter().all(|&v| v == first) {
        return Err(FitFailure::ZeroVariance);
    }
    Ok(())
}

/// Ordinary least squares on `ln y = ln Y0 - k x`
fn log_linear_start(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    if y.iter().any(|&v| v <= 0.0) {
        return None;
    }
    let n = x.len() as f64;
    let ly: Vec<f64> = y.iter().map(|v| v.ln()).collect();
    let mx = x.iter().sum::<f64>() / n;
    let my = ly.iter().sum::<f64>() / n;
    let sxx: f64 = x.iter().map(|xi| (xi - mx).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = x.iter().zip(&ly).map(|(xi, li)| (xi - mx) * (li - my)).sum();
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    Some((intercept.exp(), -slope))
}

fn sum_squares<const N: usize, F>(p: &[f64; N], x: &[f64], y: &[f64], model: &F) -> f64
where
    F: Fn(&[f64; N], f64) -> (f64, [f64; N]),
{
    x.iter()
        .zip(y)
        .map(|(&xi, &yi)| {
            let r = yi - model(p, xi).0;
            r * r
        })
        .sum()
}

/// Levenberg-Marquardt with Marquardt diagonal scaling.
///
/// `model(p, x)` returns the prediction and its gradient with respect to `p`.
fn levenberg_marquardt<const N: usize, F>(
    p0: [f64; N],
    x: &[f64],
    y: &[f64],
    opts: &FitOptions,
    model: F,
) -> Result<[f64; N], FitFailure>
where
    F: Fn(&[f64; N], f64) -> (f64, [f64; N]),
{
    let mut p = p0;
    let mut sse = sum_squares(&p, x, y, &model);
    if !sse.is_finite() {
        return Err(FitFailure::Degenerate("non-finite residuals at start".to_string()));
    }
    let exact = f64::EPSILON * f64::EPSILON * y.iter().map(|v| v * v).sum::<f64>();
    let mut lambda = LAMBDA_START;

    for _ in 0..opts.max_iterations {
        if sse <= exact {
            return Ok(p);
        }

        let mut jtj = [[0.0; N]; N];
        let mut jtr = [0.0; N];
        for (&xi, &yi) in x.iter().zip(y) {
            let (fi, grad) = model(&p, xi);
            let r = yi - fi;
            for a in 0..N {
                jtr[a] += grad[a] * r;
                for b in 0..N {
                    jtj[a][b] += grad[a] * grad[b];
                }
            }
        }

        loop {
            let mut lhs = jtj;
            for a in 0..N {
                let d = jtj[a][a];
                lhs[a][a] = if d > 0.0 { d * (1.0 + lambda) } else { lambda };
            }

            let accepted = solve_linear(lhs, jtr).and_then(|delta| {
                let mut trial = p;
                for a in 0..N {
                    trial[a] += delta[a];
                }
                let trial_sse = sum_squares(&trial, x, y, &model);
                (trial_sse.is_finite() && trial_sse < sse).then_some((trial, trial_sse, delta))
            });

            match accepted {
                Some((trial, trial_sse, delta)) => {
                    let small_gain = sse - trial_sse <= opts.ftol * sse;
                    let small_step = (0..N).all(|a| delta[a].abs() <= opts.xtol * (p[a].abs() + opts.xtol));
                    p = trial;
                    sse = trial_sse;
                    lambda = (lambda / 10.0).max(1e-12);
                    if small_gain || small_step {
                        return Ok(p);
                    }
                    break;
                }
                None => {
                    lambda *= 10.0;
                    if lambda > LAMBDA_MAX {
                        // No descent direction left: p is a minimum to working precision
                        return Ok(p);
                    }
                }
            }
        }
    }

    Err(FitFailure::DidNotConverge {
        iterations: opts.max_iterations,
    })
}

/// Gaussian elimination with partial pivoting for a small dense system
fn solve_linear<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    for col in 0..N {
        let pivot = (col..N).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in (col + 1)..N {
            let factor = a[row][col] / a[col][col];
            for k in col..N {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut out = [0.0; N];
    for row in (0..N).rev() {
        let mut acc = b[row];
        for k in (row + 1)..N {
            acc -= a[row][k] * out[k];
        }
        out[row] = acc / a[row][row];
    }
    out.iter().all(|v| v.is_finite()).then_some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid(n: usize, dx: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 * dx).collect()
    }

    #[test]
    fn test_simple_decay_exact() {
        let x = grid(101, 0.1);
        let y: Vec<f64> = x.iter().map(|xi| 3.0 * (-0.05 * xi).exp()).collect();
        let fit = fit_simple_decay(&x, &y, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.y0, 3.0, max_relative = 1e-9);
        assert_relative_eq!(fit.k, 0.05, max_relative = 1e-9);
        assert!(fit.y_floor.is_none());
    }

    #[test]
    fn test_simple_decay_fits_growth() {
        let x = grid(51, 0.2);
        let y: Vec<f64> = x.iter().map(|xi| 0.2 * (0.03 * xi).exp()).collect();
        let fit = fit_simple_decay(&x, &y, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.k, -0.03, max_relative = 1e-8);
    }

    #[test]
    fn test_simple_decay_refines_noisy_start() {
        // Deterministic wiggle so the log-linear start is not already optimal
        let x = grid(101, 0.1);
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, xi)| 2.0 * (-0.2 * xi).exp() + if i % 2 == 0 { 1e-4 } else { -1e-4 })
            .collect();
        let fit = fit_simple_decay(&x, &y, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.y0, 2.0, max_relative = 1e-3);
        assert_relative_eq!(fit.k, 0.2, max_relative = 1e-2);
    }

    #[test]
    fn test_asymptotic_recovers_floor() {
        let x = grid(101, 0.1);
        let y: Vec<f64> = x.iter().map(|xi| 2.0 * (-0.5 * xi).exp() + 1.0).collect();
        let fit = fit_asymptotic(&x, &y, &FitOptions::default()).unwrap();
        assert_relative_eq!(fit.y0, 3.0, max_relative = 1e-6);
        assert_relative_eq!(fit.k, 0.5, max_relative = 1e-6);
        assert_relative_eq!(fit.y_floor.unwrap(), 1.0, max_relative = 1e-6);
    }

    #[test]
    fn test_insufficient_window() {
        let result = fit_simple_decay(&[0.0, 1.0], &[2.0, 1.0], &FitOptions::default());
        assert_eq!(result, Err(FitFailure::InsufficientWindow { points: 2, required: 3 }));

        let result = fit_asymptotic(&[0.0, 1.0, 2.0], &[3.0, 2.0, 1.5], &FitOptions::default());
        assert_eq!(result, Err(FitFailure::InsufficientWindow { points: 3, required: 4 }));
    }

    #[test]
    fn test_zero_variance_rejected() {
        let x = grid(20, 0.5);
        let y = vec![1.25; 20];
        assert_eq!(fit_simple_decay(&x, &y, &FitOptions::default()), Err(FitFailure::ZeroVariance));
        assert_eq!(fit_asymptotic(&x, &y, &FitOptions::default()), Err(FitFailure::ZeroVariance));
    }

    #[test]
    fn test_non_positive_signal_rejected() {
        let x = grid(10, 1.0);
        let y: Vec<f64> = x.iter().map(|xi| 1.0 - 0.2 * xi).collect();
        assert_eq!(fit_simple_decay(&x, &y, &FitOptions::default()), Err(FitFailure::NonPositiveSignal));
    }

    #[test]
    fn test_solve_linear() {
        let a = [[2.0, 1.0], [1.0, 3.0]];
        let b = [3.0, 5.0];
        let x = solve_linear(a, b).unwrap();
        assert_relative_eq!(x[0], 0.8, epsilon = 1e-12);
        assert_relative_eq!(x[1], 1.4, epsilon = 1e-12);
        assert!(solve_linear([[1.0, 2.0], [2.0, 4.0]], [1.0, 1.0]).is_none());
    }
}
