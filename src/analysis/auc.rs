//! Area-under-curve summary of a normalized response.

/// Trapezoidal integral of `values` over `times_min`
pub fn trapezoid(times_min: &[f64], values: &[f64]) -> f64 {
    assert_eq!(times_min.len(), values.len(), "time and value lengths differ");
    times_min
        .windows(2)
        .zip(values.windows(2))
        .map(|(t, v)| 0.5 * (v[0] + v[1]) * (t[1] - t[0]))
        .sum()
}

/// Net area between a trace and a constant baseline, divided by the sample count.
///
/// `(∫ trace dt - ∫ baseline dt) / n` over the trace's time span. Dividing
/// by `n` keeps scores comparable across traces with different lengths.
/// Panics on an empty trace.
pub fn baseline_auc(times_min: &[f64], values: &[f64], baseline: f64) -> f64 {
    assert!(!values.is_empty(), "AUC of an empty trace is undefined");
    let span = times_min[times_min.len() - 1] - times_min[0];
    (trapezoid(times_min, values) - baseline * span) / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trapezoid_linear_is_exact() {
        let t: Vec<f64> = (0..11).map(|i| i as f64).collect();
        let v: Vec<f64> = t.iter().map(|x| 2.0 * x).collect();
        assert!((trapezoid(&t, &v) - 100.0).abs() < 1e-12);
    }

    #[test]
    fn test_single_sample_has_zero_area() {
        assert_eq!(baseline_auc(&[3.0], &[5.0], 1.0), 0.0);
    }

    #[test]
    #[should_panic]
    fn test_empty_trace_panics() {
        let _ = baseline_auc(&[], &[], 1.0);
    }
}
