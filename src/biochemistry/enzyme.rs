//! Rate-law building blocks for substrate consumption.
//!
//! References:
//! - Cornish-Bowden A. Fundamentals of Enzyme Kinetics. 4th ed. Wiley-Blackwell, 2012
//! - Hill AV. Journal of Physiology. 1910;40:iv-vii

/// Hill gating factor
///
/// g = x^n / (K^n + x^n)
///
/// Saturates to 1 as the regulator grows and falls to 0 as it vanishes.
/// Returns 0 for non-positive regulator concentrations so that a depleted
/// pool shuts the gate instead of producing NaN from a fractional power.
///
/// # Arguments
/// * `x_mM` - Regulator concentration (mM)
/// * `k_half_mM` - Half-saturation constant (mM)
/// * `n` - Hill coefficient
#[inline]
pub fn hill_gate(x_mM: f64, k_half_mM: f64, n: f64) -> f64 {
    if x_mM <= 0.0 {
        return 0.0;
    }
    let x_n = x_mM.powf(n);
    let k_n = k_half_mM.powf(n);
    x_n / (k_n + x_n)
}

/// Hyperbolic inhibition factor
///
/// f = Ki / (Ki + I)
///
/// Equal to 1 with no inhibitor and tends to 0 as the inhibitor grows.
#[inline]
pub fn inhibition(ki_mM: f64, inhibitor_mM: f64) -> f64 {
    ki_mM / (ki_mM + inhibitor_mM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hill_half_saturation() {
        assert!((hill_gate(0.2, 0.2, 4.0) - 0.5).abs() < 1e-12);
        assert!((hill_gate(0.05, 0.05, 2.0) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_hill_limits() {
        assert_eq!(hill_gate(0.0, 0.1, 2.0), 0.0);
        assert_eq!(hill_gate(-1e-6, 0.1, 2.5), 0.0);
        assert!(hill_gate(1e3, 0.1, 2.0) > 0.9999);
    }

    #[test]
    fn test_hill_cooperativity_sharpens() {
        // Below K, higher n gives a smaller gate
        let x = 0.5 * 0.2;
        assert!(hill_gate(x, 0.2, 4.0) < hill_gate(x, 0.2, 1.0));
    }

    #[test]
    fn test_inhibition() {
        assert_eq!(inhibition(50.0, 0.0), 1.0);
        assert!((inhibition(50.0, 50.0) - 0.5).abs() < 1e-12);
        assert!(inhibition(50.0, 1e9) < 1e-6);
    }
}
