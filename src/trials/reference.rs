//! Deterministic single run with the configured constants.
//!
//! Keeps the priming phase in the combined trajectory, lets the normalizer
//! fall back to the asymptotic model, and adds no noise. Useful as a sanity
//! check of the kinetics before launching a full ensemble.

use super::runner::{extract_window, normalize_window, BASELINE_RATIO};
use crate::analysis::{baseline_auc, CurveNormalizer, NormalizedCurve, NormalizerConfig};
use crate::biochemistry::{EnergyKinetics, PhaseChain, PhaseChainer};
use crate::config::Parameters;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct ReferenceRun {
    pub chain: PhaseChain,
    /// Raw observable over the response window
    pub raw: Vec<f64>,
    pub curve: NormalizedCurve,
    pub auc: f64,
}

pub fn run_reference(params: &Parameters) -> Result<ReferenceRun> {
    params.validate()?;

    let mut chainer = PhaseChainer::new(
        EnergyKinetics::new(params.kinetics),
        params.initial,
        params.grid,
        params.integrator,
    );
    let chain = chainer.run(true)?;
    let window = extract_window(&chain, params)?;

    let normalizer = CurveNormalizer::new(NormalizerConfig {
        fit_window_min: params.window.fit_window_min,
        allow_asymptotic: true,
        ..NormalizerConfig::default()
    });
    let (raw, curve) = normalize_window(&window, params, &normalizer);
    let auc = baseline_auc(&curve.times_min, &curve.values, BASELINE_RATIO);

    log::info!(
        "Reference run: fit {}, k = {}, AUC {:.6}",
        curve.outcome.model().name(),
        curve
            .outcome
            .fitted_k()
            .map_or_else(|| "n/a".to_string(), |k| format!("{:.5}", k)),
        auc
    );

    Ok(ReferenceRun {
        chain,
        raw,
        curve,
        auc,
    })
}
