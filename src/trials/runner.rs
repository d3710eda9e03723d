//! Trial orchestration.
//!
//! Each trial: sample parameters, run the phase chain, extract the response
//! window, normalize, add noise, score. Trials own their RNG, seeded with
//! `seed + trial_index`, so results do not depend on scheduling order and
//! parallel and sequential runs are identical.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use thiserror::Error;

use super::sampler::{ParameterDraw, ParameterSampler};
use crate::analysis::{baseline_auc, CurveNormalizer, FitModel, NoiseInjector, NormalizedCurve, NormalizerConfig};
use crate::biochemistry::{EnergyKinetics, PhaseChain, PhaseChainer};
use crate::config::Parameters;
use crate::error::{ConfigError, Result, SimulationError};
use crate::state::{EnsembleSummary, SeriesStats, Table, Trajectory};

/// Normalized traces are compared against an unchanged ratio of 1
pub const BASELINE_RATIO: f64 = 1.0;

/// One row of the trial summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrialRecord {
    pub trial: usize,
    pub atp_mM: f64,
    pub k_oxygen_consumption: f64,
    /// Fitted decay rate; `None` when flat normalization was used
    pub fitted_k: Option<f64>,
    pub fit_model: FitModel,
    pub auc: f64,
}

/// Everything a successful trial produces
#[derive(Debug, Clone)]
pub struct TrialOutput {
    pub record: TrialRecord,
    /// Raw observable over the response window
    pub raw: Vec<f64>,
    /// Normalized, noised observable over the response window
    pub normalized: Vec<f64>,
}

/// A trial dropped from the summary
#[derive(Debug, Clone, PartialEq, Error)]
#[error("trial {trial} failed (ATP {:.0} mM, k_O2 {:.4}): {error}", .draw.atp_mM, .draw.k_oxygen_consumption)]
pub struct FailedTrial {
    pub trial: usize,
    pub draw: ParameterDraw,
    #[source]
    pub error: SimulationError,
}

/// Collected results of a run, in trial-index order
#[derive(Debug, Clone, Default)]
pub struct TrialEnsemble {
    /// Response-window time axis shared by all traces
    pub times_min: Vec<f64>,
    pub records: Vec<TrialRecord>,
    pub raw_traces: Vec<Vec<f64>>,
    pub normalized_traces: Vec<Vec<f64>>,
    pub failures: Vec<FailedTrial>,
}

impl TrialEnsemble {
    pub fn new(times_min: Vec<f64>) -> Self {
        Self {
            times_min,
            ..Self::default()
        }
    }

    pub fn push(&mut self, output: TrialOutput) {
        self.records.push(output.record);
        self.raw_traces.push(output.raw);
        self.normalized_traces.push(output.normalized);
    }

    /// Columns `ATP, k_oxygen_consumption, fitted_k, AUC`; one row per completed trial
    pub fn summary_table(&self) -> Table {
        let mut table = Table::new(["ATP", "k_oxygen_consumption", "fitted_k", "AUC"]);
        for r in &self.records {
            table.push_row(vec![
                r.atp_mM,
                r.k_oxygen_consumption,
                r.fitted_k.unwrap_or(f64::NAN),
                r.auc,
            ]);
        }
        table
    }

    /// Raw observable; first column time, one column per completed trial
    pub fn raw_table(&self) -> Table {
        self.trace_table(&self.raw_traces)
    }

    /// Normalized, noised observable; same shape as `raw_table`
    pub fn normalized_table(&self) -> Table {
        self.trace_table(&self.normalized_traces)
    }

    fn trace_table(&self, traces: &[Vec<f64>]) -> Table {
        let headers = std::iter::once("time".to_string())
            .chain(self.records.iter().map(|r| format!("trial_{}", r.trial)));
        let mut table = Table::new(headers);
        for (i, &t) in self.times_min.iter().enumerate() {
            let mut row = Vec::with_capacity(traces.len() + 1);
            row.push(t);
            row.extend(traces.iter().map(|trace| trace[i]));
            table.push_row(row);
        }
        table
    }

    pub fn summary(&self) -> EnsembleSummary {
        let auc: Vec<f64> = self.records.iter().map(|r| r.auc).collect();
        let fitted_k: Vec<f64> = self.records.iter().filter_map(|r| r.fitted_k).collect();
        let flat = self.records.iter().filter(|r| r.fit_model == FitModel::None).count();
        EnsembleSummary {
            completed: self.records.len(),
            failed: self.failures.len(),
            auc: SeriesStats::from_values(&auc),
            fitted_k: SeriesStats::from_values(&fitted_k),
            flat_fallback_fraction: if self.records.is_empty() {
                0.0
            } else {
                flat as f64 / self.records.len() as f64
            },
        }
    }
}

/// Cut the response window out of a chained trajectory.
///
/// The window starts `lead_in` before the stimulus phase and spans `duration`.
pub(crate) fn extract_window(chain: &PhaseChain, params: &Parameters) -> Result<Trajectory> {
    let step = params.grid.step_min;
    let lead = (params.window.lead_in_min / step).round() as usize;
    let len = (params.window.duration_min / step).round() as usize + 1;
    if lead > chain.stimulus_index || chain.stimulus_index - lead + len > chain.combined.len() {
        return Err(ConfigError::Window(format!(
            "{} samples from {} before the stimulus do not fit in {} samples",
            len,
            lead,
            chain.combined.len()
        ))
        .into());
    }
    Ok(chain.combined.window(chain.stimulus_index - lead, len))
}

/// Normalize the configured observable over the response window
pub(crate) fn normalize_window(
    window: &Trajectory,
    params: &Parameters,
    normalizer: &CurveNormalizer,
) -> (Vec<f64>, NormalizedCurve) {
    let raw = window.series(params.window.observable);
    let curve = normalizer.normalize(window.times(), &raw);
    (raw, curve)
}

pub struct TrialRunner {
    params: Parameters,
    sampler: ParameterSampler,
    normalizer: CurveNormalizer,
    noise: NoiseInjector,
}

impl TrialRunner {
    pub fn new(params: Parameters) -> Result<Self> {
        params.validate()?;
        let sampler = ParameterSampler::new(&params.trials)?;
        let normalizer = CurveNormalizer::new(NormalizerConfig {
            fit_window_min: params.window.fit_window_min,
            allow_asymptotic: false,
            ..NormalizerConfig::default()
        });
        let noise = NoiseInjector::new(params.noise.noise_level);
        Ok(Self {
            params,
            sampler,
            normalizer,
            noise,
        })
    }

    pub fn params(&self) -> &Parameters {
        &self.params
    }

    pub fn trial_seed(&self, trial: usize) -> u64 {
        self.params.trials.seed.wrapping_add(trial as u64)
    }

    /// Time axis of the response window
    pub fn window_times(&self) -> Vec<f64> {
        let step = self.params.grid.step_min;
        let len = (self.params.window.duration_min / step).round() as usize + 1;
        (0..len).map(|i| i as f64 * step).collect()
    }

    /// Run all trials and merge their results in trial order
    pub fn run(&self) -> TrialEnsemble {
        let repeats = self.params.trials.repeats;
        log::info!(
            "Running {} trials (seed {}, {})",
            repeats,
            self.params.trials.seed,
            if self.params.trials.parallel { "parallel" } else { "sequential" }
        );

        let outcomes: Vec<std::result::Result<TrialOutput, FailedTrial>> = if self.params.trials.parallel {
            (0..repeats).into_par_iter().map(|i| self.run_trial(i)).collect()
        } else {
            (0..repeats).map(|i| self.run_trial(i)).collect()
        };

        let mut ensemble = TrialEnsemble::new(self.window_times());
        for outcome in outcomes {
            match outcome {
                Ok(output) => ensemble.push(output),
                Err(failed) => {
                    log::warn!("{}", failed);
                    ensemble.failures.push(failed);
                }
            }
        }

        log::info!(
            "Finished: {} completed, {} failed",
            ensemble.records.len(),
            ensemble.failures.len()
        );
        ensemble
    }

    /// Sample and run one trial from its own seed
    pub fn run_trial(&self, trial: usize) -> std::result::Result<TrialOutput, FailedTrial> {
        let mut rng = StdRng::seed_from_u64(self.trial_seed(trial));
        let draw = self.sampler.sample(&mut rng);
        self.run_trial_with_draw(trial, draw, &mut rng)
            .map_err(|error| FailedTrial { trial, draw, error })
    }

    /// Run the pipeline with caller-chosen random parameters; `rng` drives the noise.
    pub fn run_trial_with_draw<R: Rng + ?Sized>(
        &self,
        trial: usize,
        draw: ParameterDraw,
        rng: &mut R,
    ) -> Result<TrialOutput> {
        let mut kinetics = self.params.kinetics;
        kinetics.k_oxygen_consumption = draw.k_oxygen_consumption;
        let mut initial = self.params.initial;
        initial.atp_mM = draw.atp_mM;

        let mut chainer = PhaseChainer::new(
            EnergyKinetics::new(kinetics),
            initial,
            self.params.grid,
            self.params.integrator,
        );
        let chain = chainer.run(self.params.trials.include_phase_a)?;
        let window = extract_window(&chain, &self.params)?;
        let (raw, curve) = normalize_window(&window, &self.params, &self.normalizer);

        let normalized = self.noise.apply(&curve.values, rng);
        let auc = baseline_auc(window.times(), &normalized, BASELINE_RATIO);

        let record = TrialRecord {
            trial,
            atp_mM: draw.atp_mM,
            k_oxygen_consumption: draw.k_oxygen_consumption,
            fitted_k: curve.outcome.fitted_k(),
            fit_model: curve.outcome.model(),
            auc,
        };
        log::debug!(
            "trial {}: ATP {:.0}, k_O2 {:.4}, fit {}, AUC {:.6}",
            trial,
            record.atp_mM,
            record.k_oxygen_consumption,
            record.fit_model.name(),
            record.auc
        );

        Ok(TrialOutput {
            record,
            raw,
            normalized,
        })
    }
}
