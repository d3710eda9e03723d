//! Cell Energy Sim - stochastic multi-phase simulation of cellular energy metabolism
//!
//! This library chains oxygen-gated substrate kinetics through a three-phase
//! protocol, samples population-level parameter variation, and reduces each
//! simulated trace to a baseline-normalized response curve and an AUC score.

// Allow non-snake-case for unit suffixes in field names (mM, etc.)
// This follows the project convention of including units in names.
#![allow(non_snake_case)]

pub mod analysis;
pub mod biochemistry;
pub mod config;
pub mod error;
pub mod export;
pub mod state;
pub mod trials;

pub use analysis::{
    baseline_auc, CurveNormalizer, FitFailure, FitModel, FitOutcome, FitParameters,
    NormalizedCurve, NormalizerConfig, NoiseInjector,
};
pub use biochemistry::{
    EnergyKinetics, Fluxes, IntegrationMethod, Integrator, IntegratorConfig, Phase, PhaseChain,
    PhaseChainer,
};
pub use config::{
    InitialConditions, KineticParameters, NoiseConfig, Parameters, TimeGrid, TrialConfig,
    WindowConfig,
};
pub use error::{ConfigError, SimulationError};
pub use state::{EnsembleSummary, MetabolicState, Species, Table, Trajectory};
pub use trials::{
    run_reference, FailedTrial, ParameterDraw, ParameterSampler, ReferenceRun, TrialEnsemble, TrialOutput,
    TrialRecord, TrialRunner,
};
