//! Stochastic trial ensembles and the deterministic reference run.

pub mod reference;
pub mod runner;
pub mod sampler;

pub use reference::{run_reference, ReferenceRun};
pub use runner::{FailedTrial, TrialEnsemble, TrialOutput, TrialRecord, TrialRunner};
pub use sampler::{ParameterDraw, ParameterSampler};
