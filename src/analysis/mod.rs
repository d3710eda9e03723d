//! Response analysis: curve fitting, normalization, noise and AUC.
//!
//! These stages turn a raw simulated observable into the comparable,
//! noise-augmented response curve and scalar scores stored per trial.

pub mod auc;
pub mod fitting;
pub mod noise;
pub mod normalizer;

pub use auc::{baseline_auc, trapezoid};
pub use fitting::{fit_asymptotic, fit_simple_decay, FitFailure, FitModel, FitOptions, FitParameters};
pub use noise::NoiseInjector;
pub use normalizer::{CurveNormalizer, FitOutcome, NormalizedCurve, NormalizerConfig};
