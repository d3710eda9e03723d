//! Configuration module for simulation parameters.
//!
//! All kinetic constants, grid settings and trial distributions are exposed
//! here as strongly typed records that round-trip through JSON.

mod parameters;

pub use parameters::{
    InitialConditions, KineticParameters, MixtureComponent, NoiseConfig, Parameters, TimeGrid,
    TrialConfig, WindowConfig,
};

pub(crate) use parameters::{require_non_negative, require_positive};
