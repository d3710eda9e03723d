//! Biochemistry module for the cellular energy-metabolism model.
//!
//! This module implements:
//! - Oxygen-gated substrate kinetics (trehalose, glucose, lactate)
//! - Steady-state ATP balance (production equals consumption)
//! - Grid-sampling ODE integration
//! - The three-phase priming / baseline / stimulus protocol
//!
//! The kinetics are pure functions of state and parameters; all sampling
//! and randomness live in the trial layer.

pub mod enzyme;
pub mod integrator;
pub mod kinetics;
pub mod phases;

pub use enzyme::{hill_gate, inhibition};
pub use integrator::{IntegrationMethod, Integrator, IntegratorConfig, OdeSystem};
pub use kinetics::{EnergyKinetics, Fluxes};
pub use phases::{Phase, PhaseChain, PhaseChainer};
