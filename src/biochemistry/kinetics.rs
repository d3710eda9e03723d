//! Oxygen-gated substrate kinetics with steady-state ATP.
//!
//! Trehalose is broken down to glucose; glucose and lactate are consumed
//! under ATP feedback inhibition and oxygen gating, with lactate use further
//! suppressed while glucose is available. ATP consumption is defined equal
//! to production, so ATP is constant along any trajectory.
//!
//! ```text
//! d[trehalose]/dt = -v_treh
//! d[glucose]/dt   = -v_glc + 2 v_treh
//! d[lactate]/dt   = -v_lac + coupling * v_glc
//! d[ATP]/dt       = 0
//! d[oxygen]/dt    = -k_O2 (v_glc + v_lac)
//! ```

use super::enzyme::{hill_gate, inhibition};
use super::integrator::OdeSystem;
use crate::config::KineticParameters;
use crate::state::{MetabolicState, Species};

/// Glucose molecules released per trehalose hydrolysed
const GLUCOSE_PER_TREHALOSE: f64 = 2.0;

/// Instantaneous fluxes at one state (mM/min)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fluxes {
    pub trehalose_breakdown: f64,
    pub glucose_consumption: f64,
    pub lactate_consumption: f64,
    pub oxygen_consumption: f64,
    pub atp_production: f64,
    pub atp_consumption: f64,
    /// Oxygen gate on glucose use (0-1)
    pub oxygen_gate_glucose: f64,
    /// Oxygen gate on lactate use (0-1)
    pub oxygen_gate_lactate: f64,
}

/// Rate law for the five-species model
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyKinetics {
    params: KineticParameters,
}

impl EnergyKinetics {
    pub fn new(params: KineticParameters) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &KineticParameters {
        &self.params
    }

    /// Compute all fluxes at the given state
    pub fn fluxes(&self, state: &MetabolicState) -> Fluxes {
        let p = &self.params;

        let oxygen_gate_glucose = hill_gate(state.oxygen_mM, p.k_oxygen_glucose_mM, p.hill_glucose);
        let oxygen_gate_lactate = hill_gate(state.oxygen_mM, p.k_oxygen_lactate_mM, p.hill_lactate);
        let atp_feedback = inhibition(p.ki_atp_mM, state.atp_mM);

        let trehalose_breakdown = p.k_trehalose * state.trehalose_mM;
        let glucose_consumption = p.k_glucose * state.glucose_mM * atp_feedback * oxygen_gate_glucose;
        let lactate_consumption = p.k_lactate
            * state.lactate_mM
            * atp_feedback
            * inhibition(p.ki_glucose_mM, state.glucose_mM)
            * oxygen_gate_lactate;

        let atp_production =
            p.atp_yield_glucose * glucose_consumption + p.atp_yield_lactate * lactate_consumption;
        let oxygen_consumption = p.k_oxygen_consumption * (glucose_consumption + lactate_consumption);

        Fluxes {
            trehalose_breakdown,
            glucose_consumption,
            lactate_consumption,
            oxygen_consumption,
            atp_production,
            // Steady state: demand matches supply exactly
            atp_consumption: atp_production,
            oxygen_gate_glucose,
            oxygen_gate_lactate,
        }
    }

    /// Time derivative of the state. `_time_min` is unused by the rate law.
    pub fn derivatives(&self, state: &MetabolicState, _time_min: f64) -> MetabolicState {
        let v = self.fluxes(state);
        MetabolicState {
            trehalose_mM: -v.trehalose_breakdown,
            glucose_mM: -v.glucose_consumption + GLUCOSE_PER_TREHALOSE * v.trehalose_breakdown,
            lactate_mM: -v.lactate_consumption + self.params.lactate_coupling * v.glucose_consumption,
            atp_mM: v.atp_production - v.atp_consumption,
            oxygen_mM: -v.oxygen_consumption,
        }
    }
}

impl OdeSystem for EnergyKinetics {
    fn dimension(&self) -> usize {
        MetabolicState::LEN
    }

    fn rhs(&self, time_min: f64, y: &[f64], dydt: &mut [f64]) {
        let d = self.derivatives(&MetabolicState::from_slice(y), time_min);
        for species in Species::ALL {
            dydt[species.index()] = d.get(species);
        }
    }
}
