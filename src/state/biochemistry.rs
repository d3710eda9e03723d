//! Metabolic state data structures.
//!
//! The integrator works on flat `[f64]` buffers; `MetabolicState` is the
//! named view used everywhere else, so phase hand-off logic copies and resets
//! fields by name rather than by column position.

use serde::{Deserialize, Serialize};

/// One tracked quantity of the energy-metabolism model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Species {
    Trehalose,
    Glucose,
    Lactate,
    Atp,
    Oxygen,
}

impl Species {
    /// All species in buffer order
    pub const ALL: [Species; 5] = [
        Species::Trehalose,
        Species::Glucose,
        Species::Lactate,
        Species::Atp,
        Species::Oxygen,
    ];

    /// Position in the flat integration buffer
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Species::Trehalose => 0,
            Species::Glucose => 1,
            Species::Lactate => 2,
            Species::Atp => 3,
            Species::Oxygen => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Species::Trehalose => "trehalose",
            Species::Glucose => "glucose",
            Species::Lactate => "lactate",
            Species::Atp => "ATP",
            Species::Oxygen => "oxygen",
        }
    }
}

/// Concentrations of the five tracked quantities (mM)
///
/// Values are not clamped: the model can drive a pool below zero if the
/// chosen parameters and durations deplete it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetabolicState {
    pub trehalose_mM: f64,
    pub glucose_mM: f64,
    pub lactate_mM: f64,
    pub atp_mM: f64,
    pub oxygen_mM: f64,
}

impl MetabolicState {
    /// Number of state components
    pub const LEN: usize = 5;

    pub fn new(trehalose_mM: f64, glucose_mM: f64, lactate_mM: f64, atp_mM: f64, oxygen_mM: f64) -> Self {
        Self {
            trehalose_mM,
            glucose_mM,
            lactate_mM,
            atp_mM,
            oxygen_mM,
        }
    }

    /// Get concentration of a species
    #[inline]
    pub fn get(&self, species: Species) -> f64 {
        match species {
            Species::Trehalose => self.trehalose_mM,
            Species::Glucose => self.glucose_mM,
            Species::Lactate => self.lactate_mM,
            Species::Atp => self.atp_mM,
            Species::Oxygen => self.oxygen_mM,
        }
    }

    /// Set concentration of a species
    #[inline]
    pub fn set(&mut self, species: Species, value_mM: f64) {
        match species {
            Species::Trehalose => self.trehalose_mM = value_mM,
            Species::Glucose => self.glucose_mM = value_mM,
            Species::Lactate => self.lactate_mM = value_mM,
            Species::Atp => self.atp_mM = value_mM,
            Species::Oxygen => self.oxygen_mM = value_mM,
        }
    }

    /// Flatten into integration buffer order
    pub fn to_array(&self) -> [f64; Self::LEN] {
        [
            self.trehalose_mM,
            self.glucose_mM,
            self.lactate_mM,
            self.atp_mM,
            self.oxygen_mM,
        ]
    }

    /// Rebuild from a buffer in `Species::ALL` order
    pub fn from_slice(values: &[f64]) -> Self {
        assert_eq!(values.len(), Self::LEN, "state buffer must have {} entries", Self::LEN);
        Self::new(values[0], values[1], values[2], values[3], values[4])
    }

    /// True if every component is finite
    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}
