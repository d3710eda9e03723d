//! Parameter structures for the energy-metabolism model and trial protocol.
//!
//! Every field is required when loading from JSON; a file that omits a
//! constant is rejected rather than silently completed with defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::biochemistry::IntegratorConfig;
use crate::error::ConfigError;
use crate::state::Species;

/// Top-level parameters container
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    /// Rate constants, inhibition constants, yields and Hill coefficients
    pub kinetics: KineticParameters,
    /// Phase A starting concentrations and reset targets
    pub initial: InitialConditions,
    /// Sampling grid shared by every phase
    pub grid: TimeGrid,
    /// Response extraction and curve-fit window
    pub window: WindowConfig,
    /// Synthetic measurement noise
    pub noise: NoiseConfig,
    /// Trial loop settings and parameter distributions
    pub trials: TrialConfig,
    /// ODE integrator settings
    pub integrator: IntegratorConfig,
}

impl Parameters {
    /// Load parameters from a JSON file, or use defaults if it is missing or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::from_json_file(path.as_ref()) {
            Ok(params) => {
                log::info!("Loaded parameters from {:?}", path.as_ref());
                params
            }
            Err(e) => {
                log::warn!("Failed to load parameters from {:?}: {}, using defaults", path.as_ref(), e);
                Self::default()
            }
        }
    }

    /// Strict load: the file must exist, parse, and pass validation
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let params: Parameters = serde_json::from_str(&contents)?;
        params.validate()?;
        Ok(params)
    }

    /// Check every constant for finiteness and sign, and that the
    /// response window fits inside the chained trajectory.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kinetics.validate()?;
        self.initial.validate()?;
        self.grid.validate()?;
        self.noise.validate()?;
        self.trials.validate()?;
        self.integrator.validate()?;
        self.window.validate_against(&self.grid)
    }
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            kinetics: KineticParameters::default(),
            initial: InitialConditions::default(),
            grid: TimeGrid::default(),
            window: WindowConfig::default(),
            noise: NoiseConfig::default(),
            trials: TrialConfig::default(),
            integrator: IntegratorConfig::default(),
        }
    }
}

pub(crate) fn require_non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "finite and >= 0",
            value,
        })
    }
}

pub(crate) fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            requirement: "finite and > 0",
            value,
        })
    }
}

/// Kinetic and regulatory constants of the substrate model
///
/// Time is in minutes, concentrations in mM.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KineticParameters {
    /// First-order trehalose breakdown rate (1/min)
    pub k_trehalose: f64,
    /// Glucose consumption rate constant (1/min)
    pub k_glucose: f64,
    /// Lactate consumption rate constant (1/min)
    pub k_lactate: f64,
    /// ATP feedback inhibition constant (mM)
    pub ki_atp_mM: f64,
    /// Glucose inhibition constant for lactate consumption (mM)
    pub ki_glucose_mM: f64,
    /// Oxygen half-saturation for glucose consumption (mM)
    pub k_oxygen_glucose_mM: f64,
    /// Hill coefficient of oxygen gating for glucose
    pub hill_glucose: f64,
    /// Oxygen half-saturation for lactate consumption (mM)
    pub k_oxygen_lactate_mM: f64,
    /// Hill coefficient of oxygen gating for lactate
    pub hill_lactate: f64,
    /// ATP produced per glucose consumed
    pub atp_yield_glucose: f64,
    /// ATP produced per lactate consumed
    pub atp_yield_lactate: f64,
    /// Oxygen consumed per unit of total substrate flux
    pub k_oxygen_consumption: f64,
    /// Lactate produced per glucose consumed (glycolysis/LDH coupling)
    pub lactate_coupling: f64,
}

impl KineticParameters {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("k_trehalose", self.k_trehalose)?;
        require_non_negative("k_glucose", self.k_glucose)?;
        require_non_negative("k_lactate", self.k_lactate)?;
        require_positive("ki_atp_mM", self.ki_atp_mM)?;
        require_positive("ki_glucose_mM", self.ki_glucose_mM)?;
        require_positive("k_oxygen_glucose_mM", self.k_oxygen_glucose_mM)?;
        require_positive("hill_glucose", self.hill_glucose)?;
        require_positive("k_oxygen_lactate_mM", self.k_oxygen_lactate_mM)?;
        require_positive("hill_lactate", self.hill_lactate)?;
        require_non_negative("atp_yield_glucose", self.atp_yield_glucose)?;
        require_non_negative("atp_yield_lactate", self.atp_yield_lactate)?;
        require_non_negative("k_oxygen_consumption", self.k_oxygen_consumption)?;
        require_non_negative("lactate_coupling", self.lactate_coupling)
    }
}

impl Default for KineticParameters {
    fn default() -> Self {
        Self {
            k_trehalose: 0.01,
            k_glucose: 0.5,
            k_lactate: 0.2,
            ki_atp_mM: 50.0,
            ki_glucose_mM: 0.5,

            // Glucose use tolerates lower oxygen than lactate oxidation
            k_oxygen_glucose_mM: 0.05,
            hill_glucose: 2.0,
            k_oxygen_lactate_mM: 0.2,
            hill_lactate: 4.0,

            atp_yield_glucose: 32.0,
            atp_yield_lactate: 15.0,
            k_oxygen_consumption: 0.1,
            lactate_coupling: 0.0,
        }
    }
}

/// Phase A starting concentrations; also the targets of per-phase resets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialConditions {
    pub trehalose_mM: f64,
    pub glucose_mM: f64,
    pub lactate_mM: f64,
    pub atp_mM: f64,
    pub oxygen_mM: f64,
}

impl InitialConditions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("trehalose_mM", self.trehalose_mM)?;
        require_non_negative("glucose_mM", self.glucose_mM)?;
        require_non_negative("lactate_mM", self.lactate_mM)?;
        require_non_negative("atp_mM", self.atp_mM)?;
        require_non_negative("oxygen_mM", self.oxygen_mM)
    }
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            trehalose_mM: 5.0,
            glucose_mM: 1.0,
            lactate_mM: 2.0,
            atp_mM: 50.0,
            oxygen_mM: 1.0,
        }
    }
}

/// Regular sampling grid used by every phase: `[0, phase_duration]` with a fixed step
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeGrid {
    /// Sample spacing (min)
    pub step_min: f64,
    /// Duration of each phase (min)
    pub phase_duration_min: f64,
}

impl TimeGrid {
    pub fn new(step_min: f64, phase_duration_min: f64) -> Self {
        Self {
            step_min,
            phase_duration_min,
        }
    }

    /// Number of intervals in one phase
    pub fn intervals(&self) -> usize {
        (self.phase_duration_min / self.step_min).round() as usize
    }

    /// Number of samples in one phase (closed interval)
    pub fn sample_count(&self) -> usize {
        self.intervals() + 1
    }

    /// Sample times for one phase, starting at zero
    pub fn times(&self) -> Vec<f64> {
        (0..self.sample_count())
            .map(|i| i as f64 * self.step_min)
            .collect()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("step_min", self.step_min)?;
        require_positive("phase_duration_min", self.phase_duration_min)?;
        let ratio = self.phase_duration_min / self.step_min;
        if (ratio - ratio.round()).abs() > 1e-9 * ratio.max(1.0) {
            return Err(ConfigError::OutOfRange {
                field: "phase_duration_min",
                requirement: "an integer multiple of step_min",
                value: self.phase_duration_min,
            });
        }
        Ok(())
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::new(0.1, 60.0)
    }
}

/// Response extraction window, anchored on the start of the final phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Time before the final phase begins at which extraction starts (min)
    pub lead_in_min: f64,
    /// Length of the extracted response after re-indexing (min)
    pub duration_min: f64,
    /// Early sub-window used for the baseline curve fit (min)
    pub fit_window_min: f64,
    /// Which state component is normalized and scored
    pub observable: Species,
}

impl WindowConfig {
    /// The window must start after the first kept sample and end within the final phase.
    pub fn validate_against(&self, grid: &TimeGrid) -> Result<(), ConfigError> {
        require_non_negative("lead_in_min", self.lead_in_min)?;
        require_positive("duration_min", self.duration_min)?;
        require_positive("fit_window_min", self.fit_window_min)?;
        if self.lead_in_min > grid.phase_duration_min {
            return Err(ConfigError::Window(format!(
                "lead-in {} min exceeds the phase duration {} min",
                self.lead_in_min, grid.phase_duration_min
            )));
        }
        if self.duration_min - self.lead_in_min > grid.phase_duration_min {
            return Err(ConfigError::Window(format!(
                "window of {} min after a {} min lead-in runs past the final phase",
                self.duration_min, self.lead_in_min
            )));
        }
        if self.fit_window_min > self.duration_min {
            return Err(ConfigError::Window(format!(
                "fit window {} min is longer than the extracted window {} min",
                self.fit_window_min, self.duration_min
            )));
        }
        Ok(())
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            lead_in_min: 10.0,
            duration_min: 40.0,
            fit_window_min: 10.0,
            observable: Species::Glucose,
        }
    }
}

/// Measurement noise emulation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Noise standard deviation as a fraction of the trace maximum
    pub noise_level: f64,
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_negative("noise_level", self.noise_level)
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { noise_level: 0.005 }
    }
}

/// One component of a mixture of uniform distributions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MixtureComponent {
    /// Selection probability (weights are normalized across components)
    pub weight: f64,
    pub low: f64,
    pub high: f64,
}

impl MixtureComponent {
    pub fn new(weight: f64, low: f64, high: f64) -> Self {
        Self { weight, low, high }
    }
}

/// Trial loop settings and per-trial parameter distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialConfig {
    /// Number of independent trials
    pub repeats: usize,
    /// Base seed; trial `i` uses `seed + i`
    pub seed: u64,
    /// Keep Phase A in the concatenated trajectory
    pub include_phase_a: bool,
    /// Run trials on the rayon thread pool
    pub parallel: bool,
    /// Inclusive integer range for the initial ATP draw (mM)
    pub atp_range_mM: [u32; 2],
    /// Mixture distribution for `k_oxygen_consumption`
    pub k_oxygen_mixture: Vec<MixtureComponent>,
}

impl TrialConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [low, high] = self.atp_range_mM;
        if low > high {
            return Err(ConfigError::OutOfRange {
                field: "atp_range_mM",
                requirement: "ordered as [low, high]",
                value: low as f64,
            });
        }
        if self.k_oxygen_mixture.is_empty() {
            return Err(ConfigError::Mixture("no components".to_string()));
        }
        for component in &self.k_oxygen_mixture {
            require_non_negative("k_oxygen_mixture.weight", component.weight)?;
            if !(component.low.is_finite() && component.high.is_finite())
                || component.low < 0.0
                || component.low > component.high
            {
                return Err(ConfigError::Mixture(format!(
                    "component range [{}, {}] is not an ordered finite non-negative interval",
                    component.low, component.high
                )));
            }
        }
        if self.k_oxygen_mixture.iter().all(|c| c.weight == 0.0) {
            return Err(ConfigError::Mixture("all weights are zero".to_string()));
        }
        Ok(())
    }
}

impl Default for TrialConfig {
    fn default() -> Self {
        Self {
            repeats: 300,
            seed: 0,
            include_phase_a: false,
            parallel: true,
            atp_range_mM: [1, 100],
            k_oxygen_mixture: vec![
                MixtureComponent::new(0.8, 0.0, 0.2),
                MixtureComponent::new(0.2, 0.2, 0.6),
            ],
        }
    }
}
