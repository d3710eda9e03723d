//! ODE integration for metabolic simulations.
//!
//! Two methods share one driver that samples the solution on a regular grid:
//! - Dormand-Prince 4(5) with adaptive step-size control (default). Steps
//!   are clipped so every grid point is hit exactly.
//! - Classic 4th-order Runge-Kutta with a fixed number of substeps per grid
//!   interval.
//!
//! Neither method clamps the state. A non-finite state, a step-size
//! underflow, or an exhausted step budget is reported as
//! `SimulationError::NumericalDivergence`.
//!
//! References:
//! - Dormand JR, Prince PJ. J Comput Appl Math. 1980;6:19-26
//! - Press et al., Numerical Recipes, 3rd ed., Cambridge University Press 2007

use serde::{Deserialize, Serialize};

use crate::config::{require_positive, TimeGrid};
use crate::error::{ConfigError, Result, SimulationError};
use crate::state::{MetabolicState, Trajectory};

/// Right-hand side of an ODE system `dy/dt = f(t, y)`
pub trait OdeSystem {
    /// Number of state variables
    fn dimension(&self) -> usize;

    /// Evaluate `f(t, y)` into `dydt`; both slices have length `dimension()`
    fn rhs(&self, t: f64, y: &[f64], dydt: &mut [f64]);
}

/// Integration scheme
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrationMethod {
    /// Adaptive Dormand-Prince 4(5)
    DormandPrince45,
    /// Fixed-step RK4 with `substeps` steps per grid interval
    Rk4 { substeps: usize },
}

/// Configuration for the ODE integrator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    pub method: IntegrationMethod,
    /// Relative tolerance (adaptive method only)
    pub rtol: f64,
    /// Absolute tolerance in mM (adaptive method only)
    pub atol: f64,
    /// Smallest step before the run is declared divergent (min)
    pub min_step_min: f64,
    /// Maximum attempted steps per integration
    pub max_steps: u64,
}

impl IntegratorConfig {
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        require_positive("rtol", self.rtol)?;
        require_positive("atol", self.atol)?;
        require_positive("min_step_min", self.min_step_min)?;
        if self.max_steps == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_steps",
                requirement: "> 0",
                value: 0.0,
            });
        }
        if let IntegrationMethod::Rk4 { substeps: 0 } = self.method {
            return Err(ConfigError::OutOfRange {
                field: "substeps",
                requirement: "> 0",
                value: 0.0,
            });
        }
        Ok(())
    }
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        Self {
            method: IntegrationMethod::DormandPrince45,
            rtol: 1e-8,
            atol: 1e-10,
            min_step_min: 1e-12,
            max_steps: 1_000_000,
        }
    }
}

// Dormand-Prince tableau
const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

// 5th-order weights (advancing solution)
const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// Difference between 5th- and embedded 4th-order weights
const E1: f64 = B1 - 5179.0 / 57600.0;
const E3: f64 = B3 - 7571.0 / 16695.0;
const E4: f64 = B4 - 393.0 / 640.0;
const E5: f64 = B5 + 92097.0 / 339200.0;
const E6: f64 = B6 - 187.0 / 2100.0;
const E7: f64 = -1.0 / 40.0;

/// Grid-sampling ODE integrator
///
/// Holds scratch buffers so repeated integrations do not reallocate.
pub struct Integrator {
    /// Configuration
    pub config: IntegratorConfig,
    /// Steps attempted during the current integration
    pub step_count: u64,
    /// Step size carried between grid intervals (adaptive method)
    step_hint: f64,
    k1: Vec<f64>,
    k2: Vec<f64>,
    k3: Vec<f64>,
    k4: Vec<f64>,
    k5: Vec<f64>,
    k6: Vec<f64>,
    k7: Vec<f64>,
    y_temp: Vec<f64>,
    y_new: Vec<f64>,
}

impl Integrator {
    /// Create a new integrator for a system with n variables
    pub fn new(n_variables: usize, config: IntegratorConfig) -> Self {
        Self {
            config,
            step_count: 0,
            step_hint: 0.0,
            k1: vec![0.0; n_variables],
            k2: vec![0.0; n_variables],
            k3: vec![0.0; n_variables],
            k4: vec![0.0; n_variables],
            k5: vec![0.0; n_variables],
            k6: vec![0.0; n_variables],
            k7: vec![0.0; n_variables],
            y_temp: vec![0.0; n_variables],
            y_new: vec![0.0; n_variables],
        }
    }

    /// Resize internal buffers if system size changes
    pub fn resize(&mut self, n_variables: usize) {
        if self.k1.len() != n_variables {
            for buf in [
                &mut self.k1,
                &mut self.k2,
                &mut self.k3,
                &mut self.k4,
                &mut self.k5,
                &mut self.k6,
                &mut self.k7,
                &mut self.y_temp,
                &mut self.y_new,
            ] {
                buf.resize(n_variables, 0.0);
            }
        }
    }

    /// Reset step counter and carried step size
    pub fn reset(&mut self) {
        self.step_count = 0;
        self.step_hint = 0.0;
    }

    /// Integrate the system from `initial` and sample it on every point of `grid`.
    ///
    /// The returned trajectory starts at t = 0 and has `grid.sample_count()` samples.
    pub fn integrate<S: OdeSystem>(
        &mut self,
        system: &S,
        initial: &MetabolicState,
        grid: &TimeGrid,
    ) -> Result<Trajectory> {
        if !initial.is_finite() {
            return Err(SimulationError::divergence(0.0, "initial state is not finite"));
        }
        self.reset();
        self.resize(system.dimension());

        let mut y = initial.to_array();
        let mut trajectory = Trajectory::with_capacity(grid.sample_count());
        trajectory.push(0.0, *initial);

        let mut t_prev = 0.0;
        for i in 1..=grid.intervals() {
            let t_next = i as f64 * grid.step_min;
            self.advance(system, &mut y, t_prev, t_next)?;
            trajectory.push(t_next, MetabolicState::from_slice(&y));
            t_prev = t_next;
        }

        Ok(trajectory)
    }

    /// Advance `y` in place from `t0` to `t1`
    pub fn advance<S: OdeSystem>(&mut self, system: &S, y: &mut [f64], t0: f64, t1: f64) -> Result<()> {
        self.resize(y.len());
        match self.config.method {
            IntegrationMethod::DormandPrince45 => self.advance_adaptive(system, y, t0, t1),
            IntegrationMethod::Rk4 { substeps } => {
                let dt = (t1 - t0) / substeps.max(1) as f64;
                let mut t = t0;
                for _ in 0..substeps.max(1) {
                    self.count_step(t)?;
                    self.rk4_step(system, y, t, dt);
                    t += dt;
                    if y.iter().any(|v| !v.is_finite()) {
                        return Err(SimulationError::divergence(t, "state became non-finite"));
                    }
                }
                Ok(())
            }
        }
    }

    fn count_step(&mut self, t: f64) -> Result<()> {
        self.step_count += 1;
        if self.step_count > self.config.max_steps {
            return Err(SimulationError::divergence(
                t,
                format!("exceeded max_steps = {}", self.config.max_steps),
            ));
        }
        Ok(())
    }

    /// One classic RK4 step
    ///
    /// k1 = f(t, y)
    /// k2 = f(t + dt/2, y + dt/2 * k1)
    /// k3 = f(t + dt/2, y + dt/2 * k2)
    /// k4 = f(t + dt, y + dt * k3)
    /// y_new = y + dt/6 * (k1 + 2*k2 + 2*k3 + k4)
    fn rk4_step<S: OdeSystem>(&mut self, system: &S, y: &mut [f64], t: f64, dt: f64) {
        let n = y.len();

        system.rhs(t, y, &mut self.k1);

        for i in 0..n {
            self.y_temp[i] = y[i] + 0.5 * dt * self.k1[i];
        }
        system.rhs(t + 0.5 * dt, &self.y_temp, &mut self.k2);

        for i in 0..n {
            self.y_temp[i] = y[i] + 0.5 * dt * self.k2[i];
        }
        system.rhs(t + 0.5 * dt, &self.y_temp, &mut self.k3);

        for i in 0..n {
            self.y_temp[i] = y[i] + dt * self.k3[i];
        }
        system.rhs(t + dt, &self.y_temp, &mut self.k4);

        let dt_6 = dt / 6.0;
        for i in 0..n {
            y[i] += dt_6 * (self.k1[i] + 2.0 * self.k2[i] + 2.0 * self.k3[i] + self.k4[i]);
        }
    }

    fn advance_adaptive<S: OdeSystem>(&mut self, system: &S, y: &mut [f64], t0: f64, t1: f64) -> Result<()> {
        let n = y.len();
        let span = t1 - t0;
        if span <= 0.0 {
            return Ok(());
        }
        let rtol = self.config.rtol;
        let atol = self.config.atol;
        let min_step = self.config.min_step_min;
        let end_tolerance = 1e-12 * t1.abs().max(1.0);

        let mut t = t0;
        let mut h_free = if self.step_hint > 0.0 { self.step_hint } else { span };

        system.rhs(t, y, &mut self.k1);

        while t1 - t > end_tolerance {
            let remaining = t1 - t;
            let clipped = h_free >= remaining;
            let h = if clipped { remaining } else { h_free };
            self.count_step(t)?;

            for i in 0..n {
                self.y_temp[i] = y[i] + h * A21 * self.k1[i];
            }
            system.rhs(t + h / 5.0, &self.y_temp, &mut self.k2);

            for i in 0..n {
                self.y_temp[i] = y[i] + h * (A31 * self.k1[i] + A32 * self.k2[i]);
            }
            system.rhs(t + 3.0 * h / 10.0, &self.y_temp, &mut self.k3);

            for i in 0..n {
                self.y_temp[i] = y[i] + h * (A41 * self.k1[i] + A42 * self.k2[i] + A43 * self.k3[i]);
            }
            system.rhs(t + 4.0 * h / 5.0, &self.y_temp, &mut self.k4);

            for i in 0..n {
                self.y_temp[i] = y[i]
                    + h * (A51 * self.k1[i] + A52 * self.k2[i] + A53 * self.k3[i] + A54 * self.k4[i]);
            }
            system.rhs(t + 8.0 * h / 9.0, &self.y_temp, &mut self.k5);

            for i in 0..n {
                self.y_temp[i] = y[i]
                    + h * (A61 * self.k1[i]
                        + A62 * self.k2[i]
                        + A63 * self.k3[i]
                        + A64 * self.k4[i]
                        + A65 * self.k5[i]);
            }
            system.rhs(t + h, &self.y_temp, &mut self.k6);

            for i in 0..n {
                self.y_new[i] = y[i]
                    + h * (B1 * self.k1[i]
                        + B3 * self.k3[i]
                        + B4 * self.k4[i]
                        + B5 * self.k5[i]
                        + B6 * self.k6[i]);
            }
            // FSAL stage
            system.rhs(t + h, &self.y_new, &mut self.k7);

            let mut err_norm = 0.0;
            for i in 0..n {
                let ei = h
                    * (E1 * self.k1[i]
                        + E3 * self.k3[i]
                        + E4 * self.k4[i]
                        + E5 * self.k5[i]
                        + E6 * self.k6[i]
                        + E7 * self.k7[i]);
                let sc = atol + rtol * y[i].abs().max(self.y_new[i].abs());
                err_norm += (ei / sc) * (ei / sc);
            }
            err_norm = (err_norm / n as f64).sqrt();

            if !err_norm.is_finite() {
                h_free = 0.2 * h;
                if h_free < min_step {
                    return Err(SimulationError::divergence(t, "state became non-finite"));
                }
                continue;
            }

            let factor = if err_norm == 0.0 {
                5.0
            } else {
                (0.9 * err_norm.powf(-0.2)).clamp(0.2, 5.0)
            };

            if err_norm <= 1.0 {
                t = if clipped { t1 } else { t + h };
                y.copy_from_slice(&self.y_new);
                std::mem::swap(&mut self.k1, &mut self.k7);
                // A step shortened to land on the grid says nothing about the free step size
                h_free = if clipped { h_free.max(h * factor) } else { h * factor };
            } else {
                h_free = h * factor;
                if h_free < min_step {
                    return Err(SimulationError::divergence(
                        t,
                        format!("step size fell below {:e}", min_step),
                    ));
                }
            }
        }

        self.step_hint = h_free;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay;

    impl OdeSystem for Decay {
        fn dimension(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = -y[0];
        }
    }

    struct Oscillator;

    impl OdeSystem for Oscillator {
        fn dimension(&self) -> usize {
            2
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[1];
            dydt[1] = -y[0];
        }
    }

    /// dy/dt = y^2 blows up at t = 1/y0
    struct Blowup;

    impl OdeSystem for Blowup {
        fn dimension(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &[f64], dydt: &mut [f64]) {
            dydt[0] = y[0] * y[0];
        }
    }

    #[test]
    fn test_adaptive_exponential_decay() {
        let mut integrator = Integrator::new(1, IntegratorConfig::default());
        let mut y = vec![1.0];
        integrator.advance(&Decay, &mut y, 0.0, 1.0).unwrap();

        let expected = (-1.0_f64).exp();
        assert!((y[0] - expected).abs() < 1e-8, "DP45 error too large: {} vs {}", y[0], expected);
    }

    #[test]
    fn test_rk4_exponential_decay() {
        let config = IntegratorConfig {
            method: IntegrationMethod::Rk4 { substeps: 100 },
            ..IntegratorConfig::default()
        };
        let mut integrator = Integrator::new(1, config);
        let mut y = vec![1.0];
        integrator.advance(&Decay, &mut y, 0.0, 1.0).unwrap();

        let expected = (-1.0_f64).exp();
        assert!((y[0] - expected).abs() < 1e-8, "RK4 error too large: {} vs {}", y[0], expected);
        assert_eq!(integrator.step_count, 100);
    }

    #[test]
    fn test_oscillator_half_period() {
        let mut integrator = Integrator::new(2, IntegratorConfig::default());
        let mut y = vec![1.0, 0.0];
        integrator.advance(&Oscillator, &mut y, 0.0, std::f64::consts::PI).unwrap();

        assert!((y[0] + 1.0).abs() < 1e-6);
        assert!(y[1].abs() < 1e-6);
    }

    #[test]
    fn test_blowup_reports_divergence() {
        let mut integrator = Integrator::new(1, IntegratorConfig::default());
        let mut y = vec![1.0];
        let result = integrator.advance(&Blowup, &mut y, 0.0, 2.0);
        assert!(matches!(result, Err(SimulationError::NumericalDivergence { .. })));
    }

    #[test]
    fn test_step_budget_enforced() {
        let config = IntegratorConfig {
            method: IntegrationMethod::Rk4 { substeps: 10 },
            max_steps: 25,
            ..IntegratorConfig::default()
        };
        let mut integrator = Integrator::new(1, config);
        let mut y = vec![1.0];
        integrator.advance(&Decay, &mut y, 0.0, 1.0).unwrap();
        integrator.advance(&Decay, &mut y, 1.0, 2.0).unwrap();
        let result = integrator.advance(&Decay, &mut y, 2.0, 3.0);
        assert!(matches!(result, Err(SimulationError::NumericalDivergence { .. })));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = IntegratorConfig {
            method: IntegrationMethod::Rk4 { substeps: 0 },
            ..IntegratorConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
