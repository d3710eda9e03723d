//! Three-phase protocol with state hand-off between phases.
//!
//! | Phase      | trehalose | glucose   | lactate   | ATP   | oxygen    |
//! |------------|-----------|-----------|-----------|-------|-----------|
//! | Priming    | initial   | initial   | initial   | reset | initial   |
//! | Baseline   | inherited | inherited | inherited | reset | inherited |
//! | Stimulus   | reset     | inherited | inherited | reset | reset     |
//!
//! "reset" means the configured initial value for this run. The stimulus
//! phase models replenishment of trehalose and oxygen after the baseline
//! phase has run the cell down.

use super::integrator::{Integrator, IntegratorConfig};
use super::kinetics::EnergyKinetics;
use crate::config::{InitialConditions, TimeGrid};
use crate::error::Result;
use crate::state::{MetabolicState, Trajectory};

/// Segment of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Phase A: fresh constants
    Priming,
    /// Phase B: hand-off from priming with ATP reset
    Baseline,
    /// Phase C: trehalose and oxygen replenished, ATP reset
    Stimulus,
}

impl Phase {
    pub const SEQUENCE: [Phase; 3] = [Phase::Priming, Phase::Baseline, Phase::Stimulus];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Priming => "priming",
            Phase::Baseline => "baseline",
            Phase::Stimulus => "stimulus",
        }
    }

    /// Starting state for this phase given the previous phase's final state.
    ///
    /// `previous` is ignored for the priming phase and required otherwise.
    pub fn initial_state(self, initial: &InitialConditions, previous: Option<&MetabolicState>) -> MetabolicState {
        let fresh = MetabolicState::new(
            initial.trehalose_mM,
            initial.glucose_mM,
            initial.lactate_mM,
            initial.atp_mM,
            initial.oxygen_mM,
        );
        if self == Phase::Priming {
            return fresh;
        }
        let Some(prev) = previous else {
            panic!("{} phase needs the previous phase's final state", self.name());
        };
        match self {
            Phase::Priming => fresh,
            Phase::Baseline => MetabolicState {
                atp_mM: initial.atp_mM,
                ..*prev
            },
            Phase::Stimulus => MetabolicState {
                trehalose_mM: initial.trehalose_mM,
                glucose_mM: prev.glucose_mM,
                lactate_mM: prev.lactate_mM,
                atp_mM: initial.atp_mM,
                oxygen_mM: initial.oxygen_mM,
            },
        }
    }
}

/// Output of one chained run
#[derive(Debug, Clone)]
pub struct PhaseChain {
    /// Per-phase trajectories, each on its own `[0, T]` grid
    pub phases: Vec<(Phase, Trajectory)>,
    /// Kept phases joined on a continuous time axis starting at zero
    pub combined: Trajectory,
    /// Index in `combined` of the first stimulus-phase sample
    pub stimulus_index: usize,
}

impl PhaseChain {
    pub fn phase(&self, phase: Phase) -> Option<&Trajectory> {
        self.phases.iter().find(|(p, _)| *p == phase).map(|(_, t)| t)
    }

    /// Time of the stimulus in the combined trajectory
    pub fn stimulus_time_min(&self) -> f64 {
        self.combined.times()[self.stimulus_index]
    }
}

/// Runs the three phases and concatenates the kept ones
pub struct PhaseChainer {
    kinetics: EnergyKinetics,
    initial: InitialConditions,
    grid: TimeGrid,
    integrator: Integrator,
}

impl PhaseChainer {
    pub fn new(
        kinetics: EnergyKinetics,
        initial: InitialConditions,
        grid: TimeGrid,
        integrator_config: IntegratorConfig,
    ) -> Self {
        Self {
            kinetics,
            initial,
            grid,
            integrator: Integrator::new(MetabolicState::LEN, integrator_config),
        }
    }

    pub fn kinetics(&self) -> &EnergyKinetics {
        &self.kinetics
    }

    /// Run all three phases.
    ///
    /// Priming always runs, because the baseline phase starts from its final
    /// state; `include_priming` only controls whether it is kept in `combined`.
    pub fn run(&mut self, include_priming: bool) -> Result<PhaseChain> {
        let mut phases: Vec<(Phase, Trajectory)> = Vec::with_capacity(Phase::SEQUENCE.len());

        for phase in Phase::SEQUENCE {
            let previous = phases.last().and_then(|(_, traj)| traj.final_state());
            let start = phase.initial_state(&self.initial, previous);
            let trajectory = self.integrator.integrate(&self.kinetics, &start, &self.grid)?;
            log::trace!(
                "{} phase: {} samples, {} integrator steps",
                phase.name(),
                trajectory.len(),
                self.integrator.step_count
            );
            phases.push((phase, trajectory));
        }

        let kept: Vec<&Trajectory> = phases
            .iter()
            .filter(|(phase, _)| include_priming || *phase != Phase::Priming)
            .map(|(_, traj)| traj)
            .collect();
        let combined = Trajectory::concatenate(&kept, self.grid.step_min);
        // Every kept phase before the stimulus contributes all but its last sample
        let stimulus_index = (kept.len() - 1) * self.grid.intervals();

        Ok(PhaseChain {
            phases,
            combined,
            stimulus_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KineticParameters;

    fn chainer() -> PhaseChainer {
        PhaseChainer::new(
            EnergyKinetics::new(KineticParameters::default()),
            InitialConditions::default(),
            TimeGrid::new(0.5, 20.0),
            IntegratorConfig::default(),
        )
    }

    #[test]
    fn test_baseline_resets_only_atp() {
        let initial = InitialConditions::default();
        let prev = MetabolicState::new(1.0, 2.0, 3.0, 99.0, 0.1);
        let start = Phase::Baseline.initial_state(&initial, Some(&prev));
        assert_eq!(start, MetabolicState { atp_mM: initial.atp_mM, ..prev });
    }

    #[test]
    fn test_stimulus_replenishes_trehalose_and_oxygen() {
        let initial = InitialConditions::default();
        let prev = MetabolicState::new(1.0, 2.0, 3.0, 99.0, 0.1);
        let start = Phase::Stimulus.initial_state(&initial, Some(&prev));
        assert_eq!(start.trehalose_mM, initial.trehalose_mM);
        assert_eq!(start.oxygen_mM, initial.oxygen_mM);
        assert_eq!(start.atp_mM, initial.atp_mM);
        assert_eq!(start.glucose_mM, 2.0);
        assert_eq!(start.lactate_mM, 3.0);
    }

    #[test]
    #[should_panic]
    fn test_missing_hand_off_panics() {
        let _ = Phase::Stimulus.initial_state(&InitialConditions::default(), None);
    }

    #[test]
    fn test_chain_lengths_and_stimulus_index() {
        let mut chainer = chainer();
        let n = 41; // 20 min at 0.5 min

        let without = chainer.run(false).unwrap();
        assert_eq!(without.combined.len(), 2 * n - 1);
        assert_eq!(without.stimulus_index, n - 1);
        assert!((without.stimulus_time_min() - 20.0).abs() < 1e-9);

        let with = chainer.run(true).unwrap();
        assert_eq!(with.combined.len(), 3 * n - 2);
        assert!((with.stimulus_time_min() - 40.0).abs() < 1e-9);
        assert!((with.combined.times().last().unwrap() - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_hand_off_follows_phase_rules() {
        let mut chainer = chainer();
        let chain = chainer.run(false).unwrap();
        let priming_end = *chain.phase(Phase::Priming).unwrap().final_state().unwrap();
        let baseline = chain.phase(Phase::Baseline).unwrap();
        let baseline_start = *baseline.initial_state().unwrap();
        let baseline_end = *baseline.final_state().unwrap();
        let stimulus_start = *chain.phase(Phase::Stimulus).unwrap().initial_state().unwrap();

        assert_eq!(baseline_start.glucose_mM, priming_end.glucose_mM);
        assert_eq!(baseline_start.oxygen_mM, priming_end.oxygen_mM);
        assert_eq!(stimulus_start.glucose_mM, baseline_end.glucose_mM);
        assert_eq!(stimulus_start.lactate_mM, baseline_end.lactate_mM);
        assert_eq!(stimulus_start.oxygen_mM, InitialConditions::default().oxygen_mM);

        // The combined trace switches to the stimulus state at the boundary
        assert_eq!(chain.combined.states()[chain.stimulus_index], stimulus_start);
    }
}
