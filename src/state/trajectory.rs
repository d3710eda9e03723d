//! Sampled trajectories produced by the integrator.

use super::{MetabolicState, Species};

/// Ordered `(time, state)` samples on a regular grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trajectory {
    times_min: Vec<f64>,
    states: Vec<MetabolicState>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            times_min: Vec::with_capacity(capacity),
            states: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, time_min: f64, state: MetabolicState) {
        self.times_min.push(time_min);
        self.states.push(state);
    }

    pub fn len(&self) -> usize {
        self.times_min.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times_min.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times_min
    }

    pub fn states(&self) -> &[MetabolicState] {
        &self.states
    }

    pub fn initial_state(&self) -> Option<&MetabolicState> {
        self.states.first()
    }

    pub fn final_state(&self) -> Option<&MetabolicState> {
        self.states.last()
    }

    /// Values of one species across all samples
    pub fn series(&self, species: Species) -> Vec<f64> {
        self.states.iter().map(|s| s.get(species)).collect()
    }

    /// Join phase segments into one continuous trajectory.
    ///
    /// At each boundary the earlier segment's final sample is dropped: that
    /// instant is represented by the next segment's initial state, which
    /// carries any resets applied at hand-off. Times are re-indexed to
    /// `k * step_min` from zero.
    pub fn concatenate(segments: &[&Trajectory], step_min: f64) -> Trajectory {
        let total: usize = segments.iter().map(|s| s.len()).sum();
        let mut joined = Trajectory::with_capacity(total);
        let last = segments.len().saturating_sub(1);
        for (i, segment) in segments.iter().enumerate() {
            let keep = if i == last {
                segment.len()
            } else {
                segment.len().saturating_sub(1)
            };
            for state in &segment.states[..keep] {
                let time = joined.len() as f64 * step_min;
                joined.push(time, *state);
            }
        }
        joined
    }

    /// Copy `len` samples starting at `start`, with time shifted so the first sample is at zero.
    ///
    /// Panics if the range falls outside the trajectory.
    pub fn window(&self, start: usize, len: usize) -> Trajectory {
        assert!(
            start + len <= self.len(),
            "window [{}, {}) exceeds trajectory of {} samples",
            start,
            start + len,
            self.len()
        );
        let mut out = Trajectory::with_capacity(len);
        if len == 0 {
            return out;
        }
        let origin = self.times_min[start];
        for i in start..start + len {
            out.push(self.times_min[i] - origin, self.states[i]);
        }
        out
    }
}
