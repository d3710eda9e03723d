//! State records for the energy-metabolism simulation.
//!
//! Contains the named metabolic state vector, sampled trajectories, and the
//! flat tables produced at the end of a run.

mod biochemistry;
mod metrics;
mod trajectory;

pub use biochemistry::{MetabolicState, Species};
pub use metrics::{EnsembleSummary, SeriesStats, Table};
pub use trajectory::Trajectory;
