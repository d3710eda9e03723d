//! JSON run manifest.
//!
//! Records the parameters a run used alongside its aggregate results, so a
//! directory of CSV tables can be traced back to the configuration that
//! produced it.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;

use crate::config::Parameters;
use crate::state::EnsembleSummary;
use crate::trials::TrialEnsemble;

/// A trial that was dropped from the tables
#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub trial: usize,
    pub atp_mM: f64,
    pub k_oxygen_consumption: f64,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    /// Export timestamp
    pub exported_at: String,
    /// Crate version that produced the run
    pub version: &'static str,
    pub parameters: Parameters,
    pub summary: EnsembleSummary,
    pub failures: Vec<FailureEntry>,
}

impl RunManifest {
    pub fn new(parameters: &Parameters, ensemble: &TrialEnsemble) -> Self {
        let failures = ensemble
            .failures
            .iter()
            .map(|f| FailureEntry {
                trial: f.trial,
                atp_mM: f.draw.atp_mM,
                k_oxygen_consumption: f.draw.k_oxygen_consumption,
                error: f.error.to_string(),
            })
            .collect();
        Self {
            exported_at: Local::now().to_rfc3339(),
            version: env!("CARGO_PKG_VERSION"),
            parameters: parameters.clone(),
            summary: ensemble.summary(),
            failures,
        }
    }
}

pub fn write_run_manifest<P: AsRef<Path>>(manifest: &RunManifest, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, manifest)?;

    log::info!("Run manifest exported: {}", path.display());
    Ok(())
}
