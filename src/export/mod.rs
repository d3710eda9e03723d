//! Export functionality for trial results.
//!
//! Provides CSV tables and a JSON run manifest.

mod csv_export;
mod json_export;

pub use csv_export::{timestamped_dir, write_table_csv};
pub use json_export::{write_run_manifest, FailureEntry, RunManifest};
