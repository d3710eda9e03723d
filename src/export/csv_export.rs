//! CSV export for result tables.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use crate::state::Table;

/// Create `<base>/run_YYYYMMDD_HHMMSS` and return its path
pub fn timestamped_dir<P: AsRef<Path>>(base: P) -> Result<PathBuf> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let dir = base.as_ref().join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating export directory {}", dir.display()))?;
    Ok(dir)
}

/// Write a table with a header row.
///
/// Non-finite cells are written empty, so a missing `fitted_k` reads back as
/// a blank field rather than the string "NaN".
pub fn write_table_csv<P: AsRef<Path>>(table: &Table, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = csv::Writer::from_writer(file);

    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row.iter().map(|v| format_cell(*v)))?;
    }
    writer.flush()?;

    log::info!(
        "CSV exported: {} ({} rows x {} columns)",
        path.display(),
        table.n_rows(),
        table.n_cols()
    );
    Ok(())
}

fn format_cell(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}
