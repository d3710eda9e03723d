//! Flat numeric tables and summary statistics handed to the export layer.

use serde::{Deserialize, Serialize};

/// Column-labelled table of `f64` rows
///
/// Missing values (e.g. a fitted rate when the fit fell back) are stored as NaN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the header
    pub fn push_row(&mut self, row: Vec<f64>) {
        assert_eq!(
            row.len(),
            self.headers.len(),
            "row width {} does not match {} columns",
            row.len(),
            self.headers.len()
        );
        self.rows.push(row);
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.headers.len()
    }

    /// Copy out a column by header name
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }
}

/// Mean, spread and range of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub mean: f64,
    /// Sample standard deviation (0 for a single value)
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

impl SeriesStats {
    /// Statistics over the finite entries; `None` if there are none
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }
        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let std_dev = if finite.len() > 1 {
            (finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let min = finite.iter().cloned().fold(f64::INFINITY, f64::min);
        let max = finite.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        Some(Self { mean, std_dev, min, max })
    }
}

/// Aggregate view of a completed trial ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleSummary {
    /// Trials that produced a record
    pub completed: usize,
    /// Trials dropped after numerical divergence
    pub failed: usize,
    pub auc: Option<SeriesStats>,
    pub fitted_k: Option<SeriesStats>,
    /// Fraction of completed trials normalized by the flat fallback
    pub flat_fallback_fraction: f64,
}

impl EnsembleSummary {
    pub fn print_summary(&self) {
        println!("=== Trial Ensemble ===");
        println!("  Completed: {}", self.completed);
        println!("  Failed:    {}", self.failed);
        if let Some(auc) = &self.auc {
            println!(
                "  AUC:       mean {:.5}, sd {:.5}, range [{:.5}, {:.5}]",
                auc.mean, auc.std_dev, auc.min, auc.max
            );
        }
        if let Some(k) = &self.fitted_k {
            println!(
                "  Fitted k:  mean {:.5}, sd {:.5}, range [{:.5}, {:.5}]",
                k.mean, k.std_dev, k.min, k.max
            );
        }
        println!("  Flat-normalized: {:.1}%", self.flat_fallback_fraction * 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_column_lookup() {
        let mut table = Table::new(["time", "trial_0"]);
        table.push_row(vec![0.0, 1.5]);
        table.push_row(vec![0.1, 2.5]);
        assert_eq!(table.column("trial_0"), Some(vec![1.5, 2.5]));
        assert_eq!(table.column("missing"), None);
    }

    #[test]
    #[should_panic]
    fn test_table_rejects_ragged_row() {
        let mut table = Table::new(["a", "b"]);
        table.push_row(vec![1.0]);
    }

    #[test]
    fn test_series_stats_skip_nan() {
        let stats = SeriesStats::from_values(&[1.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.std_dev - 2.0_f64.sqrt()).abs() < 1e-12);
        assert!(SeriesStats::from_values(&[f64::NAN]).is_none());
    }
}
