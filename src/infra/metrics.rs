// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one row per epoch to checkpoints/metrics.csv:
//
//   epoch,train_loss,val_loss,train_mape,val_mape
//   1,0.81234,0.7741,212.4,198.3
//   ...
//
// The header comes from EpochMetrics' field names and is written
// with the first row.
//
// Losses are MSE in scaled space. MAPE is computed against scaled
// targets too, so values far above 100 % are normal when closes sit
// near the training mean (z ≈ 0).

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

/// Floor applied to |target| when dividing, matching the usual MAPE convention.
pub const MAPE_EPSILON: f64 = 1e-7;

/// Mean absolute percentage error over paired values, in percent.
pub fn mape<I>(pairs: I) -> f64
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let (sum, n) = pairs.into_iter().fold((0.0, 0usize), |(sum, n), (target, prediction)| {
        (sum + (target - prediction).abs() / target.abs().max(MAPE_EPSILON), n + 1)
    });
    if n == 0 { f64::NAN } else { 100.0 * sum / n as f64 }
}

/// One row of metrics for a single training epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch: usize,
    /// Mean MSE over training batches.
    pub train_loss: f64,
    /// Mean MSE over validation batches.
    pub val_loss: f64,
    pub train_mape: f64,
    pub val_mape: f64,
}

impl EpochMetrics {
    pub fn new(epoch: usize, train_loss: f64, val_loss: f64, train_mape: f64, val_mape: f64) -> Self {
        Self { epoch, train_loss, val_loss, train_mape, val_mape }
    }

    /// Returns true if this epoch is at least as good as the best so far.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss <= best_val_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start a fresh metrics.csv in `dir`, replacing any earlier run.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot append to '{}'", self.csv_path.display()))?;
        let first_row = f.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(first_row)
            .from_writer(f);
        writer.serialize(m)?;
        writer.flush()?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch, m.train_loss, m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_improvement() {
        let m = EpochMetrics::new(2, 2.5, 2.3, 40.0, 42.0);
        assert!(m.is_improvement(3.0));
        assert!(m.is_improvement(2.3));
        assert!(!m.is_improvement(2.0));
    }

    #[test]
    fn test_mape() {
        assert!((mape(vec![(100.0, 110.0), (200.0, 180.0)]) - 10.0).abs() < 1e-12);
        assert!(mape(Vec::new()).is_nan());
        // zero target hits the epsilon floor instead of dividing by zero
        assert!((mape(vec![(0.0, 1e-7)]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_logger_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&EpochMetrics::new(1, 0.5, 0.25, 12.0, 11.5)).unwrap();
        logger.log(&EpochMetrics::new(2, 0.4, 0.2, 10.0, 9.5)).unwrap();

        let text = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "epoch,train_loss,val_loss,train_mape,val_mape");
        assert_eq!(lines[1], "1,0.5,0.25,12.0,11.5");
        assert_eq!(lines[2], "2,0.4,0.2,10.0,9.5");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn test_new_logger_starts_a_fresh_file() {
        let dir = tempfile::tempdir().unwrap();
        let first = MetricsLogger::new(dir.path()).unwrap();
        first.log(&EpochMetrics::new(1, 0.5, 0.25, 12.0, 11.5)).unwrap();

        let second = MetricsLogger::new(dir.path()).unwrap();
        second.log(&EpochMetrics::new(1, 0.3, 0.1, 8.0, 7.0)).unwrap();

        let text = fs::read_to_string(second.csv_path()).unwrap();
        assert_eq!(text, "epoch,train_loss,val_loss,train_mape,val_mape\n1,0.3,0.1,8.0,7.0\n");
    }
}
