// ============================================================
// Layer 4 — Standard Scaler
// ============================================================
// Per-column standardisation: z = (x - mean) / scale.
//
// The only way to obtain a fitted scaler is ScaledSplit::fit_on_train,
// which partitions a series chronologically and fits on the training
// rows alone. The held-out rows are transformed with those statistics
// and nothing derived from them ever reaches the scaler.
//
// Conventions match the usual standard scaler:
//   mean  = arithmetic mean of the training rows
//   scale = population standard deviation (ddof = 0)
//   a zero-variance column gets scale 1, so constants map to 0

use serde::{Deserialize, Serialize};

use crate::data::splitter::split_chronological;
use crate::domain::series::{Asset, Bar, FeatureRow, Frequency, TimeSeries, BAR_FEATURES};
use crate::error::DataError;

/// Fitted `(mean, scale)` per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean:  [f64; BAR_FEATURES],
    scale: [f64; BAR_FEATURES],
}

impl StandardScaler {
    fn fit(rows: &[Bar]) -> Self {
        let n = rows.len().max(1) as f64;

        let mut mean = [0.0; BAR_FEATURES];
        for bar in rows {
            for (m, v) in mean.iter_mut().zip(bar.columns()) {
                *m += v;
            }
        }
        mean.iter_mut().for_each(|m| *m /= n);

        let mut var = [0.0; BAR_FEATURES];
        for bar in rows {
            for ((acc, v), m) in var.iter_mut().zip(bar.columns()).zip(mean) {
                *acc += (v - m) * (v - m);
            }
        }

        let mut scale = [1.0; BAR_FEATURES];
        for (s, v) in scale.iter_mut().zip(var) {
            let std = (v / n).sqrt();
            if std > 0.0 {
                *s = std;
            }
        }

        Self { mean, scale }
    }

    pub fn mean(&self) -> &[f64; BAR_FEATURES] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64; BAR_FEATURES] {
        &self.scale
    }

    pub fn transform(&self, bar: &Bar) -> FeatureRow {
        let mut row = [0.0f32; BAR_FEATURES];
        for (i, v) in bar.columns().into_iter().enumerate() {
            row[i] = ((v - self.mean[i]) / self.scale[i]) as f32;
        }
        row
    }

    /// Map one model-space value of column `column` back to price units.
    pub fn inverse_transform_column(&self, column: usize, value: f32) -> f64 {
        value as f64 * self.scale[column] + self.mean[column]
    }
}

/// A series after standardisation, in model order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledSeries {
    pub asset:     Asset,
    pub frequency: Frequency,
    rows:          Vec<FeatureRow>,
}

impl ScaledSeries {
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[cfg(test)]
    pub fn from_rows(asset: Asset, frequency: Frequency, rows: Vec<FeatureRow>) -> Self {
        Self { asset, frequency, rows }
    }
}

/// Training and held-out partitions of one series, both scaled with
/// statistics fit on the training partition only.
#[derive(Debug, Clone)]
pub struct ScaledSplit {
    pub scaler:   StandardScaler,
    pub train:    ScaledSeries,
    pub held_out: ScaledSeries,
}

impl ScaledSplit {
    /// Split `series` at `floor((1 - test_fraction) * len)`, fit a scaler
    /// on the head, transform head and tail with it.
    pub fn fit_on_train(series: &TimeSeries, test_fraction: f64) -> Result<Self, DataError> {
        let (train_bars, held_out_bars) = split_chronological(series.bars(), test_fraction);
        if train_bars.is_empty() {
            return Err(DataError::TooFewRows {
                name:          series.label(),
                rows:          series.len(),
                test_fraction,
            });
        }

        let scaler = StandardScaler::fit(train_bars);
        let scale_all = |bars: &[Bar]| ScaledSeries {
            asset:     series.asset,
            frequency: series.frequency,
            rows:      bars.iter().map(|b| scaler.transform(b)).collect(),
        };
        let train    = scale_all(train_bars);
        let held_out = scale_all(held_out_bars);

        tracing::debug!(
            "Scaled {}: {} train rows, {} held-out rows, close mean={:.4} scale={:.4}",
            series.label(),
            train.len(),
            held_out.len(),
            scaler.mean[3],
            scaler.scale[3],
        );

        Ok(Self { scaler, train, held_out })
    }

    /// What `train` persists about this split: the fitted statistics and
    /// the row counts they were fit under.
    pub fn record(&self) -> ScalerRecord {
        ScalerRecord {
            rows:       self.train.len() + self.held_out.len(),
            train_rows: self.train.len(),
            scaler:     self.scaler.clone(),
        }
    }
}

/// Relative tolerance when comparing statistics read back from JSON.
const STAT_TOLERANCE: f64 = 1e-9;

/// A fitted scaler together with the shape of the series it was fit on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerRecord {
    pub rows:       usize,
    pub train_rows: usize,
    pub scaler:     StandardScaler,
}

impl ScalerRecord {
    /// True when `other` describes the same split with the same statistics.
    pub fn matches(&self, other: &ScalerRecord) -> bool {
        let close = |a: &[f64; BAR_FEATURES], b: &[f64; BAR_FEATURES]| {
            a.iter().zip(b).all(|(x, y)| (x - y).abs() <= STAT_TOLERANCE * x.abs().max(y.abs()).max(1.0))
        };
        self.rows == other.rows
            && self.train_rows == other.train_rows
            && close(&self.scaler.mean, &other.scaler.mean)
            && close(&self.scaler.scale, &other.scaler.scale)
    }
}
