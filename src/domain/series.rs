// ============================================================
// Layer 3 — Price Series Domain Types
// ============================================================
// An OHLCV bar and an ordered series of them. Row order is
// chronological ascending; there is no date column because the
// loader guarantees calendar alignment through row order.

use serde::{Deserialize, Serialize};

/// Number of raw feature columns per bar: open, high, low, close, volume.
pub const BAR_FEATURES: usize = 5;

/// Column index of the close price inside a feature row.
pub const CLOSE_COLUMN: usize = 3;

/// One feature row in model order `[open, high, low, close, volume]`.
pub type FeatureRow = [f32; BAR_FEATURES];

/// Which of the two assets a series belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Asset {
    Eth,
    Btc,
}

/// Sampling periodicity of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
}

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open:   f64,
    pub high:   f64,
    pub low:    f64,
    pub close:  f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self { open, high, low, close, volume }
    }

    /// Columns in model order.
    pub fn columns(&self) -> [f64; BAR_FEATURES] {
        [self.open, self.high, self.low, self.close, self.volume]
    }
}

/// An immutable, chronologically ordered series of bars for one
/// (asset, frequency) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub asset:     Asset,
    pub frequency: Frequency,
    bars:          Vec<Bar>,
}

impl TimeSeries {
    pub fn new(asset: Asset, frequency: Frequency, bars: Vec<Bar>) -> Self {
        Self { asset, frequency, bars }
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Human-readable name used in logs and error messages, e.g. "ETH daily".
    pub fn label(&self) -> String {
        let asset = match self.asset {
            Asset::Eth => "ETH",
            Asset::Btc => "BTC",
        };
        let freq = match self.frequency {
            Frequency::Daily  => "daily",
            Frequency::Weekly => "weekly",
        };
        format!("{asset} {freq}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_follow_model_order() {
        let bar = Bar::new(1.0, 2.0, 0.5, 1.5, 100.0);
        let cols = bar.columns();
        assert_eq!(cols[CLOSE_COLUMN], 1.5);
        assert_eq!(cols, [1.0, 2.0, 0.5, 1.5, 100.0]);
    }

    #[test]
    fn test_label() {
        let s = TimeSeries::new(Asset::Btc, Frequency::Weekly, Vec::new());
        assert_eq!(s.label(), "BTC weekly");
        assert!(s.is_empty());
    }
}
