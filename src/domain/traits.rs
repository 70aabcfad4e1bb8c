// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer programs against these two seams:
//
//   SeriesSource  → where raw OHLCV bars come from
//                   (CsvSeriesLoader today)
//   Forecaster    → anything that turns held-out windows into
//                   7-day forecasts (the autoregressive
//                   Inferencer today)

use anyhow::Result;

use crate::domain::sample::{WindowSample, HORIZON};
use crate::domain::series::TimeSeries;

// ─── SeriesSource ─────────────────────────────────────────────────────────────
/// Any component that can produce one chronologically ordered series.
pub trait SeriesSource {
    fn load_series(&self) -> Result<TimeSeries>;
}

// ─── Forecaster ───────────────────────────────────────────────────────────────
/// Any component that forecasts the next `HORIZON` closes for each sample.
///
/// Implementations must only read `encoder_input_*` and the seed row of
/// `decoder_input`; `target` is never an input.
pub trait Forecaster {
    fn forecast(&self, samples: &[WindowSample]) -> Result<Vec<[f32; HORIZON]>>;
}
