// ============================================================
// Layer 4 — Data Layer
// ============================================================
// Everything between raw CSV files and Burn tensors:
//
//   loader.rs   — OHLCV CSV → TimeSeries
//   splitter.rs — chronological train/held-out split of a series,
//                 seeded shuffle split of training windows
//   scaler.rs   — per-column standardisation fit on training rows
//   window.rs   — daily/weekly alignment into WindowSamples
//   dataset.rs  — Burn Dataset over WindowSamples
//   batcher.rs  — Burn Batcher stacking samples into tensors

pub mod loader;
pub mod splitter;
pub mod scaler;
pub mod window;
pub mod dataset;
pub mod batcher;
