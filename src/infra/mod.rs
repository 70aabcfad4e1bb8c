// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting concerns used by the ml and application layers:
//
//   checkpoint.rs — best-model weights (CompactRecorder) plus
//                   model_config.json / train_config.json so a
//                   forecast run can rebuild network and data
//
//   metrics.rs    — MAPE and the per-epoch metrics.csv logger

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;
