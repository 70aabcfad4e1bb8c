// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network code lives here:
//
//   time2vec.rs   — learned trend + sine time encoding
//   attention.rs  — multi-head attention with free head width,
//                   optional causal bias
//   encoder.rs    — self-attention + LeakyReLU feed-forward block
//   decoder.rs    — causal self-attention + cross-attention block
//   model.rs      — ETH/BTC encoders, fusion stack, decoder stack,
//                   linear projection
//   schedule.rs   — inverse-time learning-rate decay
//   trainer.rs    — epoch loop, validation, best checkpoint
//   inferencer.rs — 7-step autoregressive forecast
//
// Reference: Vaswani et al. (2017) Attention Is All You Need
//            Kazemi et al. (2019) Time2Vec

pub mod time2vec;
pub mod attention;
pub mod encoder;
pub mod decoder;
pub mod model;
pub mod schedule;
pub mod trainer;
pub mod inferencer;
