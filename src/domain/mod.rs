// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust structs and traits describing what the system
// works with: price series, window samples, and the seams the
// application layer depends on.
//
// Rules for this layer:
//   - NO Burn framework types
//   - NO file I/O
//   - Only plain data and traits

/// OHLCV bars and series
pub mod series;

/// Encoder / decoder / target windows sharing one anchor day
pub mod sample;

/// Core abstractions (traits) that other layers implement
pub mod traits;
