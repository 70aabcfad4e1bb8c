// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// a specific goal (training or forecasting).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Only workflow coordination

// Series loading, scaling and windowing shared by both workflows
pub mod context;

// The training workflow
pub mod train_use_case;

// The held-out evaluation workflow
pub mod forecast_use_case;
