/// Inverse-time decay: `lr(step) = initial / (1 + decay * step)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseTimeDecay {
    initial: f64,
    decay:   f64,
}

impl InverseTimeDecay {
    pub const DEFAULT_DECAY: f64 = 0.05;

    pub fn new(initial: f64) -> Self {
        Self { initial, decay: Self::DEFAULT_DECAY }
    }

    /// Learning rate for optimiser step `step` (0-based).
    pub fn lr(&self, step: usize) -> f64 {
        self.initial / (1.0 + self.decay * step as f64)
    }
}
