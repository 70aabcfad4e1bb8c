// ============================================================
// Layer 4 — Splitters
// ============================================================
// Two different splits happen in this pipeline:
//
//   split_chronological  raw series → (train, held-out)
//                        No shuffling. The held-out partition is
//                        the tail of the series so evaluation only
//                        ever sees the future relative to training.
//
//   split_train_val      training windows → (train, validation)
//                        Shuffled first, so a validation batch is a
//                        spread of market regimes rather than the
//                        last few weeks of the training period.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom with a
// seeded StdRng so a run is reproducible from its config.

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Split at `floor((1 - test_fraction) * len)`; head is training data.
pub fn split_chronological<T>(items: &[T], test_fraction: f64) -> (&[T], &[T]) {
    let split_at = ((1.0 - test_fraction) * items.len() as f64).floor().max(0.0) as usize;
    items.split_at(split_at.min(items.len()))
}

/// Shuffle `samples` with `seed` and split into (train, validation).
///
/// # Arguments
/// * `samples`        - All training windows (consumed by this function)
/// * `train_fraction` - Proportion kept for training, e.g. 0.9 = 90%;
///                      the training count is `floor(len * train_fraction)`
/// * `seed`           - RNG seed for the shuffle
pub fn split_train_val<T>(mut samples: Vec<T>, train_fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total    = samples.len();
    let split_at = ((total as f64) * train_fraction).floor() as usize;
    let split_at = split_at.min(total);

    // split_off(n) leaves [0..n) in samples and returns [n..)
    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total.max(1),
        (val.len()     * 100) / total.max(1),
    );

    (samples, val)
}
