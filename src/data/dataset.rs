use burn::data::dataset::Dataset;

use crate::domain::sample::WindowSample;

/// In-memory collection of window samples for Burn's DataLoader.
pub struct ForecastDataset {
    samples: Vec<WindowSample>,
}

impl ForecastDataset {
    pub fn new(samples: Vec<WindowSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }
}

impl Dataset<WindowSample> for ForecastDataset {
    fn get(&self, index: usize) -> Option<WindowSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}
