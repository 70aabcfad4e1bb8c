// ============================================================
// Layer 4 — Forecast Batcher
// ============================================================
// Implements Burn's Batcher trait to stack WindowSamples into
// the four tensors the transformer consumes:
//
//   eth      [batch, W + L, 6]   time + OHLCV
//   btc      [batch, W + L, 6]
//   decoder  [batch, 7, 2]       time + close (teacher forcing)
//   target   [batch, 7, 1]       next 7 closes
//
// Rows are flattened sample-major, step-major, channel-minor and
// reshaped through TensorData, so one allocation per tensor.
//
// The inferencer reuses encoder_tensors / seed_tensor so the
// held-out path builds its inputs exactly like training does.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::{WindowSample, DECODER_CHANNELS, ENCODER_CHANNELS, HORIZON};
use crate::error::ModelError;

/// A batch ready for `ForecastTransformer::forward`.
#[derive(Debug, Clone)]
pub struct ForecastBatch<B: Backend> {
    pub eth:     Tensor<B, 3>,
    pub btc:     Tensor<B, 3>,
    pub decoder: Tensor<B, 3>,
    pub target:  Tensor<B, 3>,
}

#[derive(Clone, Debug)]
pub struct ForecastBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> ForecastBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Stack `[steps][C]` row blocks into a `[batch, steps, C]` tensor.
    fn stack<const C: usize>(&self, blocks: Vec<&[[f32; C]]>) -> Tensor<B, 3> {
        let batch = blocks.len();
        let steps = blocks.first().map(|b| b.len()).unwrap_or(0);
        let flat: Vec<f32> = blocks
            .iter()
            .flat_map(|block| block.iter().flat_map(|row| row.iter().copied()))
            .collect();
        Tensor::from_data(TensorData::new(flat, [batch, steps, C]), &self.device)
    }

    /// ETH and BTC encoder inputs, `[batch, W + L, 6]` each.
    pub fn encoder_tensors(&self, samples: &[WindowSample]) -> (Tensor<B, 3>, Tensor<B, 3>) {
        let eth = self.stack::<ENCODER_CHANNELS>(samples.iter().map(|s| s.encoder_input_eth.as_slice()).collect());
        let btc = self.stack::<ENCODER_CHANNELS>(samples.iter().map(|s| s.encoder_input_btc.as_slice()).collect());
        (eth, btc)
    }

    /// Last known close of every sample as a `[batch, 1, 1]` buffer.
    /// A sample without decoder rows has no seed and is rejected.
    pub fn seed_tensor(&self, samples: &[WindowSample]) -> Result<Tensor<B, 3>, ModelError> {
        let seeds = samples
            .iter()
            .map(|s| {
                s.last_known_close().ok_or_else(|| {
                    ModelError::shape("batcher.seed", "[1.., 2] decoder rows", &[s.decoder_steps(), DECODER_CHANNELS])
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;
        let batch = seeds.len();
        Ok(Tensor::from_data(TensorData::new(seeds, [batch, 1, 1]), &self.device))
    }

    fn target_tensor(&self, samples: &[WindowSample]) -> Tensor<B, 3> {
        let flat: Vec<f32> = samples.iter().flat_map(|s| s.target).collect();
        Tensor::from_data(TensorData::new(flat, [samples.len(), HORIZON, 1]), &self.device)
    }
}

impl<B: Backend> Batcher<WindowSample, ForecastBatch<B>> for ForecastBatcher<B> {
    fn batch(&self, items: Vec<WindowSample>) -> ForecastBatch<B> {
        let (eth, btc) = self.encoder_tensors(&items);
        let decoder    = self.stack::<DECODER_CHANNELS>(items.iter().map(|s| s.decoder_input.as_slice()).collect());
        let target     = self.target_tensor(&items);

        ForecastBatch { eth, btc, decoder, target }
    }
}
