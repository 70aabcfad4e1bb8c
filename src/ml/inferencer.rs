// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Seven-step autoregressive forecast.
//
//   buffer₀ = seed close                        [b, 1, 1]
//   step i: decoder = [linspace(0,1,7)[..len], buffer]
//           pred_i  = forward(eth, btc, decoder)[:, -1]
//           buffer  = buffer ++ pred_i
//
// Only model outputs are ever appended to the buffer, so the
// held-out targets are never seen. Samples are forecast in chunks
// of `batch_size`, each chunk advancing in lockstep.

use anyhow::{anyhow, Context, Result};
use burn::prelude::*;

use crate::data::batcher::ForecastBatcher;
use crate::data::window::decoder_time_column;
use crate::domain::sample::{WindowSample, HORIZON};
use crate::domain::traits::Forecaster;
use crate::error::ModelError;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::ForecastTransformer;

pub type InferBackend = burn::backend::NdArray;

pub const DEFAULT_INFERENCE_BATCH: usize = 32;

/// Run the forecast loop for one batch.
///
/// Returns the `[b, 7]` predictions and the final decoder buffer
/// `[b, initial + 7, 1]`.
pub fn autoregressive_forecast<B: Backend>(
    model: &ForecastTransformer<B>,
    eth:   Tensor<B, 3>,
    btc:   Tensor<B, 3>,
    seed:  Tensor<B, 3>,
) -> Result<(Tensor<B, 2>, Tensor<B, 3>), ModelError> {
    let [batch, initial, width] = seed.dims();
    if width != 1 || initial != 1 {
        return Err(ModelError::shape("inference.seed", format!("[{batch}, 1, 1]"), &seed.dims()));
    }

    let device = seed.device();
    let time   = decoder_time_column();
    let mut buffer = seed;
    let mut predictions = Vec::with_capacity(HORIZON);

    for step in 0..HORIZON {
        let len = buffer.dims()[1];
        let time_column = Tensor::<B, 1>::from_data(TensorData::new(time[..len].to_vec(), [len]), &device)
            .reshape([1, len, 1])
            .expand([batch, len, 1]);
        let decoder = Tensor::cat(vec![time_column, buffer.clone()], 2);

        let output = model.forward(eth.clone(), btc.clone(), decoder)?;
        let next   = output.slice([0..batch, len - 1..len, 0..1]);
        tracing::trace!("forecast step {} of {} (decoder length {})", step + 1, HORIZON, len);

        predictions.push(next.clone());
        buffer = Tensor::cat(vec![buffer, next], 1);
    }

    let predictions = Tensor::cat(predictions, 1).reshape([batch, HORIZON]);
    Ok((predictions, buffer))
}

pub struct Inferencer {
    model:      ForecastTransformer<InferBackend>,
    batcher:    ForecastBatcher<InferBackend>,
    batch_size: usize,
}

impl Inferencer {
    pub fn new(model: ForecastTransformer<InferBackend>, batch_size: usize) -> Self {
        let device = burn::backend::ndarray::NdArrayDevice::default();
        Self {
            model,
            batcher: ForecastBatcher::new(device),
            batch_size: batch_size.max(1),
        }
    }

    /// Rebuild the architecture from `model_config.json` and load the best weights.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, batch_size: usize) -> Result<Self> {
        let device = burn::backend::ndarray::NdArrayDevice::default();
        let cfg    = ckpt_manager.load_model_config()?;
        let model: ForecastTransformer<InferBackend> = cfg
            .init(&device)
            .context("Saved model config does not describe a valid network")?;
        let model = ckpt_manager.load_best_model(model, &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, batch_size))
    }

    fn forecast_chunk(&self, samples: &[WindowSample]) -> Result<Vec<[f32; HORIZON]>> {
        let (eth, btc) = self.batcher.encoder_tensors(samples);
        let seed       = self.batcher.seed_tensor(samples)?;

        let (predictions, _) = autoregressive_forecast(&self.model, eth, btc, seed)?;
        let flat: Vec<f32> = predictions
            .into_data()
            .to_vec()
            .map_err(|e| ModelError::Readback(format!("{e:?}")))?;

        flat.chunks_exact(HORIZON)
            .map(|row| row.try_into().map_err(|_| anyhow!("Prediction row has wrong length")))
            .collect()
    }
}

impl Forecaster for Inferencer {
    fn forecast(&self, samples: &[WindowSample]) -> Result<Vec<[f32; HORIZON]>> {
        let mut out = Vec::with_capacity(samples.len());
        for (i, chunk) in samples.chunks(self.batch_size).enumerate() {
            out.extend(self.forecast_chunk(chunk)?);
            tracing::debug!("Forecast chunk {} ({} samples)", i + 1, chunk.len());
        }
        Ok(out)
    }
}
