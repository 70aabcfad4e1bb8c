// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Train + validation loop using Burn's DataLoader and Adam.
//
//   - Training runs on TrainBackend (Autodiff<NdArray>)
//   - model.valid() drops autodiff (and dropout) for validation,
//     so the validation batcher uses the inner NdArray backend
//   - The learning rate follows InverseTimeDecay over optimiser
//     steps, not epochs
//   - Only the lowest-val_loss epoch is written to disk
//
// Reference: Kingma & Ba (2015) Adam

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::{MseLoss, Reduction},
    optim::{decay::WeightDecayConfig, AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};

use crate::data::{batcher::ForecastBatcher, dataset::ForecastDataset};
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{mape, EpochMetrics, MetricsLogger};
use crate::ml::model::{ForecastTransformer, ForecastTransformerConfig};
use crate::ml::schedule::InverseTimeDecay;

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;

/// L2 penalty applied through Adam's weight decay.
const WEIGHT_DECAY: f32 = 1e-3;

/// Loop settings independent of the architecture.
#[derive(Debug, Clone)]
pub struct TrainerSettings {
    pub epochs:     usize,
    pub batch_size: usize,
    pub lr:         f64,
    pub seed:       u64,
}

/// Running sums for one pass over a loader.
#[derive(Default)]
struct PassTotals {
    loss_sum:   f64,
    batches:    usize,
    mape_sum:   f64,
    mape_count: usize,
}

impl PassTotals {
    fn add_batch<B: Backend>(&mut self, loss: f64, predictions: Tensor<B, 3>, targets: Tensor<B, 3>) -> Result<()> {
        let predictions = flat_values(predictions)?;
        let targets     = flat_values(targets)?;
        let pairs = targets.iter().zip(&predictions).map(|(&t, &p)| (t as f64, p as f64));

        self.loss_sum   += loss;
        self.batches    += 1;
        self.mape_sum   += mape(pairs) * targets.len() as f64;
        self.mape_count += targets.len();
        Ok(())
    }

    fn mean_loss(&self) -> f64 {
        if self.batches > 0 { self.loss_sum / self.batches as f64 } else { f64::NAN }
    }

    fn mean_mape(&self) -> f64 {
        if self.mape_count > 0 { self.mape_sum / self.mape_count as f64 } else { f64::NAN }
    }
}

/// Whether epoch `m` should replace the saved checkpoint. A NaN
/// val_loss never displaces a finite best; a NaN best (empty
/// validation set) is replaced by any later epoch.
fn improves(best: Option<&EpochMetrics>, m: &EpochMetrics) -> bool {
    match best {
        None    => true,
        Some(b) => b.val_loss.is_nan() || m.is_improvement(b.val_loss),
    }
}

fn flat_values<B: Backend>(t: Tensor<B, 3>) -> Result<Vec<f32>> {
    t.into_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read tensor back: {e:?}"))
}

pub fn run_training(
    settings:      &TrainerSettings,
    model_cfg:     &ForecastTransformerConfig,
    train_dataset: ForecastDataset,
    val_dataset:   ForecastDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
) -> Result<EpochMetrics> {
    let device = burn::backend::ndarray::NdArrayDevice::default();
    tracing::info!("Using NdArray device: {:?}", device);
    train_loop::<TrainBackend>(settings, model_cfg, train_dataset, val_dataset, ckpt_manager, metrics, device)
}

fn train_loop<B: AutodiffBackend>(
    settings:      &TrainerSettings,
    model_cfg:     &ForecastTransformerConfig,
    train_dataset: ForecastDataset,
    val_dataset:   ForecastDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<EpochMetrics> {

    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: ForecastTransformer<B> = model_cfg.init(&device)?;
    tracing::info!(
        "Model ready: {}+{} encoders, {} fusion, {} decoders, {} parameters",
        model_cfg.encoder_number, model_cfg.encoder_number,
        model_cfg.fusion_number, model_cfg.decoder_number,
        model.num_params(),
    );

    // ── Adam optimiser ────────────────────────────────────────────────────────
    let mut optim = AdamConfig::new()
        .with_beta_2(0.98)
        .with_epsilon(1e-9)
        .with_weight_decay(Some(WeightDecayConfig::new(WEIGHT_DECAY)))
        .init();
    let schedule = InverseTimeDecay::new(settings.lr);

    // ── Data loaders ──────────────────────────────────────────────────────────
    let train_loader = DataLoaderBuilder::new(ForecastBatcher::<B>::new(device.clone()))
        .batch_size(settings.batch_size)
        .shuffle(settings.seed)
        .num_workers(1)
        .build(train_dataset);

    let val_loader = DataLoaderBuilder::new(ForecastBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(settings.batch_size)
        .num_workers(1)
        .build(val_dataset);

    let mse = MseLoss::new();
    let mut step = 0usize;
    let mut best: Option<EpochMetrics> = None;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=settings.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train = PassTotals::default();
        for batch in train_loader.iter() {
            let predictions = model.forward(batch.eth, batch.btc, batch.decoder)?;
            let loss = mse.forward(predictions.clone(), batch.target.clone(), Reduction::Mean);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            train.add_batch(loss_val, predictions.detach(), batch.target)?;

            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(schedule.lr(step), model, grads);
            step += 1;
        }

        // ── Validation phase ──────────────────────────────────────────────────
        let model_valid = model.valid();
        let mut val = PassTotals::default();
        for batch in val_loader.iter() {
            let predictions = model_valid.forward(batch.eth, batch.btc, batch.decoder)?;
            let loss = mse.forward(predictions.clone(), batch.target.clone(), Reduction::Mean);
            val.add_batch(loss.into_scalar().elem::<f64>(), predictions, batch.target)?;
        }

        let m = EpochMetrics::new(epoch, train.mean_loss(), val.mean_loss(), train.mean_mape(), val.mean_mape());
        tracing::info!(
            "Epoch {:>3}/{} | train_loss={:.5} | val_loss={:.5} | train_mape={:.2}% | val_mape={:.2}% | lr={:.2e}",
            epoch, settings.epochs, m.train_loss, m.val_loss, m.train_mape, m.val_mape, schedule.lr(step),
        );
        metrics.log(&m)?;

        if improves(best.as_ref(), &m) {
            ckpt_manager.save_best_model(&model, epoch)?;
            tracing::info!("Lowest val_loss so far, checkpoint saved for epoch {}", epoch);
            best = Some(m);
        }
    }

    tracing::info!("Training complete!");
    best.ok_or_else(|| anyhow!("No epochs were run (epochs = {})", settings.epochs))
}
