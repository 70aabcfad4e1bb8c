// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the training pipeline in order:
//
//   Step 1: Build the TrainingContext            (Layer 2)
//   Step 2: Build Burn datasets                  (Layer 4 - data)
//   Step 3: Save train + model config, scalers   (Layer 6 - infra)
//   Step 4: Run training loop, keep best epoch   (Layer 5 - ml)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::application::context::TrainingContext;
use crate::data::{dataset::ForecastDataset, window::WindowGeometry};
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::model::ForecastTransformerConfig;
use crate::ml::trainer::{run_training, TrainerSettings};

// ─── Training Configuration ──────────────────────────────────────────────────
// Everything a run needs, including the data paths, so `forecast`
// can rebuild the same windows from train_config.json alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub eth_daily:           String,
    pub eth_weekly:          String,
    pub btc_daily:           String,
    pub btc_weekly:          String,
    pub checkpoint_dir:      String,
    pub epochs:              usize,
    pub batch_size:          usize,
    pub lr:                  f64,
    pub sequence_length:     usize,
    pub week_length:         usize,
    pub k:                   usize,
    pub encoder_number:      usize,
    pub decoder_number:      usize,
    pub amount_of_heads:     usize,
    pub size_of_head:        usize,
    pub dropout:             f64,
    pub test_fraction:       f64,
    pub validation_fraction: f64,
    pub seed:                u64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            eth_daily:           "data/eth_daily.csv".to_string(),
            eth_weekly:          "data/eth_weekly.csv".to_string(),
            btc_daily:           "data/btc_daily.csv".to_string(),
            btc_weekly:          "data/btc_weekly.csv".to_string(),
            checkpoint_dir:      "checkpoints".to_string(),
            epochs:              25,
            batch_size:          16,
            lr:                  0.005,
            sequence_length:     42,
            week_length:         8,
            k:                   4,
            encoder_number:      4,
            decoder_number:      4,
            amount_of_heads:     16,
            size_of_head:        64,
            dropout:             0.4,
            test_fraction:       0.13,
            validation_fraction: 0.1,
            seed:                42,
        }
    }
}

impl TrainConfig {
    pub fn geometry(&self) -> WindowGeometry {
        WindowGeometry::new(self.sequence_length, self.week_length)
    }

    /// Architecture implied by this run; encoder steps follow the geometry.
    pub fn model_config(&self) -> ForecastTransformerConfig {
        ForecastTransformerConfig::new()
            .with_k(self.k)
            .with_encoder_number(self.encoder_number)
            .with_decoder_number(self.decoder_number)
            .with_amount_of_heads(self.amount_of_heads)
            .with_size_of_head(self.size_of_head)
            .with_dropout(self.dropout)
            .with_encoder_steps(self.geometry().encoder_steps())
            .with_decoder_ff_widths(vec![36, 18, self.k + 2])
    }

    pub fn trainer_settings(&self) -> TrainerSettings {
        TrainerSettings {
            epochs:     self.epochs,
            batch_size: self.batch_size,
            lr:         self.lr,
            seed:       self.seed,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the pipeline end to end; returns the metrics of the saved epoch.
    pub fn execute(&self) -> Result<EpochMetrics> {
        let cfg = &self.config;

        // ── Step 1: Windows from the four CSV files ───────────────────────────
        let ctx = TrainingContext::prepare(cfg)?;
        let scalers = ctx.scaler_set();

        // ── Step 2: Burn datasets ─────────────────────────────────────────────
        let train_dataset = ForecastDataset::new(ctx.train);
        let val_dataset   = ForecastDataset::new(ctx.validation);

        // ── Step 3: Persist configs before any weights exist ──────────────────
        let model_cfg    = cfg.model_config();
        model_cfg.validate()?;
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.save_train_config(cfg)?;
        ckpt_manager.save_model_config(&model_cfg)?;
        ckpt_manager.save_scalers(&scalers)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 4: Training loop (Layer 5) ───────────────────────────────────
        tracing::info!(
            "Training on {} windows, validating on {}",
            train_dataset.sample_count(),
            val_dataset.sample_count(),
        );
        let best = run_training(
            &cfg.trainer_settings(),
            &model_cfg,
            train_dataset,
            val_dataset,
            &ckpt_manager,
            &metrics,
        )?;

        tracing::info!(
            "Best epoch {} (val_loss={:.5}), metrics in '{}'",
            best.epoch,
            best.val_loss,
            metrics.csv_path().display(),
        );
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_model_config_matches_geometry() {
        let cfg = TrainConfig::default();
        let model = cfg.model_config();
        assert_eq!(model.encoder_steps, 50);
        assert_eq!(model.decoder_steps, 7);
        assert_eq!(model.decoder_ff_widths, vec![36, 18, 6]);
        assert!(model.validate().is_ok());
    }

    #[test]
    fn test_decoder_widths_follow_k() {
        let cfg = TrainConfig { k: 6, ..TrainConfig::default() };
        assert_eq!(cfg.model_config().decoder_width(), 8);
        assert!(cfg.model_config().validate().is_ok());
    }
}
