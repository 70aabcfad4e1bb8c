// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the forecaster using Burn's CompactRecorder.
//
// Layout of the checkpoint directory:
//
//   checkpoints/
//     model_best.mpk.gz    ← weights of the lowest-val_loss epoch
//     best_epoch.json      ← which epoch those weights came from
//     model_config.json    ← ForecastTransformerConfig (architecture)
//     train_config.json    ← TrainConfig (data paths, geometry, seed)
//     scalers.json         ← fitted scalers and the row counts behind them
//     metrics.csv          ← written by MetricsLogger
//
// The model config alone is enough to rebuild the network before
// the weights are loaded into it; the train config lets `forecast`
// rebuild the exact held-out windows the model was evaluated on,
// and scalers.json proves the CSVs still yield the same split.

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::{context::ScalerSet, train_use_case::TrainConfig};
use crate::ml::model::{ForecastTransformer, ForecastTransformerConfig};

const BEST_MODEL: &str = "model_best";
const BEST_EPOCH: &str = "best_epoch.json";
const MODEL_CONFIG: &str = "model_config.json";
const TRAIN_CONFIG: &str = "train_config.json";
const SCALERS: &str = "scalers.json";

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Open (and create if needed) a checkpoint directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Overwrite the best-model weights and record which epoch produced them.
    pub fn save_best_model<B: Backend>(&self, model: &ForecastTransformer<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(BEST_MODEL);

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;

        self.write_json(BEST_EPOCH, &epoch)?;
        tracing::debug!("Saved best model: epoch {}", epoch);
        Ok(())
    }

    /// Load the best weights into `model`, which must have the saved architecture.
    pub fn load_best_model<B: Backend>(
        &self,
        model:  ForecastTransformer<B>,
        device: &B::Device,
    ) -> Result<ForecastTransformer<B>> {
        let epoch = self.best_epoch()?;
        let path  = self.dir.join(BEST_MODEL);

        tracing::info!("Loading best checkpoint (epoch {})", epoch);

        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;

        Ok(model.load_record(record))
    }

    pub fn best_epoch(&self) -> Result<usize> {
        self.read_json(BEST_EPOCH)
            .context("No best epoch recorded. Have you run 'train' first?")
    }

    pub fn save_model_config(&self, cfg: &ForecastTransformerConfig) -> Result<()> {
        self.write_json(MODEL_CONFIG, cfg)
    }

    pub fn load_model_config(&self) -> Result<ForecastTransformerConfig> {
        self.read_json(MODEL_CONFIG)
    }

    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_CONFIG, cfg)
    }

    pub fn load_train_config(&self) -> Result<TrainConfig> {
        self.read_json(TRAIN_CONFIG)
    }

    pub fn save_scalers(&self, scalers: &ScalerSet) -> Result<()> {
        self.write_json(SCALERS, scalers)
    }

    pub fn load_scalers(&self) -> Result<ScalerSet> {
        self.read_json(SCALERS)
            .context("No fitted scalers recorded. Re-run 'train' with this version")
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote '{}'", path.display());
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed JSON in '{}'", path.display()))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn tiny_config() -> ForecastTransformerConfig {
        ForecastTransformerConfig::new()
            .with_encoder_number(1)
            .with_decoder_number(1)
            .with_fusion_number(1)
            .with_amount_of_heads(2)
            .with_size_of_head(4)
            .with_masked_heads(1)
            .with_masked_head_size(4)
            .with_encoder_steps(5)
    }

    #[test]
    fn test_model_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let device = Default::default();
        let cfg = tiny_config();

        let saved = cfg.init::<TB>(&device).unwrap();
        ckpt.save_model_config(&cfg).unwrap();
        ckpt.save_best_model(&saved, 3).unwrap();

        let rebuilt_cfg = ckpt.load_model_config().unwrap();
        assert_eq!(rebuilt_cfg.encoder_steps, 5);
        assert_eq!(rebuilt_cfg.decoder_ff_widths, vec![36, 18, 6]);

        let fresh  = rebuilt_cfg.init::<TB>(&device).unwrap();
        let loaded = ckpt.load_best_model(fresh, &device).unwrap();
        assert_eq!(ckpt.best_epoch().unwrap(), 3);

        let eth = Tensor::<TB, 3>::ones([1, 5, 6], &device);
        let dec = Tensor::<TB, 3>::ones([1, 7, 2], &device);
        let a: Vec<f32> = saved.forward(eth.clone(), eth.clone(), dec.clone()).unwrap().into_data().to_vec().unwrap();
        let b: Vec<f32> = loaded.forward(eth.clone(), eth, dec).unwrap().into_data().to_vec().unwrap();
        for (x, y) in a.iter().zip(&b) {
            assert!((x - y).abs() < 1e-6);
        }
    }

    #[test]
    fn test_train_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        let cfg = TrainConfig { epochs: 3, seed: 99, ..TrainConfig::default() };
        ckpt.save_train_config(&cfg).unwrap();

        let back = ckpt.load_train_config().unwrap();
        assert_eq!(back.epochs, 3);
        assert_eq!(back.seed, 99);
        assert_eq!(back.eth_daily, cfg.eth_daily);
    }

    #[test]
    fn test_scalers_round_trip() {
        use crate::data::scaler::ScaledSplit;
        use crate::domain::series::{Asset, Bar, Frequency, TimeSeries};

        let bars = (0..40).map(|i| {
            let c = 1234.567 + (i as f64 * 0.3).sin() * 87.1;
            Bar::new(c * 0.99, c * 1.01, c * 0.98, c, 3.3e7 + i as f64)
        }).collect();
        let record = ScaledSplit::fit_on_train(&TimeSeries::new(Asset::Eth, Frequency::Daily, bars), 0.13)
            .unwrap()
            .record();
        let set = ScalerSet {
            eth_daily:  record.clone(),
            eth_weekly: record.clone(),
            btc_daily:  record.clone(),
            btc_weekly: record,
        };

        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        ckpt.save_scalers(&set).unwrap();
        let back = ckpt.load_scalers().unwrap();
        assert_eq!(back.eth_daily.rows, 40);
        assert!(back.eth_daily.matches(&set.eth_daily));
        assert!(back.btc_weekly.matches(&set.btc_weekly));
    }

    #[test]
    fn test_missing_checkpoint_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path()).unwrap();
        assert!(ckpt.best_epoch().is_err());
        assert!(ckpt.load_model_config().is_err());
        assert!(ckpt.load_scalers().is_err());
    }
}
