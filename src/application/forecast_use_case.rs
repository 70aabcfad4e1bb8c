// ============================================================
// Layer 2 — ForecastUseCase
// ============================================================
// Evaluates a trained checkpoint on the held-out partition:
//
//   Step 1: Read train_config.json, scalers.json (Layer 6 - infra)
//   Step 2: Rebuild the TrainingContext, check   (Layer 2)
//           it reproduces the saved scalers
//   Step 3: Load the best model                  (Layer 5 - ml)
//   Step 4: 7-step forecast for every window     (Layer 5 - ml)
//   Step 5: MAPE (scaled + price) and CSV        (Layer 6 - infra)

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::application::context::TrainingContext;
use crate::data::scaler::StandardScaler;
use crate::domain::sample::{WindowSample, HORIZON};
use crate::domain::series::CLOSE_COLUMN;
use crate::domain::traits::Forecaster;
use crate::infra::{checkpoint::CheckpointManager, metrics::mape};
use crate::ml::inferencer::{Inferencer, DEFAULT_INFERENCE_BATCH};

/// One line of forecasts.csv, in price units.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastRow {
    pub sample:     usize,
    pub day:        usize,
    pub target:     f64,
    pub prediction: f64,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub rows:        Vec<ForecastRow>,
    /// MAPE against standardised targets, as the training metric reports it.
    pub mape_scaled: f64,
    /// MAPE after mapping both sides back to prices.
    pub mape_price:  f64,
}

#[derive(Debug, Clone)]
pub struct ForecastReport {
    pub best_epoch:  usize,
    pub samples:     usize,
    pub mape_scaled: f64,
    pub mape_price:  f64,
    pub output:      PathBuf,
}

/// Forecast every sample and score the result against its targets.
pub fn evaluate<F: Forecaster>(
    forecaster: &F,
    samples:    &[WindowSample],
    scaler:     &StandardScaler,
) -> Result<Evaluation> {
    let predictions = forecaster.forecast(samples)?;
    if predictions.len() != samples.len() {
        bail!("Forecaster returned {} rows for {} samples", predictions.len(), samples.len());
    }

    let mut scaled = Vec::with_capacity(samples.len() * HORIZON);
    let mut rows   = Vec::with_capacity(samples.len() * HORIZON);
    for (i, (sample, forecast)) in samples.iter().zip(&predictions).enumerate() {
        for (day, (&t, &p)) in sample.target.iter().zip(forecast).enumerate() {
            scaled.push((t as f64, p as f64));
            rows.push(ForecastRow {
                sample:     i,
                day:        day + 1,
                target:     scaler.inverse_transform_column(CLOSE_COLUMN, t),
                prediction: scaler.inverse_transform_column(CLOSE_COLUMN, p),
            });
        }
    }

    let mape_scaled = mape(scaled);
    let mape_price  = mape(rows.iter().map(|r| (r.target, r.prediction)));
    Ok(Evaluation { rows, mape_scaled, mape_price })
}

pub fn write_forecasts(path: &Path, rows: &[ForecastRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Cannot create '{}'", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub struct ForecastUseCase {
    checkpoint_dir: String,
    output:         Option<String>,
}

impl ForecastUseCase {
    /// `output` defaults to `<checkpoint_dir>/forecasts.csv`.
    pub fn new(checkpoint_dir: String, output: Option<String>) -> Self {
        Self { checkpoint_dir, output }
    }

    pub fn execute(&self) -> Result<ForecastReport> {
        let ckpt_manager = CheckpointManager::new(&self.checkpoint_dir)?;
        let train_cfg = ckpt_manager
            .load_train_config()
            .context("Make sure you have run 'train' before 'forecast'")?;

        let saved = ckpt_manager.load_scalers()?;

        let ctx = TrainingContext::prepare(&train_cfg)?;
        ctx.check_scalers(&saved)
            .context("Held-out windows would not match the ones seen at training time")?;
        if ctx.held_out.is_empty() {
            bail!("The held-out partition is too short for a single forecast window");
        }

        let scaler = &saved.eth_daily.scaler;
        tracing::debug!(
            "ETH close scaler: mean={:.4} scale={:.4}",
            scaler.mean()[CLOSE_COLUMN],
            scaler.scale()[CLOSE_COLUMN],
        );

        let inferencer = Inferencer::from_checkpoint(&ckpt_manager, DEFAULT_INFERENCE_BATCH)?;
        tracing::info!("Forecasting {} held-out windows", ctx.held_out.len());
        let evaluation = evaluate(&inferencer, &ctx.held_out, scaler)?;

        let output = self
            .output
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| ckpt_manager.dir().join("forecasts.csv"));
        write_forecasts(&output, &evaluation.rows)?;
        tracing::info!("Wrote {} forecast rows to '{}'", evaluation.rows.len(), output.display());

        Ok(ForecastReport {
            best_epoch:  ckpt_manager.best_epoch()?,
            samples:     ctx.held_out.len(),
            mape_scaled: evaluation.mape_scaled,
            mape_price:  evaluation.mape_price,
            output,
        })
    }
}
