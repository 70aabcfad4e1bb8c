// ============================================================
// Layer 2 — TrainingContext
// ============================================================
// Everything a run derives from the four CSV files, built once
// and passed by reference:
//
//   Step 1: Load ETH/BTC daily/weekly series     (Layer 4 - data)
//   Step 2: Chronological split + scaler fit     (Layer 4 - data)
//   Step 3: Train windows and held-out windows   (Layer 4 - data)
//   Step 4: Seeded train / validation split      (Layer 4 - data)
//
// Both `train` and `forecast` call `prepare` with the same
// TrainConfig. `train` also writes the fitted scalers to
// scalers.json; `forecast` refuses to run if the CSVs no longer
// reproduce them.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    loader::CsvSeriesLoader,
    scaler::{ScaledSplit, ScalerRecord},
    splitter::split_train_val,
    window::{assemble_samples, AssetRows, Partition, WindowGeometry},
};
use crate::domain::sample::WindowSample;
use crate::domain::series::{Asset, FeatureRow, Frequency, TimeSeries};
use crate::domain::traits::SeriesSource;

/// The four raw inputs of a run.
pub struct MarketSeries {
    pub eth_daily:  TimeSeries,
    pub eth_weekly: TimeSeries,
    pub btc_daily:  TimeSeries,
    pub btc_weekly: TimeSeries,
}

impl MarketSeries {
    pub fn load(cfg: &TrainConfig) -> Result<Self> {
        let load = |path: &str, asset, frequency| {
            CsvSeriesLoader::new(path, asset, frequency).load_series()
        };
        Ok(Self {
            eth_daily:  load(&cfg.eth_daily,  Asset::Eth, Frequency::Daily)?,
            eth_weekly: load(&cfg.eth_weekly, Asset::Eth, Frequency::Weekly)?,
            btc_daily:  load(&cfg.btc_daily,  Asset::Btc, Frequency::Daily)?,
            btc_weekly: load(&cfg.btc_weekly, Asset::Btc, Frequency::Weekly)?,
        })
    }
}

fn rows_of(split: &ScaledSplit, partition: Partition) -> &[FeatureRow] {
    match partition {
        Partition::Train   => split.train.rows(),
        Partition::HeldOut => split.held_out.rows(),
    }
}

/// The four fitted scalers of a run, as persisted in scalers.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerSet {
    pub eth_daily:  ScalerRecord,
    pub eth_weekly: ScalerRecord,
    pub btc_daily:  ScalerRecord,
    pub btc_weekly: ScalerRecord,
}

impl ScalerSet {
    fn named(&self) -> [(&'static str, &ScalerRecord); 4] {
        [
            ("ETH daily",  &self.eth_daily),
            ("ETH weekly", &self.eth_weekly),
            ("BTC daily",  &self.btc_daily),
            ("BTC weekly", &self.btc_weekly),
        ]
    }
}

/// Scaled series plus every sample set of a run.
pub struct TrainingContext {
    pub geometry:   WindowGeometry,
    pub eth_daily:  ScaledSplit,
    pub eth_weekly: ScaledSplit,
    pub btc_daily:  ScaledSplit,
    pub btc_weekly: ScaledSplit,
    pub train:      Vec<WindowSample>,
    pub validation: Vec<WindowSample>,
    pub held_out:   Vec<WindowSample>,
}

impl TrainingContext {
    /// Load the CSVs named in `cfg` and build all sample sets.
    pub fn prepare(cfg: &TrainConfig) -> Result<Self> {
        tracing::info!("Loading market series");
        let series = MarketSeries::load(cfg)?;
        Self::from_series(&series, cfg.geometry(), cfg.test_fraction, cfg.validation_fraction, cfg.seed)
    }

    pub fn from_series(
        series:              &MarketSeries,
        geometry:            WindowGeometry,
        test_fraction:       f64,
        validation_fraction: f64,
        seed:                u64,
    ) -> Result<Self> {
        let fit = |s: &TimeSeries| {
            ScaledSplit::fit_on_train(s, test_fraction)
                .with_context(|| format!("Cannot partition {}", s.label()))
        };
        let eth_daily  = fit(&series.eth_daily)?;
        let eth_weekly = fit(&series.eth_weekly)?;
        let btc_daily  = fit(&series.btc_daily)?;
        let btc_weekly = fit(&series.btc_weekly)?;

        let windows = |partition: Partition| {
            assemble_samples(
                AssetRows { daily: rows_of(&eth_daily, partition), weekly: rows_of(&eth_weekly, partition) },
                AssetRows { daily: rows_of(&btc_daily, partition), weekly: rows_of(&btc_weekly, partition) },
                &geometry,
                partition,
            )
        };
        let train_samples = windows(Partition::Train);
        let held_out      = windows(Partition::HeldOut);

        if train_samples.is_empty() {
            bail!(
                "Not enough history for a single training window \
                 (sequence_length={}, week_length={}, {} training days)",
                geometry.sequence_length,
                geometry.week_length,
                eth_daily.train.len(),
            );
        }

        let (train, validation) = split_train_val(train_samples, 1.0 - validation_fraction, seed);
        tracing::info!(
            "Built {} training, {} validation and {} held-out windows",
            train.len(),
            validation.len(),
            held_out.len(),
        );
        if let Some(first) = train.first() {
            tracing::debug!(
                "Window shape: {} encoder steps, {} decoder steps",
                first.encoder_steps(),
                first.decoder_steps(),
            );
        }

        Ok(Self { geometry, eth_daily, eth_weekly, btc_daily, btc_weekly, train, validation, held_out })
    }

    pub fn scaler_set(&self) -> ScalerSet {
        ScalerSet {
            eth_daily:  self.eth_daily.record(),
            eth_weekly: self.eth_weekly.record(),
            btc_daily:  self.btc_daily.record(),
            btc_weekly: self.btc_weekly.record(),
        }
    }

    /// Fail unless this context reproduces the split and statistics
    /// that were saved at training time.
    pub fn check_scalers(&self, saved: &ScalerSet) -> Result<()> {
        let current = self.scaler_set();
        for ((name, was), (_, now)) in saved.named().into_iter().zip(current.named()) {
            if !was.matches(now) {
                bail!(
                    "{name} data changed since training: {} rows ({} train) at training time, \
                     {} rows ({} train) now",
                    was.rows,
                    was.train_rows,
                    now.rows,
                    now.train_rows,
                );
            }
        }
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::series::Bar;

    fn series(asset: Asset, frequency: Frequency, n: usize, base: f64) -> TimeSeries {
        let bars = (0..n)
            .map(|i| {
                let c = base + (i as f64 * 0.21).sin() * base * 0.1 + i as f64;
                Bar::new(c * 0.99, c * 1.02, c * 0.97, c, 1.0e6 + 10.0 * i as f64)
            })
            .collect();
        TimeSeries::new(asset, frequency, bars)
    }

    fn market(daily: usize, weekly: usize) -> MarketSeries {
        MarketSeries {
            eth_daily:  series(Asset::Eth, Frequency::Daily, daily, 2000.0),
            eth_weekly: series(Asset::Eth, Frequency::Weekly, weekly, 2000.0),
            btc_daily:  series(Asset::Btc, Frequency::Daily, daily, 30000.0),
            btc_weekly: series(Asset::Btc, Frequency::Weekly, weekly, 30000.0),
        }
    }

    #[test]
    fn test_sample_counts() {
        let ctx = TrainingContext::from_series(&market(600, 90), WindowGeometry::new(10, 4), 0.13, 0.1, 7).unwrap();

        // 522 training days: 522 - 6*4 - 10 - 14 windows
        assert_eq!(ctx.train.len() + ctx.validation.len(), 474);
        assert_eq!(ctx.validation.len(), 48);
        // 78 held-out days: 78 - 6*4 - 10 - 12 windows
        assert_eq!(ctx.held_out.len(), 32);

        assert!(ctx.train.iter().all(|s| s.decoder_input.len() == 7 && s.encoder_steps() == 14));
        assert!(ctx.held_out.iter().all(|s| s.decoder_input.len() == 1));
    }

    #[test]
    fn test_eth_daily_scaler_is_the_train_fit() {
        let m = market(600, 90);
        let ctx = TrainingContext::from_series(&m, WindowGeometry::new(10, 4), 0.13, 0.1, 7).unwrap();
        let expected = ScaledSplit::fit_on_train(&m.eth_daily, 0.13).unwrap().scaler;
        assert_eq!(ctx.scaler_set().eth_daily.scaler, expected);
    }

    #[test]
    fn test_same_seed_same_validation_set() {
        let m = market(400, 60);
        let a = TrainingContext::from_series(&m, WindowGeometry::new(10, 4), 0.13, 0.1, 3).unwrap();
        let b = TrainingContext::from_series(&m, WindowGeometry::new(10, 4), 0.13, 0.1, 3).unwrap();
        assert_eq!(a.validation, b.validation);
    }

    #[test]
    fn test_grown_series_fails_the_scaler_check() {
        let geometry = WindowGeometry::new(10, 4);
        let trained = TrainingContext::from_series(&market(600, 90), geometry, 0.13, 0.1, 7).unwrap();
        let saved = trained.scaler_set();
        assert_eq!(saved.eth_daily.train_rows, 522);

        let same = TrainingContext::from_series(&market(600, 90), geometry, 0.13, 0.1, 7).unwrap();
        assert!(same.check_scalers(&saved).is_ok());

        // 50 more days move the split point from 522 to 565
        let grown = TrainingContext::from_series(&market(650, 90), geometry, 0.13, 0.1, 7).unwrap();
        assert_eq!(grown.scaler_set().eth_daily.train_rows, 565);
        let err = grown.check_scalers(&saved).unwrap_err();
        assert!(err.to_string().contains("ETH daily"));
    }

    #[test]
    fn test_too_little_history_is_an_error() {
        assert!(TrainingContext::from_series(&market(40, 6), WindowGeometry::default(), 0.13, 0.1, 1).is_err());
    }
}
