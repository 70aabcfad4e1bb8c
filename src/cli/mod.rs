// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2.
//
//   1. `train`    — fits the forecaster, keeps the best epoch
//   2. `forecast` — evaluates that checkpoint on held-out data

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ForecastArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "eth-forecast",
    version = "0.1.0",
    about = "Train an ETH+BTC transformer and forecast the next 7 daily ETH closes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => Self::run_train(args),
            Commands::Forecast(args) => Self::run_forecast(args),
        }
    }

    fn run_train(args: TrainArgs) -> Result<()> {
        use crate::application::train_use_case::TrainUseCase;

        tracing::info!("Starting training, checkpoints in: {}", args.checkpoint_dir);
        let best = TrainUseCase::new(args.into()).execute()?;

        println!(
            "Training complete. Best epoch {}: val_loss={:.5}, val_mape={:.2}%",
            best.epoch, best.val_loss, best.val_mape,
        );
        Ok(())
    }

    fn run_forecast(args: ForecastArgs) -> Result<()> {
        use crate::application::forecast_use_case::ForecastUseCase;

        let report = ForecastUseCase::new(args.checkpoint_dir, args.output).execute()?;

        println!("\nHeld-out windows : {}", report.samples);
        println!("Checkpoint epoch : {}", report.best_epoch);
        println!("MAPE (scaled)    : {:.2}%", report.mape_scaled);
        println!("MAPE (price)     : {:.2}%", report.mape_price);
        println!("Forecasts        : {}", report.output.display());
        Ok(())
    }
}
