// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the two subcommands, `train` and `forecast`, and all
// their configurable flags. Defaults mirror TrainConfig::default.

use clap::{Args, Subcommand};
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the forecaster on ETH/BTC daily and weekly CSVs
    Train(TrainArgs),

    /// Forecast the held-out windows with the best checkpoint
    Forecast(ForecastArgs),
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// ETH daily OHLCV CSV
    #[arg(long, default_value = "data/eth_daily.csv")]
    pub eth_daily: String,

    /// ETH weekly OHLCV CSV
    #[arg(long, default_value = "data/eth_weekly.csv")]
    pub eth_weekly: String,

    /// BTC daily OHLCV CSV
    #[arg(long, default_value = "data/btc_daily.csv")]
    pub btc_daily: String,

    /// BTC weekly OHLCV CSV
    #[arg(long, default_value = "data/btc_weekly.csv")]
    pub btc_weekly: String,

    /// Directory for weights, configs and metrics.csv
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    #[arg(long, default_value_t = 25)]
    pub epochs: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Initial learning rate, decayed as lr / (1 + 0.05 * step)
    #[arg(long, default_value_t = 0.005)]
    pub lr: f64,

    /// Daily lookback per window
    #[arg(long, default_value_t = 42)]
    pub sequence_length: usize,

    /// Weekly lookback per window
    #[arg(long, default_value_t = 8)]
    pub week_length: usize,

    /// Periodic channels of each Time2Vec layer
    #[arg(long, default_value_t = 4)]
    pub k: usize,

    /// Encoder blocks per asset
    #[arg(long, default_value_t = 4)]
    pub encoder_number: usize,

    #[arg(long, default_value_t = 4)]
    pub decoder_number: usize,

    /// Heads of the encoder and cross attention
    #[arg(long, default_value_t = 16)]
    pub amount_of_heads: usize,

    #[arg(long, default_value_t = 64)]
    pub size_of_head: usize,

    /// Dropout on attention probabilities
    #[arg(long, default_value_t = 0.4)]
    pub dropout: f64,

    /// Trailing fraction of every series held out for evaluation
    #[arg(long, default_value_t = 0.13)]
    pub test_fraction: f64,

    /// Fraction of training windows used for validation
    #[arg(long, default_value_t = 0.1)]
    pub validation_fraction: f64,

    /// Seed for the validation split and batch shuffling
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            eth_daily:           a.eth_daily,
            eth_weekly:          a.eth_weekly,
            btc_daily:           a.btc_daily,
            btc_weekly:          a.btc_weekly,
            checkpoint_dir:      a.checkpoint_dir,
            epochs:              a.epochs,
            batch_size:          a.batch_size,
            lr:                  a.lr,
            sequence_length:     a.sequence_length,
            week_length:         a.week_length,
            k:                   a.k,
            encoder_number:      a.encoder_number,
            decoder_number:      a.decoder_number,
            amount_of_heads:     a.amount_of_heads,
            size_of_head:        a.size_of_head,
            dropout:             a.dropout,
            test_fraction:       a.test_fraction,
            validation_fraction: a.validation_fraction,
            seed:                a.seed,
        }
    }
}

/// All arguments for the `forecast` command
#[derive(Args, Debug)]
pub struct ForecastArgs {
    /// Directory where `train` saved its checkpoint
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Forecasts CSV path (default: <checkpoint-dir>/forecasts.csv)
    #[arg(long)]
    pub output: Option<String>,
}
