//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use costwise_core::{Intent, Payment, Term};

/// Costwise - Forecast, explain and cut cloud spend
#[derive(Parser)]
#[command(name = "costwise")]
#[command(about = "Cost intelligence decision engine for cloud spend", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Cost export CSV with period,dimension,amount columns
    #[arg(long, global = true)]
    pub costs: Option<PathBuf>,

    /// Resource inventory JSON (array of resource records)
    #[arg(long, global = true)]
    pub inventory: Option<PathBuf>,

    /// Engine configuration TOML
    ///
    /// Without this flag the user override in the data directory is used when
    /// present, otherwise the built-in defaults. See `costwise config path`.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today; lookback windows end the day before
    #[arg(long, global = true)]
    pub as_of: Option<NaiveDate>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a free-text question about spend
    Ask {
        /// The question, e.g. "forecast next month and find idle resources"
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,

        /// Skip classification and answer for this intent
        #[arg(long)]
        intent: Option<Intent>,

        #[command(flatten)]
        forecast: ForecastArgs,
    },

    /// Forecast daily spend
    Forecast {
        #[command(flatten)]
        args: ForecastArgs,
    },

    /// Find unusual days in the cost history
    Anomalies {
        /// z-score above which a day is flagged
        #[arg(long)]
        threshold: Option<f64>,

        /// Rolling window length in days
        #[arg(long)]
        window: Option<usize>,

        /// Only look at one dimension (service)
        #[arg(short, long)]
        dimension: Option<String>,
    },

    /// Find idle, orphaned and underutilized resources
    Optimize,

    /// Size a savings commitment from sustained usage
    Commitment {
        /// Commitment term: one-year, three-year
        #[arg(long, default_value = "one-year")]
        term: Term,

        /// Payment option: no-upfront, partial-upfront, all-upfront
        #[arg(long, default_value = "no-upfront")]
        payment: Payment,

        /// $/hour already covered by existing commitments
        #[arg(long, default_value = "0")]
        existing: f64,
    },

    /// Check resources for required tags
    Tags,

    /// Summarize recent spend
    Overview,

    /// Show which intents a question maps to
    Classify {
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },

    /// Show engine configuration
    Config {
        #[command(subcommand)]
        action: Option<ConfigAction>,
    },
}

/// Forecast knobs shared by `forecast` and `ask`
#[derive(Args, Debug, Clone, Default)]
pub struct ForecastArgs {
    /// Days to forecast
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Interval confidence, e.g. 0.95
    #[arg(long)]
    pub confidence: Option<f64>,

    /// Only forecast one dimension (service)
    #[arg(short, long)]
    pub dimension: Option<String>,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,

    /// Show the path where a configuration override should be placed
    Path,
}
