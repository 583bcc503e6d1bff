//! Costwise CLI - Cost intelligence for cloud spend
//!
//! Usage:
//!   costwise --costs costs.csv ask "forecast next month"   Answer a question
//!   costwise --costs costs.csv forecast --horizon 30        Forecast spend
//!   costwise --inventory inventory.json optimize            Find waste
//!   costwise config path                                    Show override location

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;
use commands::GlobalOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact().with_writer(std::io::stderr))
        .init();

    let opts = GlobalOptions {
        costs: cli.costs,
        inventory: cli.inventory,
        config: cli.config,
        as_of: cli.as_of,
        json: cli.json,
    };

    match cli.command {
        Commands::Ask {
            query,
            intent,
            forecast,
        } => commands::cmd_ask(
            &opts,
            &query.join(" "),
            intent,
            forecast.horizon,
            forecast.confidence,
            forecast.dimension.as_deref(),
        )
        .await
        .map(|_| ()),
        Commands::Forecast { args } => commands::cmd_forecast(
            &opts,
            args.horizon,
            args.confidence,
            args.dimension.as_deref(),
        )
        .await
        .map(|_| ()),
        Commands::Anomalies {
            threshold,
            window,
            dimension,
        } => commands::cmd_anomalies(&opts, threshold, window, dimension.as_deref())
            .await
            .map(|_| ()),
        Commands::Optimize => commands::cmd_optimize(&opts).await.map(|_| ()),
        Commands::Commitment {
            term,
            payment,
            existing,
        } => commands::cmd_commitment(&opts, term, payment, existing)
            .await
            .map(|_| ()),
        Commands::Tags => commands::cmd_tags(&opts).await.map(|_| ()),
        Commands::Overview => commands::cmd_overview(&opts).await.map(|_| ()),
        Commands::Classify { query } => {
            commands::cmd_classify(&query.join(" "), opts.json).map(|_| ())
        }
        Commands::Config { action } => match action {
            None | Some(ConfigAction::Show) => {
                commands::cmd_config_show(opts.config.as_deref(), opts.json).map(|_| ())
            }
            Some(ConfigAction::Path) => commands::cmd_config_path(),
        },
    }
}
