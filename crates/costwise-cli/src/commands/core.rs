//! Core command utilities
//!
//! This module contains:
//! - `GlobalOptions` - Flags shared by every engine command
//! - `open_engine` - Build an engine over the local data files
//! - `run_request` - Execute one request with Ctrl-C cancellation and print it

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use costwise_core::{
    CachedCostSource, Engine, EngineConfig, FileSource, Request, StructuredResult,
};
use tokio_util::sync::CancellationToken;

use super::render;

/// Global flags that shape every engine request
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub costs: Option<PathBuf>,
    pub inventory: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub as_of: Option<NaiveDate>,
    pub json: bool,
}

/// Load the engine configuration with CLI context on failure
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::load(path).context("Failed to load engine configuration")
}

/// Build an engine over the cost CSV and inventory JSON given on the command line
pub fn open_engine(opts: &GlobalOptions) -> Result<Engine> {
    for path in [&opts.costs, &opts.inventory].into_iter().flatten() {
        if !path.exists() {
            anyhow::bail!("File not found: {}", path.display());
        }
    }
    if opts.costs.is_none() {
        tracing::debug!("No --costs file given, cost history will be empty");
    }

    let config = load_config(opts.config.as_deref())?;
    let files = Arc::new(FileSource::new(opts.costs.clone(), opts.inventory.clone()));
    let costs = Arc::new(CachedCostSource::new(files.clone()));
    Ok(Engine::new(config, costs, files))
}

/// Run one request, cancelling it on Ctrl-C, and print the result
pub async fn run_request(
    engine: &Engine,
    request: Request,
    json: bool,
) -> Result<StructuredResult> {
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling request");
            interrupt.cancel();
        }
    });

    let outcome = engine.handle_request(&request, &cancel).await;
    watcher.abort();

    match outcome {
        Ok(result) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                render::print_result(&result);
            }
            Ok(result)
        }
        Err(e) => {
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&StructuredResult::from_error(&e))?
                );
            }
            Err(anyhow::Error::new(e).context("Request failed"))
        }
    }
}
