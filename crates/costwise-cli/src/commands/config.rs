//! Configuration command implementations

use std::path::Path;

use anyhow::Result;
use costwise_core::config::default_config_path;
use costwise_core::EngineConfig;

use super::load_config;

/// Print the effective configuration and where it came from
pub fn cmd_config_show(path: Option<&Path>, json: bool) -> Result<EngineConfig> {
    let config = load_config(path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(config);
    }

    let source = EngineConfig::source_path(path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "built-in defaults".to_string());

    println!("⚙️  Engine Configuration");
    println!("   Source: {}", source);
    println!("   ─────────────────────────────────────────────────────────────");

    let f = &config.forecast;
    println!("   [forecast]");
    println!("   lookback_days      {}", f.lookback_days);
    println!("   min_history        {}", f.min_history);
    println!("   default_horizon    {} (max {})", f.default_horizon, f.max_horizon);
    println!("   default_confidence {}", f.default_confidence);
    println!("   season_length      {}", f.season_length);
    println!("   trees              {} (depth {}, seed {})", f.trees, f.max_depth, f.seed);
    println!();

    let a = &config.anomaly;
    println!("   [anomaly]");
    println!("   lookback_days      {}", a.lookback_days);
    println!(
        "   window             {} (min history {}, max {})",
        a.window, a.min_history, a.max_window
    );
    println!("   threshold          {} (high above {})", a.threshold, a.high_severity);
    println!();

    let o = &config.optimize;
    println!("   [optimize]");
    println!("   cpu_threshold      {}%", o.cpu_threshold);
    println!("   samples            {} of last {}", o.min_samples, o.lookback_samples);
    println!("   downsize_savings   {:.0}%", o.downsize_savings_ratio * 100.0);
    println!();

    let c = &config.commitment;
    println!("   [commitment]");
    println!("   lookback           {} days / {} periods", c.lookback_days, c.lookback_periods);
    println!("   min_history        {}", c.min_history);
    println!("   max_volatility     {}", c.max_volatility);
    if !c.dimensions.is_empty() {
        println!("   dimensions         {}", c.dimensions.join(", "));
    }
    println!(
        "   one_year           {:.0}% / {:.0}% / {:.0}%",
        c.one_year.no_upfront * 100.0,
        c.one_year.partial_upfront * 100.0,
        c.one_year.all_upfront * 100.0
    );
    println!(
        "   three_year         {:.0}% / {:.0}% / {:.0}%",
        c.three_year.no_upfront * 100.0,
        c.three_year.partial_upfront * 100.0,
        c.three_year.all_upfront * 100.0
    );
    println!();

    println!("   [tags]");
    println!("   required           {}", config.tags.required.join(", "));
    println!();
    println!("   [overview]");
    println!(
        "   lookback_days      {} (top {})",
        config.overview.lookback_days, config.overview.top_n
    );
    println!();
    println!("   [ingest]");
    println!(
        "   fetch_timeout      {}s",
        config.ingest.fetch_timeout.as_secs_f64()
    );

    Ok(config)
}

/// Show the path where a configuration override should be placed
pub fn cmd_config_path() -> Result<()> {
    match default_config_path() {
        Some(path) => {
            println!("{}", path.display());

            if !path.exists() {
                eprintln!();
                eprintln!("Note: This file does not exist yet.");
                eprintln!("Create it to override the built-in defaults.");
            }
        }
        None => {
            eprintln!("Could not determine the config directory.");
            eprintln!("The data directory is not available on this system.");
        }
    }

    Ok(())
}
