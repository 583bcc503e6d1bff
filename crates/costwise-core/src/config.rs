//! Engine configuration
//!
//! Every threshold the engine uses is a named value here. Configuration is
//! loaded in two layers:
//! 1. The default `config/engine.toml`, embedded at compile time
//! 2. An override file at `~/.local/share/costwise/config/engine.toml`
//!    (or an explicit path), applied key by key on top of the defaults

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::commitment::{Payment, Term};
use crate::error::{Error, Result};

/// Default configuration embedded at compile time
pub const DEFAULT_CONFIG: &str = include_str!("../../../config/engine.toml");

/// Forecasting ensemble settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastConfig {
    /// Days of history fetched for a forecast
    pub lookback_days: u32,
    /// Minimum periods before a model-backed forecast is produced
    pub min_history: usize,
    pub default_horizon: u32,
    pub max_horizon: u32,
    pub default_confidence: f64,
    /// Upper bound on the backtest holdout length
    pub max_holdout: usize,
    /// Season length in periods (7 = weekly for daily data)
    pub season_length: usize,
    /// Ridge term added to the normal equations
    pub ridge: f64,
    pub trees: usize,
    pub max_depth: usize,
    pub min_leaf: usize,
    /// Bootstrap seed for the bagged trees
    pub seed: u64,
    pub days_per_month: f64,
    /// Relative half-width of the heuristic fallback band
    pub heuristic_band: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            min_history: 14,
            default_horizon: 30,
            max_horizon: 366,
            default_confidence: 0.95,
            max_holdout: 7,
            season_length: 7,
            ridge: 1e-6,
            trees: 25,
            max_depth: 4,
            min_leaf: 3,
            seed: 42,
            days_per_month: 30.0,
            heuristic_band: 0.25,
        }
    }
}

/// Rolling z-score detector settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyConfig {
    pub lookback_days: u32,
    /// Trailing window length in periods
    pub window: usize,
    /// Largest window a request may ask for
    pub max_window: usize,
    /// Minimum window fill before a point is evaluated
    pub min_history: usize,
    /// |z| above this is an anomaly
    pub threshold: f64,
    /// |z| above this is high severity
    pub high_severity: f64,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            window: 14,
            max_window: 366,
            min_history: 7,
            threshold: 2.5,
            high_severity: 3.0,
        }
    }
}

/// Resource optimization scanner settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizeConfig {
    /// CPU percent; every sample in the window must be below it
    pub cpu_threshold: f64,
    pub min_samples: usize,
    pub lookback_samples: usize,
    /// Fraction of monthly cost saved by downsizing
    pub downsize_savings_ratio: f64,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            cpu_threshold: 10.0,
            min_samples: 7,
            lookback_samples: 30,
            downsize_savings_ratio: 0.5,
        }
    }
}

/// Discount rates for one commitment term
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaymentRates {
    pub no_upfront: f64,
    pub partial_upfront: f64,
    pub all_upfront: f64,
}

impl PaymentRates {
    pub fn for_payment(&self, payment: Payment) -> f64 {
        match payment {
            Payment::NoUpfront => self.no_upfront,
            Payment::PartialUpfront => self.partial_upfront,
            Payment::AllUpfront => self.all_upfront,
        }
    }
}

/// Savings commitment recommender settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitmentConfig {
    pub lookback_days: u32,
    /// Trailing periods the sustained minimum is taken over
    pub lookback_periods: usize,
    pub min_history: usize,
    /// Coefficient of variation above which no commitment is recommended
    pub max_volatility: f64,
    /// Dimensions that make up the usage series (empty = all)
    pub dimensions: Vec<String>,
    pub one_year: PaymentRates,
    pub three_year: PaymentRates,
}

impl CommitmentConfig {
    /// Discount rate for a term and payment option
    pub fn discount(&self, term: Term, payment: Payment) -> f64 {
        match term {
            Term::OneYear => self.one_year.for_payment(payment),
            Term::ThreeYear => self.three_year.for_payment(payment),
        }
    }
}

impl Default for CommitmentConfig {
    fn default() -> Self {
        Self {
            lookback_days: 90,
            lookback_periods: 60,
            min_history: 60,
            max_volatility: 1.0,
            dimensions: Vec::new(),
            one_year: PaymentRates {
                no_upfront: 0.20,
                partial_upfront: 0.24,
                all_upfront: 0.27,
            },
            three_year: PaymentRates {
                no_upfront: 0.37,
                partial_upfront: 0.42,
                all_upfront: 0.46,
            },
        }
    }
}

/// Tag compliance settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TagsConfig {
    pub required: Vec<String>,
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            required: ["Environment", "Owner", "CostCenter", "Project"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Cost overview settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverviewConfig {
    pub lookback_days: u32,
    pub top_n: usize,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            top_n: 5,
        }
    }
}

/// Ingestion settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestConfig {
    pub fetch_timeout: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EngineConfig {
    pub forecast: ForecastConfig,
    pub anomaly: AnomalyConfig,
    pub optimize: OptimizeConfig,
    pub commitment: CommitmentConfig,
    pub tags: TagsConfig,
    pub overview: OverviewConfig,
    pub ingest: IngestConfig,
}

impl EngineConfig {
    /// Load configuration (explicit path, then override location, then default)
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let content = match path {
            Some(path) => fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?,
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => {
                    tracing::debug!("Loading config override from {}", default_path.display());
                    fs::read_to_string(&default_path)
                        .map_err(|e| Error::Config(format!("Failed to read config: {}", e)))?
                }
                _ => DEFAULT_CONFIG.to_string(),
            },
        };

        parse_config(&content)
    }

    /// Parse configuration from TOML, applying it over the defaults
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    /// The file `load(path)` would read, if any
    pub fn source_path(path: Option<&Path>) -> Option<PathBuf> {
        match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.exists()),
        }
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        let f = &self.forecast;
        if f.min_history < 2 {
            return Err(Error::Config("forecast.min_history must be at least 2".into()));
        }
        if f.max_horizon == 0 || f.default_horizon == 0 || f.default_horizon > f.max_horizon {
            return Err(Error::Config(
                "forecast.default_horizon must be within 1..=forecast.max_horizon".into(),
            ));
        }
        if !(f.default_confidence > 0.0 && f.default_confidence < 1.0) {
            return Err(Error::Config(
                "forecast.default_confidence must be in (0, 1)".into(),
            ));
        }
        if f.max_holdout == 0 || f.season_length == 0 || f.trees == 0 || f.min_leaf == 0 {
            return Err(Error::Config(
                "forecast.max_holdout, season_length, trees and min_leaf must be positive".into(),
            ));
        }
        if f.days_per_month <= 0.0 || f.heuristic_band < 0.0 {
            return Err(Error::Config(
                "forecast.days_per_month must be positive and heuristic_band non-negative".into(),
            ));
        }

        let a = &self.anomaly;
        if a.window < 2 || a.min_history < 2 || a.min_history > a.window {
            return Err(Error::Config(
                "anomaly.min_history must be within 2..=anomaly.window".into(),
            ));
        }
        if a.window > a.max_window {
            return Err(Error::Config(
                "anomaly.window must not exceed anomaly.max_window".into(),
            ));
        }
        if a.threshold <= 0.0 {
            return Err(Error::Config("anomaly.threshold must be positive".into()));
        }
        if a.threshold < 2.0 || a.threshold > 3.0 {
            tracing::warn!(
                "anomaly.threshold {} is outside the recommended 2.0-3.0 range",
                a.threshold
            );
        }

        let o = &self.optimize;
        if o.lookback_samples == 0 || o.min_samples > o.lookback_samples {
            return Err(Error::Config(
                "optimize.min_samples must not exceed optimize.lookback_samples".into(),
            ));
        }

        let c = &self.commitment;
        if c.lookback_periods == 0 {
            return Err(Error::Config(
                "commitment.lookback_periods must be positive".into(),
            ));
        }
        for rate in [
            c.one_year.no_upfront,
            c.one_year.partial_upfront,
            c.one_year.all_upfront,
            c.three_year.no_upfront,
            c.three_year.partial_upfront,
            c.three_year.all_upfront,
        ] {
            if !(rate > 0.0 && rate < 1.0) {
                return Err(Error::Config(format!(
                    "commitment discount {} must be in (0, 1)",
                    rate
                )));
            }
        }

        if self.overview.top_n == 0 {
            return Err(Error::Config("overview.top_n must be positive".into()));
        }
        if self.ingest.fetch_timeout.is_zero() {
            return Err(Error::Config(
                "ingest.fetch_timeout_secs must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("costwise").join("config").join("engine.toml"))
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    forecast: Option<RawForecast>,
    anomaly: Option<RawAnomaly>,
    optimize: Option<RawOptimize>,
    commitment: Option<RawCommitment>,
    tags: Option<RawTags>,
    overview: Option<RawOverview>,
    ingest: Option<RawIngest>,
}

#[derive(Debug, Deserialize)]
struct RawForecast {
    lookback_days: Option<u32>,
    min_history: Option<usize>,
    default_horizon: Option<u32>,
    max_horizon: Option<u32>,
    default_confidence: Option<f64>,
    max_holdout: Option<usize>,
    season_length: Option<usize>,
    ridge: Option<f64>,
    trees: Option<usize>,
    max_depth: Option<usize>,
    min_leaf: Option<usize>,
    seed: Option<u64>,
    days_per_month: Option<f64>,
    heuristic_band: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawAnomaly {
    lookback_days: Option<u32>,
    window: Option<usize>,
    max_window: Option<usize>,
    min_history: Option<usize>,
    threshold: Option<f64>,
    high_severity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawOptimize {
    cpu_threshold: Option<f64>,
    min_samples: Option<usize>,
    lookback_samples: Option<usize>,
    downsize_savings_ratio: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawCommitment {
    lookback_days: Option<u32>,
    lookback_periods: Option<usize>,
    min_history: Option<usize>,
    max_volatility: Option<f64>,
    dimensions: Option<Vec<String>>,
    discounts: Option<RawDiscounts>,
}

#[derive(Debug, Deserialize)]
struct RawDiscounts {
    one_year: Option<RawPaymentRates>,
    three_year: Option<RawPaymentRates>,
}

#[derive(Debug, Deserialize)]
struct RawPaymentRates {
    no_upfront: Option<f64>,
    partial_upfront: Option<f64>,
    all_upfront: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawTags {
    required: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct RawOverview {
    lookback_days: Option<u32>,
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RawIngest {
    fetch_timeout_secs: Option<u64>,
}

fn apply<T>(target: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *target = value;
    }
}

fn apply_rates(target: &mut PaymentRates, raw: Option<RawPaymentRates>) {
    if let Some(raw) = raw {
        apply(&mut target.no_upfront, raw.no_upfront);
        apply(&mut target.partial_upfront, raw.partial_upfront);
        apply(&mut target.all_upfront, raw.all_upfront);
    }
}

/// Parse config from TOML content
fn parse_config(content: &str) -> Result<EngineConfig> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut config = EngineConfig::default();

    if let Some(f) = raw.forecast {
        let c = &mut config.forecast;
        apply(&mut c.lookback_days, f.lookback_days);
        apply(&mut c.min_history, f.min_history);
        apply(&mut c.default_horizon, f.default_horizon);
        apply(&mut c.max_horizon, f.max_horizon);
        apply(&mut c.default_confidence, f.default_confidence);
        apply(&mut c.max_holdout, f.max_holdout);
        apply(&mut c.season_length, f.season_length);
        apply(&mut c.ridge, f.ridge);
        apply(&mut c.trees, f.trees);
        apply(&mut c.max_depth, f.max_depth);
        apply(&mut c.min_leaf, f.min_leaf);
        apply(&mut c.seed, f.seed);
        apply(&mut c.days_per_month, f.days_per_month);
        apply(&mut c.heuristic_band, f.heuristic_band);
    }

    if let Some(a) = raw.anomaly {
        let c = &mut config.anomaly;
        apply(&mut c.lookback_days, a.lookback_days);
        apply(&mut c.window, a.window);
        apply(&mut c.max_window, a.max_window);
        apply(&mut c.min_history, a.min_history);
        apply(&mut c.threshold, a.threshold);
        apply(&mut c.high_severity, a.high_severity);
    }

    if let Some(o) = raw.optimize {
        let c = &mut config.optimize;
        apply(&mut c.cpu_threshold, o.cpu_threshold);
        apply(&mut c.min_samples, o.min_samples);
        apply(&mut c.lookback_samples, o.lookback_samples);
        apply(&mut c.downsize_savings_ratio, o.downsize_savings_ratio);
        // Downsizing can never save more than the resource costs
        c.downsize_savings_ratio = c.downsize_savings_ratio.clamp(0.0, 1.0);
    }

    if let Some(cm) = raw.commitment {
        let c = &mut config.commitment;
        apply(&mut c.lookback_days, cm.lookback_days);
        apply(&mut c.lookback_periods, cm.lookback_periods);
        apply(&mut c.min_history, cm.min_history);
        apply(&mut c.max_volatility, cm.max_volatility);
        apply(&mut c.dimensions, cm.dimensions);
        if let Some(d) = cm.discounts {
            apply_rates(&mut c.one_year, d.one_year);
            apply_rates(&mut c.three_year, d.three_year);
        }
    }

    if let Some(t) = raw.tags {
        apply(&mut config.tags.required, t.required);
    }

    if let Some(o) = raw.overview {
        apply(&mut config.overview.lookback_days, o.lookback_days);
        apply(&mut config.overview.top_n, o.top_n);
    }

    if let Some(i) = raw.ingest {
        if let Some(secs) = i.fetch_timeout_secs {
            config.ingest.fetch_timeout = Duration::from_secs(secs);
        }
    }

    config.validate()?;
    Ok(config)
}
