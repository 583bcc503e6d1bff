//! Costwise Core Library
//!
//! Cost intelligence decision engine:
//! - Request classification into intents
//! - Cost forecasting with a backtested estimator ensemble
//! - Rolling-window anomaly detection
//! - Idle and orphaned resource scanning
//! - Savings commitment sizing from sustained usage
//! - Tag compliance and spend overviews
//! - Response composition over pluggable cost and inventory sources

pub mod anomaly;
pub mod classify;
pub mod commitment;
pub mod config;
pub mod engine;
pub mod error;
pub mod forecast;
pub mod ingest;
pub mod models;
pub mod optimize;
pub mod overview;
pub mod result;
pub mod tags;

/// Series and inventory fixtures for tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use anomaly::{AnomalyDetector, RollingWindow, WindowScore};
pub use classify::{Classifier, Intent, IntentScorer, LexicalScorer};
pub use commitment::{usage_rate_series, CommitmentRecommender, Payment, Term};
pub use config::EngineConfig;
pub use engine::{Engine, Request, RequestParams};
pub use error::{Error, Result};
pub use forecast::{Estimator, Forecaster};
pub use ingest::{CachedCostSource, CostSource, FileSource, InventorySource, StaticSource};
pub use models::{
    CostObservation, Granularity, GroupBy, Provenance, ResourceKind, ResourceRecord,
    ResourceState, Status, TimeSeries, TimeWindow,
};
pub use optimize::OptimizationScanner;
pub use result::{
    AnomalyReport, CommitmentRecommendation, CommitmentStatus, CompoundReport, CostOverview,
    ErrorReport, ForecastResult, OptimizationReport, Section, StructuredResult,
    TagComplianceReport,
};
pub use tags::TagComplianceScanner;
