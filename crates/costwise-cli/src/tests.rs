//! CLI command tests
//!
//! This module contains all tests for the CLI commands. Data files are
//! written to a temp directory from the core fixtures.

use std::io::Write;
use std::path::PathBuf;

use chrono::Duration;
use costwise_core::test_utils::{as_of, sample_inventory, stable_costs, with_spike};
use costwise_core::{CostObservation, Intent, Payment, Provenance, StructuredResult, Term};
use tempfile::TempDir;

use crate::commands::{self, truncate, GlobalOptions};

fn write_costs(dir: &TempDir, observations: &[CostObservation]) -> PathBuf {
    let path = dir.path().join("costs.csv");
    let mut f = std::fs::File::create(&path).unwrap();
    writeln!(f, "period,dimension,amount").unwrap();
    for o in observations {
        writeln!(f, "{},{},{}", o.period, o.dimension, o.amount).unwrap();
    }
    path
}

fn write_inventory(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("inventory.json");
    std::fs::write(&path, serde_json::to_string(&sample_inventory()).unwrap()).unwrap();
    path
}

/// Options over 60 days of stable costs and the sample inventory
fn setup_opts(dir: &TempDir) -> GlobalOptions {
    GlobalOptions {
        costs: Some(write_costs(dir, &stable_costs(60))),
        inventory: Some(write_inventory(dir)),
        config: None,
        as_of: Some(as_of()),
        json: false,
    }
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("short", 10), "short");
    assert_eq!(truncate("a-very-long-resource-id", 10), "a-very-...");
    assert_eq!(truncate("ünïcödé-name", 8), "ünïcö...");
}

// ========== Classify Command Tests ==========

#[test]
fn test_cmd_classify_compound() {
    let intents =
        commands::cmd_classify("forecast next month and find idle resources", false).unwrap();
    assert_eq!(intents, vec![Intent::Optimize, Intent::Forecast]);
}

#[test]
fn test_cmd_classify_falls_back_to_general() {
    let intents = commands::cmd_classify("hello there", true).unwrap();
    assert_eq!(intents, vec![Intent::General]);
}

// ========== Config Command Tests ==========

#[test]
fn test_cmd_config_show_override_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[anomaly]\nthreshold = 2.0\n\n[overview]\ntop_n = 3\n").unwrap();

    let config = commands::cmd_config_show(Some(&path), false).unwrap();
    assert_eq!(config.anomaly.threshold, 2.0);
    assert_eq!(config.overview.top_n, 3);
    assert_eq!(config.anomaly.window, 14);
}

#[test]
fn test_cmd_config_show_missing_file() {
    let result = commands::cmd_config_show(Some(std::path::Path::new("/nonexistent/engine.toml")), false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_config_show_rejects_unknown_keys() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.toml");
    std::fs::write(&path, "[anomaly]\nthreshhold = 2.0\n").unwrap();
    assert!(commands::cmd_config_show(Some(&path), true).is_err());
}

#[test]
fn test_cmd_config_path() {
    assert!(commands::cmd_config_path().is_ok());
}

// ========== Engine Command Tests ==========

#[test]
fn test_open_engine_missing_file() {
    let opts = GlobalOptions {
        costs: Some(PathBuf::from("/nonexistent/costs.csv")),
        ..Default::default()
    };
    assert!(commands::open_engine(&opts).is_err());
}

#[tokio::test]
async fn test_cmd_forecast() {
    let dir = TempDir::new().unwrap();
    let opts = setup_opts(&dir);

    let result = commands::cmd_forecast(&opts, Some(14), None, None).await.unwrap();
    let StructuredResult::Forecast(forecast) = result else {
        panic!("expected a forecast");
    };
    assert_eq!(forecast.horizon, 14);
    assert!(forecast.is_consistent());
    assert_eq!(forecast.provenance, Provenance::DataBacked);
    assert_eq!(forecast.first_period, Some(as_of()));
}

#[tokio::test]
async fn test_cmd_forecast_one_dimension() {
    let dir = TempDir::new().unwrap();
    let opts = GlobalOptions {
        json: true,
        ..setup_opts(&dir)
    };

    let result = commands::cmd_forecast(&opts, Some(7), Some(0.8), Some("Storage"))
        .await
        .unwrap();
    let StructuredResult::Forecast(forecast) = result else {
        panic!("expected a forecast");
    };
    assert_eq!(forecast.dimension, "Storage");
    // Storage hovers between 20 and 22 a day
    assert!(forecast.point.iter().all(|p| (15.0..27.0).contains(p)));
}

#[tokio::test]
async fn test_cmd_forecast_invalid_horizon() {
    let dir = TempDir::new().unwrap();
    let opts = setup_opts(&dir);
    assert!(commands::cmd_forecast(&opts, Some(0), None, None).await.is_err());
}

#[tokio::test]
async fn test_cmd_forecast_without_costs_uses_inventory() {
    let dir = TempDir::new().unwrap();
    let opts = GlobalOptions {
        costs: None,
        ..setup_opts(&dir)
    };

    let StructuredResult::Forecast(forecast) =
        commands::cmd_forecast(&opts, Some(5), None, None).await.unwrap()
    else {
        panic!("expected a forecast");
    };
    assert_eq!(forecast.provenance, Provenance::HeuristicFallback);
    assert!(forecast.backtest_error.is_none());
    assert!(!forecast.status.is_ok());
}

#[tokio::test]
async fn test_cmd_anomalies_flags_spike() {
    let dir = TempDir::new().unwrap();
    let spike_day = as_of() - Duration::days(3);
    let costs = with_spike(stable_costs(60), "Compute", spike_day, 900.0);
    let base = setup_opts(&dir);
    let opts = GlobalOptions {
        costs: Some(write_costs(&dir, &costs)),
        ..base
    };

    let StructuredResult::AnomalyList(report) =
        commands::cmd_anomalies(&opts, None, None, None).await.unwrap()
    else {
        panic!("expected an anomaly list");
    };
    assert!(report.status.is_ok());
    assert!(report
        .by_dimension
        .iter()
        .any(|r| r.period == spike_day && r.dimension == "Compute"));
    assert!(report.aggregate.iter().any(|r| r.period == spike_day));
}

#[tokio::test]
async fn test_cmd_anomalies_rejects_bad_window() {
    let dir = TempDir::new().unwrap();
    let opts = setup_opts(&dir);
    assert!(commands::cmd_anomalies(&opts, None, Some(1), None).await.is_err());
}

#[tokio::test]
async fn test_cmd_optimize() {
    let dir = TempDir::new().unwrap();
    let opts = setup_opts(&dir);

    let StructuredResult::OptimizationReport(report) =
        commands::cmd_optimize(&opts).await.unwrap()
    else {
        panic!("expected an optimization report");
    };
    let ids: Vec<&str> = report
        .opportunities
        .iter()
        .map(|o| o.resource_id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["i-stopped", "vol-free", "eip-free", "snap-orphan", "i-idle"]
    );
    assert!(report
        .opportunities
        .iter()
        .all(|o| o.estimated_savings <= o.monthly_cost));
}

#[tokio::test]
async fn test_cmd_commitment_insufficient_history() {
    let dir = TempDir::new().unwrap();
    let base = setup_opts(&dir);
    let opts = GlobalOptions {
        costs: Some(write_costs(&dir, &stable_costs(20))),
        ..base
    };

    let StructuredResult::CommitmentRecommendation(rec) =
        commands::cmd_commitment(&opts, Term::ThreeYear, Payment::AllUpfront, 0.0)
            .await
            .unwrap()
    else {
        panic!("expected a commitment recommendation");
    };
    assert!(!rec.status.is_recommended());
    assert_eq!(rec.hourly_rate, 0.0);
}

#[tokio::test]
async fn test_cmd_commitment_recommends_below_minimum() {
    let dir = TempDir::new().unwrap();
    let base = setup_opts(&dir);
    let opts = GlobalOptions {
        costs: Some(write_costs(&dir, &stable_costs(90))),
        ..base
    };

    let StructuredResult::CommitmentRecommendation(rec) =
        commands::cmd_commitment(&opts, Term::OneYear, Payment::NoUpfront, 0.0)
            .await
            .unwrap()
    else {
        panic!("expected a commitment recommendation");
    };
    assert!(rec.status.is_recommended());
    assert!(rec.hourly_rate > 0.0);
    assert!(rec.hourly_rate <= rec.sustained_minimum);
}

#[tokio::test]
async fn test_cmd_tags() {
    let dir = TempDir::new().unwrap();
    let opts = setup_opts(&dir);

    let StructuredResult::TagCompliance(report) = commands::cmd_tags(&opts).await.unwrap() else {
        panic!("expected a tag compliance report");
    };
    // i-gone is terminated and not counted
    assert_eq!(report.total_resources, 8);
    assert_eq!(report.compliant, 1);
    assert_eq!(report.non_compliant.len(), 7);
}

#[tokio::test]
async fn test_cmd_overview_without_costs() {
    let dir = TempDir::new().unwrap();
    let opts = GlobalOptions {
        costs: None,
        ..setup_opts(&dir)
    };

    let StructuredResult::CostOverview(overview) = commands::cmd_overview(&opts).await.unwrap()
    else {
        panic!("expected an overview");
    };
    assert!(!overview.status.is_ok());
    assert_eq!(overview.total, 0.0);
}

#[tokio::test]
async fn test_cmd_ask_compound() {
    let dir = TempDir::new().unwrap();
    let opts = setup_opts(&dir);

    let result = commands::cmd_ask(
        &opts,
        "forecast next month and find idle resources",
        None,
        Some(30),
        None,
        None,
    )
    .await
    .unwrap();
    let StructuredResult::Compound(report) = result else {
        panic!("expected a compound report");
    };
    assert_eq!(report.sections.len(), 2);
    assert_eq!(report.sections[0].intent, Intent::Optimize);
    assert_eq!(report.sections[1].intent, Intent::Forecast);
    assert_eq!(report.failures().count(), 0);
}

#[tokio::test]
async fn test_cmd_ask_with_intent_hint() {
    let dir = TempDir::new().unwrap();
    let opts = setup_opts(&dir);

    let result = commands::cmd_ask(&opts, "anything", Some(Intent::TagCompliance), None, None, None)
        .await
        .unwrap();
    assert_eq!(result.kind(), "tag_compliance");
}
