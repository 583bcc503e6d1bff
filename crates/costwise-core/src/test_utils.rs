//! Test fixtures for costwise-core
//!
//! Deterministic cost series and inventories shared by unit tests and by
//! downstream crates (enable the `test-utils` feature).

use chrono::{Duration, NaiveDate};

use crate::models::{CostObservation, ResourceKind, ResourceRecord, ResourceState};

/// Reference "today" for fixtures; every series ends the day before
pub fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
}

/// First day of a `days`-long series ending the day before `as_of()`
pub fn series_start(days: usize) -> NaiveDate {
    as_of() - Duration::days(days as i64)
}

/// One observation per day for `dimension`, starting at `start`
pub fn daily_costs(dimension: &str, start: NaiveDate, amounts: &[f64]) -> Vec<CostObservation> {
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            CostObservation::new(start + Duration::days(i as i64), dimension, *amount).unwrap()
        })
        .collect()
}

/// Two well-behaved services with a weekly ripple
pub fn stable_costs(days: usize) -> Vec<CostObservation> {
    let start = series_start(days);
    let compute: Vec<f64> = (0..days).map(|i| 100.0 + (i % 7) as f64 * 2.0).collect();
    let storage: Vec<f64> = (0..days).map(|i| 20.0 + (i % 3) as f64).collect();

    let mut observations = daily_costs("Compute", start, &compute);
    observations.extend(daily_costs("Storage", start, &storage));
    observations
}

/// The same amount every day for one dimension
pub fn constant_costs(dimension: &str, days: usize, amount: f64) -> Vec<CostObservation> {
    daily_costs(dimension, series_start(days), &vec![amount; days])
}

/// Add `amount` on top of whatever `dimension` spent on `period`
pub fn with_spike(
    mut observations: Vec<CostObservation>,
    dimension: &str,
    period: NaiveDate,
    amount: f64,
) -> Vec<CostObservation> {
    observations.push(CostObservation::new(period, dimension, amount).unwrap());
    observations
}

/// Daily compute spend that never drops below `floor` and peaks every
/// fifth day
pub fn usage_costs(days: usize, floor: f64) -> Vec<CostObservation> {
    let amounts: Vec<f64> = (0..days)
        .map(|i| floor + (i % 5) as f64 * floor * 0.1)
        .collect();
    daily_costs("Compute", series_start(days), &amounts)
}

/// Inventory with one opportunity per category, healthy resources and
/// mixed tagging
pub fn sample_inventory() -> Vec<ResourceRecord> {
    vec![
        ResourceRecord::new("i-web", ResourceKind::Instance, ResourceState::Running)
            .with_cost(1.0, 70.0)
            .with_utilization(vec![55.0; 30])
            .with_tag("Environment", "prod")
            .with_tag("Owner", "web-team")
            .with_tag("CostCenter", "cc-100")
            .with_tag("Project", "storefront"),
        ResourceRecord::new("i-idle", ResourceKind::Instance, ResourceState::Running)
            .with_cost(1.0, 70.0)
            .with_utilization(vec![2.0; 30])
            .with_tag("Environment", "dev"),
        ResourceRecord::new("i-stopped", ResourceKind::Instance, ResourceState::Stopped)
            .with_cost(50.0, 0.1),
        ResourceRecord::new("vol-root", ResourceKind::Volume, ResourceState::InUse)
            .with_cost(100.0, 0.08)
            .attached_to("i-web"),
        ResourceRecord::new("vol-free", ResourceKind::Volume, ResourceState::Available)
            .with_cost(100.0, 0.08),
        ResourceRecord::new("eip-free", ResourceKind::Address, ResourceState::Available)
            .with_cost(1.0, 3.6),
        ResourceRecord::new("snap-web", ResourceKind::Snapshot, ResourceState::Available)
            .with_cost(20.0, 0.05)
            .with_parent("vol-root"),
        ResourceRecord::new("snap-orphan", ResourceKind::Snapshot, ResourceState::Available)
            .with_cost(20.0, 0.05)
            .with_parent("vol-deleted"),
        ResourceRecord::new("i-gone", ResourceKind::Instance, ResourceState::Terminated)
            .with_cost(1.0, 70.0),
    ]
}
