//! Domain models for Costwise
//!
//! Inputs (`CostObservation`, `ResourceRecord`) are immutable snapshots
//! produced by the ingestion boundary. Everything derived from them lives in
//! `crate::result`.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Name used for the aggregate (all dimensions) series
pub const TOTAL_DIMENSION: &str = "total";

/// Time granularity of a cost series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

impl std::str::FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "monthly" => Ok(Self::Monthly),
            _ => Err(format!(
                "Unknown granularity: {} (valid: daily, monthly)",
                s
            )),
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a cost series should be grouped by the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    /// One aggregate row per period
    Total,
    /// One row per (period, dimension)
    Dimension,
}

/// Half-open date range `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start >= end {
            return Err(Error::InvalidParameter(format!(
                "window start {} must be before end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` days before `end` (exclusive)
    pub fn trailing(end: NaiveDate, days: u32) -> Result<Self> {
        if days == 0 {
            return Err(Error::InvalidParameter(
                "lookback must be at least one day".to_string(),
            ));
        }
        Self::new(end - Duration::days(days as i64), end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// One cost amount for one period and dimension
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostObservation {
    pub period: NaiveDate,
    /// Grouping key, e.g. a service name
    pub dimension: String,
    pub amount: f64,
}

impl CostObservation {
    pub fn new(period: NaiveDate, dimension: impl Into<String>, amount: f64) -> Result<Self> {
        let obs = Self {
            period,
            dimension: dimension.into(),
            amount,
        };
        obs.validate()?;
        Ok(obs)
    }

    /// Amounts must be finite and non-negative
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "cost amount for {} on {} must be a non-negative number, got {}",
                self.dimension, self.period, self.amount
            )));
        }
        Ok(())
    }
}

/// Kind of inventory resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Compute instance
    Instance,
    /// Block storage volume
    Volume,
    /// Static network address
    Address,
    /// Storage snapshot
    Snapshot,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Volume => "volume",
            Self::Address => "address",
            Self::Snapshot => "snapshot",
        }
    }

    pub fn all() -> &'static [ResourceKind] {
        &[Self::Instance, Self::Volume, Self::Address, Self::Snapshot]
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "instance" | "ec2" => Ok(Self::Instance),
            "volume" | "ebs" => Ok(Self::Volume),
            "address" | "eip" | "ip" => Ok(Self::Address),
            "snapshot" => Ok(Self::Snapshot),
            _ => Err(format!("Unknown resource kind: {}", s)),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state reported by the inventory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Running,
    Stopped,
    /// Exists but not in use (e.g. a detached volume)
    Available,
    InUse,
    Terminated,
}

impl ResourceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::Available => "available",
            Self::InUse => "in_use",
            Self::Terminated => "terminated",
        }
    }
}

impl std::fmt::Display for ResourceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One inventory resource at snapshot time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub kind: ResourceKind,
    pub state: ResourceState,
    /// Utilization samples in percent, oldest first
    #[serde(default)]
    pub utilization: Vec<f64>,
    /// Attachment (volumes) or association (addresses) target
    #[serde(default)]
    pub attached_to: Option<String>,
    /// Source resource of a snapshot
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Size in billing units (GB for storage, 1 for instances and addresses).
    /// For stopped instances this is the still-billed attached storage.
    #[serde(default = "default_size")]
    pub size: f64,
    /// Monthly cost per size unit
    pub unit_cost: f64,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

fn default_size() -> f64 {
    1.0
}

impl ResourceRecord {
    pub fn new(id: impl Into<String>, kind: ResourceKind, state: ResourceState) -> Self {
        Self {
            id: id.into(),
            kind,
            state,
            utilization: Vec::new(),
            attached_to: None,
            parent_id: None,
            size: 1.0,
            unit_cost: 0.0,
            tags: BTreeMap::new(),
        }
    }

    pub fn with_cost(mut self, size: f64, unit_cost: f64) -> Self {
        self.size = size;
        self.unit_cost = unit_cost;
        self
    }

    pub fn with_utilization(mut self, samples: Vec<f64>) -> Self {
        self.utilization = samples;
        self
    }

    pub fn attached_to(mut self, target: impl Into<String>) -> Self {
        self.attached_to = Some(target.into());
        self
    }

    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_id = Some(parent.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Monthly cost currently billed for this resource
    pub fn monthly_cost(&self) -> f64 {
        (self.size * self.unit_cost).max(0.0)
    }

    /// Terminated resources are no longer billed
    pub fn is_billable(&self) -> bool {
        self.state != ResourceState::Terminated
    }
}

/// Ids of every resource in a snapshot, for parent lookups
pub fn resource_ids(resources: &[ResourceRecord]) -> HashSet<&str> {
    resources.iter().map(|r| r.id.as_str()).collect()
}

/// A single point of a regular series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub period: NaiveDate,
    pub value: f64,
}

/// A gap-free daily series for one dimension (or the aggregate)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub dimension: String,
    pub points: Vec<SeriesPoint>,
}

impl TimeSeries {
    pub fn new(dimension: impl Into<String>, points: Vec<SeriesPoint>) -> Self {
        Self {
            dimension: dimension.into(),
            points,
        }
    }

    /// Build a daily series from observations, summing duplicates.
    ///
    /// Days between the first and last observed period with no observation
    /// are filled with zero (no recorded spend).
    pub fn daily<'a>(
        dimension: impl Into<String>,
        observations: impl IntoIterator<Item = &'a CostObservation>,
    ) -> Self {
        let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for obs in observations {
            *by_day.entry(obs.period).or_insert(0.0) += obs.amount;
        }

        let mut points = Vec::with_capacity(by_day.len());
        if let (Some((&first, _)), Some((&last, _))) =
            (by_day.iter().next(), by_day.iter().next_back())
        {
            let mut day = first;
            while day <= last {
                points.push(SeriesPoint {
                    period: day,
                    value: by_day.get(&day).copied().unwrap_or(0.0),
                });
                day += Duration::days(1);
            }
        }

        Self::new(dimension, points)
    }

    /// Aggregate of every dimension
    pub fn total(observations: &[CostObservation]) -> Self {
        Self::daily(TOTAL_DIMENSION, observations)
    }

    /// One series per dimension, ordered by dimension name
    pub fn by_dimension(observations: &[CostObservation]) -> Vec<Self> {
        let mut grouped: BTreeMap<&str, Vec<&CostObservation>> = BTreeMap::new();
        for obs in observations {
            grouped.entry(obs.dimension.as_str()).or_default().push(obs);
        }
        grouped
            .into_iter()
            .map(|(dim, obs)| Self::daily(dim, obs))
            .collect()
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last_period(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.period)
    }

    /// Keep only the trailing `n` points
    pub fn tail(&self, n: usize) -> Self {
        let start = self.points.len().saturating_sub(n);
        Self::new(self.dimension.clone(), self.points[start..].to_vec())
    }
}

/// Whether a number is backed by data/models or by a heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    /// Computed from supplied cost/inventory data
    DataBacked,
    /// Deterministic estimate used when data was insufficient
    HeuristicFallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataBacked => "data_backed",
            Self::HeuristicFallback => "heuristic_fallback",
        }
    }
}

impl std::fmt::Display for Provenance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome status carried inside every component result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum Status {
    Ok,
    InsufficientData(String),
}

impl Status {
    pub fn is_ok(&self) -> bool {
        matches!(self, Status::Ok)
    }

    /// Status for a result computed despite `cause`
    pub fn recovered(cause: &Error) -> Self {
        match cause {
            Error::InsufficientData(reason) => Status::InsufficientData(reason.clone()),
            other => Status::InsufficientData(other.to_string()),
        }
    }

    /// Append context to an insufficient-data reason
    pub fn annotate(&mut self, note: &str) {
        if let Status::InsufficientData(reason) = self {
            reason.push_str("; ");
            reason.push_str(note);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn test_observation_rejects_negative_amount() {
        assert!(CostObservation::new(day(1), "Compute", -1.0).is_err());
        assert!(CostObservation::new(day(1), "Compute", f64::NAN).is_err());
        assert!(CostObservation::new(day(1), "Compute", 0.0).is_ok());
    }

    #[test]
    fn test_daily_series_fills_gaps() {
        let obs = vec![
            CostObservation::new(day(1), "Compute", 2.0).unwrap(),
            CostObservation::new(day(1), "Storage", 1.0).unwrap(),
            CostObservation::new(day(4), "Compute", 5.0).unwrap(),
        ];

        let total = TimeSeries::total(&obs);
        assert_eq!(total.values(), vec![3.0, 0.0, 0.0, 5.0]);
        assert_eq!(total.dimension, TOTAL_DIMENSION);

        let dims = TimeSeries::by_dimension(&obs);
        assert_eq!(dims.len(), 2);
        assert_eq!(dims[0].dimension, "Compute");
        assert_eq!(dims[0].values(), vec![2.0, 0.0, 0.0, 5.0]);
        assert_eq!(dims[1].values(), vec![1.0]);
    }

    #[test]
    fn test_time_window() {
        let window = TimeWindow::trailing(day(31), 30).unwrap();
        assert_eq!(window.days(), 30);
        assert!(window.contains(day(1)));
        assert!(!window.contains(day(31)));
        assert!(TimeWindow::trailing(day(31), 0).is_err());
        assert!(TimeWindow::new(day(2), day(1)).is_err());
    }

    #[test]
    fn test_resource_monthly_cost() {
        let volume = ResourceRecord::new("vol-1", ResourceKind::Volume, ResourceState::Available)
            .with_cost(100.0, 0.08);
        assert!((volume.monthly_cost() - 8.0).abs() < 1e-9);
        assert!(volume.is_billable());

        let gone = ResourceRecord::new("i-1", ResourceKind::Instance, ResourceState::Terminated);
        assert!(!gone.is_billable());
    }

    #[test]
    fn test_resource_kind_parsing() {
        assert_eq!("EBS".parse::<ResourceKind>().unwrap(), ResourceKind::Volume);
        assert_eq!(
            "snapshot".parse::<ResourceKind>().unwrap(),
            ResourceKind::Snapshot
        );
        assert!("bucket".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn test_resource_record_deserializes_with_defaults() {
        let json = r#"{"id":"eip-1","kind":"address","state":"available","unit_cost":3.6}"#;
        let record: ResourceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.size, 1.0);
        assert!(record.attached_to.is_none());
        assert!((record.monthly_cost() - 3.6).abs() < 1e-9);
    }
}
