//! Result types produced by the engine
//!
//! Every numeric result carries a `Provenance`. `StructuredResult` is the
//! tagged union returned by `Engine::handle_request`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::Intent;
use crate::commitment::{Payment, Term};
use crate::error::Error;
use crate::models::{Provenance, ResourceKind, Status};

// ========== Forecast ==========

/// Ensemble weight of one estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorWeight {
    pub name: String,
    pub weight: f64,
    pub backtest_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Series the forecast was made for (`total` or a dimension)
    pub dimension: String,
    pub horizon: usize,
    /// Period of `point[0]`, when known
    pub first_period: Option<NaiveDate>,
    pub point: Vec<f64>,
    pub lower: Vec<f64>,
    pub upper: Vec<f64>,
    pub confidence: f64,
    /// RMSE of the combined backtest; absent for heuristic results
    pub backtest_error: Option<f64>,
    pub weights: Vec<EstimatorWeight>,
    pub provenance: Provenance,
    pub status: Status,
}

impl ForecastResult {
    /// Sum of point forecasts over the horizon
    pub fn total(&self) -> f64 {
        self.point.iter().sum()
    }

    pub fn total_lower(&self) -> f64 {
        self.lower.iter().sum()
    }

    pub fn total_upper(&self) -> f64 {
        self.upper.iter().sum()
    }

    /// Lengths match the horizon and every point lies inside its band
    pub fn is_consistent(&self) -> bool {
        self.point.len() == self.horizon
            && self.lower.len() == self.horizon
            && self.upper.len() == self.horizon
            && self
                .point
                .iter()
                .zip(&self.lower)
                .zip(&self.upper)
                .all(|((p, l), u)| *l >= 0.0 && l <= p && p <= u)
    }
}

// ========== Anomalies ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    pub period: NaiveDate,
    pub dimension: String,
    pub observed: f64,
    /// Rolling mean of the window
    pub expected: f64,
    pub z_score: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub series_evaluated: usize,
    pub points_evaluated: usize,
    pub total: usize,
    /// Anomalies per evaluated point, in percent
    pub anomaly_rate: f64,
    pub max_abs_z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub threshold: f64,
    pub window: usize,
    /// Anomalies in the aggregate daily total
    pub aggregate: Vec<AnomalyRecord>,
    /// Per-dimension anomalies, largest |z| first
    pub by_dimension: Vec<AnomalyRecord>,
    pub summary: AnomalySummary,
    pub provenance: Provenance,
    pub status: Status,
}

// ========== Optimization ==========

/// Kind of optimization opportunity, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityCategory {
    StoppedInstance,
    UnattachedVolume,
    UnassociatedAddress,
    OrphanedSnapshot,
    UnderutilizedInstance,
}

impl OpportunityCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoppedInstance => "stopped_instance",
            Self::UnattachedVolume => "unattached_volume",
            Self::UnassociatedAddress => "unassociated_address",
            Self::OrphanedSnapshot => "orphaned_snapshot",
            Self::UnderutilizedInstance => "underutilized_instance",
        }
    }

    /// Recommended action
    pub fn action(&self) -> &'static str {
        match self {
            Self::StoppedInstance => "snapshot and terminate",
            Self::UnattachedVolume => "delete",
            Self::UnassociatedAddress => "release",
            Self::OrphanedSnapshot => "delete",
            Self::UnderutilizedInstance => "downsize",
        }
    }

    pub fn all() -> &'static [OpportunityCategory] {
        &[
            Self::StoppedInstance,
            Self::UnattachedVolume,
            Self::UnassociatedAddress,
            Self::OrphanedSnapshot,
            Self::UnderutilizedInstance,
        ]
    }
}

impl fmt::Display for OpportunityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationOpportunity {
    pub resource_id: String,
    pub category: OpportunityCategory,
    pub resource_kind: ResourceKind,
    pub monthly_cost: f64,
    pub action: String,
    /// Never more than `monthly_cost`
    pub estimated_savings: f64,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub category: OpportunityCategory,
    pub count: usize,
    pub monthly_savings: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub resources_scanned: usize,
    pub opportunities: Vec<OptimizationOpportunity>,
    /// Only categories with at least one opportunity
    pub categories: Vec<CategorySummary>,
    pub total_monthly_savings: f64,
    pub total_annual_savings: f64,
    pub provenance: Provenance,
    pub status: Status,
}

// ========== Savings commitment ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoRecommendationReason {
    InsufficientHistory,
    AlreadyCovered,
    UsageTooVolatile,
}

impl NoRecommendationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientHistory => "insufficient_history",
            Self::AlreadyCovered => "already_covered",
            Self::UsageTooVolatile => "usage_too_volatile",
        }
    }
}

impl fmt::Display for NoRecommendationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum CommitmentStatus {
    Recommended,
    NoRecommendation(NoRecommendationReason),
}

impl CommitmentStatus {
    pub fn is_recommended(&self) -> bool {
        matches!(self, CommitmentStatus::Recommended)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitmentRecommendation {
    pub term: Term,
    pub payment: Payment,
    pub status: CommitmentStatus,
    /// Committed $/hour; zero unless recommended
    pub hourly_rate: f64,
    pub estimated_annual_savings: f64,
    pub roi: f64,
    pub discount: f64,
    /// Strict minimum $/hour over the lookback window
    pub sustained_minimum: f64,
    pub existing_commitment: f64,
    pub coefficient_of_variation: f64,
    /// Periods the recommendation was computed over
    pub lookback_periods: usize,
    pub provenance: Provenance,
}

// ========== Tag compliance ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NonCompliantResource {
    pub resource_id: String,
    pub kind: ResourceKind,
    pub missing: Vec<String>,
    pub monthly_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagComplianceReport {
    pub required_tags: Vec<String>,
    pub total_resources: usize,
    pub compliant: usize,
    pub non_compliant: Vec<NonCompliantResource>,
    /// Percent of compliant resources (100 when there are none)
    pub compliance_rate: f64,
    pub missing_tag_counts: BTreeMap<String, usize>,
    /// Monthly cost of non-compliant resources
    pub untagged_monthly_cost: f64,
    pub provenance: Provenance,
    pub status: Status,
}

// ========== Overview ==========

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionShare {
    pub dimension: String,
    pub amount: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOverview {
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
    pub total: f64,
    pub periods: usize,
    pub daily_average: f64,
    pub projected_monthly: f64,
    pub top_dimensions: Vec<DimensionShare>,
    pub provenance: Provenance,
    pub status: Status,
}

// ========== Composition ==========

/// A failed component or request, rendered for presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    /// Component that failed (absent for whole-request failures)
    pub component: Option<Intent>,
    pub kind: String,
    /// Underlying kind when `kind` is `partial_component_failure`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
    pub message: String,
    pub retryable: bool,
}

impl ErrorReport {
    pub fn new(component: Option<Intent>, err: &Error) -> Self {
        Self {
            component,
            kind: err.kind().to_string(),
            cause: err.cause().map(str::to_string),
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// One intent's result inside a compound report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub intent: Intent,
    pub result: StructuredResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundReport {
    /// Sections in intent priority order
    pub sections: Vec<Section>,
}

impl CompoundReport {
    pub fn section(&self, intent: Intent) -> Option<&StructuredResult> {
        self.sections
            .iter()
            .find(|s| s.intent == intent)
            .map(|s| &s.result)
    }

    /// Sections that failed
    pub fn failures(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|s| s.result.is_error())
    }
}

/// Everything `Engine::handle_request` can return
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StructuredResult {
    Forecast(ForecastResult),
    AnomalyList(AnomalyReport),
    OptimizationReport(OptimizationReport),
    CommitmentRecommendation(CommitmentRecommendation),
    TagCompliance(TagComplianceReport),
    CostOverview(CostOverview),
    Compound(CompoundReport),
    Error(ErrorReport),
}

impl StructuredResult {
    /// Render a top-level failure
    pub fn from_error(err: &Error) -> Self {
        StructuredResult::Error(ErrorReport::new(None, err))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Forecast(_) => "forecast",
            Self::AnomalyList(_) => "anomaly_list",
            Self::OptimizationReport(_) => "optimization_report",
            Self::CommitmentRecommendation(_) => "commitment_recommendation",
            Self::TagCompliance(_) => "tag_compliance",
            Self::CostOverview(_) => "cost_overview",
            Self::Compound(_) => "compound",
            Self::Error(_) => "error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}
