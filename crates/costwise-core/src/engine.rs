//! Response composer
//!
//! The engine classifies a request, fetches the cost and inventory snapshots
//! its intents need (once, concurrently, under a timeout), runs one component
//! per intent on the blocking pool and merges the results in intent priority
//! order.
//!
//! A single intent returns its component's result or error directly. A
//! compound request always returns a `CompoundReport`; a failed component
//! becomes an `Error` section and the other sections are kept.

use std::sync::Arc;
use std::time::Instant;

use chrono::{NaiveDate, Utc};
use tokio_util::sync::CancellationToken;

use crate::anomaly::AnomalyDetector;
use crate::classify::{Classifier, Intent};
use crate::commitment::{usage_rate_series, CommitmentRecommender, Payment, Term};
use crate::config::{AnomalyConfig, EngineConfig};
use crate::error::{Error, Result};
use crate::forecast::{self, Forecaster};
use crate::ingest::{CostSource, InventorySource};
use crate::models::{
    CostObservation, Granularity, GroupBy, Provenance, ResourceRecord, Status, TimeSeries,
    TimeWindow,
};
use crate::optimize::OptimizationScanner;
use crate::overview;
use crate::result::{CompoundReport, ErrorReport, Section, StructuredResult};
use crate::tags::TagComplianceScanner;

/// Per-request overrides; anything unset comes from `EngineConfig`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams {
    pub horizon: Option<usize>,
    /// Forecast interval confidence, in (0, 1)
    pub confidence: Option<f64>,
    /// Exclusive end of every lookback window (defaults to today)
    pub as_of: Option<NaiveDate>,
    /// Restrict forecasting and anomaly detection to one dimension
    pub dimension: Option<String>,
    pub term: Option<Term>,
    pub payment: Option<Payment>,
    /// $/hour already covered by commitments
    pub existing_commitment: Option<f64>,
    pub anomaly_threshold: Option<f64>,
    pub anomaly_window: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub query: String,
    /// Skips classification when set
    pub intent: Option<Intent>,
    pub params: RequestParams,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    /// Structured request for exactly one intent
    pub fn for_intent(intent: Intent) -> Self {
        Self {
            intent: Some(intent),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: RequestParams) -> Self {
        self.params = params;
        self
    }
}

/// Request parameters after defaults and validation
#[derive(Debug, Clone)]
struct Plan {
    horizon: usize,
    confidence: f64,
    as_of: NaiveDate,
    dimension: Option<String>,
    term: Term,
    payment: Payment,
    existing_commitment: f64,
    anomaly: AnomalyConfig,
}

/// Immutable inputs shared by every component of one request
#[derive(Debug, Default)]
struct Snapshot {
    costs: Vec<CostObservation>,
    /// Why cost data is missing when the fetch timed out
    costs_degraded: Option<String>,
    inventory: Vec<ResourceRecord>,
    /// Why inventory is missing when its fetch failed or timed out
    inventory_degraded: Option<String>,
}

/// What came back from one upstream
enum Fetched<T> {
    Ready(T),
    TimedOut,
    Failed(Error),
    Skipped,
}

pub struct Engine {
    config: Arc<EngineConfig>,
    classifier: Classifier,
    costs: Arc<dyn CostSource>,
    inventory: Arc<dyn InventorySource>,
}

impl Engine {
    pub fn new(
        config: EngineConfig,
        costs: Arc<dyn CostSource>,
        inventory: Arc<dyn InventorySource>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            classifier: Classifier::default(),
            costs,
            inventory,
        }
    }

    /// Replace the default lexical classifier
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Intents a request resolves to, in priority order
    pub fn classify(&self, request: &Request) -> Vec<Intent> {
        self.classifier.classify(&request.query, request.intent)
    }

    /// Answer one request.
    ///
    /// Parameters are validated before anything is fetched. Cancelling
    /// `cancel` aborts outstanding fetches and the join with
    /// `Error::Cancelled`.
    pub async fn handle_request(
        &self,
        request: &Request,
        cancel: &CancellationToken,
    ) -> Result<StructuredResult> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let started = Instant::now();
        let plan = self.plan(&request.params)?;
        let intents = self.classify(request);
        tracing::debug!(intents = ?intents, as_of = %plan.as_of, "Classified request");

        let cost_window = self.cost_window(&intents, plan.as_of)?;
        let (costs, inventory) = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            fetched = self.fetch(cost_window, intents.iter().any(|i| i.needs_inventory())) => fetched,
        };

        let mut snapshot = Snapshot::default();
        let mut cost_error = None;
        let mut inventory_error = None;
        match costs {
            Fetched::Ready(costs) => snapshot.costs = costs,
            Fetched::TimedOut => {
                let reason = format!(
                    "cost fetch from {} timed out after {}s",
                    self.costs.name(),
                    self.config.ingest.fetch_timeout.as_secs_f64()
                );
                tracing::warn!(source = self.costs.name(), "Cost fetch timed out, degrading");
                snapshot.costs_degraded = Some(reason);
            }
            Fetched::Failed(e) => cost_error = Some(e),
            Fetched::Skipped => {}
        }
        match inventory {
            Fetched::Ready(inventory) => snapshot.inventory = inventory,
            Fetched::TimedOut => {
                inventory_error = Some(Error::upstream(
                    self.inventory.name(),
                    format!(
                        "inventory fetch timed out after {}s",
                        self.config.ingest.fetch_timeout.as_secs_f64()
                    ),
                    true,
                ));
            }
            Fetched::Failed(e) => inventory_error = Some(e),
            Fetched::Skipped => {}
        }
        if let Some(e) = &inventory_error {
            tracing::warn!(source = self.inventory.name(), error = %e, "Inventory unavailable");
            snapshot.inventory_degraded = Some(e.to_string());
        }

        // Single intents surface fetch failures as the request's error
        if let [intent] = intents.as_slice() {
            if let Some(e) = take_blocking_error(*intent, &mut cost_error, &mut inventory_error) {
                tracing::warn!(intent = intent.as_str(), error = %e, "Request failed upstream");
                return Err(e);
            }
        }

        let snapshot = Arc::new(snapshot);
        let plan = Arc::new(plan);
        let mut pending = Vec::with_capacity(intents.len());
        let mut sections: Vec<(Intent, Result<StructuredResult>)> = Vec::new();
        for &intent in &intents {
            if let Some(e) = blocking_error(intent, &cost_error, &inventory_error) {
                sections.push((intent, Err(partial_failure(intent, e))));
                continue;
            }
            let config = self.config.clone();
            let snapshot = snapshot.clone();
            let plan = plan.clone();
            let handle = tokio::task::spawn_blocking(move || {
                run_component(intent, &config, &plan, &snapshot)
            });
            pending.push((intent, handle));
        }

        let joined = tokio::select! {
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            joined = async {
                let mut out = Vec::with_capacity(pending.len());
                for (intent, handle) in pending {
                    out.push((intent, handle.await.map_err(Error::from).and_then(|r| r)));
                }
                out
            } => joined,
        };
        sections.extend(joined);
        sections.sort_by_key(|(intent, _)| intent.priority());

        let result = if sections.len() == 1 {
            let (intent, outcome) = sections.remove(0);
            if let Err(e) = &outcome {
                tracing::warn!(intent = intent.as_str(), error = %e, "Component failed");
            }
            outcome?
        } else {
            let sections = sections
                .into_iter()
                .map(|(intent, outcome)| {
                    let result = match outcome {
                        Ok(result) => result,
                        Err(e) => {
                            tracing::warn!(
                                intent = intent.as_str(),
                                error = %e,
                                "Component failed, keeping other sections"
                            );
                            let failure = Error::partial(intent.as_str(), e);
                            StructuredResult::Error(ErrorReport::new(Some(intent), &failure))
                        }
                    };
                    Section { intent, result }
                })
                .collect();
            StructuredResult::Compound(CompoundReport { sections })
        };

        tracing::info!(
            kind = result.kind(),
            intents = intents.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Request complete"
        );
        Ok(result)
    }

    fn plan(&self, params: &RequestParams) -> Result<Plan> {
        let fc = &self.config.forecast;
        let horizon = params.horizon.unwrap_or(fc.default_horizon as usize);
        let confidence = params.confidence.unwrap_or(fc.default_confidence);
        forecast::validate_params(horizon, confidence, fc.max_horizon)?;

        let existing_commitment = params.existing_commitment.unwrap_or(0.0);
        if !existing_commitment.is_finite() || existing_commitment < 0.0 {
            return Err(Error::InvalidParameter(format!(
                "existing commitment must be a non-negative $/hour, got {}",
                existing_commitment
            )));
        }

        let mut anomaly = self.config.anomaly.clone();
        if let Some(threshold) = params.anomaly_threshold {
            if !(threshold.is_finite() && threshold > 0.0) {
                return Err(Error::InvalidParameter(format!(
                    "anomaly threshold must be positive, got {}",
                    threshold
                )));
            }
            anomaly.threshold = threshold;
        }
        if let Some(window) = params.anomaly_window {
            if window < 2 || window > anomaly.max_window {
                return Err(Error::InvalidParameter(format!(
                    "anomaly window must be within 2..={} periods, got {}",
                    anomaly.max_window, window
                )));
            }
            anomaly.window = window;
            anomaly.min_history = anomaly.min_history.min(window);
        }

        if let Some(dimension) = &params.dimension {
            if dimension.trim().is_empty() {
                return Err(Error::InvalidParameter("dimension must not be empty".into()));
            }
        }

        Ok(Plan {
            horizon,
            confidence,
            as_of: params.as_of.unwrap_or_else(|| Utc::now().date_naive()),
            dimension: params.dimension.clone(),
            term: params.term.unwrap_or(Term::OneYear),
            payment: params.payment.unwrap_or(Payment::NoUpfront),
            existing_commitment,
            anomaly,
        })
    }

    /// Widest lookback any cost-dependent intent needs, or `None`
    fn cost_window(&self, intents: &[Intent], as_of: NaiveDate) -> Result<Option<TimeWindow>> {
        let days = intents
            .iter()
            .filter(|i| i.needs_costs())
            .map(|i| lookback_days(&self.config, *i))
            .max();
        days.map(|days| TimeWindow::trailing(as_of, days)).transpose()
    }

    async fn fetch(
        &self,
        cost_window: Option<TimeWindow>,
        needs_inventory: bool,
    ) -> (Fetched<Vec<CostObservation>>, Fetched<Vec<ResourceRecord>>) {
        let timeout = self.config.ingest.fetch_timeout;

        let costs = async {
            let Some(window) = cost_window else {
                return Fetched::Skipped;
            };
            let fetch = self
                .costs
                .fetch_cost_series(window, Granularity::Daily, GroupBy::Dimension);
            match tokio::time::timeout(timeout, fetch).await {
                Ok(Ok(costs)) => {
                    tracing::debug!(source = self.costs.name(), rows = costs.len(), "Fetched costs");
                    Fetched::Ready(costs)
                }
                Ok(Err(e)) => Fetched::Failed(e),
                Err(_) => Fetched::TimedOut,
            }
        };

        let inventory = async {
            if !needs_inventory {
                return Fetched::Skipped;
            }
            match tokio::time::timeout(timeout, self.inventory.fetch_inventory(None)).await {
                Ok(Ok(inventory)) => {
                    tracing::debug!(
                        source = self.inventory.name(),
                        resources = inventory.len(),
                        "Fetched inventory"
                    );
                    Fetched::Ready(inventory)
                }
                Ok(Err(e)) => Fetched::Failed(e),
                Err(_) => Fetched::TimedOut,
            }
        };

        tokio::join!(costs, inventory)
    }
}

fn lookback_days(config: &EngineConfig, intent: Intent) -> u32 {
    match intent {
        Intent::Forecast => config.forecast.lookback_days,
        Intent::Anomaly => config.anomaly.lookback_days,
        Intent::SavingsCommitment => config.commitment.lookback_days,
        Intent::General => config.overview.lookback_days,
        Intent::Optimize | Intent::TagCompliance => 0,
    }
}

/// Inventory is optional for forecasting (fallback only)
fn requires_inventory(intent: Intent) -> bool {
    matches!(intent, Intent::Optimize | Intent::TagCompliance)
}

fn blocking_error<'a>(
    intent: Intent,
    cost_error: &'a Option<Error>,
    inventory_error: &'a Option<Error>,
) -> Option<&'a Error> {
    if intent.needs_costs() {
        if let Some(e) = cost_error {
            return Some(e);
        }
    }
    if requires_inventory(intent) {
        if let Some(e) = inventory_error {
            return Some(e);
        }
    }
    None
}

fn take_blocking_error(
    intent: Intent,
    cost_error: &mut Option<Error>,
    inventory_error: &mut Option<Error>,
) -> Option<Error> {
    if intent.needs_costs() && cost_error.is_some() {
        return cost_error.take();
    }
    if requires_inventory(intent) {
        return inventory_error.take();
    }
    None
}

/// A fetch failure shared by several sections, charged to one of them
fn partial_failure(intent: Intent, e: &Error) -> Error {
    Error::PartialComponentFailure {
        component: intent.as_str().to_string(),
        cause: e.kind(),
        message: e.to_string(),
        retryable: e.is_retryable(),
    }
}

/// Observations inside an intent's trailing lookback
fn in_lookback(
    observations: &[CostObservation],
    as_of: NaiveDate,
    days: u32,
    dimension: Option<&str>,
) -> Result<Vec<CostObservation>> {
    let window = TimeWindow::trailing(as_of, days)?;
    Ok(observations
        .iter()
        .filter(|o| window.contains(o.period))
        .filter(|o| dimension.map_or(true, |d| o.dimension == d))
        .cloned()
        .collect())
}

fn ensure_dimension_known(snapshot: &Snapshot, dimension: Option<&str>) -> Result<()> {
    match dimension {
        Some(d)
            if snapshot.costs_degraded.is_none()
                && !snapshot.costs.iter().any(|o| o.dimension == d) =>
        {
            Err(Error::InvalidParameter(format!(
                "dimension {} has no cost observations",
                d
            )))
        }
        _ => Ok(()),
    }
}

/// Replace an Ok status with the degraded-fetch reason
fn degrade(status: &mut Status, snapshot: &Snapshot) {
    if let Some(reason) = &snapshot.costs_degraded {
        *status = Status::InsufficientData(reason.clone());
    }
}

fn run_component(
    intent: Intent,
    config: &EngineConfig,
    plan: &Plan,
    snapshot: &Snapshot,
) -> Result<StructuredResult> {
    let dimension = plan.dimension.as_deref();
    let result = match intent {
        Intent::Forecast => {
            ensure_dimension_known(snapshot, dimension)?;
            let observations = in_lookback(
                &snapshot.costs,
                plan.as_of,
                config.forecast.lookback_days,
                dimension,
            )?;
            let series = match dimension {
                Some(d) => TimeSeries::daily(d, &observations),
                None => TimeSeries::total(&observations),
            };
            let mut result = Forecaster::new(config.forecast.clone()).forecast(
                &series,
                plan.horizon,
                plan.confidence,
                &snapshot.inventory,
            )?;
            degrade(&mut result.status, snapshot);
            if result.provenance == Provenance::HeuristicFallback {
                if let Some(missing) = &snapshot.inventory_degraded {
                    result
                        .status
                        .annotate(&format!("no inventory for the fallback estimate ({})", missing));
                }
            }
            StructuredResult::Forecast(result)
        }
        Intent::Anomaly => {
            ensure_dimension_known(snapshot, dimension)?;
            let observations = in_lookback(
                &snapshot.costs,
                plan.as_of,
                config.anomaly.lookback_days,
                dimension,
            )?;
            let mut report = AnomalyDetector::new(plan.anomaly.clone()).detect_all(&observations);
            degrade(&mut report.status, snapshot);
            StructuredResult::AnomalyList(report)
        }
        Intent::Optimize => StructuredResult::OptimizationReport(
            OptimizationScanner::new(config.optimize.clone()).scan(&snapshot.inventory),
        ),
        Intent::SavingsCommitment => {
            let observations = in_lookback(
                &snapshot.costs,
                plan.as_of,
                config.commitment.lookback_days,
                None,
            )?;
            let usage = usage_rate_series(&observations, &config.commitment.dimensions);
            StructuredResult::CommitmentRecommendation(
                CommitmentRecommender::new(config.commitment.clone()).recommend(
                    &usage,
                    plan.term,
                    plan.payment,
                    plan.existing_commitment,
                )?,
            )
        }
        Intent::TagCompliance => StructuredResult::TagCompliance(
            TagComplianceScanner::new(config.tags.clone()).scan(&snapshot.inventory),
        ),
        Intent::General => {
            let observations = in_lookback(
                &snapshot.costs,
                plan.as_of,
                config.overview.lookback_days,
                None,
            )?;
            let mut overview = overview::summarize(&observations, &config.overview);
            degrade(&mut overview.status, snapshot);
            StructuredResult::CostOverview(overview)
        }
    };
    tracing::debug!(intent = intent.as_str(), kind = result.kind(), "Component finished");
    Ok(result)
}
