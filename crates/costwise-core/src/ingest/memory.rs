//! In-memory source
//!
//! Serves a fixed snapshot. Latency and failures can be injected so the
//! engine's timeout, cancellation and partial-failure paths can be tested
//! without a real upstream.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::{CostObservation, Granularity, GroupBy, ResourceKind, ResourceRecord, TimeWindow};

use super::{filter_inventory, shape_observations, CostSource, InventorySource};

/// In-memory cost and inventory snapshot
#[derive(Debug, Default)]
pub struct StaticSource {
    costs: Vec<CostObservation>,
    inventory: Vec<ResourceRecord>,
    /// Delay before every fetch
    latency: Option<Duration>,
    /// Fail cost fetches (value is `retryable`)
    cost_failure: Option<bool>,
    /// Fail inventory fetches (value is `retryable`)
    inventory_failure: Option<bool>,
    cost_fetches: AtomicUsize,
    inventory_fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(costs: Vec<CostObservation>, inventory: Vec<ResourceRecord>) -> Self {
        Self {
            costs,
            inventory,
            ..Default::default()
        }
    }

    /// Source with no data at all
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn failing_costs(mut self, retryable: bool) -> Self {
        self.cost_failure = Some(retryable);
        self
    }

    pub fn failing_inventory(mut self, retryable: bool) -> Self {
        self.inventory_failure = Some(retryable);
        self
    }

    /// Number of cost fetches served (including failed ones)
    pub fn cost_fetches(&self) -> usize {
        self.cost_fetches.load(Ordering::SeqCst)
    }

    pub fn inventory_fetches(&self) -> usize {
        self.inventory_fetches.load(Ordering::SeqCst)
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn failure(&self, retryable: bool, what: &str) -> Error {
        Error::upstream(
            CostSource::name(self),
            format!("injected {} failure", what),
            retryable,
        )
    }
}

#[async_trait]
impl CostSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_cost_series(
        &self,
        window: TimeWindow,
        granularity: Granularity,
        group_by: GroupBy,
    ) -> Result<Vec<CostObservation>> {
        self.cost_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if let Some(retryable) = self.cost_failure {
            return Err(self.failure(retryable, "cost"));
        }
        shape_observations(&self.costs, window, granularity, group_by)
    }
}

#[async_trait]
impl InventorySource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn fetch_inventory(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceRecord>> {
        self.inventory_fetches.fetch_add(1, Ordering::SeqCst);
        self.delay().await;
        if let Some(retryable) = self.inventory_failure {
            return Err(self.failure(retryable, "inventory"));
        }
        Ok(filter_inventory(&self.inventory, kind))
    }
}
