//! Ingestion boundary
//!
//! The engine reads cost history and resource inventory only through the
//! `CostSource` and `InventorySource` traits. Sources are injected as
//! `Arc<dyn ...>` and may fail with `Error::UpstreamUnavailable`; retrying
//! is the caller's decision.
//!
//! # Implementations
//!
//! - `StaticSource`: in-memory snapshot, with optional injected latency and
//!   failures for tests and embedding
//! - `FileSource`: CSV cost export (`period,dimension,amount`) and a JSON
//!   array of resource records
//! - `CachedCostSource`: single-flight decorator over any `CostSource`

mod cache;
mod file;
mod memory;

pub use cache::CachedCostSource;
pub use file::FileSource;
pub use memory::StaticSource;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};

use crate::error::Result;
use crate::models::{
    CostObservation, Granularity, GroupBy, ResourceKind, ResourceRecord, TimeWindow,
    TOTAL_DIMENSION,
};

/// Source of historical cost observations
#[async_trait]
pub trait CostSource: Send + Sync {
    /// Name used in logs and upstream errors
    fn name(&self) -> &str;

    /// Observations with `window.start <= period < window.end`
    async fn fetch_cost_series(
        &self,
        window: TimeWindow,
        granularity: Granularity,
        group_by: GroupBy,
    ) -> Result<Vec<CostObservation>>;
}

/// Source of resource inventory snapshots
#[async_trait]
pub trait InventorySource: Send + Sync {
    fn name(&self) -> &str;

    /// Every resource of `kind`, or every resource when `kind` is `None`
    async fn fetch_inventory(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceRecord>>;
}

/// Restrict raw observations to a window and reshape them for a request.
///
/// Amounts are validated, monthly granularity buckets periods to the first
/// of the month, and `GroupBy::Total` collapses every dimension into one.
/// Output is ordered by (period, dimension).
pub fn shape_observations(
    raw: &[CostObservation],
    window: TimeWindow,
    granularity: Granularity,
    group_by: GroupBy,
) -> Result<Vec<CostObservation>> {
    let mut buckets: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
    for obs in raw.iter().filter(|o| window.contains(o.period)) {
        obs.validate()?;
        let period = match granularity {
            Granularity::Daily => obs.period,
            Granularity::Monthly => obs.period.with_day(1).unwrap_or(obs.period),
        };
        let dimension = match group_by {
            GroupBy::Dimension => obs.dimension.clone(),
            GroupBy::Total => TOTAL_DIMENSION.to_string(),
        };
        *buckets.entry((period, dimension)).or_insert(0.0) += obs.amount;
    }

    Ok(buckets
        .into_iter()
        .map(|((period, dimension), amount)| CostObservation {
            period,
            dimension,
            amount,
        })
        .collect())
}

/// Keep resources of one kind (all when `kind` is `None`)
pub fn filter_inventory(
    inventory: &[ResourceRecord],
    kind: Option<ResourceKind>,
) -> Vec<ResourceRecord> {
    inventory
        .iter()
        .filter(|r| kind.map_or(true, |k| r.kind == k))
        .cloned()
        .collect()
}
