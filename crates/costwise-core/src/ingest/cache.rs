//! Single-flight cost cache
//!
//! Concurrent requests for the same (window, granularity, group-by) key share
//! one upstream fetch. Each key owns a `tokio::sync::OnceCell`; the first
//! caller runs the fetch and the others await the same cell. A failed fetch
//! leaves the cell empty, so the next caller retries upstream.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OnceCell};

use crate::error::Result;
use crate::models::{CostObservation, Granularity, GroupBy, TimeWindow};

use super::CostSource;

type CacheKey = (GroupBy, TimeWindow, Granularity);
type Cell = Arc<OnceCell<Arc<Vec<CostObservation>>>>;

pub struct CachedCostSource {
    inner: Arc<dyn CostSource>,
    cells: Mutex<HashMap<CacheKey, Cell>>,
}

impl CachedCostSource {
    pub fn new(inner: Arc<dyn CostSource>) -> Self {
        Self {
            inner,
            cells: Mutex::new(HashMap::new()),
        }
    }

    /// Number of keys with a cell (filled or in flight)
    pub async fn len(&self) -> usize {
        self.cells.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop every cached series
    pub async fn clear(&self) {
        self.cells.lock().await.clear();
    }

    async fn cell(&self, key: CacheKey) -> Cell {
        let mut cells = self.cells.lock().await;
        cells
            .entry(key)
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}

#[async_trait]
impl CostSource for CachedCostSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch_cost_series(
        &self,
        window: TimeWindow,
        granularity: Granularity,
        group_by: GroupBy,
    ) -> Result<Vec<CostObservation>> {
        let cell = self.cell((group_by, window, granularity)).await;
        let series = cell
            .get_or_try_init(|| async {
                tracing::debug!(
                    "Cache miss for {} {}..{} ({})",
                    self.inner.name(),
                    window.start,
                    window.end,
                    granularity
                );
                self.inner
                    .fetch_cost_series(window, granularity, group_by)
                    .await
                    .map(Arc::new)
            })
            .await?;
        Ok(series.as_ref().clone())
    }
}
