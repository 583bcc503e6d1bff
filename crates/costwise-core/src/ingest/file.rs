//! File-backed source
//!
//! Reads a CSV cost export with `period,dimension,amount` columns and a JSON
//! array of resource records. Files are re-read on every fetch; wrap the
//! source in `CachedCostSource` to share one read between concurrent
//! requests.
//!
//! Unreadable or malformed files surface as non-retryable
//! `UpstreamUnavailable` errors; the parse helpers keep the underlying kind.

use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::NaiveDate;
use csv::ReaderBuilder;
use serde::Deserialize;

use crate::error::{Error, Result};
use crate::models::{CostObservation, Granularity, GroupBy, ResourceKind, ResourceRecord, TimeWindow};

use super::{filter_inventory, shape_observations, CostSource, InventorySource};

#[derive(Debug, Deserialize)]
struct CostRow {
    period: String,
    dimension: String,
    amount: f64,
}

/// Parse a date in the formats cost exports commonly use
fn parse_period(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    // Billing exports often carry a timestamp; keep the date part
    let date_part = s.split(|c: char| c == 'T' || c == ' ').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%m/%d/%Y"))
        .map_err(|_| Error::InvalidParameter(format!("Invalid period date: {}", s)))
}

/// Parse a `period,dimension,amount` CSV export
pub fn parse_cost_csv<R: Read>(reader: R) -> Result<Vec<CostObservation>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut observations = Vec::new();
    for row in rdr.deserialize() {
        let row: CostRow = row?;
        observations.push(CostObservation::new(
            parse_period(&row.period)?,
            row.dimension,
            row.amount,
        )?);
    }
    Ok(observations)
}

/// Parse a JSON array of resource records
pub fn parse_inventory_json(content: &str) -> Result<Vec<ResourceRecord>> {
    Ok(serde_json::from_str(content)?)
}

/// A file that can't be read or parsed is an upstream outage
fn unavailable(path: &Path, cause: Error) -> Error {
    tracing::warn!("Failed to load {}: {}", path.display(), cause);
    Error::upstream("file", format!("{}: {}", path.display(), cause), false)
}

/// Local files standing in for a billing export and an inventory API
#[derive(Debug, Clone, Default)]
pub struct FileSource {
    costs: Option<PathBuf>,
    inventory: Option<PathBuf>,
}

impl FileSource {
    /// A source with no files serves empty data
    pub fn new(costs: Option<PathBuf>, inventory: Option<PathBuf>) -> Self {
        Self { costs, inventory }
    }

    pub fn costs_path(&self) -> Option<&Path> {
        self.costs.as_deref()
    }

    pub fn inventory_path(&self) -> Option<&Path> {
        self.inventory.as_deref()
    }

    async fn read(path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| unavailable(path, Error::Io(e)))
    }
}

#[async_trait]
impl CostSource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_cost_series(
        &self,
        window: TimeWindow,
        granularity: Granularity,
        group_by: GroupBy,
    ) -> Result<Vec<CostObservation>> {
        let Some(path) = &self.costs else {
            return Ok(Vec::new());
        };
        let content = Self::read(path).await?;
        let raw = parse_cost_csv(content.as_bytes()).map_err(|e| unavailable(path, e))?;
        tracing::debug!("Read {} cost rows from {}", raw.len(), path.display());
        shape_observations(&raw, window, granularity, group_by)
    }
}

#[async_trait]
impl InventorySource for FileSource {
    fn name(&self) -> &str {
        "file"
    }

    async fn fetch_inventory(&self, kind: Option<ResourceKind>) -> Result<Vec<ResourceRecord>> {
        let Some(path) = &self.inventory else {
            return Ok(Vec::new());
        };
        let content = Self::read(path).await?;
        let inventory = parse_inventory_json(&content).map_err(|e| unavailable(path, e))?;
        tracing::debug!("Read {} resources from {}", inventory.len(), path.display());
        Ok(filter_inventory(&inventory, kind))
    }
}
