//! Resource optimization scanner
//!
//! Scans an inventory snapshot for resources that cost money without doing
//! useful work:
//! - Stopped instances still billed for attached storage
//! - Unattached volumes
//! - Unassociated addresses
//! - Snapshots whose source resource no longer exists
//! - Running instances whose utilization stays below the CPU threshold
//!
//! Output is sorted by (category, resource id), so identical inventories
//! always produce identical reports.

use std::collections::HashSet;

use crate::config::OptimizeConfig;
use crate::models::{
    resource_ids, Provenance, ResourceKind, ResourceRecord, ResourceState, Status,
};
use crate::result::{
    CategorySummary, OpportunityCategory, OptimizationOpportunity, OptimizationReport,
};

const MONTHS_PER_YEAR: f64 = 12.0;

pub struct OptimizationScanner {
    config: OptimizeConfig,
}

impl OptimizationScanner {
    pub fn new(config: OptimizeConfig) -> Self {
        Self { config }
    }

    /// Scan an inventory snapshot
    pub fn scan(&self, inventory: &[ResourceRecord]) -> OptimizationReport {
        let ids = resource_ids(inventory);

        let mut opportunities: Vec<OptimizationOpportunity> = inventory
            .iter()
            .filter_map(|resource| self.evaluate(resource, &ids))
            .collect();
        opportunities.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.resource_id.cmp(&b.resource_id))
        });

        let categories: Vec<CategorySummary> = OpportunityCategory::all()
            .iter()
            .filter_map(|category| {
                let matching: Vec<_> = opportunities
                    .iter()
                    .filter(|o| o.category == *category)
                    .collect();
                if matching.is_empty() {
                    return None;
                }
                Some(CategorySummary {
                    category: *category,
                    count: matching.len(),
                    monthly_savings: matching.iter().map(|o| o.estimated_savings).sum(),
                })
            })
            .collect();

        let total_monthly_savings: f64 = opportunities.iter().map(|o| o.estimated_savings).sum();

        tracing::debug!(
            "Scanned {} resources: {} opportunities, ${:.2}/month",
            inventory.len(),
            opportunities.len(),
            total_monthly_savings
        );

        OptimizationReport {
            resources_scanned: inventory.len(),
            opportunities,
            categories,
            total_monthly_savings,
            total_annual_savings: total_monthly_savings * MONTHS_PER_YEAR,
            provenance: Provenance::DataBacked,
            status: Status::Ok,
        }
    }

    fn evaluate(
        &self,
        resource: &ResourceRecord,
        ids: &HashSet<&str>,
    ) -> Option<OptimizationOpportunity> {
        let monthly_cost = resource.monthly_cost();
        let (category, savings, detail) = match (resource.kind, resource.state) {
            (_, ResourceState::Terminated) => return None,
            (ResourceKind::Instance, ResourceState::Stopped) => (
                OpportunityCategory::StoppedInstance,
                monthly_cost,
                format!("stopped, still billed ${:.2}/month for storage", monthly_cost),
            ),
            (ResourceKind::Instance, ResourceState::Running) => {
                let average = self.underutilized_average(resource)?;
                let ratio = self.config.downsize_savings_ratio.clamp(0.0, 1.0);
                (
                    OpportunityCategory::UnderutilizedInstance,
                    monthly_cost * ratio,
                    format!(
                        "average CPU {:.1}%, every sample below {:.0}%",
                        average, self.config.cpu_threshold
                    ),
                )
            }
            (ResourceKind::Volume, _) if resource.attached_to.is_none() => (
                OpportunityCategory::UnattachedVolume,
                monthly_cost,
                format!("{:.0} GB not attached to any instance", resource.size),
            ),
            (ResourceKind::Address, _) if resource.attached_to.is_none() => (
                OpportunityCategory::UnassociatedAddress,
                monthly_cost,
                "not associated with any instance".to_string(),
            ),
            (ResourceKind::Snapshot, _) => {
                let parent = resource.parent_id.as_deref()?;
                if ids.contains(parent) {
                    return None;
                }
                (
                    OpportunityCategory::OrphanedSnapshot,
                    monthly_cost,
                    format!("source {} no longer exists", parent),
                )
            }
            _ => return None,
        };

        Some(OptimizationOpportunity {
            resource_id: resource.id.clone(),
            category,
            resource_kind: resource.kind,
            monthly_cost,
            action: category.action().to_string(),
            estimated_savings: savings.min(monthly_cost),
            detail,
        })
    }

    /// Average CPU of the trailing window when every sample in it is below
    /// the threshold and there are enough samples
    fn underutilized_average(&self, resource: &ResourceRecord) -> Option<f64> {
        let samples = &resource.utilization;
        let start = samples.len().saturating_sub(self.config.lookback_samples);
        let window = &samples[start..];

        if window.len() < self.config.min_samples || window.is_empty() {
            return None;
        }
        if !window.iter().all(|s| *s < self.config.cpu_threshold) {
            return None;
        }
        Some(window.iter().sum::<f64>() / window.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> OptimizationScanner {
        OptimizationScanner::new(OptimizeConfig::default())
    }

    fn inventory() -> Vec<ResourceRecord> {
        vec![
            ResourceRecord::new("i-stopped", ResourceKind::Instance, ResourceState::Stopped)
                .with_cost(50.0, 0.10),
            ResourceRecord::new("i-idle", ResourceKind::Instance, ResourceState::Running)
                .with_cost(1.0, 70.0)
                .with_utilization(vec![2.0; 30]),
            ResourceRecord::new("i-busy", ResourceKind::Instance, ResourceState::Running)
                .with_cost(1.0, 70.0)
                .with_utilization(vec![55.0; 30]),
            ResourceRecord::new("vol-free", ResourceKind::Volume, ResourceState::Available)
                .with_cost(100.0, 0.08),
            ResourceRecord::new("vol-used", ResourceKind::Volume, ResourceState::InUse)
                .with_cost(100.0, 0.08)
                .attached_to("i-busy"),
            ResourceRecord::new("eip-free", ResourceKind::Address, ResourceState::Available)
                .with_cost(1.0, 3.6),
            ResourceRecord::new("snap-orphan", ResourceKind::Snapshot, ResourceState::Available)
                .with_cost(20.0, 0.05)
                .with_parent("vol-deleted"),
            ResourceRecord::new("snap-ok", ResourceKind::Snapshot, ResourceState::Available)
                .with_cost(20.0, 0.05)
                .with_parent("vol-used"),
            ResourceRecord::new("snap-ami", ResourceKind::Snapshot, ResourceState::Available)
                .with_cost(20.0, 0.05),
            ResourceRecord::new("i-gone", ResourceKind::Instance, ResourceState::Terminated)
                .with_cost(50.0, 0.10),
        ]
    }

    #[test]
    fn test_finds_every_category() {
        let report = scanner().scan(&inventory());
        let found: Vec<(&str, OpportunityCategory)> = report
            .opportunities
            .iter()
            .map(|o| (o.resource_id.as_str(), o.category))
            .collect();

        assert_eq!(
            found,
            vec![
                ("i-stopped", OpportunityCategory::StoppedInstance),
                ("vol-free", OpportunityCategory::UnattachedVolume),
                ("eip-free", OpportunityCategory::UnassociatedAddress),
                ("snap-orphan", OpportunityCategory::OrphanedSnapshot),
                ("i-idle", OpportunityCategory::UnderutilizedInstance),
            ]
        );
        assert_eq!(report.categories.len(), 5);
        assert_eq!(report.resources_scanned, 10);

        // 5 + 8 + 3.6 + 1 + 35
        assert!((report.total_monthly_savings - 52.6).abs() < 1e-9);
        assert!((report.total_annual_savings - 52.6 * 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_savings_never_exceed_cost() {
        let scanner = OptimizationScanner::new(OptimizeConfig {
            downsize_savings_ratio: 3.0,
            ..Default::default()
        });
        for o in scanner.scan(&inventory()).opportunities {
            assert!(o.estimated_savings <= o.monthly_cost);
        }
    }

    #[test]
    fn test_one_sample_above_threshold_not_flagged() {
        let mut samples = vec![3.0; 29];
        samples.push(40.0);
        let instance = ResourceRecord::new("i-1", ResourceKind::Instance, ResourceState::Running)
            .with_cost(1.0, 70.0)
            .with_utilization(samples);
        assert!(scanner().scan(&[instance]).opportunities.is_empty());
    }

    #[test]
    fn test_mostly_busy_instance_not_flagged() {
        // 29 of 30 samples above the threshold, 1 below
        let mut samples = vec![60.0; 29];
        samples.push(1.0);
        let instance = ResourceRecord::new("i-1", ResourceKind::Instance, ResourceState::Running)
            .with_cost(1.0, 70.0)
            .with_utilization(samples);
        assert!(scanner().scan(&[instance]).opportunities.is_empty());
    }

    #[test]
    fn test_only_trailing_window_counts() {
        // Old busy period falls outside the 30-sample window
        let mut samples = vec![90.0; 10];
        samples.extend(vec![1.0; 30]);
        let instance = ResourceRecord::new("i-1", ResourceKind::Instance, ResourceState::Running)
            .with_cost(1.0, 70.0)
            .with_utilization(samples);
        let report = scanner().scan(&[instance]);
        assert_eq!(report.opportunities.len(), 1);
        assert!((report.opportunities[0].estimated_savings - 35.0).abs() < 1e-9);
    }

    #[test]
    fn test_too_few_samples_not_flagged() {
        let instance = ResourceRecord::new("i-1", ResourceKind::Instance, ResourceState::Running)
            .with_cost(1.0, 70.0)
            .with_utilization(vec![1.0; 6]);
        assert!(scanner().scan(&[instance]).opportunities.is_empty());
    }

    #[test]
    fn test_scan_is_idempotent() {
        let mut shuffled = inventory();
        shuffled.reverse();
        assert_eq!(scanner().scan(&inventory()), scanner().scan(&inventory()));
        assert_eq!(
            scanner().scan(&inventory()).opportunities,
            scanner().scan(&shuffled).opportunities
        );
    }

    #[test]
    fn test_empty_inventory() {
        let report = scanner().scan(&[]);
        assert!(report.opportunities.is_empty());
        assert!(report.categories.is_empty());
        assert_eq!(report.total_monthly_savings, 0.0);
        assert!(report.status.is_ok());
    }
}
