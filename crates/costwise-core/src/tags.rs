//! Tag compliance scanner
//!
//! Checks every billable resource for the required tag keys. Keys are
//! compared exactly; a tag with an empty value counts as missing.

use std::collections::BTreeMap;

use crate::config::TagsConfig;
use crate::models::{Provenance, ResourceRecord, Status};
use crate::result::{NonCompliantResource, TagComplianceReport};

pub struct TagComplianceScanner {
    config: TagsConfig,
}

impl TagComplianceScanner {
    pub fn new(config: TagsConfig) -> Self {
        Self { config }
    }

    /// Required tags the resource lacks, in configured order
    pub fn missing_tags(&self, resource: &ResourceRecord) -> Vec<String> {
        self.config
            .required
            .iter()
            .filter(|key| {
                resource
                    .tags
                    .get(key.as_str())
                    .map_or(true, |value| value.trim().is_empty())
            })
            .cloned()
            .collect()
    }

    pub fn scan(&self, inventory: &[ResourceRecord]) -> TagComplianceReport {
        let mut resources: Vec<&ResourceRecord> =
            inventory.iter().filter(|r| r.is_billable()).collect();
        resources.sort_by(|a, b| a.id.cmp(&b.id));

        let mut missing_tag_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut non_compliant = Vec::new();
        for resource in &resources {
            let missing = self.missing_tags(resource);
            if missing.is_empty() {
                continue;
            }
            for key in &missing {
                *missing_tag_counts.entry(key.clone()).or_insert(0) += 1;
            }
            non_compliant.push(NonCompliantResource {
                resource_id: resource.id.clone(),
                kind: resource.kind,
                missing,
                monthly_cost: resource.monthly_cost(),
            });
        }

        let total = resources.len();
        let compliant = total - non_compliant.len();
        let compliance_rate = if total == 0 {
            100.0
        } else {
            compliant as f64 / total as f64 * 100.0
        };
        let untagged_monthly_cost = non_compliant.iter().map(|r| r.monthly_cost).sum();

        tracing::debug!(
            "Tag compliance: {}/{} resources compliant ({:.1}%)",
            compliant,
            total,
            compliance_rate
        );

        TagComplianceReport {
            required_tags: self.config.required.clone(),
            total_resources: total,
            compliant,
            non_compliant,
            compliance_rate,
            missing_tag_counts,
            untagged_monthly_cost,
            provenance: Provenance::DataBacked,
            status: Status::Ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceKind, ResourceState};

    fn fully_tagged(id: &str) -> ResourceRecord {
        ResourceRecord::new(id, ResourceKind::Instance, ResourceState::Running)
            .with_cost(1.0, 40.0)
            .with_tag("Environment", "prod")
            .with_tag("Owner", "platform")
            .with_tag("CostCenter", "cc-42")
            .with_tag("Project", "billing")
    }

    #[test]
    fn test_scan_reports_missing_tags() {
        let inventory = vec![
            fully_tagged("i-b"),
            ResourceRecord::new("vol-a", ResourceKind::Volume, ResourceState::InUse)
                .with_cost(100.0, 0.1)
                .with_tag("Environment", "prod")
                .with_tag("Owner", ""),
            ResourceRecord::new("i-gone", ResourceKind::Instance, ResourceState::Terminated),
        ];

        let report = TagComplianceScanner::new(TagsConfig::default()).scan(&inventory);
        assert_eq!(report.total_resources, 2);
        assert_eq!(report.compliant, 1);
        assert_eq!(report.non_compliant.len(), 1);
        assert_eq!(report.non_compliant[0].resource_id, "vol-a");
        assert_eq!(
            report.non_compliant[0].missing,
            vec!["Owner", "CostCenter", "Project"]
        );
        assert!((report.compliance_rate - 50.0).abs() < 1e-9);
        assert!((report.untagged_monthly_cost - 10.0).abs() < 1e-9);
        assert_eq!(report.missing_tag_counts.get("Owner"), Some(&1));
        assert_eq!(report.missing_tag_counts.get("Environment"), None);
    }

    #[test]
    fn test_keys_compared_exactly() {
        let resource = ResourceRecord::new("i-1", ResourceKind::Instance, ResourceState::Running)
            .with_tag("environment", "prod");
        let scanner = TagComplianceScanner::new(TagsConfig {
            required: vec!["Environment".to_string()],
        });
        assert_eq!(scanner.missing_tags(&resource), vec!["Environment"]);
    }

    #[test]
    fn test_empty_inventory_is_compliant() {
        let report = TagComplianceScanner::new(TagsConfig::default()).scan(&[]);
        assert_eq!(report.compliance_rate, 100.0);
        assert!(report.non_compliant.is_empty());
    }
}
