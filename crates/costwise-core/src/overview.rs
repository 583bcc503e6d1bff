//! Cost overview for general questions about spend

use std::collections::BTreeMap;

use crate::config::OverviewConfig;
use crate::models::{CostObservation, Provenance, Status, TimeSeries};
use crate::result::{CostOverview, DimensionShare};

/// Days used to project a monthly figure from the daily average
const DAYS_PER_MONTH: f64 = 30.0;

pub fn summarize(observations: &[CostObservation], config: &OverviewConfig) -> CostOverview {
    let daily = TimeSeries::total(observations);
    if daily.is_empty() {
        return CostOverview {
            window_start: None,
            window_end: None,
            total: 0.0,
            periods: 0,
            daily_average: 0.0,
            projected_monthly: 0.0,
            top_dimensions: Vec::new(),
            provenance: Provenance::DataBacked,
            status: Status::InsufficientData("no cost observations in the window".to_string()),
        };
    }

    let total: f64 = daily.values().iter().sum();
    let periods = daily.len();
    let daily_average = total / periods as f64;

    let mut by_dimension: BTreeMap<&str, f64> = BTreeMap::new();
    for obs in observations {
        *by_dimension.entry(obs.dimension.as_str()).or_insert(0.0) += obs.amount;
    }
    let mut ranked: Vec<(&str, f64)> = by_dimension.into_iter().collect();
    // Largest first; BTreeMap order breaks ties by name
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

    let top_dimensions = ranked
        .into_iter()
        .take(config.top_n)
        .map(|(dimension, amount)| DimensionShare {
            dimension: dimension.to_string(),
            amount,
            percent: if total > 0.0 { amount / total * 100.0 } else { 0.0 },
        })
        .collect();

    CostOverview {
        window_start: daily.points.first().map(|p| p.period),
        window_end: daily.last_period(),
        total,
        periods,
        daily_average,
        projected_monthly: daily_average * DAYS_PER_MONTH,
        top_dimensions,
        provenance: Provenance::DataBacked,
        status: Status::Ok,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn test_summarize() {
        let start = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let mut observations = Vec::new();
        for i in 0..10 {
            let day = start + Duration::days(i);
            observations.push(CostObservation::new(day, "Compute", 6.0).unwrap());
            observations.push(CostObservation::new(day, "Storage", 3.0).unwrap());
            observations.push(CostObservation::new(day, "Network", 1.0).unwrap());
        }

        let overview = summarize(&observations, &OverviewConfig { lookback_days: 30, top_n: 2 });
        assert!(overview.status.is_ok());
        assert_eq!(overview.periods, 10);
        assert!((overview.total - 100.0).abs() < 1e-9);
        assert!((overview.daily_average - 10.0).abs() < 1e-9);
        assert!((overview.projected_monthly - 300.0).abs() < 1e-9);
        assert_eq!(overview.top_dimensions.len(), 2);
        assert_eq!(overview.top_dimensions[0].dimension, "Compute");
        assert!((overview.top_dimensions[0].percent - 60.0).abs() < 1e-9);
        assert_eq!(overview.window_end, Some(start + Duration::days(9)));
    }

    #[test]
    fn test_empty_window() {
        let overview = summarize(&[], &OverviewConfig::default());
        assert!(!overview.status.is_ok());
        assert_eq!(overview.total, 0.0);
        assert!(overview.top_dimensions.is_empty());
    }
}
