//! Rolling z-score anomaly detection
//!
//! Each point is scored against the trailing window that precedes it (the
//! point itself is never part of its own baseline). Points are skipped until
//! the window holds `min_history` observations, and a window with no
//! variance never produces an anomaly.

use std::collections::VecDeque;

use statistical::{mean, standard_deviation};

use crate::config::AnomalyConfig;
use crate::models::{CostObservation, Provenance, Status, TimeSeries};
use crate::result::{AnomalyRecord, AnomalyReport, AnomalySummary, Severity};

/// Standard deviations this small relative to the mean count as zero
const ZERO_STD_EPSILON: f64 = 1e-9;

/// Windows grow on demand past this many slots
const INITIAL_CAPACITY: usize = 64;

/// Score of one observation against its window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowScore {
    pub observed: f64,
    /// Window mean
    pub expected: f64,
    pub std_dev: f64,
    /// Zero when the window has no variance
    pub z_score: f64,
    pub is_anomaly: bool,
}

/// Trailing window with incremental evaluation
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    min_history: usize,
    threshold: f64,
    values: VecDeque<f64>,
}

impl RollingWindow {
    pub fn new(capacity: usize, min_history: usize, threshold: f64) -> Self {
        let capacity = capacity.max(2);
        Self {
            capacity,
            min_history: min_history.clamp(2, capacity),
            threshold,
            values: VecDeque::with_capacity(capacity.min(INITIAL_CAPACITY)),
        }
    }

    pub fn from_config(config: &AnomalyConfig) -> Self {
        Self::new(config.window, config.min_history, config.threshold)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Score `observed` against the current window, then add it.
    ///
    /// Returns `None` while the window is shorter than `min_history`.
    pub fn push(&mut self, observed: f64) -> Option<WindowScore> {
        let score = self.score(observed);
        if self.values.len() == self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(observed);
        score
    }

    fn score(&self, observed: f64) -> Option<WindowScore> {
        if self.values.len() < self.min_history {
            return None;
        }

        let (front, back) = self.values.as_slices();
        let window: Vec<f64> = front.iter().chain(back).copied().collect();
        let expected = mean(&window);
        let std_dev = standard_deviation(&window, Some(expected));

        if !std_dev.is_finite() || std_dev <= ZERO_STD_EPSILON * expected.abs().max(1.0) {
            return Some(WindowScore {
                observed,
                expected,
                std_dev: 0.0,
                z_score: 0.0,
                is_anomaly: false,
            });
        }

        let z_score = (observed - expected) / std_dev;
        Some(WindowScore {
            observed,
            expected,
            std_dev,
            z_score,
            is_anomaly: z_score.abs() > self.threshold,
        })
    }
}

/// Detector over whole series
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnomalyConfig {
        &self.config
    }

    fn severity(&self, z_score: f64) -> Severity {
        if z_score.abs() > self.config.high_severity {
            Severity::High
        } else {
            Severity::Medium
        }
    }

    /// Anomalies in one series, in period order, plus the number of points
    /// that had enough history to be evaluated
    pub fn detect(&self, series: &TimeSeries) -> (Vec<AnomalyRecord>, usize) {
        let mut window = RollingWindow::from_config(&self.config);
        let mut evaluated = 0;
        let mut records = Vec::new();

        for point in &series.points {
            let Some(score) = window.push(point.value) else {
                continue;
            };
            evaluated += 1;
            if score.is_anomaly {
                records.push(AnomalyRecord {
                    period: point.period,
                    dimension: series.dimension.clone(),
                    observed: score.observed,
                    expected: score.expected,
                    z_score: score.z_score,
                    severity: self.severity(score.z_score),
                });
            }
        }

        (records, evaluated)
    }

    /// Run the detector on the daily total and on every dimension
    pub fn detect_all(&self, observations: &[CostObservation]) -> AnomalyReport {
        let mut summary = AnomalySummary::default();

        let (aggregate, evaluated) = self.detect(&TimeSeries::total(observations));
        summary.points_evaluated += evaluated;
        if evaluated > 0 {
            summary.series_evaluated += 1;
        }

        let mut by_dimension = Vec::new();
        for series in TimeSeries::by_dimension(observations) {
            let (records, evaluated) = self.detect(&series);
            summary.points_evaluated += evaluated;
            if evaluated > 0 {
                summary.series_evaluated += 1;
            }
            by_dimension.extend(records);
        }
        by_dimension.sort_by(|a, b| {
            b.z_score
                .abs()
                .total_cmp(&a.z_score.abs())
                .then(a.period.cmp(&b.period))
                .then_with(|| a.dimension.cmp(&b.dimension))
        });

        summary.total = aggregate.len() + by_dimension.len();
        summary.max_abs_z = aggregate
            .iter()
            .chain(&by_dimension)
            .map(|r| r.z_score.abs())
            .fold(0.0, f64::max);
        if summary.points_evaluated > 0 {
            summary.anomaly_rate =
                summary.total as f64 / summary.points_evaluated as f64 * 100.0;
        }

        let status = if summary.points_evaluated == 0 {
            Status::InsufficientData(format!(
                "no series has {} periods of history",
                self.config.min_history + 1
            ))
        } else {
            Status::Ok
        };

        if summary.total > 0 {
            tracing::info!(
                "Detected {} anomalies over {} points (max |z| {:.2})",
                summary.total,
                summary.points_evaluated,
                summary.max_abs_z
            );
        }

        AnomalyReport {
            threshold: self.config.threshold,
            window: self.config.window,
            aggregate,
            by_dimension,
            summary,
            provenance: Provenance::DataBacked,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SeriesPoint;
    use chrono::{Duration, NaiveDate};

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        TimeSeries::new(
            "Compute",
            values
                .iter()
                .enumerate()
                .map(|(i, v)| SeriesPoint {
                    period: start + Duration::days(i as i64),
                    value: *v,
                })
                .collect(),
        )
    }

    fn stable(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + if i % 2 == 0 { 1.0 } else { -1.0 }).collect()
    }

    #[test]
    fn test_constant_series_has_no_anomalies() {
        for threshold in [0.1, 2.5, 10.0] {
            let detector = AnomalyDetector::new(AnomalyConfig {
                threshold,
                ..Default::default()
            });
            let (records, evaluated) = detector.detect(&series(&[42.0; 30]));
            assert!(records.is_empty());
            assert!(evaluated > 0);
        }
    }

    #[test]
    fn test_spike_is_flagged() {
        let mut values = stable(30);
        // Window std for the alternating pattern is ~1.04
        values[25] = 100.0 + 10.0 * 1.04;
        let detector = AnomalyDetector::new(AnomalyConfig::default());
        let (records, _) = detector.detect(&series(&values));

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].period, NaiveDate::from_ymd_opt(2026, 2, 26).unwrap());
        assert!(records[0].z_score > 9.0);
        assert_eq!(records[0].severity, Severity::High);
        assert!((records[0].expected - 100.0).abs() < 0.2);
    }

    #[test]
    fn test_needs_min_history() {
        let mut window = RollingWindow::new(14, 7, 2.5);
        for _ in 0..7 {
            assert!(window.push(10.0).is_none());
        }
        assert!(window.push(10.0).is_some());
    }

    #[test]
    fn test_window_excludes_evaluated_point() {
        let mut window = RollingWindow::new(4, 2, 2.5);
        window.push(1.0);
        window.push(3.0);
        let score = window.push(100.0).unwrap();
        assert!((score.expected - 2.0).abs() < 1e-12);
        assert!(score.is_anomaly);
    }

    #[test]
    fn test_window_is_bounded() {
        let mut window = RollingWindow::new(5, 2, 2.5);
        for i in 0..20 {
            window.push(i as f64);
        }
        assert_eq!(window.len(), 5);
        // Mean of 15..=19
        let score = window.push(17.0).unwrap();
        assert!((score.expected - 17.0).abs() < 1e-12);
    }

    #[test]
    fn test_huge_window_is_not_preallocated() {
        let mut window = RollingWindow::new(usize::MAX / 4, 2, 2.5);
        assert!(window.push(1.0).is_none());
        assert!(window.push(1.0).is_none());
        assert_eq!(window.push(1.0).unwrap().z_score, 0.0);
        assert_eq!(window.len(), 3);
    }

    #[test]
    fn test_detect_all_by_dimension() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let mut observations = Vec::new();
        for (i, v) in stable(30).iter().enumerate() {
            let period = start + Duration::days(i as i64);
            let storage = if i == 20 { 500.0 } else { 10.0 + (i % 3) as f64 };
            observations.push(CostObservation::new(period, "Compute", *v).unwrap());
            observations.push(CostObservation::new(period, "Storage", storage).unwrap());
        }

        let report = AnomalyDetector::new(AnomalyConfig::default()).detect_all(&observations);
        assert!(report.status.is_ok());
        assert_eq!(report.summary.series_evaluated, 3);
        assert!(report.by_dimension.iter().any(|r| r.dimension == "Storage"));
        assert!(report.aggregate.iter().any(|r| r.period == start + Duration::days(20)));
        assert!(report.summary.max_abs_z >= report.by_dimension[0].z_score.abs());
        assert!(report.summary.anomaly_rate > 0.0);
    }

    #[test]
    fn test_detect_all_insufficient_history() {
        let start = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let observations: Vec<_> = (0..5)
            .map(|i| CostObservation::new(start + Duration::days(i), "Compute", 1.0).unwrap())
            .collect();
        let report = AnomalyDetector::new(AnomalyConfig::default()).detect_all(&observations);
        assert!(!report.status.is_ok());
        assert_eq!(report.summary.total, 0);
    }
}
