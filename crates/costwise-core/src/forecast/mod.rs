//! Forecasting ensemble
//!
//! Three stateless estimators are backtested on a trailing holdout of the
//! supplied series and combined with inverse-error weights. The interval
//! comes from the residuals of the combined backtest and widens with the
//! forecast step.
//!
//! Series that are empty, all zero, or shorter than `min_history` never get
//! a model-backed number: the forecaster returns a deterministic estimate
//! from the inventory, flagged as `HeuristicFallback`.

mod forest;
mod linear;
mod seasonal;

pub use forest::BaggedTrees;
pub use linear::LinearTrend;
pub use seasonal::SeasonalQuadratic;

use chrono::Duration;

use crate::config::ForecastConfig;
use crate::error::{Error, Result};
use crate::models::{Provenance, ResourceRecord, Status, TimeSeries};
use crate::result::{EstimatorWeight, ForecastResult};

/// Keeps inverse-error weights finite for perfect fits
const WEIGHT_EPSILON: f64 = 1e-9;

/// Residual floor relative to the series level, so bands never collapse
/// to zero width
const MIN_RELATIVE_SIGMA: f64 = 1e-6;

/// A forecasting method that can be fitted and backtested on a series
pub trait Estimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fit on the whole series and predict the next `horizon` values
    fn fit_predict(&self, series: &[f64], horizon: usize) -> Vec<f64>;

    /// RMSE on the trailing `holdout` values after fitting on the rest
    fn backtest_error(&self, series: &[f64], holdout: usize) -> Option<f64> {
        if holdout == 0 || series.len() <= holdout {
            return None;
        }
        let split = series.len() - holdout;
        let predicted = self.fit_predict(&series[..split], holdout);
        Some(rmse(&predicted, &series[split..]))
    }
}

/// Root mean squared error over paired values
pub fn rmse(predicted: &[f64], actual: &[f64]) -> f64 {
    let n = predicted.len().min(actual.len());
    if n == 0 {
        return 0.0;
    }
    let sum: f64 = predicted
        .iter()
        .zip(actual)
        .map(|(p, a)| (p - a) * (p - a))
        .sum();
    (sum / n as f64).sqrt()
}

/// Inverse of the standard normal CDF (Acklam's rational approximation)
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

/// Two-sided critical value for a confidence level
pub fn z_for_confidence(confidence: f64) -> f64 {
    inverse_normal_cdf((1.0 + confidence) / 2.0)
}

/// Reject horizons and confidence levels no forecast can honor
pub fn validate_params(horizon: usize, confidence: f64, max_horizon: u32) -> Result<()> {
    if horizon == 0 || horizon > max_horizon as usize {
        return Err(Error::InvalidParameter(format!(
            "horizon must be between 1 and {}, got {}",
            max_horizon, horizon
        )));
    }
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(Error::InvalidParameter(format!(
            "confidence must be in (0, 1), got {}",
            confidence
        )));
    }
    Ok(())
}

/// Reject series that can't support a model-backed forecast
fn check_history(values: &[f64], min_history: usize) -> Result<()> {
    if values.is_empty() {
        Err(Error::InsufficientData(
            "no cost history in the lookback window".to_string(),
        ))
    } else if values.iter().all(|v| *v == 0.0) {
        Err(Error::InsufficientData("cost history is all zero".to_string()))
    } else if values.len() < min_history {
        Err(Error::InsufficientData(format!(
            "{} periods of cost history, at least {} required",
            values.len(),
            min_history
        )))
    } else {
        Ok(())
    }
}

/// Ensemble forecaster
pub struct Forecaster {
    config: ForecastConfig,
    estimators: Vec<Box<dyn Estimator>>,
}

impl Forecaster {
    /// Forecaster with the linear, seasonal and bagged-tree estimators
    pub fn new(config: ForecastConfig) -> Self {
        let estimators: Vec<Box<dyn Estimator>> = vec![
            Box::new(LinearTrend),
            Box::new(SeasonalQuadratic::new(config.season_length, config.ridge)),
            Box::new(BaggedTrees::new(
                config.trees,
                config.max_depth,
                config.min_leaf,
                config.season_length,
                config.seed,
            )),
        ];
        Self::with_estimators(config, estimators)
    }

    pub fn with_estimators(config: ForecastConfig, estimators: Vec<Box<dyn Estimator>>) -> Self {
        Self { config, estimators }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast `horizon` periods after the end of `series`.
    ///
    /// `inventory` is only used for the heuristic fallback.
    pub fn forecast(
        &self,
        series: &TimeSeries,
        horizon: usize,
        confidence: f64,
        inventory: &[ResourceRecord],
    ) -> Result<ForecastResult> {
        validate_params(horizon, confidence, self.config.max_horizon)?;

        let values = series.values();
        if let Err(cause) = check_history(&values, self.config.min_history) {
            tracing::debug!("Forecast for {} falls back: {}", series.dimension, cause);
            return Ok(self.heuristic(series, horizon, confidence, inventory, &cause));
        }

        let n = values.len();
        let holdout = (n / 4).min(self.config.max_holdout).max(1);
        let split = n - holdout;
        let actual = &values[split..];

        // Backtest every estimator on the same holdout
        let mut scored = Vec::with_capacity(self.estimators.len());
        for estimator in &self.estimators {
            let predicted = estimator.fit_predict(&values[..split], holdout);
            let err = rmse(&predicted, actual);
            if err.is_finite() && predicted.iter().all(|v| v.is_finite()) {
                scored.push((estimator.as_ref(), predicted, err));
            } else {
                tracing::warn!("Estimator {} produced a non-finite backtest", estimator.name());
            }
        }

        if scored.is_empty() {
            let cause =
                Error::InsufficientData("no estimator produced a usable backtest".to_string());
            return Ok(self.heuristic(series, horizon, confidence, inventory, &cause));
        }

        let inverse: Vec<f64> = scored
            .iter()
            .map(|(_, _, err)| 1.0 / (err + WEIGHT_EPSILON))
            .collect();
        let norm: f64 = inverse.iter().sum();
        let weights: Vec<f64> = inverse.iter().map(|w| w / norm).collect();

        // Residuals of the combined backtest drive the interval
        let combined: Vec<f64> = (0..holdout)
            .map(|i| {
                scored
                    .iter()
                    .zip(&weights)
                    .map(|((_, predicted, _), w)| w * predicted[i])
                    .sum::<f64>()
            })
            .collect();
        let combined_error = rmse(&combined, actual);
        let level = values.iter().map(|v| v.abs()).sum::<f64>() / n as f64;
        let sigma = combined_error.max(level * MIN_RELATIVE_SIGMA);
        let z = z_for_confidence(confidence);

        let mut point = vec![0.0; horizon];
        for ((estimator, _, _), w) in scored.iter().zip(&weights) {
            for (slot, value) in point.iter_mut().zip(estimator.fit_predict(&values, horizon)) {
                *slot += w * value;
            }
        }

        let mut lower = Vec::with_capacity(horizon);
        let mut upper = Vec::with_capacity(horizon);
        for (k, p) in point.iter_mut().enumerate() {
            if !p.is_finite() || *p < 0.0 {
                *p = 0.0;
            }
            let width = z * sigma * (1.0 + (k + 1) as f64 / holdout as f64).sqrt();
            lower.push((*p - width).max(0.0));
            upper.push(*p + width);
        }

        let weights = scored
            .iter()
            .zip(&weights)
            .map(|((estimator, _, err), w)| EstimatorWeight {
                name: estimator.name().to_string(),
                weight: *w,
                backtest_error: *err,
            })
            .collect();

        tracing::debug!(
            "Forecast for {}: {} periods from {} observations, backtest RMSE {:.4}",
            series.dimension,
            horizon,
            n,
            combined_error
        );

        Ok(ForecastResult {
            dimension: series.dimension.clone(),
            horizon,
            first_period: series.last_period().map(|d| d + Duration::days(1)),
            point,
            lower,
            upper,
            confidence,
            backtest_error: Some(combined_error),
            weights,
            provenance: Provenance::DataBacked,
            status: Status::Ok,
        })
    }

    /// Deterministic estimate from the monthly cost of billable resources
    fn heuristic(
        &self,
        series: &TimeSeries,
        horizon: usize,
        confidence: f64,
        inventory: &[ResourceRecord],
        cause: &Error,
    ) -> ForecastResult {
        let monthly: f64 = inventory
            .iter()
            .filter(|r| r.is_billable())
            .map(|r| r.monthly_cost())
            .sum();
        // An empty sum is -0.0
        let daily = if monthly > 0.0 {
            monthly / self.config.days_per_month
        } else {
            0.0
        };
        let band = self.config.heuristic_band;

        ForecastResult {
            dimension: series.dimension.clone(),
            horizon,
            first_period: series.last_period().map(|d| d + Duration::days(1)),
            point: vec![daily; horizon],
            lower: vec![(daily * (1.0 - band)).max(0.0); horizon],
            upper: vec![daily * (1.0 + band); horizon],
            confidence,
            backtest_error: None,
            weights: Vec::new(),
            provenance: Provenance::HeuristicFallback,
            status: Status::recovered(cause),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResourceKind, ResourceState, SeriesPoint};
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        TimeSeries::new(
            "total",
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

    fn forecaster() -> Forecaster {
        Forecaster::new(ForecastConfig::default())
    }

    #[test]
    fn test_inverse_normal() {
        assert!((z_for_confidence(0.95) - 1.959964).abs() < 1e-3);
        assert!((z_for_confidence(0.80) - 1.281552).abs() < 1e-3);
        assert!(inverse_normal_cdf(0.5).abs() < 1e-9);
        assert!((inverse_normal_cdf(0.01) + 2.326348).abs() < 1e-3);
    }

    #[test]
    fn test_constant_series_forecast() {
        let result = forecaster()
            .forecast(&series(&[3.5; 30]), 7, 0.95, &[])
            .unwrap();

        assert_eq!(result.provenance, Provenance::DataBacked);
        assert!(result.status.is_ok());
        assert!(result.is_consistent());
        assert_eq!(result.point.len(), 7);
        for i in 0..7 {
            assert!((result.point[i] - 3.5).abs() <= 0.7);
            assert!(result.lower[i] <= 3.5 && result.upper[i] >= 3.5);
        }
        assert_eq!(
            result.first_period,
            NaiveDate::from_ymd_opt(2026, 1, 31)
        );
    }

    #[test]
    fn test_bands_hold_for_noisy_series() {
        let values: Vec<f64> = (0..60)
            .map(|t| 100.0 + 0.8 * t as f64 + if t % 7 == 3 { 25.0 } else { 0.0 } + (t % 5) as f64)
            .collect();
        for horizon in [1, 14, 90] {
            let result = forecaster()
                .forecast(&series(&values), horizon, 0.9, &[])
                .unwrap();
            assert!(result.is_consistent(), "horizon {}", horizon);
            let total_weight: f64 = result.weights.iter().map(|w| w.weight).sum();
            assert!((total_weight - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_band_widens_with_step() {
        let values: Vec<f64> = (0..40).map(|t| 50.0 + ((t * 37) % 11) as f64).collect();
        let result = forecaster().forecast(&series(&values), 10, 0.95, &[]).unwrap();
        let first = result.upper[0] - result.point[0];
        let last = result.upper[9] - result.point[9];
        assert!(last > first);
    }

    #[test]
    fn test_zero_series_uses_fallback() {
        let inventory = vec![
            ResourceRecord::new("i-1", ResourceKind::Instance, ResourceState::Running)
                .with_cost(1.0, 60.0),
            ResourceRecord::new("i-2", ResourceKind::Instance, ResourceState::Terminated)
                .with_cost(1.0, 500.0),
        ];

        for values in [vec![], vec![0.0; 30]] {
            let result = forecaster()
                .forecast(&series(&values), 5, 0.95, &inventory)
                .unwrap();
            assert_eq!(result.provenance, Provenance::HeuristicFallback);
            assert!(result.backtest_error.is_none());
            assert!(!result.status.is_ok());
            assert!(result.is_consistent());
            assert!((result.point[0] - 2.0).abs() < 1e-9);
            assert!((result.lower[0] - 1.5).abs() < 1e-9);
            assert!((result.upper[0] - 2.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_fallback_without_inventory_is_positive_zero() {
        let result = forecaster().forecast(&series(&[]), 3, 0.95, &[]).unwrap();
        assert_eq!(result.provenance, Provenance::HeuristicFallback);
        assert!(result
            .point
            .iter()
            .chain(&result.lower)
            .chain(&result.upper)
            .all(|v| *v == 0.0 && v.is_sign_positive()));
        assert_eq!(
            serde_json::to_value(&result).unwrap()["point"][0].to_string(),
            "0.0"
        );
    }

    #[test]
    fn test_short_series_uses_fallback() {
        let result = forecaster()
            .forecast(&series(&[5.0; 13]), 3, 0.95, &[])
            .unwrap();
        assert_eq!(result.provenance, Provenance::HeuristicFallback);
        assert_eq!(result.point, vec![0.0; 3]);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let inventory = vec![
            ResourceRecord::new("vol-1", ResourceKind::Volume, ResourceState::InUse)
                .with_cost(100.0, 0.1),
        ];
        let a = forecaster().forecast(&series(&[]), 4, 0.9, &inventory).unwrap();
        let b = forecaster().forecast(&series(&[]), 4, 0.9, &inventory).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_params() {
        let f = forecaster();
        let s = series(&[1.0; 20]);
        assert!(matches!(f.forecast(&s, 0, 0.95, &[]), Err(Error::InvalidParameter(_))));
        assert!(matches!(f.forecast(&s, 367, 0.95, &[]), Err(Error::InvalidParameter(_))));
        assert!(matches!(f.forecast(&s, 5, 1.0, &[]), Err(Error::InvalidParameter(_))));
        assert!(matches!(f.forecast(&s, 5, 0.0, &[]), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_better_estimator_gets_more_weight() {
        struct Fixed(&'static str, f64);
        impl Estimator for Fixed {
            fn name(&self) -> &'static str {
                self.0
            }
            fn fit_predict(&self, _series: &[f64], horizon: usize) -> Vec<f64> {
                vec![self.1; horizon]
            }
        }

        let f = Forecaster::with_estimators(
            ForecastConfig::default(),
            vec![Box::new(Fixed("close", 10.5)), Box::new(Fixed("far", 20.0))],
        );
        let result = f.forecast(&series(&[10.0; 20]), 1, 0.95, &[]).unwrap();
        assert!(result.weights[0].weight > result.weights[1].weight);
        assert!(result.point[0] < 12.0);
    }
}
