//! Linear trend estimator (ordinary least squares on the period index)

use super::Estimator;

/// `y = intercept + slope * t`
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTrend;

impl LinearTrend {
    /// Least-squares (intercept, slope) over t = 0..n
    pub fn fit(series: &[f64]) -> (f64, f64) {
        let n = series.len();
        if n == 0 {
            return (0.0, 0.0);
        }
        if n == 1 {
            return (series[0], 0.0);
        }

        let nf = n as f64;
        let mean_t = (nf - 1.0) / 2.0;
        let mean_y = series.iter().sum::<f64>() / nf;

        let mut sxy = 0.0;
        let mut sxx = 0.0;
        for (t, y) in series.iter().enumerate() {
            let dt = t as f64 - mean_t;
            sxy += dt * (y - mean_y);
            sxx += dt * dt;
        }

        let slope = if sxx > 0.0 { sxy / sxx } else { 0.0 };
        (mean_y - slope * mean_t, slope)
    }
}

impl Estimator for LinearTrend {
    fn name(&self) -> &'static str {
        "linear_trend"
    }

    fn fit_predict(&self, series: &[f64], horizon: usize) -> Vec<f64> {
        let (intercept, slope) = Self::fit(series);
        let n = series.len();
        (0..horizon)
            .map(|k| intercept + slope * (n + k) as f64)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fits_exact_line() {
        let series: Vec<f64> = (0..10).map(|t| 2.0 + 0.5 * t as f64).collect();
        let (intercept, slope) = LinearTrend::fit(&series);
        assert!((intercept - 2.0).abs() < 1e-9);
        assert!((slope - 0.5).abs() < 1e-9);

        let next = LinearTrend.fit_predict(&series, 2);
        assert!((next[0] - 7.0).abs() < 1e-9);
        assert!((next[1] - 7.5).abs() < 1e-9);
    }

    #[test]
    fn test_short_series() {
        assert_eq!(LinearTrend.fit_predict(&[], 3), vec![0.0, 0.0, 0.0]);
        assert_eq!(LinearTrend.fit_predict(&[4.0], 2), vec![4.0, 4.0]);
    }

    #[test]
    fn test_backtest_error_zero_on_line() {
        let series: Vec<f64> = (0..20).map(|t| 1.0 + t as f64).collect();
        let err = LinearTrend.backtest_error(&series, 5).unwrap();
        assert!(err < 1e-9);
    }
}
