//! Quadratic trend with seasonal dummies
//!
//! Features are `[1, s, s², d_1 .. d_{m-1}]` where `s = t / n` and `d_j` is
//! 1 when `t mod m == j`. The normal equations get a small ridge term on
//! every coefficient but the intercept and are solved by Gaussian
//! elimination with partial pivoting. Seasonal dummies are only used once
//! two full seasons of history are available.

use super::Estimator;

#[derive(Debug, Clone, Copy)]
pub struct SeasonalQuadratic {
    season_length: usize,
    ridge: f64,
}

impl SeasonalQuadratic {
    pub fn new(season_length: usize, ridge: f64) -> Self {
        Self {
            season_length: season_length.max(1),
            ridge: ridge.max(0.0),
        }
    }

    fn use_dummies(&self, n: usize) -> bool {
        self.season_length > 1 && n >= 2 * self.season_length
    }

    fn features(&self, t: usize, n: usize, dummies: bool) -> Vec<f64> {
        let s = t as f64 / n as f64;
        let mut row = vec![1.0, s, s * s];
        if dummies {
            let pos = t % self.season_length;
            for j in 1..self.season_length {
                row.push(if pos == j { 1.0 } else { 0.0 });
            }
        }
        row
    }

    /// Coefficients for the series, or `None` if the system is singular
    fn fit(&self, series: &[f64]) -> Option<(Vec<f64>, bool)> {
        let n = series.len();
        let dummies = self.use_dummies(n);
        let p = 3 + if dummies { self.season_length - 1 } else { 0 };

        let mut xtx = vec![vec![0.0; p]; p];
        let mut xty = vec![0.0; p];
        for (t, y) in series.iter().enumerate() {
            let row = self.features(t, n, dummies);
            for i in 0..p {
                xty[i] += row[i] * y;
                for j in 0..p {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }
        for (i, row) in xtx.iter_mut().enumerate().skip(1) {
            row[i] += self.ridge;
        }

        solve(xtx, xty).map(|beta| (beta, dummies))
    }
}

impl Default for SeasonalQuadratic {
    fn default() -> Self {
        Self::new(7, 1e-6)
    }
}

impl Estimator for SeasonalQuadratic {
    fn name(&self) -> &'static str {
        "seasonal_quadratic"
    }

    fn fit_predict(&self, series: &[f64], horizon: usize) -> Vec<f64> {
        let n = series.len();
        if n < 3 {
            let level = if n == 0 {
                0.0
            } else {
                series.iter().sum::<f64>() / n as f64
            };
            return vec![level; horizon];
        }

        match self.fit(series) {
            Some((beta, dummies)) => (n..n + horizon)
                .map(|t| {
                    self.features(t, n, dummies)
                        .iter()
                        .zip(&beta)
                        .map(|(x, b)| x * b)
                        .sum::<f64>()
                })
                .collect(),
            None => {
                tracing::debug!("Seasonal system singular, predicting the mean");
                let mean = series.iter().sum::<f64>() / n as f64;
                vec![mean; horizon]
            }
        }
    }
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting
pub(crate) fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Option<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                let upper = a[col][k];
                a[row][k] -= factor * upper;
            }
            let upper = b[col];
            b[row] -= factor * upper;
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    if x.iter().all(|v| v.is_finite()) {
        Some(x)
    } else {
        None
    }
}
