//! Bagged regression trees
//!
//! CART trees split on variance reduction over two features: the period
//! index and the position within the season. Each tree is grown on a
//! bootstrap sample drawn from a seeded `StdRng`, so the same series and
//! seed always give the same forecast.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Estimator;

const FEATURES: usize = 2;

#[derive(Debug)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, x: &[f64; FEATURES]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if x[*feature] <= *threshold {
                    left.predict(x)
                } else {
                    right.predict(x)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BaggedTrees {
    trees: usize,
    max_depth: usize,
    min_leaf: usize,
    season_length: usize,
    seed: u64,
}

impl Default for BaggedTrees {
    fn default() -> Self {
        Self::new(25, 4, 3, 7, 42)
    }
}

impl BaggedTrees {
    pub fn new(
        trees: usize,
        max_depth: usize,
        min_leaf: usize,
        season_length: usize,
        seed: u64,
    ) -> Self {
        Self {
            trees: trees.max(1),
            max_depth,
            min_leaf: min_leaf.max(1),
            season_length: season_length.max(1),
            seed,
        }
    }

    fn features(&self, t: usize) -> [f64; FEATURES] {
        [t as f64, (t % self.season_length) as f64]
    }

    fn grow(&self, samples: &mut [([f64; FEATURES], f64)], depth: usize) -> Node {
        let leaf = Node::Leaf(statistical::mean(
            &samples.iter().map(|(_, y)| *y).collect::<Vec<_>>(),
        ));
        if depth >= self.max_depth || samples.len() < 2 * self.min_leaf {
            return leaf;
        }

        match self.best_split(samples) {
            Some((feature, threshold)) => {
                samples.sort_by(|a, b| a.0[feature].total_cmp(&b.0[feature]));
                let cut = samples.partition_point(|(x, _)| x[feature] <= threshold);
                let (left, right) = samples.split_at_mut(cut);
                Node::Split {
                    feature,
                    threshold,
                    left: Box::new(self.grow(left, depth + 1)),
                    right: Box::new(self.grow(right, depth + 1)),
                }
            }
            None => leaf,
        }
    }

    /// Split with the largest reduction in squared error, if any
    fn best_split(&self, samples: &mut [([f64; FEATURES], f64)]) -> Option<(usize, f64)> {
        let n = samples.len();
        let total: f64 = samples.iter().map(|(_, y)| y).sum();
        let total_sq: f64 = samples.iter().map(|(_, y)| y * y).sum();
        let parent_sse = total_sq - total * total / n as f64;

        let mut best: Option<(usize, f64, f64)> = None;
        for feature in 0..FEATURES {
            samples.sort_by(|a, b| a.0[feature].total_cmp(&b.0[feature]));

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;
            for i in 0..n - 1 {
                let y = samples[i].1;
                left_sum += y;
                left_sq += y * y;

                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < self.min_leaf || right_n < self.min_leaf {
                    continue;
                }
                let here = samples[i].0[feature];
                let next = samples[i + 1].0[feature];
                if here == next {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / left_n as f64)
                    + (right_sq - right_sum * right_sum / right_n as f64);
                let gain = parent_sse - sse;
                if gain > 1e-12 * total_sq.max(1e-12)
                    && best.map_or(true, |(_, _, g)| gain > g)
                {
                    best = Some((feature, (here + next) / 2.0, gain));
                }
            }
        }

        best.map(|(feature, threshold, _)| (feature, threshold))
    }
}

impl Estimator for BaggedTrees {
    fn name(&self) -> &'static str {
        "bagged_trees"
    }

    fn fit_predict(&self, series: &[f64], horizon: usize) -> Vec<f64> {
        let n = series.len();
        if n == 0 {
            return vec![0.0; horizon];
        }

        let data: Vec<([f64; FEATURES], f64)> = series
            .iter()
            .enumerate()
            .map(|(t, y)| (self.features(t), *y))
            .collect();

        let mut rng = StdRng::seed_from_u64(self.seed);
        let forest: Vec<Node> = (0..self.trees)
            .map(|_| {
                let mut sample: Vec<_> = (0..n).map(|_| data[rng.gen_range(0..n)]).collect();
                self.grow(&mut sample, 0)
            })
            .collect();

        (n..n + horizon)
            .map(|t| {
                let x = self.features(t);
                forest.iter().map(|tree| tree.predict(&x)).sum::<f64>() / forest.len() as f64
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_series() {
        let forecast = BaggedTrees::default().fit_predict(&[3.5; 30], 5);
        assert_eq!(forecast.len(), 5);
        for value in forecast {
            assert!((value - 3.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reproducible_with_seed() {
        let series: Vec<f64> = (0..40).map(|t| 10.0 + (t % 5) as f64 * 1.5).collect();
        let a = BaggedTrees::default().fit_predict(&series, 10);
        let b = BaggedTrees::default().fit_predict(&series, 10);
        assert_eq!(a, b);
    }

    #[test]
    fn test_learns_level_shift() {
        // Recent level is higher; trees extrapolate the latest level
        let series: Vec<f64> = (0..40).map(|t| if t < 20 { 5.0 } else { 20.0 }).collect();
        let forecast = BaggedTrees::new(25, 4, 3, 1, 7).fit_predict(&series, 3);
        for value in forecast {
            assert!(value > 15.0, "got {}", value);
        }
    }

    #[test]
    fn test_empty_series() {
        assert_eq!(BaggedTrees::default().fit_predict(&[], 2), vec![0.0, 0.0]);
    }
}
