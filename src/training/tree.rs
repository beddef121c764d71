use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::TreeConfig;

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART-style regression tree grown by variance reduction.
///
/// Nodes live in an arena; index 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

struct Best {
    feature: usize,
    threshold: f64,
    /// Summed squared error of both children.
    sse: f64,
}

struct Grower<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    config: &'a TreeConfig,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit on `x` rows and `y` targets. Features are visited in a seeded
    /// random order at every node and the first strictly best split wins, so
    /// ties resolve the same way for the same seed.
    pub fn fit(x: &[Vec<f64>], y: &[f64], config: &TreeConfig, seed: u64) -> Self {
        let mut grower = Grower {
            x,
            y,
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            nodes: Vec::new(),
        };
        let rows: Vec<usize> = (0..y.len()).collect();
        grower.grow(rows, 0);
        log::debug!("Grew regression tree with {} nodes", grower.nodes.len());
        RegressionTree {
            nodes: grower.nodes,
        }
    }

    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }
}

impl Grower<'_> {
    /// Push the node for `rows` and return its index.
    fn grow(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        let idx = self.nodes.len();
        let value = mean(rows.iter().map(|&r| self.y[r]));
        self.nodes.push(Node::Leaf { value });

        let depth_left = self.config.max_depth.map_or(true, |max| depth < max);
        if !depth_left || rows.len() < self.config.min_samples_split || sse(self.y, &rows) == 0.0 {
            return idx;
        }
        let Some(best) = self.best_split(&rows) else {
            return idx;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .partition(|&&r| self.x[r][best.feature] <= best.threshold);
        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: best.feature,
            threshold: best.threshold,
            left,
            right,
        };
        idx
    }

    fn best_split(&mut self, rows: &[usize]) -> Option<Best> {
        let parent_sse = sse(self.y, rows);
        let min_leaf = self.config.min_samples_leaf.max(1);
        let width = self.x.first().map(Vec::len).unwrap_or(0);

        let mut features: Vec<usize> = (0..width).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<Best> = None;
        for feature in features {
            let mut order = rows.to_vec();
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            // Running sums give each child's SSE as Σy² - (Σy)²/n.
            let total: f64 = order.iter().map(|&r| self.y[r]).sum();
            let total_sq: f64 = order.iter().map(|&r| self.y[r].powi(2)).sum();
            let (mut sum, mut sum_sq) = (0.0, 0.0);

            for split in 1..order.len() {
                let prev = order[split - 1];
                sum += self.y[prev];
                sum_sq += self.y[prev].powi(2);

                let (lo, hi) = (self.x[prev][feature], self.x[order[split]][feature]);
                if lo == hi || split < min_leaf || order.len() - split < min_leaf {
                    continue;
                }
                let n_left = split as f64;
                let n_right = (order.len() - split) as f64;
                let left_sse = sum_sq - sum * sum / n_left;
                let right_sse = (total_sq - sum_sq) - (total - sum).powi(2) / n_right;
                let candidate = left_sse.max(0.0) + right_sse.max(0.0);

                if candidate < parent_sse && best.as_ref().map_or(true, |b| candidate < b.sse) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold == hi {
                        threshold = lo;
                    }
                    best = Some(Best {
                        feature,
                        threshold,
                        sse: candidate,
                    });
                }
            }
        }
        best
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

fn sse(y: &[f64], rows: &[usize]) -> f64 {
    let m = mean(rows.iter().map(|&r| y[r]));
    rows.iter().map(|&r| (y[r] - m).powi(2)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        let x: Vec<Vec<f64>> = (0..8).map(|i| vec![i as f64, (i % 3) as f64]).collect();
        let y: Vec<f64> = (0..8).map(|i| if i < 4 { 1.0 } else { 5.0 }).collect();
        (x, y)
    }

    #[test]
    fn finds_the_step() {
        let (x, y) = step_data();
        let tree = RegressionTree::fit(&x, &y, &TreeConfig::default(), 42);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict_row(&[3.4, 0.0]), 1.0);
        assert_eq!(tree.predict_row(&[3.6, 0.0]), 5.0);
    }

    #[test]
    fn fully_grown_tree_interpolates_training_data() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| ((i * 7) % 10) as f64).collect();
        let tree = RegressionTree::fit(&x, &y, &TreeConfig::default(), 42);
        for (row, target) in x.iter().zip(&y) {
            assert_eq!(tree.predict_row(row), *target);
        }
    }

    #[test]
    fn max_depth_limits_growth() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..10).map(|i| ((i * 7) % 10) as f64).collect();
        let config = TreeConfig {
            max_depth: Some(2),
            ..TreeConfig::default()
        };
        assert!(RegressionTree::fit(&x, &y, &config, 42).depth() <= 2);
    }

    #[test]
    fn tied_features_resolve_by_seed_deterministically() {
        // Two identical features: every split on one is as good as on the other.
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64, i as f64]).collect();
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let a = RegressionTree::fit(&x, &y, &TreeConfig::default(), 42);
        let b = RegressionTree::fit(&x, &y, &TreeConfig::default(), 42);
        assert_eq!(a, b);
    }

    #[test]
    fn constant_target_is_a_single_leaf() {
        let x: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let tree = RegressionTree::fit(&x, &[2.0; 4], &TreeConfig::default(), 42);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict_row(&[100.0]), 2.0);
    }
}
