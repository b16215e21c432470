//! Regression trees and the two ensembles built from them: a bootstrap
//! random forest and a residual-fitting gradient boosting machine.
use anyhow::{Result, ensure};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// A node in a fitted regression tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Node {
    /// A terminal node carrying the mean target of its samples
    Leaf {
        /// The predicted value
        value: f64,
    },
    /// An internal split: rows with `feature < threshold` go left
    Split {
        /// Index of the feature the split tests
        feature: usize,
        /// The split threshold
        threshold: f64,
        /// Index of the left child in the node arena
        left: usize,
        /// Index of the right child in the node arena
        right: usize,
    },
}

/// A fitted regression tree. Nodes live in an arena with the root at
/// index 0.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Growth limits for a single tree
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeOptions {
    /// Maximum tree depth
    pub max_depth: usize,
    /// Minimum number of samples a node needs before it may split
    pub min_samples_split: usize,
}

impl DecisionTree {
    /// Fit a tree on the rows of `x`/`y` selected by `indices`
    pub fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], options: &TreeOptions) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(x, y, indices, options, 0);
        tree
    }

    /// Grow one node (and its subtree), returning its arena index
    fn build(
        &mut self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        options: &TreeOptions,
        depth: usize,
    ) -> usize {
        let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / indices.len() as f64;

        let split = if depth < options.max_depth && indices.len() >= options.min_samples_split {
            best_split(x, y, indices)
        } else {
            None
        };
        let Some((feature, threshold)) = split else {
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .copied()
            .partition(|&i| x[i][feature] < threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            // Adjacent float values can round the midpoint onto one side
            self.nodes.push(Node::Leaf { value: mean });
            return self.nodes.len() - 1;
        }

        // Reserve the parent slot before growing the children so the root
        // stays at index 0
        let node_index = self.nodes.len();
        self.nodes.push(Node::Leaf { value: mean });
        let left = self.build(x, y, &left_indices, options, depth + 1);
        let right = self.build(x, y, &right_indices, options, depth + 1);
        self.nodes[node_index] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };

        node_index
    }

    /// Predict a single value for one feature row
    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Find the (feature, threshold) pair minimising the summed child variance,
/// or `None` when no split improves on the parent
fn best_split(x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Option<(usize, f64)> {
    let n_features = x[indices[0]].len();
    let parent_sse = sse(y, indices);
    let mut best: Option<(usize, f64, f64)> = None;

    for feature in 0..n_features {
        let mut pairs: Vec<(f64, f64)> = indices.iter().map(|&i| (x[i][feature], y[i])).collect();
        pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap());

        // Running sums from the left side of each candidate threshold
        let total_sum: f64 = pairs.iter().map(|(_, t)| t).sum();
        let total_sq: f64 = pairs.iter().map(|(_, t)| t * t).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;

        for k in 0..pairs.len() - 1 {
            left_sum += pairs[k].1;
            left_sq += pairs[k].1 * pairs[k].1;
            // Only split between distinct feature values
            if pairs[k].0 == pairs[k + 1].0 {
                continue;
            }

            let left_n = (k + 1) as f64;
            let right_n = (pairs.len() - k - 1) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let split_sse = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if best.is_none_or(|(_, _, best_sse)| split_sse < best_sse) {
                let threshold = (pairs[k].0 + pairs[k + 1].0) / 2.0;
                best = Some((feature, threshold, split_sse));
            }
        }
    }

    best.and_then(|(feature, threshold, best_sse)| {
        (best_sse < parent_sse - 1e-12).then_some((feature, threshold))
    })
}

/// Sum of squared errors around the mean for the selected rows
fn sse(y: &[f64], indices: &[usize]) -> f64 {
    let n = indices.len() as f64;
    let sum: f64 = indices.iter().map(|&i| y[i]).sum();
    let sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
    sq - sum * sum / n
}

/// Hyperparameters for the random forest
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestOptions {
    /// Number of trees
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: usize,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
    /// Seed for the bootstrap sampling
    pub seed: u64,
}

impl Default for ForestOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 3,
            seed: 42,
        }
    }
}

/// A bootstrap ensemble of regression trees, averaged at prediction time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fit the forest: each tree trains on a bootstrap resample of the rows
    pub fn fit(x: &[Vec<f64>], y: &[f64], options: &ForestOptions) -> Result<Self> {
        ensure!(!x.is_empty(), "Cannot fit a random forest on no samples");
        ensure!(
            x.len() == y.len(),
            "Feature matrix has {} rows but target has {} values",
            x.len(),
            y.len()
        );

        let tree_options = TreeOptions {
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split,
        };
        let mut rng = StdRng::seed_from_u64(options.seed);
        let trees = (0..options.n_estimators)
            .map(|_| {
                let sample: Vec<usize> =
                    (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
                DecisionTree::fit(x, y, &sample, &tree_options)
            })
            .collect();

        Ok(Self { trees })
    }

    /// Predict the mean of the per-tree predictions
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.trees.iter().map(|t| t.predict(row)).sum::<f64>() / self.trees.len() as f64
    }
}

/// Hyperparameters for gradient boosting
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientBoostingOptions {
    /// Number of boosting rounds
    pub n_estimators: usize,
    /// Maximum depth per tree
    pub max_depth: usize,
    /// Minimum samples a node needs before it may split
    pub min_samples_split: usize,
    /// Shrinkage applied to each tree's contribution
    pub learning_rate: f64,
}

impl Default for GradientBoostingOptions {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 5,
            min_samples_split: 2,
            learning_rate: 0.1,
        }
    }
}

/// A gradient boosting ensemble: trees fit sequentially on the residuals of
/// the running prediction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GradientBoosting {
    init: f64,
    learning_rate: f64,
    trees: Vec<DecisionTree>,
}

impl GradientBoosting {
    /// Fit the ensemble
    pub fn fit(x: &[Vec<f64>], y: &[f64], options: &GradientBoostingOptions) -> Result<Self> {
        ensure!(!x.is_empty(), "Cannot fit gradient boosting on no samples");
        ensure!(
            x.len() == y.len(),
            "Feature matrix has {} rows but target has {} values",
            x.len(),
            y.len()
        );

        let tree_options = TreeOptions {
            max_depth: options.max_depth,
            min_samples_split: options.min_samples_split,
        };
        let init = y.iter().sum::<f64>() / y.len() as f64;
        let indices: Vec<usize> = (0..x.len()).collect();
        let mut residuals: Vec<f64> = y.iter().map(|v| v - init).collect();
        let mut trees = Vec::with_capacity(options.n_estimators);

        for _ in 0..options.n_estimators {
            let tree = DecisionTree::fit(x, &residuals, &indices, &tree_options);
            for (residual, row) in residuals.iter_mut().zip(x) {
                *residual -= options.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        Ok(Self {
            init,
            learning_rate: options.learning_rate,
            trees,
        })
    }

    /// Predict a single value for one feature row
    pub fn predict(&self, row: &[f64]) -> f64 {
        self.init
            + self.learning_rate
                * self
                    .trees
                    .iter()
                    .map(|t| t.predict(row))
                    .sum::<f64>()
    }
}
