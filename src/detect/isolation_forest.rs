//! Isolation forest density scorer

use crate::detect::AnomalyScorer;
use crate::error::{ApiwatchError, Result};
use ndarray::{Array1, Array2};
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// A single randomized partition tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum IsolationTree {
    /// Internal node splitting on one feature
    Internal {
        /// Feature index for the split
        feature: usize,
        /// Split threshold
        threshold: f64,
        /// Subtree for values below the threshold
        left: Box<IsolationTree>,
        /// Subtree for values at or above the threshold
        right: Box<IsolationTree>,
    },
    /// Leaf node
    External {
        /// Number of samples that reached this leaf during fitting
        size: usize,
    },
}

impl IsolationTree {
    fn build(
        x: &Array2<f64>,
        indices: &[usize],
        height: usize,
        max_height: usize,
        rng: &mut impl Rng,
    ) -> Self {
        let n_samples = indices.len();
        if height >= max_height || n_samples <= 1 {
            return IsolationTree::External { size: n_samples };
        }

        let feature = rng.gen_range(0..x.ncols());
        let values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        let min_val = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let max_val = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

        // Constant feature in this subset: nothing to split on
        if (max_val - min_val).abs() < 1e-10 {
            return IsolationTree::External { size: n_samples };
        }

        let threshold = rng.gen_range(min_val..max_val);
        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) =
            indices.iter().partition(|&&i| x[[i, feature]] < threshold);

        if left_indices.is_empty() || right_indices.is_empty() {
            return IsolationTree::External { size: n_samples };
        }

        IsolationTree::Internal {
            feature,
            threshold,
            left: Box::new(Self::build(x, &left_indices, height + 1, max_height, rng)),
            right: Box::new(Self::build(x, &right_indices, height + 1, max_height, rng)),
        }
    }

    /// Path length from the root to the leaf this sample lands in, with the
    /// standard leaf-size correction term.
    pub fn path_length(&self, sample: &[f64], current_height: usize) -> f64 {
        match self {
            IsolationTree::External { size } => current_height as f64 + Self::avg_bst_depth(*size),
            IsolationTree::Internal {
                feature,
                threshold,
                left,
                right,
            } => {
                if sample[*feature] < *threshold {
                    left.path_length(sample, current_height + 1)
                } else {
                    right.path_length(sample, current_height + 1)
                }
            }
        }
    }

    /// Average path length of an unsuccessful BST search over `n` points:
    /// c(n) = 2 H(n-1) - 2(n-1)/n, with H(i) approximated via ln(i) + gamma.
    fn avg_bst_depth(n: usize) -> f64 {
        match n {
            0 | 1 => 0.0,
            2 => 1.0,
            _ => {
                let n = n as f64;
                2.0 * ((n - 1.0).ln() + 0.577_215_664_9) - 2.0 * (n - 1.0) / n
            }
        }
    }
}

/// Isolation forest: an ensemble of randomized partition trees.
///
/// A row isolated in few splits (short average path length) gets a score
/// close to 1; deeply buried rows score near 0.5 or below. Higher = more
/// anomalous, matching the crate-wide scorer convention, so no sign flip
/// is needed downstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IsolationForest {
    n_trees: usize,
    max_samples: usize,
    contamination: f64,
    seed: Option<u64>,
    trees: Option<Vec<IsolationTree>>,
    decision_threshold: Option<f64>,
    samples_per_tree: Option<usize>,
    n_features: Option<usize>,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl IsolationForest {
    /// Create a forest with default parameters (200 trees, 1% contamination).
    pub fn new() -> Self {
        Self {
            n_trees: 200,
            max_samples: 256,
            contamination: 0.01,
            seed: None,
            trees: None,
            decision_threshold: None,
            samples_per_tree: None,
            n_features: None,
        }
    }

    /// Set the number of trees.
    pub fn with_n_trees(mut self, n: usize) -> Self {
        self.n_trees = n.max(1);
        self
    }

    /// Set the maximum samples drawn per tree.
    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n.max(1);
        self
    }

    /// Set the expected anomaly fraction. Only calibrates the internal
    /// decision threshold used by [`IsolationForest::predict`]; the raw
    /// scores handed downstream are unaffected.
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Set the random seed for reproducible tree construction.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Binary prediction against the contamination-calibrated threshold:
    /// -1 for anomalous rows, 1 for inliers.
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<i32>> {
        let scores = self.score_samples(x)?;
        let threshold = self.decision_threshold.unwrap_or(0.5);
        Ok(scores.mapv(|s| if s >= threshold { -1 } else { 1 }))
    }

    fn compute_scores(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let trees = self.trees.as_ref().ok_or(ApiwatchError::ModelNotFitted)?;
        let n_features = self.n_features.ok_or(ApiwatchError::ModelNotFitted)?;
        if x.ncols() != n_features {
            return Err(ApiwatchError::ShapeError(format!(
                "expected {} features, got {}",
                n_features,
                x.ncols()
            )));
        }
        let c_n = IsolationTree::avg_bst_depth(self.samples_per_tree.unwrap_or(256));

        let scores: Vec<f64> = x
            .rows()
            .into_iter()
            .map(|row| {
                let sample: Vec<f64> = row.iter().copied().collect();
                let avg_path: f64 = trees
                    .iter()
                    .map(|tree| tree.path_length(&sample, 0))
                    .sum::<f64>()
                    / trees.len() as f64;

                // s(x, n) = 2^(-E[h(x)] / c(n))
                2.0_f64.powf(-avg_path / c_n)
            })
            .collect();

        Ok(Array1::from_vec(scores))
    }
}

impl AnomalyScorer for IsolationForest {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        // Partitioning degenerates on tiny batches
        let min_rows = (2 * x.ncols()).max(2);
        if n_samples < min_rows {
            return Err(ApiwatchError::InsufficientData {
                rows: n_samples,
                min_rows,
            });
        }

        let samples_per_tree = self.max_samples.min(n_samples);
        let max_height = (samples_per_tree as f64).log2().ceil() as usize;

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut trees = Vec::with_capacity(self.n_trees);
        for _ in 0..self.n_trees {
            let indices: Vec<usize> = (0..samples_per_tree)
                .map(|_| rng.gen_range(0..n_samples))
                .collect();
            trees.push(IsolationTree::build(x, &indices, 0, max_height, &mut rng));
        }

        self.trees = Some(trees);
        self.samples_per_tree = Some(samples_per_tree);
        self.n_features = Some(x.ncols());

        // Calibrate the internal decision threshold from the contamination
        let scores = self.compute_scores(x)?;
        let mut sorted: Vec<f64> = scores.to_vec();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        let idx = ((self.contamination * n_samples as f64) as usize).min(n_samples - 1);
        self.decision_threshold = Some(sorted[idx]);

        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.compute_scores(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outliers_score_higher() {
        let mut data = Vec::new();
        for i in 0..50 {
            data.push((i % 10) as f64);
            data.push(((i % 10) + 1) as f64);
        }
        data.extend_from_slice(&[100.0, 100.0]);
        data.extend_from_slice(&[-50.0, -50.0]);
        let x = Array2::from_shape_vec((52, 2), data).unwrap();

        let mut forest = IsolationForest::new()
            .with_n_trees(50)
            .with_contamination(0.05)
            .with_seed(42);
        forest.fit(&x).unwrap();

        let scores = forest.score_samples(&x).unwrap();
        assert!(scores[50] > scores[0]);
        assert!(scores[51] > scores[0]);

        let labels = forest.predict(&x).unwrap();
        assert!(labels.iter().any(|&l| l == -1));
    }

    #[test]
    fn test_same_seed_same_scores() {
        let x = Array2::from_shape_vec((20, 2), (0..40).map(|i| i as f64).collect()).unwrap();

        let fit_score = |seed| {
            let mut forest = IsolationForest::new().with_n_trees(25).with_seed(seed);
            forest.fit(&x).unwrap();
            forest.score_samples(&x).unwrap()
        };

        assert_eq!(fit_score(7), fit_score(7));
    }

    #[test]
    fn test_tiny_batch_rejected() {
        // 3 rows, 2 features: below the 2x-features floor
        let x = Array2::from_shape_vec((3, 2), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let mut forest = IsolationForest::new().with_seed(1);
        assert!(matches!(
            forest.fit(&x),
            Err(ApiwatchError::InsufficientData { rows: 3, min_rows: 4 })
        ));
    }

    #[test]
    fn test_column_count_mismatch_errors() {
        let x = Array2::from_shape_vec((10, 2), (0..20).map(|i| i as f64).collect()).unwrap();
        let mut forest = IsolationForest::new().with_n_trees(10).with_seed(1);
        forest.fit(&x).unwrap();

        let narrow = Array2::zeros((4, 1));
        assert!(matches!(
            forest.score_samples(&narrow),
            Err(ApiwatchError::ShapeError(_))
        ));
    }

    #[test]
    fn test_score_before_fit_errors() {
        let x = Array2::zeros((4, 2));
        let forest = IsolationForest::new();
        assert!(matches!(
            forest.score_samples(&x),
            Err(ApiwatchError::ModelNotFitted)
        ));
    }
}
