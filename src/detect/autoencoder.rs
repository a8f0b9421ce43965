//! Bottleneck autoencoder reconstruction scorer
//!
//! A symmetric feedforward network (input -> 16 -> bottleneck -> 16 -> input)
//! trained to reconstruct the standardized feature rows it will later score.
//! The anomaly score is the per-row mean squared reconstruction error: rows
//! the learned compression represents poorly score high.

use crate::detect::AnomalyScorer;
use crate::error::{ApiwatchError, Result};
use ndarray::{Array1, Array2, Axis};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Autoencoder hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoencoderConfig {
    /// Width of the outer hidden layers
    pub hidden_width: usize,
    /// Width of the bottleneck layer
    pub bottleneck_width: usize,
    /// SGD learning rate
    pub learning_rate: f64,
    /// Training epochs
    pub epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// SGD momentum
    pub momentum: f64,
    /// Seed for weight init and mini-batch shuffling
    pub seed: Option<u64>,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            hidden_width: 16,
            bottleneck_width: 8,
            learning_rate: 0.001,
            epochs: 10,
            batch_size: 32,
            momentum: 0.9,
            seed: Some(42),
        }
    }
}

/// Bottleneck autoencoder with ReLU hidden layers and a linear output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Autoencoder {
    config: AutoencoderConfig,
    weights: Vec<Array2<f64>>,
    biases: Vec<Array1<f64>>,
    n_features: usize,
    is_fitted: bool,
}

impl Autoencoder {
    pub fn new(config: AutoencoderConfig) -> Self {
        Self {
            config,
            weights: Vec::new(),
            biases: Vec::new(),
            n_features: 0,
            is_fitted: false,
        }
    }

    /// Reconstruct rows through the trained network.
    pub fn reconstruct(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(ApiwatchError::ModelNotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ApiwatchError::ShapeError(format!(
                "expected {} features, got {}",
                self.n_features,
                x.ncols()
            )));
        }
        Ok(self.forward(x).0.pop().unwrap_or_else(|| x.clone()))
    }

    fn layer_sizes(&self) -> Vec<usize> {
        vec![
            self.n_features,
            self.config.hidden_width,
            self.config.bottleneck_width,
            self.config.hidden_width,
            self.n_features,
        ]
    }

    fn initialize_weights(&mut self, rng: &mut Xoshiro256PlusPlus) {
        self.weights.clear();
        self.biases.clear();

        let sizes = self.layer_sizes();
        for pair in sizes.windows(2) {
            let (n_in, n_out) = (pair[0], pair[1]);
            // Xavier/Glorot initialization
            let scale = (2.0 / (n_in + n_out) as f64).sqrt();
            let weights: Array2<f64> =
                Array2::from_shape_fn((n_in, n_out), |_| rng.gen::<f64>() * 2.0 * scale - scale);
            self.weights.push(weights);
            self.biases.push(Array1::zeros(n_out));
        }
    }

    /// Forward pass returning per-layer activations and pre-activations.
    fn forward(&self, x: &Array2<f64>) -> (Vec<Array2<f64>>, Vec<Array2<f64>>) {
        let mut activations = vec![x.clone()];
        let mut z_values = Vec::new();

        for (i, (w, b)) in self.weights.iter().zip(self.biases.iter()).enumerate() {
            let z = activations.last().unwrap().dot(w) + b;
            z_values.push(z.clone());

            let a = if i < self.weights.len() - 1 {
                z.mapv(|v| v.max(0.0)) // ReLU
            } else {
                z // linear reconstruction output
            };
            activations.push(a);
        }

        (activations, z_values)
    }

    fn backward(
        &self,
        target: &Array2<f64>,
        activations: &[Array2<f64>],
        z_values: &[Array2<f64>],
    ) -> Vec<(Array2<f64>, Array1<f64>)> {
        let n = target.nrows() as f64;
        let mut gradients = Vec::new();

        // MSE gradient at the linear output
        let mut delta = (activations.last().unwrap() - target) / n;

        for i in (0..self.weights.len()).rev() {
            let a_prev = &activations[i];
            gradients.push((a_prev.t().dot(&delta), delta.sum_axis(Axis(0))));

            if i > 0 {
                let relu_grad = z_values[i - 1].mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
                delta = delta.dot(&self.weights[i].t()) * relu_grad;
            }
        }

        gradients.reverse();
        gradients
    }

    fn gather_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
        let n_cols = x.ncols();
        let mut rows = Vec::with_capacity(indices.len() * n_cols);
        for &i in indices {
            rows.extend(x.row(i).iter().copied());
        }
        Array2::from_shape_vec((indices.len(), n_cols), rows)
            .unwrap_or_else(|_| Array2::zeros((0, n_cols)))
    }

    fn row_mse(x: &Array2<f64>, reconstruction: &Array2<f64>) -> Array1<f64> {
        let diff = x - reconstruction;
        diff.mapv(|v| v * v).mean_axis(Axis(1)).unwrap_or_default()
    }
}

impl AnomalyScorer for Autoencoder {
    fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(ApiwatchError::InsufficientData {
                rows: 0,
                min_rows: 1,
            });
        }
        self.n_features = x.ncols();

        let mut rng = match self.config.seed {
            Some(seed) => Xoshiro256PlusPlus::seed_from_u64(seed),
            None => Xoshiro256PlusPlus::from_entropy(),
        };
        self.initialize_weights(&mut rng);

        let mut velocities_w: Vec<Array2<f64>> = self
            .weights
            .iter()
            .map(|w| Array2::zeros(w.raw_dim()))
            .collect();
        let mut velocities_b: Vec<Array1<f64>> = self
            .biases
            .iter()
            .map(|b| Array1::zeros(b.len()))
            .collect();

        let mut indices: Vec<usize> = (0..n_samples).collect();

        for epoch in 0..self.config.epochs {
            indices.shuffle(&mut rng);

            let mut epoch_loss = 0.0;
            let mut n_batches = 0usize;

            for batch_start in (0..n_samples).step_by(self.config.batch_size) {
                let batch_end = (batch_start + self.config.batch_size).min(n_samples);
                let batch = Self::gather_rows(x, &indices[batch_start..batch_end]);

                let (activations, z_values) = self.forward(&batch);
                epoch_loss += Self::row_mse(&batch, activations.last().unwrap())
                    .mean()
                    .unwrap_or(0.0);
                n_batches += 1;

                let gradients = self.backward(&batch, &activations, &z_values);
                for (i, (grad_w, grad_b)) in gradients.into_iter().enumerate() {
                    velocities_w[i] = &velocities_w[i] * self.config.momentum
                        - &grad_w * self.config.learning_rate;
                    velocities_b[i] = &velocities_b[i] * self.config.momentum
                        - &grad_b * self.config.learning_rate;

                    self.weights[i] = &self.weights[i] + &velocities_w[i];
                    self.biases[i] = &self.biases[i] + &velocities_b[i];
                }
            }

            let epoch_loss = epoch_loss / n_batches.max(1) as f64;
            debug!(epoch, loss = epoch_loss, "autoencoder epoch complete");

            if !epoch_loss.is_finite() {
                return Err(ApiwatchError::TrainingDivergence {
                    epoch,
                    loss: epoch_loss,
                });
            }
        }

        self.is_fitted = true;
        Ok(())
    }

    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        let reconstruction = self.reconstruct(x)?;
        Ok(Self::row_mse(x, &reconstruction))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standardized_batch() -> Array2<f64> {
        // 40 rows clustered near zero, last row far out
        let mut data: Vec<f64> = Vec::new();
        for i in 0..39 {
            let v = ((i % 7) as f64 - 3.0) * 0.3;
            data.extend_from_slice(&[v, -v, v * 0.5]);
        }
        data.extend_from_slice(&[6.0, 6.0, 6.0]);
        Array2::from_shape_vec((40, 3), data).unwrap()
    }

    #[test]
    fn test_scores_are_finite_and_non_negative() {
        let x = standardized_batch();
        let mut model = Autoencoder::new(AutoencoderConfig {
            epochs: 20,
            ..Default::default()
        });
        let scores = model.fit_score(&x).unwrap();

        assert_eq!(scores.len(), 40);
        assert!(scores.iter().all(|s| s.is_finite() && *s >= 0.0));
    }

    #[test]
    fn test_outlier_reconstructs_worse() {
        let x = standardized_batch();
        let mut model = Autoencoder::new(AutoencoderConfig {
            epochs: 50,
            ..Default::default()
        });
        let scores = model.fit_score(&x).unwrap();

        let mean_inlier: f64 = scores.iter().take(39).sum::<f64>() / 39.0;
        assert!(
            scores[39] > mean_inlier,
            "outlier score {} should exceed inlier mean {}",
            scores[39],
            mean_inlier
        );
    }

    #[test]
    fn test_same_seed_same_scores() {
        let x = standardized_batch();

        let fit_score = |seed| {
            let mut model = Autoencoder::new(AutoencoderConfig {
                seed: Some(seed),
                ..Default::default()
            });
            model.fit_score(&x).unwrap()
        };

        assert_eq!(fit_score(11), fit_score(11));
    }

    #[test]
    fn test_divergence_detected() {
        let x = standardized_batch();
        let mut model = Autoencoder::new(AutoencoderConfig {
            learning_rate: 1e6,
            ..Default::default()
        });
        assert!(matches!(
            model.fit(&x),
            Err(ApiwatchError::TrainingDivergence { .. })
        ));
    }

    #[test]
    fn test_score_before_fit_errors() {
        let model = Autoencoder::new(AutoencoderConfig::default());
        let x = Array2::zeros((4, 3));
        assert!(matches!(
            model.score_samples(&x),
            Err(ApiwatchError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_empty_batch_errors() {
        let mut model = Autoencoder::new(AutoencoderConfig::default());
        let x = Array2::zeros((0, 3));
        assert!(matches!(
            model.fit(&x),
            Err(ApiwatchError::InsufficientData { .. })
        ));
    }
}
