//! Pipeline configuration

use crate::error::{ApiwatchError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the full detection pipeline.
///
/// Defaults follow the reference deployment: 200 trees at 1% contamination,
/// a width-8 bottleneck trained for 10 epochs, 0.6/0.4 fusion weights and a
/// 99th-percentile anomaly cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of isolation trees
    pub num_trees: usize,
    /// Expected anomaly fraction (isolation forest internal calibration only)
    pub contamination: f64,
    /// Width of the autoencoder bottleneck layer
    pub bottleneck_width: usize,
    /// Autoencoder training epochs
    pub epochs: usize,
    /// Autoencoder mini-batch size
    pub batch_size: usize,
    /// Fusion weight for the density (isolation forest) score
    pub w_density: f64,
    /// Fusion weight for the reconstruction score
    pub w_reconstruction: f64,
    /// Percentile of the fused score used as the anomaly threshold
    pub anomaly_percentile: f64,
    /// Trailing window size for the rolling mean latency feature
    pub rolling_window_size: usize,
    /// Seed threaded through both scorers for reproducible runs
    pub random_seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            num_trees: 200,
            contamination: 0.01,
            bottleneck_width: 8,
            epochs: 10,
            batch_size: 32,
            w_density: 0.6,
            w_reconstruction: 0.4,
            anomaly_percentile: 99.0,
            rolling_window_size: 10,
            random_seed: Some(42),
        }
    }
}

impl PipelineConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of isolation trees.
    pub fn with_num_trees(mut self, n: usize) -> Self {
        self.num_trees = n.max(1);
        self
    }

    /// Set the expected anomaly fraction.
    pub fn with_contamination(mut self, c: f64) -> Self {
        self.contamination = c.clamp(0.0, 0.5);
        self
    }

    /// Set the autoencoder bottleneck width.
    pub fn with_bottleneck_width(mut self, w: usize) -> Self {
        self.bottleneck_width = w.max(1);
        self
    }

    /// Set the autoencoder training epochs.
    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs.max(1);
        self
    }

    /// Set the autoencoder mini-batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the fusion weights (must sum to 1).
    pub fn with_fusion_weights(mut self, w_density: f64, w_reconstruction: f64) -> Self {
        self.w_density = w_density;
        self.w_reconstruction = w_reconstruction;
        self
    }

    /// Set the anomaly percentile threshold.
    pub fn with_anomaly_percentile(mut self, p: f64) -> Self {
        self.anomaly_percentile = p.clamp(0.0, 100.0);
        self
    }

    /// Set the rolling window size.
    pub fn with_rolling_window_size(mut self, size: usize) -> Self {
        self.rolling_window_size = size.max(1);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if (self.w_density + self.w_reconstruction - 1.0).abs() > 1e-9 {
            return Err(ApiwatchError::ValidationError(format!(
                "fusion weights must sum to 1, got {} + {}",
                self.w_density, self.w_reconstruction
            )));
        }
        if self.w_density < 0.0 || self.w_reconstruction < 0.0 {
            return Err(ApiwatchError::ValidationError(
                "fusion weights must be non-negative".to_string(),
            ));
        }
        if !(0.0..=100.0).contains(&self.anomaly_percentile) {
            return Err(ApiwatchError::ValidationError(format!(
                "anomaly percentile must be in [0, 100], got {}",
                self.anomaly_percentile
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.num_trees, 200);
        assert_eq!(config.anomaly_percentile, 99.0);
        assert_eq!(config.rolling_window_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = PipelineConfig::new()
            .with_num_trees(50)
            .with_fusion_weights(0.5, 0.5)
            .with_seed(7);
        assert_eq!(config.num_trees, 50);
        assert_eq!(config.random_seed, Some(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let config = PipelineConfig::new().with_fusion_weights(0.7, 0.7);
        assert!(config.validate().is_err());
    }
}
