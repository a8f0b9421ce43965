//! Unsupervised anomaly scorers
//!
//! Two independent scorers share one contract: fit on a standardized feature
//! matrix, then return one raw score per row with higher meaning more
//! anomalous. Their raw scales differ; the ensemble module normalizes and
//! fuses them.

mod autoencoder;
mod isolation_forest;

pub use autoencoder::{Autoencoder, AutoencoderConfig};
pub use isolation_forest::{IsolationForest, IsolationTree};

use crate::error::Result;
use ndarray::{Array1, Array2};

/// Common contract for anomaly scorers.
///
/// Score convention: higher = more anomalous, uniformly across scorers.
pub trait AnomalyScorer {
    /// Train the scorer on a standardized feature matrix.
    fn fit(&mut self, x: &Array2<f64>) -> Result<()>;

    /// Score each row of a matrix. Requires a prior `fit`.
    fn score_samples(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Fit on a batch and score that same batch.
    fn fit_score(&mut self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.fit(x)?;
        self.score_samples(x)
    }
}
