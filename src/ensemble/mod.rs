//! Score fusion and percentile thresholding
//!
//! Combines the two independently-scaled raw score vectors into one bounded
//! ensemble score, then derives a binary verdict from a batch-relative
//! percentile cut. Because the cut is a percentile, the anomaly rate is
//! approximately fixed (~1% at the default 99th) regardless of the absolute
//! score distribution.

use crate::error::{ApiwatchError, Result};
use crate::record::EnsembleVerdict;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fusion weights and threshold percentile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Weight of the density (isolation forest) score
    pub w_density: f64,
    /// Weight of the reconstruction score
    pub w_reconstruction: f64,
    /// Percentile of the fused score used as the anomaly threshold
    pub anomaly_percentile: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            w_density: 0.6,
            w_reconstruction: 0.4,
            anomaly_percentile: 99.0,
        }
    }
}

impl FusionConfig {
    fn validate(&self) -> Result<()> {
        if (self.w_density + self.w_reconstruction - 1.0).abs() > 1e-9 {
            return Err(ApiwatchError::ValidationError(format!(
                "fusion weights must sum to 1, got {} + {}",
                self.w_density, self.w_reconstruction
            )));
        }
        Ok(())
    }
}

/// Min-max normalize a score vector to [0, 1] over the batch.
///
/// Degenerate batches (`max == min`, e.g. all scores identical) normalize to
/// all zeros rather than dividing by zero. This is expected at small batch
/// sizes and is handled here instead of being surfaced as an error.
pub fn min_max_normalize(scores: &Array1<f64>) -> Array1<f64> {
    let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;

    if !range.is_finite() || range <= 0.0 {
        return Array1::zeros(scores.len());
    }
    scores.mapv(|s| (s - min) / range)
}

/// Linear-interpolated percentile of a value set, `p` in [0, 100].
pub fn percentile(values: &Array1<f64>, p: f64) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = p.clamp(0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
    }
}

/// Fuse two raw score vectors into per-record verdicts.
///
/// Each vector is min-max normalized over the batch, the normalized scores
/// are combined as a weighted sum, and `is_anomaly` is true for rows whose
/// fused score strictly exceeds the batch percentile threshold.
pub fn fuse_scores(
    density: &Array1<f64>,
    reconstruction: &Array1<f64>,
    config: &FusionConfig,
) -> Result<Vec<EnsembleVerdict>> {
    config.validate()?;
    if density.len() != reconstruction.len() {
        return Err(ApiwatchError::ShapeError(format!(
            "score vectors differ in length: {} vs {}",
            density.len(),
            reconstruction.len()
        )));
    }

    let norm_density = min_max_normalize(density);
    let norm_reconstruction = min_max_normalize(reconstruction);

    let ensemble =
        &norm_density * config.w_density + &norm_reconstruction * config.w_reconstruction;
    let threshold = percentile(&ensemble, config.anomaly_percentile);
    debug!(threshold, rows = ensemble.len(), "fused scores thresholded");

    Ok(ensemble
        .iter()
        .map(|&score| EnsembleVerdict {
            ensemble_score: score,
            is_anomaly: score > threshold,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_normalization_hits_bounds() {
        let scores = array![3.0, 7.0, 5.0];
        let norm = min_max_normalize(&scores);

        assert_eq!(norm[0], 0.0);
        assert_eq!(norm[1], 1.0);
        assert_eq!(norm[2], 0.5);
    }

    #[test]
    fn test_degenerate_batch_normalizes_to_zero() {
        let scores = array![4.2, 4.2, 4.2, 4.2];
        let norm = min_max_normalize(&scores);
        assert!(norm.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = array![1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert_eq!(percentile(&values, 50.0), 2.5);
    }

    #[test]
    fn test_fuse_flags_top_scorer() {
        let density = Array1::from_iter((0..100).map(|i| i as f64));
        let reconstruction = Array1::from_iter((0..100).map(|i| i as f64));

        let verdicts = fuse_scores(&density, &reconstruction, &FusionConfig::default()).unwrap();

        let flagged: Vec<usize> = verdicts
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_anomaly)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flagged, vec![99]);
        assert!((verdicts[99].ensemble_score - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_scores_flag_nothing() {
        let density = array![1.0, 1.0, 1.0, 1.0];
        let reconstruction = array![2.0, 2.0, 2.0, 2.0];

        let verdicts = fuse_scores(&density, &reconstruction, &FusionConfig::default()).unwrap();
        assert!(verdicts.iter().all(|v| !v.is_anomaly));
        assert!(verdicts.iter().all(|v| v.ensemble_score == 0.0));
    }

    #[test]
    fn test_length_mismatch_errors() {
        let a = array![1.0, 2.0];
        let b = array![1.0];
        assert!(matches!(
            fuse_scores(&a, &b, &FusionConfig::default()),
            Err(ApiwatchError::ShapeError(_))
        ));
    }

    #[test]
    fn test_bad_weights_rejected() {
        let a = array![1.0, 2.0];
        let config = FusionConfig {
            w_density: 0.8,
            w_reconstruction: 0.4,
            anomaly_percentile: 99.0,
        };
        assert!(matches!(
            fuse_scores(&a, &a, &config),
            Err(ApiwatchError::ValidationError(_))
        ));
    }
}
