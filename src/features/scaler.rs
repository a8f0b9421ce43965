//! Column-wise standardization for the feature matrix

use crate::error::{ApiwatchError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Standard (z-score) scaler: `(x - mean) / std` per column.
///
/// Zero-variance columns are scaled by 1 so degenerate features collapse to
/// zero instead of dividing by zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Option<Array1<f64>>,
    stds: Option<Array1<f64>>,
}

impl Default for StandardScaler {
    fn default() -> Self {
        Self::new()
    }
}

impl StandardScaler {
    /// Create an unfitted scaler.
    pub fn new() -> Self {
        Self {
            means: None,
            stds: None,
        }
    }

    /// Fit column means and standard deviations.
    pub fn fit(&mut self, x: &Array2<f64>) -> Result<()> {
        if x.nrows() == 0 {
            return Err(ApiwatchError::InsufficientData {
                rows: 0,
                min_rows: 1,
            });
        }

        let means = x.mean_axis(Axis(0)).ok_or_else(|| {
            ApiwatchError::ShapeError("cannot compute column means of empty matrix".to_string())
        })?;
        let stds = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 0.0 { s } else { 1.0 });

        self.means = Some(means);
        self.stds = Some(stds);
        Ok(())
    }

    /// Standardize a matrix with the fitted statistics.
    pub fn transform(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        let (means, stds) = match (&self.means, &self.stds) {
            (Some(m), Some(s)) => (m, s),
            _ => return Err(ApiwatchError::ModelNotFitted),
        };
        if x.ncols() != means.len() {
            return Err(ApiwatchError::ShapeError(format!(
                "expected {} columns, got {}",
                means.len(),
                x.ncols()
            )));
        }

        Ok((x - means) / stds)
    }

    /// Fit and transform in one step.
    pub fn fit_transform(&mut self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardized_columns_have_zero_mean() {
        let x = Array2::from_shape_vec((4, 2), vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0])
            .unwrap();

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        for col in scaled.axis_iter(Axis(1)) {
            let mean: f64 = col.iter().sum::<f64>() / col.len() as f64;
            assert!(mean.abs() < 1e-10);
        }
    }

    #[test]
    fn test_zero_variance_column_maps_to_zero() {
        let x = Array2::from_shape_vec((3, 2), vec![5.0, 1.0, 5.0, 2.0, 5.0, 3.0]).unwrap();

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(&x).unwrap();

        for i in 0..3 {
            assert_eq!(scaled[[i, 0]], 0.0);
        }
    }

    #[test]
    fn test_transform_before_fit_errors() {
        let x = Array2::zeros((2, 2));
        let scaler = StandardScaler::new();
        assert!(matches!(
            scaler.transform(&x),
            Err(ApiwatchError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_column_count_mismatch_errors() {
        let x = Array2::zeros((2, 2));
        let y = Array2::zeros((2, 3));
        let mut scaler = StandardScaler::new();
        scaler.fit(&x).unwrap();
        assert!(matches!(
            scaler.transform(&y),
            Err(ApiwatchError::ShapeError(_))
        ));
    }
}
