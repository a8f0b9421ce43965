//! Feature extraction over ordered API call records
//!
//! Converts a batch of [`RawRecord`]s into a numeric matrix:
//! - `latency_ms` and `hour` (UTC hour of day, 0-23)
//! - `status_error` (1 iff status code >= 500)
//! - `rolling_mean_latency_10` (trailing mean over the timestamp-sorted
//!   sequence, current record included, never looking ahead)
//! - one one-hot column per endpoint in the fitted vocabulary
//!
//! Rows are in timestamp order; the matrix keeps the permutation back to the
//! original input order so verdicts can be re-attached downstream.

mod encoder;
mod scaler;

pub use encoder::EndpointEncoder;
pub use scaler::StandardScaler;

use crate::error::{ApiwatchError, Result};
use crate::record::RawRecord;
use chrono::Timelike;
use ndarray::Array2;

/// Names of the fixed (non one-hot) feature columns.
pub const FIXED_COLUMNS: [&str; 4] = [
    "latency_ms",
    "hour",
    "status_error",
    "rolling_mean_latency_10",
];

/// A feature matrix aligned to a timestamp-sorted batch of records.
#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    values: Array2<f64>,
    columns: Vec<String>,
    sorted_to_original: Vec<usize>,
    rolling_mean: Vec<f64>,
}

impl FeatureMatrix {
    /// The numeric matrix, one row per record in timestamp order.
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Column names, fixed features followed by one-hot endpoint columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    /// Original input index of the record at sorted row `i`.
    pub fn original_index(&self, i: usize) -> usize {
        self.sorted_to_original[i]
    }

    /// Permutation from sorted row position to original input index.
    pub fn sorted_to_original(&self) -> &[usize] {
        &self.sorted_to_original
    }

    /// Rolling mean latency for the record at sorted row `i`.
    pub fn rolling_mean(&self, i: usize) -> f64 {
        self.rolling_mean[i]
    }
}

/// Derives feature matrices from record batches.
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    window: usize,
    encoder: EndpointEncoder,
}

impl FeaturePipeline {
    /// Create a pipeline with the given rolling window size.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            encoder: EndpointEncoder::new(),
        }
    }

    /// Create a pipeline around an already-fitted encoder, e.g. one loaded
    /// from persisted model artifacts.
    pub fn with_encoder(window: usize, encoder: EndpointEncoder) -> Self {
        Self {
            window: window.max(1),
            encoder,
        }
    }

    /// The endpoint encoder (fitted after `fit_transform`).
    pub fn encoder(&self) -> &EndpointEncoder {
        &self.encoder
    }

    /// Fit the endpoint vocabulary on this batch, then derive features.
    pub fn fit_transform(&mut self, records: &[RawRecord]) -> Result<FeatureMatrix> {
        if records.is_empty() {
            return Err(ApiwatchError::InsufficientData {
                rows: 0,
                min_rows: 1,
            });
        }
        let order = sorted_indices(records);
        self.encoder
            .fit(order.iter().map(|&i| records[i].endpoint.as_str()));
        self.build(records, order)
    }

    /// Derive features against the already-fitted vocabulary.
    pub fn transform(&self, records: &[RawRecord]) -> Result<FeatureMatrix> {
        if records.is_empty() {
            return Err(ApiwatchError::InsufficientData {
                rows: 0,
                min_rows: 1,
            });
        }
        self.build(records, sorted_indices(records))
    }

    fn build(&self, records: &[RawRecord], order: Vec<usize>) -> Result<FeatureMatrix> {
        let n = records.len();
        let onehot_width = self.encoder.width();
        let mut columns: Vec<String> = FIXED_COLUMNS.iter().map(|s| s.to_string()).collect();
        columns.extend(self.encoder.column_names());

        let mut values = Array2::zeros((n, FIXED_COLUMNS.len() + onehot_width));
        let mut rolling_mean = Vec::with_capacity(n);

        // Trailing-window running sum over the sorted sequence
        let mut window_sum = 0.0;

        for (row, &orig) in order.iter().enumerate() {
            let record = &records[orig];
            let latency = record.latency_ms as f64;

            window_sum += latency;
            if row >= self.window {
                window_sum -= records[order[row - self.window]].latency_ms as f64;
            }
            let window_len = (row + 1).min(self.window);
            let mean = window_sum / window_len as f64;
            rolling_mean.push(mean);

            values[[row, 0]] = latency;
            values[[row, 1]] = record.timestamp.hour() as f64;
            values[[row, 2]] = if record.status_code >= 500 { 1.0 } else { 0.0 };
            values[[row, 3]] = mean;

            if let Some(col) = self.encoder.encode(&record.endpoint)? {
                values[[row, FIXED_COLUMNS.len() + col]] = 1.0;
            }
        }

        // Scorers assume a fully finite matrix
        values.mapv_inplace(|v| if v.is_finite() { v } else { 0.0 });

        Ok(FeatureMatrix {
            values,
            columns,
            sorted_to_original: order,
            rolling_mean,
        })
    }
}

/// Stable sort of record indices by timestamp.
fn sorted_indices(records: &[RawRecord]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..records.len()).collect();
    order.sort_by_key(|&i| records[i].timestamp);
    order
}
