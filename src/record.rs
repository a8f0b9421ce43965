//! Raw and annotated API call records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single API call record, as produced by the upstream log source.
///
/// Records are immutable once ingested; the pipeline never mutates them.
/// Ordering by `timestamp` is significant and is preserved end-to-end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Event time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Distributed trace identifier
    #[serde(rename = "traceId")]
    pub trace_id: String,
    /// Request path, e.g. `/login`
    pub endpoint: String,
    /// Request latency in milliseconds
    pub latency_ms: u64,
    /// HTTP status code
    pub status_code: u16,
    /// Caller identifier
    pub user_id: u64,
}

/// Verdict attached to each record after score fusion.
///
/// `is_anomaly` is batch-relative: the threshold is a percentile of the
/// fused scores over the batch, so re-running on a different batch can
/// change the cutoff for materially identical records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnsembleVerdict {
    /// Fused anomaly score in [0, 1]
    pub ensemble_score: f64,
    /// Whether the fused score exceeds the batch percentile threshold
    pub is_anomaly: bool,
}

/// A record augmented with its verdict and explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatedRecord {
    /// The original record, unchanged
    #[serde(flatten)]
    pub record: RawRecord,
    /// Fused anomaly score in [0, 1]
    pub ensemble_score: f64,
    /// Batch-relative anomaly flag
    pub is_anomaly: bool,
    /// Joined reason strings; empty for non-anomalous records
    pub explanation: String,
}

impl AnnotatedRecord {
    /// Attach a verdict and explanation to a record.
    pub fn new(record: RawRecord, verdict: EnsembleVerdict, explanation: String) -> Self {
        Self {
            record,
            ensemble_score: verdict.ensemble_score,
            is_anomaly: verdict.is_anomaly,
            explanation,
        }
    }
}
