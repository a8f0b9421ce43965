//! End-to-end batch detection pipeline
//!
//! Orchestration: feature extraction -> standardization -> the two scorers
//! (run in parallel; neither depends on the other) -> fusion barrier (needs
//! both full score vectors for batch min/max and the percentile cut) ->
//! per-record explanations. Output order always matches input order, even
//! though scoring happens in timestamp order internally.
//!
//! The run is all-or-nothing: any scorer failure aborts before any annotated
//! output is produced.

use crate::config::PipelineConfig;
use crate::detect::{AnomalyScorer, Autoencoder, AutoencoderConfig, IsolationForest};
use crate::ensemble::{fuse_scores, FusionConfig};
use crate::error::{ApiwatchError, Result};
use crate::explain::{explain, RuleContext};
use crate::features::{EndpointEncoder, FeatureMatrix, FeaturePipeline, StandardScaler};
use crate::record::{AnnotatedRecord, RawRecord};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fitted model artifacts, persistable as one opaque blob.
///
/// The recoverable invariant is the fit/score contract: a saved and reloaded
/// set scores a batch identically to the set that was saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModels {
    /// Column standardization statistics
    pub scaler: StandardScaler,
    /// Fitted endpoint vocabulary
    pub encoder: EndpointEncoder,
    /// Density scorer
    pub forest: IsolationForest,
    /// Reconstruction scorer
    pub autoencoder: Autoencoder,
}

/// Result of a pipeline run: annotated records plus the fitted models.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    /// Input records with verdicts and explanations, in input order
    pub records: Vec<AnnotatedRecord>,
    /// Models fitted on this batch, for persistence
    pub models: TrainedModels,
}

impl DetectionResult {
    /// Number of records flagged anomalous.
    pub fn anomaly_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_anomaly).count()
    }
}

/// The batch anomaly detection pipeline.
#[derive(Debug, Clone)]
pub struct AnomalyPipeline {
    config: PipelineConfig,
}

impl AnomalyPipeline {
    /// Create a pipeline from a validated configuration.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run detection over a batch of records.
    pub fn run(&self, records: &[RawRecord]) -> Result<DetectionResult> {
        let mut feature_pipeline = FeaturePipeline::new(self.config.rolling_window_size);
        let features = feature_pipeline.fit_transform(records)?;
        info!(
            rows = features.nrows(),
            cols = features.ncols(),
            "feature matrix built"
        );

        let mut scaler = StandardScaler::new();
        let scaled = scaler.fit_transform(features.values())?;

        let forest = {
            let mut forest = IsolationForest::new()
                .with_n_trees(self.config.num_trees)
                .with_contamination(self.config.contamination);
            if let Some(seed) = self.config.random_seed {
                forest = forest.with_seed(seed);
            }
            forest
        };
        let autoencoder = Autoencoder::new(AutoencoderConfig {
            bottleneck_width: self.config.bottleneck_width,
            epochs: self.config.epochs,
            batch_size: self.config.batch_size,
            seed: self.config.random_seed,
            ..Default::default()
        });

        // The scorers are independent; fusion is the barrier that needs both
        let scaled = &scaled;
        let (density, reconstruction) = rayon::join(
            || {
                let mut forest = forest;
                forest.fit_score(scaled).map(|s| (forest, s))
            },
            || {
                let mut autoencoder = autoencoder;
                autoencoder.fit_score(scaled).map(|s| (autoencoder, s))
            },
        );
        let (forest, density) = density?;
        let (autoencoder, reconstruction) = reconstruction?;

        let verdicts = fuse_scores(
            &density,
            &reconstruction,
            &FusionConfig {
                w_density: self.config.w_density,
                w_reconstruction: self.config.w_reconstruction,
                anomaly_percentile: self.config.anomaly_percentile,
            },
        )?;

        let records = annotate(records, &features, &verdicts);
        let result = DetectionResult {
            records,
            models: TrainedModels {
                scaler,
                encoder: feature_pipeline.encoder().clone(),
                forest,
                autoencoder,
            },
        };
        info!(
            anomalies = result.anomaly_count(),
            total = result.records.len(),
            "batch annotated"
        );
        Ok(result)
    }
}

/// Attach verdicts and explanations, restoring original input order.
fn annotate(
    records: &[RawRecord],
    features: &FeatureMatrix,
    verdicts: &[crate::record::EnsembleVerdict],
) -> Vec<AnnotatedRecord> {
    // Explanations are row-independent; shard them across workers
    let explanations: Vec<String> = (0..features.nrows())
        .into_par_iter()
        .map(|row| {
            if !verdicts[row].is_anomaly {
                return String::new();
            }
            let record = &records[features.original_index(row)];
            explain(&RuleContext {
                endpoint: &record.endpoint,
                latency_ms: record.latency_ms as f64,
                rolling_mean_latency: features.rolling_mean(row),
                status_error: record.status_code >= 500,
            })
        })
        .collect();

    let mut annotated: Vec<Option<AnnotatedRecord>> = vec![None; records.len()];
    for (row, (verdict, explanation)) in verdicts.iter().zip(explanations).enumerate() {
        let original = features.original_index(row);
        annotated[original] = Some(AnnotatedRecord::new(
            records[original].clone(),
            *verdict,
            explanation,
        ));
    }

    // Every original index appears exactly once in the permutation
    annotated.into_iter().flatten().collect()
}

impl AnomalyPipeline {
    /// Score a new batch against previously fitted models.
    ///
    /// Features are encoded with the persisted endpoint vocabulary; unseen
    /// endpoints follow the encoder's documented policy. The scorers are not
    /// refitted.
    pub fn score_with(
        &self,
        models: &TrainedModels,
        records: &[RawRecord],
    ) -> Result<Vec<AnnotatedRecord>> {
        if records.is_empty() {
            return Err(ApiwatchError::InsufficientData {
                rows: 0,
                min_rows: 1,
            });
        }

        let feature_pipeline =
            FeaturePipeline::with_encoder(self.config.rolling_window_size, models.encoder.clone());
        let features = feature_pipeline.transform(records)?;
        let scaled = models.scaler.transform(features.values())?;

        let density = models.forest.score_samples(&scaled)?;
        let reconstruction = models.autoencoder.score_samples(&scaled)?;

        let verdicts = fuse_scores(
            &density,
            &reconstruction,
            &FusionConfig {
                w_density: self.config.w_density,
                w_reconstruction: self.config.w_reconstruction,
                anomaly_percentile: self.config.anomaly_percentile,
            },
        )?;

        Ok(annotate(records, &features, &verdicts))
    }
}
