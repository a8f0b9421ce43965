//! apiwatch - batch anomaly detection for API call logs
//!
//! Ingests a window of API call records, scores each record with an ensemble
//! of two independently-trained unsupervised models, and attaches a
//! human-readable explanation to every flagged anomaly.
//!
//! # Modules
//!
//! ## Core pipeline
//! - [`features`] - Feature extraction (rolling statistics, one-hot endpoint
//!   encoding, standardization)
//! - [`detect`] - The two scorers: isolation forest and bottleneck autoencoder
//! - [`ensemble`] - Score normalization, weighted fusion, percentile threshold
//! - [`explain`] - Deterministic rule-based explanations
//! - [`pipeline`] - End-to-end batch orchestration
//!
//! ## Collaborators
//! - [`synthetic`] - Synthetic log batch generation
//! - [`io`] - Batch and model artifact persistence
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use apiwatch::config::PipelineConfig;
//! use apiwatch::pipeline::AnomalyPipeline;
//! use apiwatch::synthetic::LogGenerator;
//!
//! # fn main() -> apiwatch::error::Result<()> {
//! let records = LogGenerator::new(1000).with_seed(42).generate();
//! let pipeline = AnomalyPipeline::new(PipelineConfig::default())?;
//! let result = pipeline.run(&records)?;
//! println!("{} anomalies", result.anomaly_count());
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod detect;
pub mod ensemble;
pub mod error;
pub mod explain;
pub mod features;
pub mod io;
pub mod pipeline;
pub mod record;
pub mod synthetic;

pub use config::PipelineConfig;
pub use error::{ApiwatchError, Result};
pub use pipeline::{AnomalyPipeline, DetectionResult, TrainedModels};
pub use record::{AnnotatedRecord, EnsembleVerdict, RawRecord};
