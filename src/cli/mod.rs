//! Command-line interface
//!
//! Two subcommands mirror the batch workflow: `generate` writes a synthetic
//! log batch, `detect` runs the full pipeline over a batch file and writes
//! the annotated result (and optionally the trained model artifacts).

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PipelineConfig;
use crate::io;
use crate::pipeline::AnomalyPipeline;
use crate::synthetic::LogGenerator;

/// Batch anomaly detection for API call logs.
#[derive(Debug, Parser)]
#[command(name = "apiwatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a synthetic log batch
    Generate {
        /// Number of records to generate
        #[arg(long, default_value_t = 5000)]
        count: usize,
        /// Output path for the JSON batch
        #[arg(long, default_value = "data/sample_logs.json")]
        output: PathBuf,
        /// Seed for a reproducible batch
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Detect and explain anomalies in a log batch
    Detect {
        /// Input JSON batch
        #[arg(long)]
        input: PathBuf,
        /// Output path for the annotated batch
        #[arg(long, default_value = "data/detected.json")]
        output: PathBuf,
        /// Optional path to persist the trained model artifacts
        #[arg(long)]
        models: Option<PathBuf>,
        /// Anomaly percentile threshold
        #[arg(long, default_value_t = 99.0)]
        percentile: f64,
        /// Seed threaded through both scorers
        #[arg(long)]
        seed: Option<u64>,
    },
}

/// Run the `generate` subcommand.
pub fn cmd_generate(count: usize, output: &Path, seed: Option<u64>) -> anyhow::Result<()> {
    let mut generator = LogGenerator::new(count);
    if let Some(seed) = seed {
        generator = generator.with_seed(seed);
    }
    let records = generator.generate();
    io::save_records(output, &records)
        .with_context(|| format!("writing batch to {}", output.display()))?;
    println!("Wrote {} records to {}", records.len(), output.display());
    Ok(())
}

/// Run the `detect` subcommand.
pub fn cmd_detect(
    input: &Path,
    output: &Path,
    models_path: Option<&Path>,
    percentile: f64,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let records = io::load_records(input)
        .with_context(|| format!("reading batch from {}", input.display()))?;

    let mut config = PipelineConfig::default().with_anomaly_percentile(percentile);
    if let Some(seed) = seed {
        config = config.with_seed(seed);
    }

    let pipeline = AnomalyPipeline::new(config)?;
    let result = pipeline.run(&records)?;
    info!(
        anomalies = result.anomaly_count(),
        total = result.records.len(),
        "detection complete"
    );

    io::save_annotated(output, &result.records)
        .with_context(|| format!("writing annotated batch to {}", output.display()))?;
    if let Some(path) = models_path {
        io::save_models(path, &result.models)
            .with_context(|| format!("writing model artifacts to {}", path.display()))?;
    }

    println!(
        "Anomalies detected: {} / {}",
        result.anomaly_count(),
        result.records.len()
    );
    Ok(())
}
