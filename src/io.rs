//! Storage collaborator: batch and model artifact persistence
//!
//! Record batches travel as JSON arrays; trained models are persisted as a
//! single JSON blob. The pipeline core only relies on the fit/score contract
//! surviving a save/load round-trip.

use crate::error::{ApiwatchError, Result};
use crate::pipeline::TrainedModels;
use crate::record::{AnnotatedRecord, RawRecord};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| ApiwatchError::DataError(format!("{}: {e}", path.display())))
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ApiwatchError::DataError(format!("{}: {e}", parent.display())))?;
        }
    }
    File::create(path).map_err(|e| ApiwatchError::DataError(format!("{}: {e}", path.display())))
}

/// Load a batch of raw records from a JSON array file.
pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    let path = path.as_ref();
    let reader = BufReader::new(open(path)?);
    let records: Vec<RawRecord> = serde_json::from_reader(reader)
        .map_err(|e| ApiwatchError::DataError(format!("{}: {e}", path.display())))?;
    info!(count = records.len(), path = %path.display(), "records loaded");
    Ok(records)
}

/// Save a batch of raw records as a JSON array file.
pub fn save_records(path: impl AsRef<Path>, records: &[RawRecord]) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(create(path)?);
    serde_json::to_writer_pretty(writer, records)
        .map_err(|e| ApiwatchError::SerializationError(e.to_string()))?;
    info!(count = records.len(), path = %path.display(), "records saved");
    Ok(())
}

/// Save an annotated batch as a JSON array file.
pub fn save_annotated(path: impl AsRef<Path>, records: &[AnnotatedRecord]) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(create(path)?);
    serde_json::to_writer_pretty(writer, records)
        .map_err(|e| ApiwatchError::SerializationError(e.to_string()))?;
    info!(count = records.len(), path = %path.display(), "annotated records saved");
    Ok(())
}

/// Persist trained model artifacts as one opaque JSON blob.
pub fn save_models(path: impl AsRef<Path>, models: &TrainedModels) -> Result<()> {
    let path = path.as_ref();
    let writer = BufWriter::new(create(path)?);
    serde_json::to_writer(writer, models)
        .map_err(|e| ApiwatchError::SerializationError(e.to_string()))?;
    info!(path = %path.display(), "model artifacts saved");
    Ok(())
}

/// Load trained model artifacts.
pub fn load_models(path: impl AsRef<Path>) -> Result<TrainedModels> {
    let path = path.as_ref();
    let reader = BufReader::new(open(path)?);
    let mut models: TrainedModels = serde_json::from_reader(reader)
        .map_err(|e| ApiwatchError::SerializationError(format!("{}: {e}", path.display())))?;
    // The encoder's lookup index is not serialized
    models.encoder.rebuild_index();
    info!(path = %path.display(), "model artifacts loaded");
    Ok(models)
}
