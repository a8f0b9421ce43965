//! Crate-wide error types

use thiserror::Error;

/// Errors produced by the detection pipeline
#[derive(Debug, Error)]
pub enum ApiwatchError {
    /// Data loading or conversion failure
    #[error("Data error: {0}")]
    DataError(String),

    /// Invalid configuration or input
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Mismatched array dimensions
    #[error("Shape error: {0}")]
    ShapeError(String),

    /// Model used before fitting
    #[error("Model not fitted")]
    ModelNotFitted,

    /// Batch too small for a scorer to produce meaningful statistics
    #[error("Insufficient data: {rows} rows supplied, at least {min_rows} required")]
    InsufficientData { rows: usize, min_rows: usize },

    /// Reconstruction loss became non-finite during training
    #[error("Training diverged at epoch {epoch}: loss = {loss}")]
    TrainingDivergence { epoch: usize, loss: f64 },

    /// Categorical value outside the fitted vocabulary
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Model artifact (de)serialization failure
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type alias for apiwatch operations
pub type Result<T> = std::result::Result<T, ApiwatchError>;
