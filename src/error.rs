use thiserror::Error;

use crate::config::ConfigError;
use crate::source::SourceError;

/// Precondition failures of the learning engine.
///
/// Every variant is detected before the coefficients are touched, so a
/// rejected call leaves the model exactly as it was.
#[derive(Debug, Error, PartialEq)]
pub enum ModelError {
    /// Training or evaluation was asked to run over zero records.
    #[error("cannot {operation} on an empty dataset")]
    EmptyDataset { operation: &'static str },
    /// The fold count is outside `2..=rows`.
    #[error("fold count {folds} is invalid for {rows} rows (expected 2..={rows})")]
    FoldCount { folds: usize, rows: usize },
    #[error("learning rate must be finite and positive, got {0}")]
    InvalidLearningRate(f64),
}

/// Everything that can end a run of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Model(#[from] ModelError),
}
