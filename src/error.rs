//! Error types for the risk decision engine.

use thiserror::Error;

/// Failures surfaced by the engine and its startup path.
///
/// Inference failures on the model path are absorbed inside the estimator and
/// never reach a caller of [`crate::core::ensemble::EnsembleAggregator::assess`];
/// the safety evaluators surface as [`EngineError::EvaluatorFailed`].
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("model artifact rejected: {0}")]
    ModelArtifact(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("{evaluator} failed: {reason}")]
    EvaluatorFailed {
        evaluator: &'static str,
        reason: String,
    },

    #[error("worker pool unavailable")]
    WorkerPool,

    #[error("invalid intake record: {0}")]
    InvalidIntake(#[from] validator::ValidationErrors),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
