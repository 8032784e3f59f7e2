//! Error handling

use thiserror::Error;

use super::features::LayoutMismatchError;
use super::model::InferenceStage;

pub type DiagnosticResult<T> = Result<T, DiagnosticError>;

/// Every failure the pipeline can report.
///
/// A caller always gets either a complete report or one of these, never a
/// partially filled report.
#[derive(Debug, Error)]
pub enum DiagnosticError {
    // Startup errors
    #[error("model unavailable: {artifact}: {reason}")]
    ModelUnavailable { artifact: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    // Per-request errors
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("{stage} timed out after {timeout_ms} ms")]
    InferenceTimeout { stage: InferenceStage, timeout_ms: u64 },

    #[error("{stage} failed: {reason}")]
    InferenceFailed { stage: InferenceStage, reason: String },

    #[error("invalid image: {0}")]
    InvalidImage(String),

    #[error("invalid patient profile: {0}")]
    InvalidProfile(String),

    #[error("annotation failed: {0}")]
    AnnotationFailed(String),
}

impl DiagnosticError {
    pub fn model_unavailable(artifact: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        DiagnosticError::ModelUnavailable {
            artifact: artifact.into(),
            reason: reason.to_string(),
        }
    }

    /// Stable machine-readable code
    pub fn kind(&self) -> &'static str {
        match self {
            DiagnosticError::ModelUnavailable { .. } => "MODEL_UNAVAILABLE",
            DiagnosticError::Config(_) => "CONFIG",
            DiagnosticError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            DiagnosticError::InferenceTimeout { .. } => "INFERENCE_TIMEOUT",
            DiagnosticError::InferenceFailed { .. } => "INFERENCE_FAILED",
            DiagnosticError::InvalidImage(_) => "INVALID_IMAGE",
            DiagnosticError::InvalidProfile(_) => "INVALID_PROFILE",
            DiagnosticError::AnnotationFailed(_) => "ANNOTATION_FAILED",
        }
    }

    /// Startup-time errors that must keep the service from starting
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DiagnosticError::ModelUnavailable { .. } | DiagnosticError::Config(_)
        )
    }
}

impl From<LayoutMismatchError> for DiagnosticError {
    fn from(err: LayoutMismatchError) -> Self {
        DiagnosticError::SchemaMismatch(err.to_string())
    }
}
