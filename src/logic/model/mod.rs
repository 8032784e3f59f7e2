//! Model Module - Inference collaborators
//!
//! The pipeline only knows the three traits below. ONNX Runtime backed
//! implementations live next to them; tests plug in mocks.
//!
//! ## Structure
//! - `artifact`: checksum-pinned artifact loading
//! - `bounded`: timeout wrapper for blocking inference
//! - `detector` / `classifier` / `corrector`: ONNX implementations

pub mod artifact;
pub mod bounded;
pub mod detector;
pub mod classifier;
pub mod corrector;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::logic::detection::RawDetection;

// Re-export common types
pub use artifact::{file_sha256, load_session, verify_artifact, ArtifactInfo};
pub use bounded::run_bounded;
pub use detector::{DetectorSettings, OnnxLesionDetector};
pub use classifier::OnnxSkinTypeClassifier;
pub use corrector::OnnxContextualCorrector;

// ============================================================================
// ERRORS
// ============================================================================

/// Error raised inside a collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceError(pub String);

impl std::fmt::Display for InferenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InferenceError: {}", self.0)
    }
}

impl std::error::Error for InferenceError {}

/// Which collaborator a failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceStage {
    Detection,
    Classification,
    Correction,
}

impl InferenceStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            InferenceStage::Detection => "detection",
            InferenceStage::Classification => "classification",
            InferenceStage::Correction => "correction",
        }
    }
}

impl std::fmt::Display for InferenceStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// CORRECTOR OUTPUT
// ============================================================================

/// Corrected label + distribution over every diagnosis label
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub label_id: i64,
    pub distribution: Vec<f32>,
}

impl Correction {
    /// max(distribution), 0.0 when empty
    pub fn confidence(&self) -> f32 {
        self.distribution.iter().copied().fold(0.0, f32::max)
    }
}

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// image → raw per-detection tuples
pub trait LesionDetector: Send + Sync {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<RawDetection>, InferenceError>;
}

/// image → [p_dry, p_normal, p_oily]
pub trait SkinTypeClassifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError>;
}

/// aligned vector → (label id, distribution)
pub trait ContextualCorrector: Send + Sync {
    fn correct(&self, features: &[f32]) -> Result<Correction, InferenceError>;

    /// Input width the model was exported with, when known
    fn expected_input_len(&self) -> Option<usize> {
        None
    }
}
