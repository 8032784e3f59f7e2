//! Pipeline Module - startup phase + per-request orchestration
//!
//! ## Per request
//! 1. decode image on the blocking pool (InvalidImage before any model runs)
//! 2. detection ‖ classification (concurrent, each under its deadline)
//! 3. pre-filter + aggregate → build features → align → correct
//! 4. annotate → assemble
//!
//! All collaborators are read-only after `PipelineBuilder::build`, so one
//! pipeline serves concurrent requests.

pub mod builder;

#[cfg(test)]
mod tests;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GenericImageView, ImageReader};

use crate::logic::config::{PipelineConfig, StageTimeouts};
use crate::logic::detection::{aggregate, retain_detections, DETECTION_MIN_CONFIDENCE};
use crate::logic::error::{DiagnosticError, DiagnosticResult};
use crate::logic::features::build_features;
use crate::logic::model::{
    run_bounded, ArtifactInfo, ContextualCorrector, InferenceStage, LesionDetector,
    SkinTypeClassifier,
};
use crate::logic::profile::ProfileInput;
use crate::logic::report::{
    annotations_for, assemble, validate_correction, AnnotationRenderer, AnnotationStyle,
    DiagnosticReport, ReportParts, ReportThresholds,
};
use crate::logic::schema::{align, ExpectedSchema, SchemaCoverage};
use crate::logic::skin::{SkinTypeProbabilities, SKIN_TYPE_COUNT};

pub use builder::PipelineBuilder;

// ============================================================================
// IMAGE INPUT
// ============================================================================

/// Image reference: a file path or in-memory encoded bytes
#[derive(Debug, Clone, PartialEq)]
pub enum ImageInput {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl ImageInput {
    /// Decode to pixels. The format comes from the content, not the file
    /// extension. Any failure is `InvalidImage`.
    pub fn decode(&self) -> DiagnosticResult<DynamicImage> {
        let image = match self {
            ImageInput::Path(path) => {
                let invalid = |e: &dyn std::fmt::Display| {
                    DiagnosticError::InvalidImage(format!("{}: {}", path.display(), e))
                };
                ImageReader::open(path)
                    .and_then(|reader| reader.with_guessed_format())
                    .map_err(|e| invalid(&e))?
                    .decode()
                    .map_err(|e| invalid(&e))?
            }
            ImageInput::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(DiagnosticError::InvalidImage("empty image buffer".to_string()));
                }
                image::load_from_memory(bytes).map_err(|e| DiagnosticError::InvalidImage(e.to_string()))?
            }
        };

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(DiagnosticError::InvalidImage(format!("image is {}x{}", width, height)));
        }
        Ok(image)
    }
}

impl From<PathBuf> for ImageInput {
    fn from(path: PathBuf) -> Self {
        ImageInput::Path(path)
    }
}

impl From<&Path> for ImageInput {
    fn from(path: &Path) -> Self {
        ImageInput::Path(path.to_path_buf())
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        ImageInput::Bytes(bytes)
    }
}

// ============================================================================
// PIPELINE
// ============================================================================

pub struct DiagnosticPipeline {
    detector: Arc<dyn LesionDetector>,
    classifier: Arc<dyn SkinTypeClassifier>,
    corrector: Arc<dyn ContextualCorrector>,
    renderer: Arc<dyn AnnotationRenderer>,
    schema: Arc<ExpectedSchema>,
    coverage: SchemaCoverage,
    timeouts: StageTimeouts,
    thresholds: ReportThresholds,
    style: AnnotationStyle,
    artifacts: Vec<ArtifactInfo>,
}

impl DiagnosticPipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Load every artifact named by `config` and build.
    pub fn from_config(config: &PipelineConfig) -> DiagnosticResult<Self> {
        PipelineBuilder::from_config(config)?.build()
    }

    pub fn schema(&self) -> &ExpectedSchema {
        &self.schema
    }

    pub fn coverage(&self) -> &SchemaCoverage {
        &self.coverage
    }

    pub fn thresholds(&self) -> &ReportThresholds {
        &self.thresholds
    }

    pub fn artifacts(&self) -> &[ArtifactInfo] {
        &self.artifacts
    }

    /// Run one analysis. Returns a complete report or a typed error.
    pub async fn analyze(
        &self,
        image: &ImageInput,
        profile: Option<&ProfileInput>,
    ) -> DiagnosticResult<DiagnosticReport> {
        let image = {
            let input = image.clone();
            let decoded = tokio::task::spawn_blocking(move || input.decode())
                .await
                .map_err(|e| DiagnosticError::InvalidImage(format!("decode task aborted: {}", e)))??;
            Arc::new(decoded)
        };
        let profile = profile.map(ProfileInput::resolve).unwrap_or_default();

        // Detection and classification in parallel
        let detection = {
            let detector = Arc::clone(&self.detector);
            let image = Arc::clone(&image);
            run_bounded(
                InferenceStage::Detection,
                self.timeouts.for_stage(InferenceStage::Detection),
                move || detector.detect(&image),
            )
        };
        let classification = {
            let classifier = Arc::clone(&self.classifier);
            let image = Arc::clone(&image);
            run_bounded(
                InferenceStage::Classification,
                self.timeouts.for_stage(InferenceStage::Classification),
                move || classifier.classify(&image),
            )
        };
        let (raw_detections, skin_output) = tokio::try_join!(detection, classification)?;

        let skin = SkinTypeProbabilities::from_slice(&skin_output).ok_or_else(|| {
            DiagnosticError::InferenceFailed {
                stage: InferenceStage::Classification,
                reason: format!(
                    "expected {} finite non-negative probabilities, got {:?}",
                    SKIN_TYPE_COUNT, skin_output
                ),
            }
        })?;

        let retained = retain_detections(&raw_detections, DETECTION_MIN_CONFIDENCE);
        let aggregation = aggregate(&retained, self.thresholds.mention_min);
        log::debug!(
            "{} detections retained, detected issues: {:?}",
            aggregation.retained.len(),
            aggregation.detected_issues
        );

        let fused = build_features(&profile, aggregation.probabilities.as_slice(), &skin)?;
        fused.validate()?;
        let aligned = align(self.schema.as_ref(), &fused);

        let correction = {
            let corrector = Arc::clone(&self.corrector);
            run_bounded(
                InferenceStage::Correction,
                self.timeouts.for_stage(InferenceStage::Correction),
                move || corrector.correct(aligned.as_slice()),
            )
            .await?
        };
        validate_correction(&correction)?;

        let annotated_image_ref = {
            let renderer = Arc::clone(&self.renderer);
            let annotations = annotations_for(&aggregation.retained);
            let style = self.style;
            let image = Arc::clone(&image);
            tokio::task::spawn_blocking(move || renderer.render(&image, &annotations, &style))
                .await
                .map_err(|e| DiagnosticError::AnnotationFailed(format!("render task aborted: {}", e)))?
                .map_err(|e| DiagnosticError::AnnotationFailed(e.0))?
        };

        assemble(
            ReportParts {
                aggregation: &aggregation,
                skin: &skin,
                correction: &correction,
                fused: &fused,
                annotated_image_ref,
            },
            &self.thresholds,
        )
    }
}
