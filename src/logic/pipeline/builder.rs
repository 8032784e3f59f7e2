//! Pipeline Builder - the single startup phase
//!
//! Every collaborator is injected here. `build` is all-or-nothing: a missing
//! or unloadable collaborator is `ModelUnavailable` and no pipeline exists.

use std::path::PathBuf;
use std::sync::Arc;

use super::DiagnosticPipeline;
use crate::constants::default_annotation_dir;
use crate::logic::config::{PipelineConfig, StageTimeouts};
use crate::logic::error::{DiagnosticError, DiagnosticResult};
use crate::logic::features::{FusedFeatureVector, LayoutInfo};
use crate::logic::model::{
    verify_artifact, ArtifactInfo, ContextualCorrector, LesionDetector, OnnxContextualCorrector,
    OnnxLesionDetector, OnnxSkinTypeClassifier, SkinTypeClassifier,
};
use crate::logic::report::{AnnotationRenderer, AnnotationStyle, PngAnnotationRenderer, ReportThresholds};
use crate::logic::schema::{ExpectedSchema, SchemaCoverage};

pub struct PipelineBuilder {
    detector: Option<Arc<dyn LesionDetector>>,
    classifier: Option<Arc<dyn SkinTypeClassifier>>,
    corrector: Option<Arc<dyn ContextualCorrector>>,
    renderer: Option<Arc<dyn AnnotationRenderer>>,
    schema: Option<ExpectedSchema>,
    timeouts: StageTimeouts,
    thresholds: ReportThresholds,
    style: AnnotationStyle,
    annotation_dir: PathBuf,
    artifacts: Vec<ArtifactInfo>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            detector: None,
            classifier: None,
            corrector: None,
            renderer: None,
            schema: None,
            timeouts: StageTimeouts::default(),
            thresholds: ReportThresholds::default(),
            style: AnnotationStyle::default(),
            annotation_dir: default_annotation_dir(),
            artifacts: Vec::new(),
        }
    }

    /// Load the schema and the three ONNX models named by `config`.
    ///
    /// The renderer stays unset, so `build` falls back to PNG output in
    /// `config.annotation_dir` unless the caller injects another one.
    pub fn from_config(config: &PipelineConfig) -> DiagnosticResult<Self> {
        config.validate()?;
        let checksums = &config.checksums;

        let schema_path = config.schema_path();
        let schema_info = verify_artifact("expected schema", &schema_path, checksums.schema.as_deref())?;
        let schema = ExpectedSchema::load(&schema_path)?;

        let corrector = OnnxContextualCorrector::load(&config.corrector_path(), checksums.corrector.as_deref())?;
        let detector = OnnxLesionDetector::load(
            &config.detector_path(),
            checksums.detector.as_deref(),
            config.detector,
        )?;
        let classifier =
            OnnxSkinTypeClassifier::load(&config.classifier_path(), checksums.classifier.as_deref())?;

        let artifacts = vec![
            schema_info,
            detector.info().clone(),
            classifier.info().clone(),
            corrector.info().clone(),
        ];

        let mut builder = Self::new()
            .detector(detector)
            .classifier(classifier)
            .corrector(corrector)
            .schema(schema)
            .timeouts(config.timeouts)
            .thresholds(config.thresholds)
            .annotation_dir(config.annotation_dir.clone());
        builder.artifacts = artifacts;
        Ok(builder)
    }

    pub fn detector(mut self, detector: impl LesionDetector + 'static) -> Self {
        self.detector = Some(Arc::new(detector));
        self
    }

    pub fn classifier(mut self, classifier: impl SkinTypeClassifier + 'static) -> Self {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    pub fn corrector(mut self, corrector: impl ContextualCorrector + 'static) -> Self {
        self.corrector = Some(Arc::new(corrector));
        self
    }

    pub fn renderer(mut self, renderer: impl AnnotationRenderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn schema(mut self, schema: ExpectedSchema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn timeouts(mut self, timeouts: StageTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn thresholds(mut self, thresholds: ReportThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    pub fn annotation_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.annotation_dir = dir.into();
        self
    }

    pub fn build(self) -> DiagnosticResult<DiagnosticPipeline> {
        self.timeouts.validate()?;
        self.thresholds.validate()?;

        let detector = self.detector.ok_or_else(|| not_configured("detector"))?;
        let classifier = self.classifier.ok_or_else(|| not_configured("classifier"))?;
        let corrector = self.corrector.ok_or_else(|| not_configured("corrector"))?;
        let schema = self.schema.ok_or_else(|| not_configured("expected schema"))?;

        if let Some(width) = corrector.expected_input_len() {
            if width != schema.len() {
                return Err(DiagnosticError::model_unavailable(
                    "corrector",
                    format!("model expects {} inputs, schema has {} columns", width, schema.len()),
                ));
            }
        }

        let renderer = match self.renderer {
            Some(renderer) => renderer,
            None => Arc::new(PngAnnotationRenderer::new(self.annotation_dir)) as Arc<dyn AnnotationRenderer>,
        };

        let layout = LayoutInfo::current();
        log::info!(
            "Fused feature layout v{} (hash: {:08x}, {} features)",
            layout.version,
            layout.hash,
            layout.feature_count
        );

        let coverage = SchemaCoverage::compute(&schema, &FusedFeatureVector::new());
        coverage.log();

        for artifact in &self.artifacts {
            log::info!(
                "Artifact {}: {} (sha256 {}, loaded {})",
                artifact.name,
                artifact.path.display(),
                artifact.sha256,
                artifact.loaded_at.to_rfc3339()
            );
        }

        Ok(DiagnosticPipeline {
            detector,
            classifier,
            corrector,
            renderer,
            schema: Arc::new(schema),
            coverage,
            timeouts: self.timeouts,
            thresholds: self.thresholds,
            style: self.style,
            artifacts: self.artifacts,
        })
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn not_configured(artifact: &str) -> DiagnosticError {
    DiagnosticError::model_unavailable(artifact, "not configured")
}
