//! Pipeline Configuration
//!
//! Defaults come from `constants.rs`; `from_env` overrides them from
//! `SKIN_*` environment variables, `from_file` from a JSON document.
//! Nothing here touches a model file, `PipelineBuilder` does that.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::{DiagnosticError, DiagnosticResult};
use super::model::{DetectorSettings, InferenceStage};
use super::report::ReportThresholds;
use crate::constants::{
    default_annotation_dir, env_opt, env_or, env_parse_or, DEFAULT_CLASSIFIER_MODEL,
    DEFAULT_CLASSIFIER_TIMEOUT_MS, DEFAULT_CORRECTOR_MODEL, DEFAULT_CORRECTOR_TIMEOUT_MS,
    DEFAULT_DETECTOR_MODEL, DEFAULT_DETECTOR_TIMEOUT_MS, DEFAULT_MODELS_DIR, DEFAULT_SCHEMA_FILE,
};

// ============================================================================
// SECTIONS
// ============================================================================

/// Optional SHA-256 pin per artifact (hex)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactChecksums {
    pub detector: Option<String>,
    pub classifier: Option<String>,
    pub corrector: Option<String>,
    pub schema: Option<String>,
}

/// Per-stage inference deadlines
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageTimeouts {
    pub detection_ms: u64,
    pub classification_ms: u64,
    pub correction_ms: u64,
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            detection_ms: DEFAULT_DETECTOR_TIMEOUT_MS,
            classification_ms: DEFAULT_CLASSIFIER_TIMEOUT_MS,
            correction_ms: DEFAULT_CORRECTOR_TIMEOUT_MS,
        }
    }
}

impl StageTimeouts {
    pub fn for_stage(&self, stage: InferenceStage) -> Duration {
        let ms = match stage {
            InferenceStage::Detection => self.detection_ms,
            InferenceStage::Classification => self.classification_ms,
            InferenceStage::Correction => self.correction_ms,
        };
        Duration::from_millis(ms)
    }

    pub fn validate(&self) -> DiagnosticResult<()> {
        let all = [
            ("detection", self.detection_ms),
            ("classification", self.classification_ms),
            ("correction", self.correction_ms),
        ];
        for (stage, ms) in all {
            if ms == 0 {
                return Err(DiagnosticError::Config(format!("{} timeout must be positive", stage)));
            }
        }
        Ok(())
    }
}

// ============================================================================
// PIPELINE CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Base for every relative artifact path below
    pub models_dir: PathBuf,
    pub detector_model: PathBuf,
    pub classifier_model: PathBuf,
    pub corrector_model: PathBuf,
    pub schema_file: PathBuf,
    pub checksums: ArtifactChecksums,
    pub timeouts: StageTimeouts,
    pub thresholds: ReportThresholds,
    pub detector: DetectorSettings,
    pub annotation_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            detector_model: PathBuf::from(DEFAULT_DETECTOR_MODEL),
            classifier_model: PathBuf::from(DEFAULT_CLASSIFIER_MODEL),
            corrector_model: PathBuf::from(DEFAULT_CORRECTOR_MODEL),
            schema_file: PathBuf::from(DEFAULT_SCHEMA_FILE),
            checksums: ArtifactChecksums::default(),
            timeouts: StageTimeouts::default(),
            thresholds: ReportThresholds::default(),
            detector: DetectorSettings::default(),
            annotation_dir: default_annotation_dir(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            models_dir: PathBuf::from(env_or("SKIN_MODELS_DIR", DEFAULT_MODELS_DIR)),
            detector_model: PathBuf::from(env_or("SKIN_DETECTOR_MODEL", DEFAULT_DETECTOR_MODEL)),
            classifier_model: PathBuf::from(env_or("SKIN_CLASSIFIER_MODEL", DEFAULT_CLASSIFIER_MODEL)),
            corrector_model: PathBuf::from(env_or("SKIN_CORRECTOR_MODEL", DEFAULT_CORRECTOR_MODEL)),
            schema_file: PathBuf::from(env_or("SKIN_SCHEMA_FILE", DEFAULT_SCHEMA_FILE)),

            checksums: ArtifactChecksums {
                detector: env_opt("SKIN_DETECTOR_SHA256"),
                classifier: env_opt("SKIN_CLASSIFIER_SHA256"),
                corrector: env_opt("SKIN_CORRECTOR_SHA256"),
                schema: env_opt("SKIN_SCHEMA_SHA256"),
            },

            timeouts: StageTimeouts {
                detection_ms: env_parse_or("SKIN_DETECTOR_TIMEOUT_MS", DEFAULT_DETECTOR_TIMEOUT_MS),
                classification_ms: env_parse_or("SKIN_CLASSIFIER_TIMEOUT_MS", DEFAULT_CLASSIFIER_TIMEOUT_MS),
                correction_ms: env_parse_or("SKIN_CORRECTOR_TIMEOUT_MS", DEFAULT_CORRECTOR_TIMEOUT_MS),
            },

            thresholds: ReportThresholds {
                mention_min: env_parse_or("SKIN_MENTION_MIN", defaults.thresholds.mention_min),
                severity_detect_min: env_parse_or("SKIN_SEVERITY_DETECT_MIN", defaults.thresholds.severity_detect_min),
                severity_moderate_min: env_parse_or(
                    "SKIN_SEVERITY_MODERATE_MIN",
                    defaults.thresholds.severity_moderate_min,
                ),
                severity_high_min: env_parse_or("SKIN_SEVERITY_HIGH_MIN", defaults.thresholds.severity_high_min),
            },

            detector: DetectorSettings {
                input_size: env_parse_or("SKIN_DETECTOR_INPUT_SIZE", defaults.detector.input_size),
                confidence_min: env_parse_or("SKIN_DETECTOR_CONFIDENCE_MIN", defaults.detector.confidence_min),
                iou_threshold: env_parse_or("SKIN_DETECTOR_IOU", defaults.detector.iou_threshold),
            },

            annotation_dir: env_opt("SKIN_ANNOTATION_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.annotation_dir),
        }
    }

    /// Load configuration from a JSON file. Missing keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> DiagnosticResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DiagnosticError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> DiagnosticResult<Self> {
        serde_json::from_str(json).map_err(|e| DiagnosticError::Config(format!("invalid config: {}", e)))
    }

    /// Absolute paths stay as they are; relative ones hang off `models_dir`
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.models_dir.join(file)
        }
    }

    pub fn detector_path(&self) -> PathBuf {
        self.resolve(&self.detector_model)
    }

    pub fn classifier_path(&self) -> PathBuf {
        self.resolve(&self.classifier_model)
    }

    pub fn corrector_path(&self) -> PathBuf {
        self.resolve(&self.corrector_model)
    }

    pub fn schema_path(&self) -> PathBuf {
        self.resolve(&self.schema_file)
    }

    pub fn validate(&self) -> DiagnosticResult<()> {
        self.timeouts.validate()?;
        self.thresholds.validate()?;

        let detector = &self.detector;
        if detector.input_size == 0 {
            return Err(DiagnosticError::Config("detector input_size must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&detector.confidence_min) {
            return Err(DiagnosticError::Config(format!(
                "detector confidence_min = {} is outside [0, 1]",
                detector.confidence_min
            )));
        }
        if !(detector.iou_threshold > 0.0 && detector.iou_threshold <= 1.0) {
            return Err(DiagnosticError::Config(format!(
                "detector iou_threshold = {} is outside (0, 1]",
                detector.iou_threshold
            )));
        }

        Ok(())
    }
}
