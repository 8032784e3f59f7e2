//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Environment variables override these through the helpers below.

/// Directory holding every model artifact
pub const DEFAULT_MODELS_DIR: &str = "models";

/// Lesion detector export (YOLOv8, ONNX)
pub const DEFAULT_DETECTOR_MODEL: &str = "lesion_detector.onnx";

/// Skin-type classifier export (EfficientNet-B0, ONNX)
pub const DEFAULT_CLASSIFIER_MODEL: &str = "skin_type_classifier.onnx";

/// Contextual correction model export (ONNX, probability output)
pub const DEFAULT_CORRECTOR_MODEL: &str = "context_correction.onnx";

/// Column list the correction model was fit against
pub const DEFAULT_SCHEMA_FILE: &str = "context_correction.columns.json";

/// Default per-stage inference timeouts (milliseconds)
pub const DEFAULT_DETECTOR_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_CLASSIFIER_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_CORRECTOR_TIMEOUT_MS: u64 = 2_000;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "skin-diagnostic";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Read a string from the environment or use the default
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read an optional, non-empty string from the environment
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Read a parseable value from the environment or use the default
pub fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Default annotation output directory
pub fn default_annotation_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join(APP_NAME)
        .join("annotations")
}
