//! Skin Diagnostic Core - Fusion Pipeline
//!
//! Turns lesion detections, a skin-type distribution and patient metadata
//! into one `DiagnosticReport`.
//!
//! ## Layout
//! - `logic::detection` - raw detections → issue-probability vector
//! - `logic::features` - fused feature layout + builder
//! - `logic::schema` - projection onto the corrector's expected columns
//! - `logic::model` - collaborator traits + ONNX implementations
//! - `logic::report` - severity rules, annotation, report assembly
//! - `logic::pipeline` - startup phase + per-request orchestration

pub mod constants;
pub mod logic;

pub use logic::config::PipelineConfig;
pub use logic::error::{DiagnosticError, DiagnosticResult};
pub use logic::pipeline::{DiagnosticPipeline, ImageInput, PipelineBuilder};
pub use logic::profile::{PatientProfile, ProfileInput};
pub use logic::report::{DiagnosticReport, Severity};
