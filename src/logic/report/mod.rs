//! Report Module - Severity rules, annotation, report assembly
//!
//! ## Structure
//! - `rules`: mention floor + severity ladder
//! - `types`: Severity, DiagnosticReport
//! - `annotate`: annotation content + renderer seam
//! - `assembler`: assemble()

pub mod rules;
pub mod types;
pub mod annotate;
pub mod assembler;

#[cfg(test)]
mod tests;

pub use rules::ReportThresholds;
pub use types::{DiagnosticReport, Severity, VisualFinding};
pub use annotate::{
    annotation_text, annotations_for, Annotation, AnnotationRenderer, AnnotationStyle,
    PngAnnotationRenderer, RenderError,
};
pub use assembler::{assemble, severity_for, severity_map, validate_correction, ReportParts};
