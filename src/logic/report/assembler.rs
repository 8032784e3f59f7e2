//! Result Assembler - every upstream output → one DiagnosticReport
//!
//! Either a complete report or an error; nothing is defaulted or guessed.

use std::collections::BTreeMap;

use super::rules::ReportThresholds;
use super::types::{DiagnosticReport, Severity, VisualFinding};
use crate::logic::detection::{Aggregation, IssueClass, ISSUE_CLASS_COUNT};
use crate::logic::error::{DiagnosticError, DiagnosticResult};
use crate::logic::features::FusedFeatureVector;
use crate::logic::model::{Correction, InferenceStage};
use crate::logic::skin::{SkinType, SkinTypeProbabilities};

/// Grade one class from its raw (pre-normalization) confidence
pub fn severity_for(raw_confidence: f32, thresholds: &ReportThresholds) -> Severity {
    if raw_confidence < thresholds.severity_detect_min {
        Severity::None
    } else if raw_confidence >= thresholds.severity_high_min {
        Severity::High
    } else if raw_confidence >= thresholds.severity_moderate_min {
        Severity::Moderate
    } else {
        Severity::Low
    }
}

/// Grade for all ten classes
pub fn severity_map(
    max_confidence: &[f32; ISSUE_CLASS_COUNT],
    thresholds: &ReportThresholds,
) -> BTreeMap<IssueClass, Severity> {
    IssueClass::ALL
        .iter()
        .map(|&issue| (issue, severity_for(max_confidence[issue.index()], thresholds)))
        .collect()
}

/// Everything one request produced upstream of the report
pub struct ReportParts<'a> {
    pub aggregation: &'a Aggregation,
    pub skin: &'a SkinTypeProbabilities,
    pub correction: &'a Correction,
    pub fused: &'a FusedFeatureVector,
    pub annotated_image_ref: String,
}

/// Check the corrector output against the label table
pub fn validate_correction(correction: &Correction) -> DiagnosticResult<IssueClass> {
    if correction.distribution.len() != ISSUE_CLASS_COUNT {
        return Err(DiagnosticError::SchemaMismatch(format!(
            "correction distribution has {} entries, label table has {}",
            correction.distribution.len(),
            ISSUE_CLASS_COUNT
        )));
    }

    if correction.distribution.iter().any(|p| !p.is_finite()) {
        return Err(DiagnosticError::InferenceFailed {
            stage: InferenceStage::Correction,
            reason: "non-finite probability in distribution".to_string(),
        });
    }

    IssueClass::from_class_id(correction.label_id).ok_or_else(|| {
        DiagnosticError::SchemaMismatch(format!(
            "correction label id {} is not in the label table",
            correction.label_id
        ))
    })
}

pub fn assemble(parts: ReportParts<'_>, thresholds: &ReportThresholds) -> DiagnosticResult<DiagnosticReport> {
    let primary = validate_correction(parts.correction)?;
    let aggregation = parts.aggregation;

    let issue_probabilities = IssueClass::ALL
        .iter()
        .map(|&issue| (issue, aggregation.probabilities.get(issue)))
        .collect();
    let skin_probabilities = SkinType::ALL
        .iter()
        .map(|&skin| (skin, parts.skin.get(skin)))
        .collect();

    Ok(DiagnosticReport {
        primary_diagnosis: primary,
        confidence: parts.correction.confidence(),
        skin_type: parts.skin.predicted(),
        detected_issues: aggregation.detected_issues.clone(),
        severity_map: severity_map(&aggregation.max_confidence, thresholds),
        annotated_image_ref: parts.annotated_image_ref,
        visual_diagnosis: aggregation
            .probabilities
            .top()
            .map(|(issue, probability)| VisualFinding { issue, probability }),
        issue_probabilities,
        skin_probabilities,
        correction_label_id: parts.correction.label_id,
        correction_distribution: parts.correction.distribution.clone(),
        detections: aggregation.retained.clone(),
        feature_version: parts.fused.version,
        layout_hash: parts.fused.layout_hash,
    })
}
