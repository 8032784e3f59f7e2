//! Detection Aggregator
//!
//! Raw detections → normalized issue-probability vector + detected-issue list.
//! Input: RawDetection list
//! Output: Aggregation

use serde::Serialize;

use super::types::{
    Detection, IssueClass, IssueProbabilityVector, RawDetection, ISSUE_CLASS_COUNT,
};

/// Floor applied to raw detector output before aggregation (raw confidence).
/// Fixed, and separate from the report's mention and severity thresholds.
pub const DETECTION_MIN_CONFIDENCE: f32 = 0.10;

/// Result of aggregating one request's detections
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregation {
    /// L1-normalized per-class maxima (all-zero when nothing was detected)
    pub probabilities: IssueProbabilityVector,
    /// Per-class maxima BEFORE normalization
    pub max_confidence: [f32; ISSUE_CLASS_COUNT],
    /// Classes whose pre-normalization maximum reaches the mention threshold
    pub detected_issues: Vec<IssueClass>,
    /// Detections that survived the pre-filter, in detector order
    pub retained: Vec<Detection>,
}

/// Pre-filter raw detector output.
///
/// Drops out-of-range class ids, non-finite values and anything below
/// `min_confidence`. Confidences are clamped into [0, 1].
pub fn retain_detections(raw: &[RawDetection], min_confidence: f32) -> Vec<Detection> {
    let mut retained = Vec::with_capacity(raw.len());

    for det in raw {
        let Some(issue) = IssueClass::from_class_id(det.class_id) else {
            log::warn!("Dropping detection with unknown class id {}", det.class_id);
            continue;
        };

        if !det.confidence.is_finite() || !det.bbox.is_finite() {
            log::warn!("Dropping non-finite {} detection", issue);
            continue;
        }

        let confidence = det.confidence.clamp(0.0, 1.0);
        if confidence < min_confidence {
            continue;
        }

        retained.push(Detection {
            issue,
            confidence,
            bbox: det.bbox,
        });
    }

    log::debug!("Retained {}/{} detections", retained.len(), raw.len());
    retained
}

/// Aggregate retained detections.
///
/// Repeated detections of one class combine by max, never by sum.
/// `detected_issues` is decided on pre-normalization values.
pub fn aggregate(detections: &[Detection], mention_min: f32) -> Aggregation {
    let mut max_confidence = [0.0f32; ISSUE_CLASS_COUNT];

    for det in detections {
        let slot = &mut max_confidence[det.issue.index()];
        *slot = slot.max(det.confidence);
    }

    let detected_issues: Vec<IssueClass> = IssueClass::ALL
        .iter()
        .copied()
        .filter(|issue| max_confidence[issue.index()] >= mention_min)
        .collect();

    let sum: f32 = max_confidence.iter().sum();
    let probabilities = if sum > 0.0 {
        let mut normalized = max_confidence;
        for v in normalized.iter_mut() {
            *v /= sum;
        }
        IssueProbabilityVector::from_values(normalized)
    } else {
        // No evidence stays all-zero, never uniform
        IssueProbabilityVector::zeros()
    };

    Aggregation {
        probabilities,
        max_confidence,
        detected_issues,
        retained: detections.to_vec(),
    }
}
