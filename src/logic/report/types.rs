//! Report Types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::logic::detection::{Detection, IssueClass};
use crate::logic::skin::SkinType;

// ============================================================================
// SEVERITY
// ============================================================================

/// Per-class grade from the raw confidence ladder
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    None,
    Low,
    Moderate,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::None => "NONE",
            Severity::Low => "LOW",
            Severity::Moderate => "MODERATE",
            Severity::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// REPORT
// ============================================================================

/// Arg-max of the issue vector, before contextual correction
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisualFinding {
    pub issue: IssueClass,
    pub probability: f32,
}

/// Complete result of one analysis. Never partially filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Corrected diagnosis label
    pub primary_diagnosis: IssueClass,
    /// max(correction distribution)
    pub confidence: f32,
    pub skin_type: SkinType,
    /// Classes whose raw confidence reached the mention floor
    pub detected_issues: Vec<IssueClass>,
    /// All ten classes, NONE when not flagged
    pub severity_map: BTreeMap<IssueClass, Severity>,
    pub annotated_image_ref: String,

    /// Absent when there was no visual evidence
    pub visual_diagnosis: Option<VisualFinding>,
    pub issue_probabilities: BTreeMap<IssueClass, f32>,
    pub skin_probabilities: BTreeMap<SkinType, f32>,
    pub correction_label_id: i64,
    pub correction_distribution: Vec<f32>,
    pub detections: Vec<Detection>,
    pub feature_version: u8,
    pub layout_hash: u32,
}

impl DiagnosticReport {
    pub fn severity(&self, issue: IssueClass) -> Severity {
        self.severity_map.get(&issue).copied().unwrap_or(Severity::None)
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
