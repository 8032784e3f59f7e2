//! Report Rules & Thresholds
//!
//! Two independent threshold families:
//! - the MENTION floor decides which classes appear in `detected_issues`
//! - the SEVERITY ladder decides the grade in `severity_map`
//!
//! A class can be mentioned at 0.3 and still grade NONE. Neither family
//! decides which detections survive; that is `DETECTION_MIN_CONFIDENCE`.
//! Constants and config only, no classification logic.

use serde::{Deserialize, Serialize};

use crate::logic::error::{DiagnosticError, DiagnosticResult};

// ============================================================================
// MENTION
// ============================================================================

/// `detected_issues` floor (raw confidence)
pub const MENTION_MIN_CONFIDENCE: f32 = 0.10;

// ============================================================================
// SEVERITY LADDER (raw, pre-normalization confidence)
// ============================================================================

/// Below this a class grades NONE
pub const SEVERITY_DETECT_MIN: f32 = 0.5;

/// At or above = MODERATE
pub const SEVERITY_MODERATE_MIN: f32 = 0.6;

/// At or above = HIGH
pub const SEVERITY_HIGH_MIN: f32 = 0.8;

// ============================================================================
// CONFIGURABLE THRESHOLDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportThresholds {
    pub mention_min: f32,
    pub severity_detect_min: f32,
    pub severity_moderate_min: f32,
    pub severity_high_min: f32,
}

impl Default for ReportThresholds {
    fn default() -> Self {
        Self {
            mention_min: MENTION_MIN_CONFIDENCE,
            severity_detect_min: SEVERITY_DETECT_MIN,
            severity_moderate_min: SEVERITY_MODERATE_MIN,
            severity_high_min: SEVERITY_HIGH_MIN,
        }
    }
}

impl ReportThresholds {
    /// Every value in [0,1], severity ladder non-decreasing
    pub fn validate(&self) -> DiagnosticResult<()> {
        let all = [
            ("mention_min", self.mention_min),
            ("severity_detect_min", self.severity_detect_min),
            ("severity_moderate_min", self.severity_moderate_min),
            ("severity_high_min", self.severity_high_min),
        ];
        for (name, value) in all {
            if !(0.0..=1.0).contains(&value) {
                return Err(DiagnosticError::Config(format!("{} = {} is outside [0, 1]", name, value)));
            }
        }

        if self.severity_detect_min > self.severity_moderate_min
            || self.severity_moderate_min > self.severity_high_min
        {
            return Err(DiagnosticError::Config(format!(
                "severity ladder must be non-decreasing: {} / {} / {}",
                self.severity_detect_min, self.severity_moderate_min, self.severity_high_min
            )));
        }

        Ok(())
    }
}
