//! Detection Types
//!
//! Core types for lesion detection.
//! No logic here beyond small geometry helpers.

use serde::{Deserialize, Serialize};

/// Number of lesion classes the detector recognises
pub const ISSUE_CLASS_COUNT: usize = 10;

// ============================================================================
// LESION CLASSES
// ============================================================================

/// Lesion classes, in detector class-id order.
///
/// The same table resolves the corrector's label id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueClass {
    #[serde(rename = "Acne")]
    Acne,
    #[serde(rename = "Blackheads")]
    Blackheads,
    #[serde(rename = "Dark-Spots")]
    DarkSpots,
    #[serde(rename = "Dry-Skin")]
    DrySkin,
    // Spelling matches the detector's training labels
    #[serde(rename = "Englarged-Pores")]
    EnlargedPores,
    #[serde(rename = "Eyebags")]
    Eyebags,
    #[serde(rename = "Oily-Skin")]
    OilySkin,
    #[serde(rename = "Skin-Redness")]
    SkinRedness,
    #[serde(rename = "Whiteheads")]
    Whiteheads,
    #[serde(rename = "Wrinkles")]
    Wrinkles,
}

impl IssueClass {
    pub const ALL: [IssueClass; ISSUE_CLASS_COUNT] = [
        IssueClass::Acne,
        IssueClass::Blackheads,
        IssueClass::DarkSpots,
        IssueClass::DrySkin,
        IssueClass::EnlargedPores,
        IssueClass::Eyebags,
        IssueClass::OilySkin,
        IssueClass::SkinRedness,
        IssueClass::Whiteheads,
        IssueClass::Wrinkles,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Resolve a raw class id as emitted by a model
    pub fn from_class_id(class_id: i64) -> Option<Self> {
        usize::try_from(class_id).ok().and_then(Self::from_index)
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(&self) -> &'static str {
        match self {
            IssueClass::Acne => "Acne",
            IssueClass::Blackheads => "Blackheads",
            IssueClass::DarkSpots => "Dark-Spots",
            IssueClass::DrySkin => "Dry-Skin",
            IssueClass::EnlargedPores => "Englarged-Pores",
            IssueClass::Eyebags => "Eyebags",
            IssueClass::OilySkin => "Oily-Skin",
            IssueClass::SkinRedness => "Skin-Redness",
            IssueClass::Whiteheads => "Whiteheads",
            IssueClass::Wrinkles => "Wrinkles",
        }
    }
}

impl std::fmt::Display for IssueClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ============================================================================
// GEOMETRY
// ============================================================================

/// Axis-aligned box in source-image pixels (x1, y1) - (x2, y2)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection over union
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let inter = ix * iy;
        let union = self.area() + other.area() - inter;
        if union <= 0.0 {
            0.0
        } else {
            inter / union
        }
    }

    pub fn is_finite(&self) -> bool {
        self.x1.is_finite() && self.y1.is_finite() && self.x2.is_finite() && self.y2.is_finite()
    }
}

// ============================================================================
// DETECTIONS
// ============================================================================

/// Detection exactly as a `LesionDetector` reports it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
    pub class_id: i64,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl RawDetection {
    pub fn new(class_id: i64, confidence: f32, bbox: BoundingBox) -> Self {
        Self { class_id, confidence, bbox }
    }
}

/// Detection retained after the pre-filter, with a resolved class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub issue: IssueClass,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

// ============================================================================
// ISSUE PROBABILITY VECTOR
// ============================================================================

/// One slot per lesion class.
///
/// Sums to 1.0 when any detection exists; all-zero means "no evidence".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct IssueProbabilityVector {
    values: [f32; ISSUE_CLASS_COUNT],
}

impl IssueProbabilityVector {
    pub fn zeros() -> Self {
        Self::default()
    }

    pub(crate) fn from_values(values: [f32; ISSUE_CLASS_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, issue: IssueClass) -> f32 {
        self.values[issue.index()]
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn as_array(&self) -> &[f32; ISSUE_CLASS_COUNT] {
        &self.values
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    pub fn has_evidence(&self) -> bool {
        self.values.iter().any(|&v| v > 0.0)
    }

    /// Most probable class. None when there is no evidence.
    pub fn top(&self) -> Option<(IssueClass, f32)> {
        if !self.has_evidence() {
            return None;
        }
        let mut best = 0;
        for (i, &p) in self.values.iter().enumerate().skip(1) {
            if p > self.values[best] {
                best = i;
            }
        }
        Some((IssueClass::ALL[best], self.values[best]))
    }
}
