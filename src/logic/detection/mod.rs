//! Detection Module
//!
//! Lesion classes, raw/retained detections, and the aggregator that turns
//! them into an issue-probability vector.
//!
//! ## Structure
//! - `types`: IssueClass, BoundingBox, RawDetection, IssueProbabilityVector
//! - `aggregator`: pre-filter + max-then-normalize aggregation

pub mod types;
pub mod aggregator;


pub use types::{
    BoundingBox, Detection, IssueClass, IssueProbabilityVector, RawDetection, ISSUE_CLASS_COUNT,
};
pub use aggregator::{aggregate, retain_detections, Aggregation, DETECTION_MIN_CONFIDENCE};
