//! Features Module - Fused Feature Construction
//!
//! One canonical place where profile, issue and skin-type signals become
//! named features. Every caller goes through `build_features`.

pub mod layout;
pub mod vector;
pub mod builder;


// Re-export common types
pub use layout::{
    feature_index, layout_hash, validate_layout, LayoutInfo, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT,
    FEATURE_VERSION,
};
pub use vector::{FeatureLookup, FusedFeatureVector};
pub use builder::{build_features, FusedFeatureBuilder};
