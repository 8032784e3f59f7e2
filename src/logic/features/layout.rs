//! Feature Layout - Centralized Fused Feature Definition
//!
//! **CRITICAL: This file controls the fused feature schema**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The correction model never sees this order directly; `schema::align`
//! projects fused features onto its own column list by name.

use crc32fast::Hasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Feature names in exact order they appear in the vector
/// This is the SINGLE SOURCE OF TRUTH for the fused layout
pub const FEATURE_LAYOUT: &[&str] = &[
    // === Numeric profile (0-2) ===
    "age",                          // 0
    "sleep_hours",                  // 1
    "stress_level",                 // 2

    // === Gender one-hot (3-5) ===
    "gender_Male",                  // 3
    "gender_Female",                // 4
    "gender_Other",                 // 5

    // === Diet quality one-hot (6-9) ===
    "diet_quality_Poor",            // 6
    "diet_quality_Average",         // 7
    "diet_quality_Good",            // 8
    "diet_quality_Excellent",       // 9

    // === Smoker one-hot (10-11) ===
    "smoker_Yes",                   // 10
    "smoker_No",                    // 11

    // === Alcohol one-hot (12-15) ===
    "alcohol_consumption_None",     // 12
    "alcohol_consumption_Occasional", // 13
    "alcohol_consumption_Moderate", // 14
    "alcohol_consumption_High",     // 15

    // === Issue probabilities, detector class order (16-25) ===
    "issue_0",                      // 16: Acne
    "issue_1",                      // 17: Blackheads
    "issue_2",                      // 18: Dark-Spots
    "issue_3",                      // 19: Dry-Skin
    "issue_4",                      // 20: Englarged-Pores
    "issue_5",                      // 21: Eyebags
    "issue_6",                      // 22: Oily-Skin
    "issue_7",                      // 23: Skin-Redness
    "issue_8",                      // 24: Whiteheads
    "issue_9",                      // 25: Wrinkles

    // === Skin-type raw probabilities (26-28) ===
    "skin_prob_Dry",                // 26
    "skin_prob_Normal",             // 27
    "skin_prob_Oily",               // 28

    // === Skin-type arg-max one-hot (29-31) ===
    "skin_Dry",                     // 29
    "skin_Normal",                  // 30
    "skin_Oily",                    // 31
];

/// Total number of features
/// IMPORTANT: Must match FEATURE_LAYOUT.len()!
pub const FEATURE_COUNT: usize = 32;

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the version byte and every name, NUL-separated, in order
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for name in FEATURE_LAYOUT {
        hasher.update(name.as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

// ============================================================================
// LAYOUT INFO
// ============================================================================

/// Complete layout information for serialization/logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutInfo {
    pub version: u8,
    pub hash: u32,
    pub feature_count: usize,
    pub feature_names: Vec<String>,
}

impl LayoutInfo {
    pub fn current() -> Self {
        Self {
            version: FEATURE_VERSION,
            hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Default for LayoutInfo {
    fn default() -> Self {
        Self::current()
    }
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// A fused vector stamped with a layout other than `FEATURE_LAYOUT`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("fused vector built for layout v{found_version} ({found_hash:08x}), current is v{current_version} ({current_hash:08x})")]
pub struct LayoutMismatchError {
    pub found_version: u8,
    pub found_hash: u32,
    pub current_version: u8,
    pub current_hash: u32,
}

/// Check a (version, hash) stamp against the current layout
pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();
    if version == FEATURE_VERSION && hash == current_hash {
        Ok(())
    } else {
        Err(LayoutMismatchError {
            found_version: version,
            found_hash: hash,
            current_version: FEATURE_VERSION,
            current_hash,
        })
    }
}

// ============================================================================
// FEATURE INDEX LOOKUP
// ============================================================================

pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_LAYOUT.iter().position(|&n| n == name)
}

// ============================================================================
// TESTS
// ============================================================================
