//! Fused Feature Vector - named, versioned ML input
//!
//! Values are stored in `FEATURE_LAYOUT` order but every caller addresses
//! them by name; only `schema::align` turns them into a positional vector.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

use serde::{Deserialize, Serialize};

use super::layout::{
    feature_index, layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_LAYOUT, FEATURE_VERSION,
};
use crate::logic::schema::canonical_column;

// ============================================================================
// NAMED LOOKUP
// ============================================================================

/// Anything that can answer "what is the value of feature `name`?"
pub trait FeatureLookup {
    /// Value of a canonical feature name, if present
    fn feature(&self, name: &str) -> Option<f32>;

    /// Canonical names this source provides
    fn feature_names(&self) -> Vec<String>;
}

// ============================================================================
// VERSIONED FUSED VECTOR
// ============================================================================

/// Fused feature vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedFeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    values: [f32; FEATURE_COUNT],
}

impl FusedFeatureVector {
    /// Create a new zeroed vector with current version
    pub fn new() -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values: [0.0; FEATURE_COUNT],
        }
    }

    /// Get feature by name
    pub fn get(&self, name: &str) -> Option<f32> {
        feature_index(name).map(|i| self.values[i])
    }

    /// Set feature by name. Returns false for names outside the layout.
    pub(crate) fn set(&mut self, name: &str, value: f32) -> bool {
        match feature_index(name) {
            Some(index) => {
                self.values[index] = value;
                true
            }
            None => false,
        }
    }

    /// (name, value) pairs in layout order
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f32)> + '_ {
        FEATURE_LAYOUT.iter().copied().zip(self.values.iter().copied())
    }

    /// Check the version/hash stamp against the current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }
}

impl Default for FusedFeatureVector {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureLookup for FusedFeatureVector {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name)
    }

    fn feature_names(&self) -> Vec<String> {
        FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect()
    }
}

// Plain maps are looked up through the same column normalization as the
// schema side, so `"\"age\" "` and `age` address the same feature. An exact
// key wins; among aliases of one name the smallest raw key wins.

fn lookup_alias<'a>(entries: impl Iterator<Item = (&'a String, &'a f32)>, name: &str) -> Option<f32> {
    entries
        .filter(|(key, _)| canonical_column(key) == name)
        .min_by(|a, b| a.0.cmp(b.0))
        .map(|(_, value)| *value)
}

impl<S: BuildHasher> FeatureLookup for HashMap<String, f32, S> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name).copied().or_else(|| lookup_alias(self.iter(), name))
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys().map(|k| canonical_column(k)).collect();
        names.sort();
        names.dedup();
        names
    }
}

impl FeatureLookup for BTreeMap<String, f32> {
    fn feature(&self, name: &str) -> Option<f32> {
        self.get(name).copied().or_else(|| lookup_alias(self.iter(), name))
    }

    fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.keys().map(|k| canonical_column(k)).collect();
        names.sort();
        names.dedup();
        names
    }
}

// ============================================================================
// TESTS
// ============================================================================
