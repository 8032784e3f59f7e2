//! Schema Aligner - named features → fixed-order numeric vector
//!
//! For every expected column, look the name up in the fused features;
//! absent → 0.0. Fused features the schema does not name are dropped.
//! The output length and order are always exactly the schema's.

use serde::Serialize;

use super::expected::ExpectedSchema;
use crate::logic::features::FeatureLookup;

// ============================================================================
// ALIGNED VECTOR
// ============================================================================

/// Positional vector in `ExpectedSchema` order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignedVector {
    values: Vec<f32>,
}

impl AlignedVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.values
    }
}

/// Project `features` onto `schema`
pub fn align<L: FeatureLookup + ?Sized>(schema: &ExpectedSchema, features: &L) -> AlignedVector {
    let values = schema
        .columns()
        .iter()
        .map(|column| features.feature(column).unwrap_or(0.0))
        .collect();

    AlignedVector { values }
}

// ============================================================================
// COVERAGE
// ============================================================================

/// How well a feature source covers the schema
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SchemaCoverage {
    /// Schema columns the features provide
    pub matched: Vec<String>,
    /// Schema columns the features lack (always 0.0)
    pub zero_filled: Vec<String>,
    /// Features the schema never reads
    pub dropped: Vec<String>,
}

impl SchemaCoverage {
    pub fn compute<L: FeatureLookup + ?Sized>(schema: &ExpectedSchema, features: &L) -> Self {
        let mut coverage = Self::default();

        for column in schema.columns() {
            if features.feature(column).is_some() {
                coverage.matched.push(column.clone());
            } else {
                coverage.zero_filled.push(column.clone());
            }
        }

        coverage.dropped = features
            .feature_names()
            .into_iter()
            .filter(|name| !schema.columns().contains(name))
            .collect();

        coverage
    }

    /// Fraction of schema columns actually fed (0.0 - 1.0)
    pub fn coverage(&self) -> f32 {
        let total = self.matched.len() + self.zero_filled.len();
        if total == 0 {
            return 0.0;
        }
        self.matched.len() as f32 / total as f32
    }

    pub fn log(&self) {
        log::info!(
            "Schema coverage: {} matched, {} zero-filled, {} dropped ({:.0}%)",
            self.matched.len(),
            self.zero_filled.len(),
            self.dropped.len(),
            self.coverage() * 100.0
        );

        // A zero-filled column usually means a naming drift between training and serving
        for column in &self.zero_filled {
            log::warn!("Schema column '{}' has no matching feature, always 0.0", column);
        }
        if !self.dropped.is_empty() {
            log::debug!("Features not read by the schema: {:?}", self.dropped);
        }
    }
}
