//! Skin Type - classifier output types

use serde::{Deserialize, Serialize};

/// Number of skin-type classes
pub const SKIN_TYPE_COUNT: usize = 3;

/// Allowed distance of a classifier distribution's sum from 1.0
pub const SKIN_PROB_SUM_TOLERANCE: f32 = 1e-3;

/// Skin-type classes, in classifier output order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SkinType {
    Dry,
    Normal,
    Oily,
}

impl SkinType {
    pub const ALL: [SkinType; SKIN_TYPE_COUNT] = [SkinType::Dry, SkinType::Normal, SkinType::Oily];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SkinType::Dry => "Dry",
            SkinType::Normal => "Normal",
            SkinType::Oily => "Oily",
        }
    }
}

impl std::fmt::Display for SkinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// [p_dry, p_normal, p_oily], summing to ~1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkinTypeProbabilities {
    values: [f32; SKIN_TYPE_COUNT],
}

impl SkinTypeProbabilities {
    pub fn new(values: [f32; SKIN_TYPE_COUNT]) -> Self {
        Self { values }
    }

    /// Accept a classifier output slice.
    ///
    /// Returns None unless it has exactly three finite, non-negative entries
    /// that sum to 1 within `SKIN_PROB_SUM_TOLERANCE`. An all-zero output is
    /// rejected so no label is ever picked from an empty distribution.
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        let values: [f32; SKIN_TYPE_COUNT] = values.try_into().ok()?;
        if !values.iter().all(|v| v.is_finite() && *v >= 0.0) {
            return None;
        }
        let sum: f32 = values.iter().sum();
        if (sum - 1.0).abs() > SKIN_PROB_SUM_TOLERANCE {
            return None;
        }
        Some(Self { values })
    }

    pub fn get(&self, skin: SkinType) -> f32 {
        self.values[skin.index()]
    }

    pub fn as_array(&self) -> &[f32; SKIN_TYPE_COUNT] {
        &self.values
    }

    pub fn sum(&self) -> f32 {
        self.values.iter().sum()
    }

    /// Arg-max label. Ties resolve to the lowest index.
    pub fn predicted(&self) -> SkinType {
        let mut best = 0;
        for (i, &p) in self.values.iter().enumerate().skip(1) {
            if p > self.values[best] {
                best = i;
            }
        }
        SkinType::ALL[best]
    }
}
