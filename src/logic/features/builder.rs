//! Feature Builder - profile + issue vector + skin vector → fused vector
//!
//! ## One-hot table
//! | field               | features                                   |
//! |---------------------|--------------------------------------------|
//! | gender              | gender_{Male,Female,Other}                 |
//! | diet_quality        | diet_quality_{Poor,Average,Good,Excellent} |
//! | smoker              | smoker_Yes / smoker_No                     |
//! | alcohol_consumption | alcohol_consumption_{None,Occasional,Moderate,High} |
//! | skin type (arg-max) | skin_{Dry,Normal,Oily}                     |
//!
//! Numeric fields (age, sleep_hours, stress_level) pass through.

use crate::logic::detection::ISSUE_CLASS_COUNT;
use crate::logic::error::{DiagnosticError, DiagnosticResult};
use crate::logic::profile::{AlcoholConsumption, DietQuality, Gender, PatientProfile};
use crate::logic::skin::{SkinType, SkinTypeProbabilities};

use super::vector::FusedFeatureVector;

// ============================================================================
// FEATURE NAMES
// ============================================================================

pub fn gender_feature(gender: Gender) -> String {
    format!("gender_{}", gender.as_str())
}

pub fn diet_feature(diet: DietQuality) -> String {
    format!("diet_quality_{}", diet.as_str())
}

pub fn smoker_feature(smoker: bool) -> &'static str {
    if smoker {
        "smoker_Yes"
    } else {
        "smoker_No"
    }
}

pub fn alcohol_feature(alcohol: AlcoholConsumption) -> String {
    format!("alcohol_consumption_{}", alcohol.as_str())
}

pub fn issue_feature(index: usize) -> String {
    format!("issue_{}", index)
}

pub fn skin_probability_feature(skin: SkinType) -> String {
    format!("skin_prob_{}", skin.as_str())
}

pub fn skin_one_hot_feature(skin: SkinType) -> String {
    format!("skin_{}", skin.as_str())
}

// ============================================================================
// BUILDER PATTERN
// ============================================================================

/// Builder for FusedFeatureVector with one setter per input source
pub struct FusedFeatureBuilder {
    vector: FusedFeatureVector,
}

impl FusedFeatureBuilder {
    pub fn new() -> Self {
        Self { vector: FusedFeatureVector::new() }
    }

    fn put(&mut self, name: &str, value: f32) {
        let known = self.vector.set(name, value);
        debug_assert!(known, "feature {} missing from layout", name);
    }

    fn one_hot<T: Copy + PartialEq>(&mut self, all: &[T], selected: T, name: impl Fn(T) -> String) {
        for &option in all {
            let value = if option == selected { 1.0 } else { 0.0 };
            self.put(&name(option), value);
        }
    }

    pub fn profile(mut self, profile: &PatientProfile) -> Self {
        self.put("age", profile.age as f32);
        self.put("sleep_hours", profile.sleep_hours);
        self.put("stress_level", profile.stress_level as f32);

        self.one_hot(&Gender::ALL, profile.gender, gender_feature);
        self.one_hot(&DietQuality::ALL, profile.diet_quality, diet_feature);
        self.one_hot(&[true, false], profile.smoker, |s| smoker_feature(s).to_string());
        self.one_hot(&AlcoholConsumption::ALL, profile.alcohol_consumption, alcohol_feature);
        self
    }

    pub fn issue_probabilities(mut self, probabilities: &[f32; ISSUE_CLASS_COUNT]) -> Self {
        for (i, &p) in probabilities.iter().enumerate() {
            self.put(&issue_feature(i), p);
        }
        self
    }

    /// Skin type goes in twice: raw probabilities and arg-max one-hot
    pub fn skin_type(mut self, skin: &SkinTypeProbabilities) -> Self {
        for option in SkinType::ALL {
            self.put(&skin_probability_feature(option), skin.get(option));
        }
        self.one_hot(&SkinType::ALL, skin.predicted(), skin_one_hot_feature);
        self
    }

    pub fn build(self) -> FusedFeatureVector {
        self.vector
    }
}

impl Default for FusedFeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Build the fused vector for one request.
///
/// Pure: identical inputs give a bit-identical vector.
pub fn build_features(
    profile: &PatientProfile,
    issue_probabilities: &[f32],
    skin: &SkinTypeProbabilities,
) -> DiagnosticResult<FusedFeatureVector> {
    let issues: &[f32; ISSUE_CLASS_COUNT] = issue_probabilities.try_into().map_err(|_| {
        DiagnosticError::SchemaMismatch(format!(
            "issue vector has {} slots, expected {}",
            issue_probabilities.len(),
            ISSUE_CLASS_COUNT
        ))
    })?;

    Ok(FusedFeatureBuilder::new()
        .profile(profile)
        .issue_probabilities(issues)
        .skin_type(skin)
        .build())
}
