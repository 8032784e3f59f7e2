//! Patient Profile - non-visual metadata
//!
//! `ProfileInput` is the loose, JSON-shaped structure callers send.
//! `PatientProfile` is the resolved, fully-defaulted value the feature
//! builder consumes.

use serde::{Deserialize, Serialize};

use super::error::{DiagnosticError, DiagnosticResult};

// ============================================================================
// DEFAULTS
// ============================================================================

pub const DEFAULT_AGE: u32 = 25;
pub const DEFAULT_SLEEP_HOURS: f32 = 7.0;
pub const DEFAULT_STRESS_LEVEL: u8 = 5;
pub const MAX_STRESS_LEVEL: u8 = 10;

// ============================================================================
// CATEGORICAL FIELDS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub const ALL: [Gender; 3] = [Gender::Male, Gender::Female, Gender::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Other => "Other",
        }
    }

    fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Some(Gender::Male),
            "female" | "f" => Some(Gender::Female),
            "other" => Some(Gender::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DietQuality {
    Poor,
    Average,
    Good,
    Excellent,
}

impl DietQuality {
    pub const ALL: [DietQuality; 4] = [
        DietQuality::Poor,
        DietQuality::Average,
        DietQuality::Good,
        DietQuality::Excellent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DietQuality::Poor => "Poor",
            DietQuality::Average => "Average",
            DietQuality::Good => "Good",
            DietQuality::Excellent => "Excellent",
        }
    }

    fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "poor" => Some(DietQuality::Poor),
            "average" => Some(DietQuality::Average),
            "good" => Some(DietQuality::Good),
            "excellent" => Some(DietQuality::Excellent),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlcoholConsumption {
    None,
    Occasional,
    Moderate,
    High,
}

impl AlcoholConsumption {
    pub const ALL: [AlcoholConsumption; 4] = [
        AlcoholConsumption::None,
        AlcoholConsumption::Occasional,
        AlcoholConsumption::Moderate,
        AlcoholConsumption::High,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlcoholConsumption::None => "None",
            AlcoholConsumption::Occasional => "Occasional",
            AlcoholConsumption::Moderate => "Moderate",
            AlcoholConsumption::High => "High",
        }
    }

    fn parse_loose(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            // "No" is what older clients send
            "none" | "no" => Some(AlcoholConsumption::None),
            "occasional" => Some(AlcoholConsumption::Occasional),
            "moderate" => Some(AlcoholConsumption::Moderate),
            "high" => Some(AlcoholConsumption::High),
            _ => None,
        }
    }
}

// ============================================================================
// RESOLVED PROFILE
// ============================================================================

/// Fully resolved patient metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub age: u32,
    pub gender: Gender,
    pub sleep_hours: f32,
    pub stress_level: u8,
    pub diet_quality: DietQuality,
    pub smoker: bool,
    pub alcohol_consumption: AlcoholConsumption,
}

impl Default for PatientProfile {
    fn default() -> Self {
        Self {
            age: DEFAULT_AGE,
            gender: Gender::Female,
            sleep_hours: DEFAULT_SLEEP_HOURS,
            stress_level: DEFAULT_STRESS_LEVEL,
            diet_quality: DietQuality::Average,
            smoker: false,
            alcohol_consumption: AlcoholConsumption::None,
        }
    }
}

// ============================================================================
// LOOSE INPUT
// ============================================================================

/// `smoker` arrives as a bool or as "Yes"/"No"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FlagInput {
    Bool(bool),
    Text(String),
}

/// Profile-shaped input. Unknown keys are ignored, `null` means missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileInput {
    pub age: Option<f64>,
    pub gender: Option<String>,
    #[serde(alias = "sleepHours")]
    pub sleep_hours: Option<f64>,
    #[serde(alias = "stressLevel")]
    pub stress_level: Option<f64>,
    #[serde(alias = "dietQuality")]
    pub diet_quality: Option<String>,
    pub smoker: Option<FlagInput>,
    #[serde(alias = "alcoholConsumption")]
    pub alcohol_consumption: Option<String>,
}

impl ProfileInput {
    pub fn from_json_str(json: &str) -> DiagnosticResult<Self> {
        serde_json::from_str(json).map_err(|e| DiagnosticError::InvalidProfile(e.to_string()))
    }

    pub fn from_json_value(value: serde_json::Value) -> DiagnosticResult<Self> {
        serde_json::from_value(value).map_err(|e| DiagnosticError::InvalidProfile(e.to_string()))
    }

    /// Apply defaults and coerce every field into its domain
    pub fn resolve(&self) -> PatientProfile {
        let defaults = PatientProfile::default();

        let age = match self.age {
            Some(a) if a.is_finite() && a >= 0.0 => a.round().min(u32::MAX as f64) as u32,
            Some(a) => {
                log::warn!("Ignoring invalid age {}, using {}", a, defaults.age);
                defaults.age
            }
            None => defaults.age,
        };

        let sleep_hours = match self.sleep_hours {
            Some(h) if h.is_finite() && h >= 0.0 => h as f32,
            Some(h) => {
                log::warn!("Ignoring invalid sleep_hours {}, using {}", h, defaults.sleep_hours);
                defaults.sleep_hours
            }
            None => defaults.sleep_hours,
        };

        let stress_level = match self.stress_level {
            Some(s) if s.is_finite() => {
                let clamped = s.round().clamp(0.0, MAX_STRESS_LEVEL as f64);
                if clamped != s.round() {
                    log::warn!("stress_level {} clamped to {}", s, clamped);
                }
                clamped as u8
            }
            Some(s) => {
                log::warn!("Ignoring invalid stress_level {}, using {}", s, defaults.stress_level);
                defaults.stress_level
            }
            None => defaults.stress_level,
        };

        PatientProfile {
            age,
            gender: resolve_choice("gender", self.gender.as_deref(), Gender::parse_loose, defaults.gender),
            sleep_hours,
            stress_level,
            diet_quality: resolve_choice(
                "diet_quality",
                self.diet_quality.as_deref(),
                DietQuality::parse_loose,
                defaults.diet_quality,
            ),
            smoker: resolve_flag(self.smoker.as_ref(), defaults.smoker),
            alcohol_consumption: resolve_choice(
                "alcohol_consumption",
                self.alcohol_consumption.as_deref(),
                AlcoholConsumption::parse_loose,
                defaults.alcohol_consumption,
            ),
        }
    }
}

impl From<ProfileInput> for PatientProfile {
    fn from(input: ProfileInput) -> Self {
        input.resolve()
    }
}

fn resolve_choice<T: Copy>(
    field: &str,
    value: Option<&str>,
    parse: fn(&str) -> Option<T>,
    default: T,
) -> T {
    match value {
        Some(raw) => parse(raw).unwrap_or_else(|| {
            log::warn!("Unrecognised {} value {:?}, using default", field, raw);
            default
        }),
        None => default,
    }
}

fn resolve_flag(value: Option<&FlagInput>, default: bool) -> bool {
    match value {
        Some(FlagInput::Bool(b)) => *b,
        Some(FlagInput::Text(raw)) => match raw.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" | "true" | "1" => true,
            "no" | "n" | "false" | "0" => false,
            _ => {
                log::warn!("Unrecognised smoker value {:?}, using default", raw);
                default
            }
        },
        None => default,
    }
}
