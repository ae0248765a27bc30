//! Patient models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stored enum value is not one of the canonical forms.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Sex assigned at birth.
///
/// Stored in canonical lowercase English form; localized labels live in
/// [`crate::models::Locale`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SexAtBirth {
    Male,
    Female,
    Other,
}

impl SexAtBirth {
    pub const ALL: [SexAtBirth; 3] = [SexAtBirth::Male, SexAtBirth::Female, SexAtBirth::Other];

    /// Canonical storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            SexAtBirth::Male => "male",
            SexAtBirth::Female => "female",
            SexAtBirth::Other => "other",
        }
    }
}

impl fmt::Display for SexAtBirth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SexAtBirth {
    type Err = UnknownVariant;

    /// Parses the canonical form only. Form input goes through the normalizer,
    /// which also accepts localized labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SexAtBirth::ALL
            .into_iter()
            .find(|sex| sex.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "sex_at_birth",
                value: s.to_string(),
            })
    }
}

/// Body-mass index band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BmiCategory {
    /// BMI below 18.5
    Underweight,
    /// 18.5 up to (excluding) 25.0
    Normal,
    /// 25.0 up to (excluding) 30.0
    Overweight,
    /// 30.0 and above
    Obese,
}

impl BmiCategory {
    pub const ALL: [BmiCategory; 4] = [
        BmiCategory::Underweight,
        BmiCategory::Normal,
        BmiCategory::Overweight,
        BmiCategory::Obese,
    ];

    /// Classify a BMI value. Each band includes its lower bound.
    pub fn from_bmi(bmi: f64) -> Self {
        if bmi < 18.5 {
            BmiCategory::Underweight
        } else if bmi < 25.0 {
            BmiCategory::Normal
        } else if bmi < 30.0 {
            BmiCategory::Overweight
        } else {
            BmiCategory::Obese
        }
    }

    /// Canonical storage form.
    pub fn as_str(&self) -> &'static str {
        match self {
            BmiCategory::Underweight => "underweight",
            BmiCategory::Normal => "normal",
            BmiCategory::Overweight => "overweight",
            BmiCategory::Obese => "obese",
        }
    }
}

impl fmt::Display for BmiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BmiCategory {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BmiCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownVariant {
                kind: "bmi_category",
                value: s.to_string(),
            })
    }
}

/// The last BMI computed for a patient.
///
/// All four values are written and cleared together, so they live in one
/// optional struct on the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BmiReading {
    /// `bmi_last`, rounded to two decimals
    pub value: f64,
    /// `bmi_category_last`
    pub category: BmiCategory,
    /// `bmi_last_measured_at`
    pub measured_at: DateTime<Utc>,
    /// `bmi_inputs_updated_at`
    pub inputs_updated_at: DateTime<Utc>,
}

/// A persisted patient record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// UUID assigned at creation, never reused
    pub patient_id: String,
    /// Title-cased given name
    pub first_name: String,
    /// Title-cased family name
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub sex_at_birth: SexAtBirth,
    /// Patient-reported gender identity
    pub gender_identity: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Free-text notes
    pub notes: Option<String>,
    /// Always true for a stored record
    pub consent_data_processing: bool,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    /// Present iff both height and weight are present
    pub bmi: Option<BmiReading>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last successful write
    pub updated_at: DateTime<Utc>,
}

impl PatientRecord {
    pub fn bmi_last(&self) -> Option<f64> {
        self.bmi.as_ref().map(|b| b.value)
    }

    pub fn bmi_category_last(&self) -> Option<BmiCategory> {
        self.bmi.as_ref().map(|b| b.category)
    }

    pub fn bmi_last_measured_at(&self) -> Option<DateTime<Utc>> {
        self.bmi.as_ref().map(|b| b.measured_at)
    }

    pub fn bmi_inputs_updated_at(&self) -> Option<DateTime<Utc>> {
        self.bmi.as_ref().map(|b| b.inputs_updated_at)
    }
}

/// Fields derived from a record on every read and write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ComputedFields {
    /// "{last}, {first}"
    pub display_name: String,
    pub age_years: Option<u32>,
    pub is_adult: Option<bool>,
    /// Email or phone on file
    pub contactable: bool,
}

/// A record together with its derived view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientView {
    #[serde(flatten)]
    pub record: PatientRecord,
    pub computed: ComputedFields,
}

impl PatientView {
    pub fn patient_id(&self) -> &str {
        &self.record.patient_id
    }
}
