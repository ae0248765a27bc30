//! Display locales and the label table for enumerated values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::patient::{BmiCategory, SexAtBirth, UnknownVariant};

/// Display locale for labels and validation messages.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Es];

    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    /// Display label for a sex-at-birth value.
    pub fn sex_label(&self, sex: SexAtBirth) -> &'static str {
        match (self, sex) {
            (Locale::En, SexAtBirth::Male) => "Male",
            (Locale::En, SexAtBirth::Female) => "Female",
            (Locale::En, SexAtBirth::Other) => "Other",
            (Locale::Es, SexAtBirth::Male) => "Masculino",
            (Locale::Es, SexAtBirth::Female) => "Femenino",
            (Locale::Es, SexAtBirth::Other) => "Otro",
        }
    }

    /// Display label for a BMI band.
    pub fn bmi_category_label(&self, category: BmiCategory) -> &'static str {
        match (self, category) {
            (Locale::En, BmiCategory::Underweight) => "underweight",
            (Locale::En, BmiCategory::Normal) => "normal",
            (Locale::En, BmiCategory::Overweight) => "overweight",
            (Locale::En, BmiCategory::Obese) => "obese",
            (Locale::Es, BmiCategory::Underweight) => "bajo peso",
            (Locale::Es, BmiCategory::Normal) => "normal",
            (Locale::Es, BmiCategory::Overweight) => "sobrepeso",
            (Locale::Es, BmiCategory::Obese) => "obesidad",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Locale::ALL
            .into_iter()
            .find(|locale| locale.as_str() == lower)
            .ok_or_else(|| UnknownVariant {
                kind: "locale",
                value: s.to_string(),
            })
    }
}
