//! Form field normalizer.
//!
//! Handles:
//! - Name casing (whitespace collapse + title case)
//! - Numeric and date parsing
//! - Sex-at-birth canonicalization (canonical values and localized labels)

use std::collections::HashMap;

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Locale, PatientForm, SexAtBirth};

/// Field-level parse failures. The validator turns these into field errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("Invalid date format (expected YYYY-MM-DD): {0}")]
    InvalidFormat(String),

    #[error("Not a number: {0}")]
    NotANumber(String),

    #[error("Unknown value: {0}")]
    UnknownValue(String),
}

/// Form after normalization, before any rule is checked.
///
/// Required fields that were not submitted are `None`; submitted values that
/// failed to parse carry their error so the validator can report it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedForm {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<Result<NaiveDate, NormalizeError>>,
    pub sex_at_birth: Option<Result<SexAtBirth, NormalizeError>>,
    pub gender_identity: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub consent_data_processing: bool,
    pub height_cm: Result<Option<f64>, NormalizeError>,
    pub weight_kg: Result<Option<f64>, NormalizeError>,
}

/// Collapse whitespace runs, trim, and title-case each word.
///
/// A letter is upper-cased when it follows a non-alphanumeric character, so
/// hyphenated and apostrophized names ("García-López", "O'Neil") are handled.
pub fn normalize_name(raw: &str) -> String {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut out = String::with_capacity(collapsed.len());
    let mut at_word_start = true;

    for c in collapsed.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = !c.is_alphanumeric();
    }

    out
}

/// Trim a free-text value; empty becomes `None`.
pub fn normalize_optional_text(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse an optional decimal number.
///
/// Absent or blank input is `Ok(None)`. Anything else must be a finite
/// number with a `.` decimal separator.
pub fn parse_optional_number(raw: Option<&str>) -> Result<Option<f64>, NormalizeError> {
    let Some(s) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match s.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(Some(value)),
        _ => Err(NormalizeError::NotANumber(s.to_string())),
    }
}

/// Parse a strict `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, NormalizeError> {
    let s = raw.trim();
    let bytes = s.as_bytes();
    let shape_ok = bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        });

    if !shape_ok {
        return Err(NormalizeError::InvalidFormat(s.to_string()));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| NormalizeError::InvalidFormat(s.to_string()))
}

/// Normalizer for submitted patient forms.
pub struct Normalizer {
    /// Accepted spellings (lowercase) → canonical sex-at-birth
    sex_aliases: HashMap<String, SexAtBirth>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    /// Create a normalizer accepting canonical values and every locale label.
    pub fn new() -> Self {
        Self {
            sex_aliases: Self::default_sex_aliases(),
        }
    }

    /// Normalize a submitted form.
    ///
    /// `consent_default` applies when the consent toggle was not submitted at
    /// all: false on create, the stored value on edit.
    pub fn normalize(&self, form: &PatientForm, consent_default: bool) -> NormalizedForm {
        NormalizedForm {
            first_name: normalize_name(form.first_name.as_deref().unwrap_or_default()),
            last_name: normalize_name(form.last_name.as_deref().unwrap_or_default()),
            date_of_birth: normalize_optional_text(form.date_of_birth.as_deref())
                .map(|s| parse_date(&s)),
            sex_at_birth: normalize_optional_text(form.sex_at_birth.as_deref())
                .map(|s| self.parse_sex_at_birth(&s)),
            gender_identity: normalize_optional_text(form.gender_identity.as_deref()),
            email: normalize_optional_text(form.email.as_deref()),
            phone: normalize_optional_text(form.phone.as_deref()),
            notes: normalize_optional_text(form.notes.as_deref()),
            consent_data_processing: form.resolve_consent(consent_default),
            height_cm: parse_optional_number(form.height_cm.as_deref()),
            weight_kg: parse_optional_number(form.weight_kg.as_deref()),
        }
    }

    /// Map a submitted sex-at-birth value to its canonical form.
    pub fn parse_sex_at_birth(&self, raw: &str) -> Result<SexAtBirth, NormalizeError> {
        self.sex_aliases
            .get(&alias_key(raw))
            .copied()
            .ok_or_else(|| NormalizeError::UnknownValue(raw.trim().to_string()))
    }

    /// Add a custom sex-at-birth spelling.
    pub fn add_sex_alias(&mut self, alias: &str, sex: SexAtBirth) {
        self.sex_aliases.insert(alias_key(alias), sex);
    }

    /// Canonical values plus the label of each locale.
    fn default_sex_aliases() -> HashMap<String, SexAtBirth> {
        let mut map = HashMap::new();

        for sex in SexAtBirth::ALL {
            map.insert(sex.as_str().to_string(), sex);
            for locale in Locale::ALL {
                map.insert(alias_key(locale.sex_label(sex)), sex);
            }
        }

        map
    }
}

/// Lookup key for an alias: whitespace runs collapsed, lowercased.
fn alias_key(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}
