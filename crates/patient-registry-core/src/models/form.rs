//! Raw and validated form types.
//!
//! `PatientForm` is exactly what a caller submitted. `PatientFields` is the
//! typed result of a successful validation pass. The pipeline module maps one
//! into the other.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::locale::Locale;
use super::patient::{PatientRecord, SexAtBirth};

/// Toggle values that count as a checked box.
const CONSENT_TRUE_VALUES: [&str; 4] = ["on", "true", "1", "yes"];

/// Raw submitted form fields. Every value is optional and untrusted.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatientForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Expected as YYYY-MM-DD
    pub date_of_birth: Option<String>,
    /// Canonical value or a localized label
    pub sex_at_birth: Option<String>,
    pub gender_identity: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub height_cm: Option<String>,
    pub weight_kg: Option<String>,
    /// Checkbox state, "on" when ticked; absent when the box was not sent
    pub consent_data_processing: Option<String>,
}

impl PatientForm {
    /// Resolve the consent toggle. An absent toggle falls back to `default`.
    pub fn resolve_consent(&self, default: bool) -> bool {
        match self.consent_data_processing.as_deref() {
            Some(value) => {
                let value = value.trim();
                CONSENT_TRUE_VALUES
                    .iter()
                    .any(|accepted| value.eq_ignore_ascii_case(accepted))
            }
            None => default,
        }
    }

    /// Build a pre-populated edit form from a stored record.
    pub fn from_record(record: &PatientRecord, locale: Locale) -> Self {
        Self {
            first_name: Some(record.first_name.clone()),
            last_name: Some(record.last_name.clone()),
            date_of_birth: Some(record.date_of_birth.format("%Y-%m-%d").to_string()),
            sex_at_birth: Some(locale.sex_label(record.sex_at_birth).to_string()),
            gender_identity: record.gender_identity.clone(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            notes: record.notes.clone(),
            height_cm: record.height_cm.map(|h| h.to_string()),
            weight_kg: record.weight_kg.map(|w| w.to_string()),
            consent_data_processing: Some(if record.consent_data_processing {
                "on".to_string()
            } else {
                "off".to_string()
            }),
        }
    }
}

/// A validated, normalized field set ready for derivation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatientFields {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub sex_at_birth: SexAtBirth,
    pub gender_identity: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub consent_data_processing: bool,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
}
