//! Demo patients for a fresh registry.
//!
//! Seeds go through the same normalize → validate → derive path as form
//! submissions, with fixed ids and creation stamps.

use chrono::{DateTime, NaiveDate, Utc};

use super::derive::derive_record;
use super::normalizer::Normalizer;
use super::validator::validate;
use super::RegistryError;
use crate::models::{PatientForm, PatientRecord};

/// One seeded patient, as it would have been typed into the form.
#[derive(Debug, Clone, Copy)]
pub struct DemoPatient {
    pub patient_id: &'static str,
    pub created_at: &'static str,
    pub first_name: &'static str,
    pub last_name: &'static str,
    pub date_of_birth: &'static str,
    pub sex_at_birth: &'static str,
    pub email: &'static str,
    pub phone: &'static str,
    pub height_cm: &'static str,
    pub weight_kg: &'static str,
}

pub const DEMO_PATIENTS: [DemoPatient; 2] = [
    // Normal BMI
    DemoPatient {
        patient_id: "f0b5a2e1-1a9d-4c6b-9e11-aaa111aaa111",
        created_at: "2025-10-26T10:00:00Z",
        first_name: "Laura",
        last_name: "Gómez",
        date_of_birth: "1992-04-15",
        sex_at_birth: "Femenino",
        email: "laura.gomez@example.com",
        phone: "+34 600 112 233",
        height_cm: "165",
        weight_kg: "60",
    },
    // Overweight
    DemoPatient {
        patient_id: "a8f1c3b2-4e0a-4f9b-9b77-bbb222bbb222",
        created_at: "2025-10-26T10:05:00Z",
        first_name: "Carlos",
        last_name: "López",
        date_of_birth: "1988-09-10",
        sex_at_birth: "Masculino  ",
        email: "carlos.lopez@example.com",
        phone: "+34 611 223 344",
        height_cm: "178",
        weight_kg: "92",
    },
];

impl DemoPatient {
    pub fn form(&self) -> PatientForm {
        PatientForm {
            first_name: Some(self.first_name.to_string()),
            last_name: Some(self.last_name.to_string()),
            date_of_birth: Some(self.date_of_birth.to_string()),
            sex_at_birth: Some(self.sex_at_birth.to_string()),
            gender_identity: None,
            email: Some(self.email.to_string()),
            phone: Some(self.phone.to_string()),
            notes: None,
            height_cm: Some(self.height_cm.to_string()),
            weight_kg: Some(self.weight_kg.to_string()),
            consent_data_processing: Some("on".to_string()),
        }
    }

    /// Run the demo form through the pipeline, stamped at `created_at`.
    pub fn to_record(
        &self,
        normalizer: &Normalizer,
        today: NaiveDate,
    ) -> Result<PatientRecord, RegistryError> {
        let created_at = self
            .created_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| self.invalid(e.to_string()))?;

        let normalized = normalizer.normalize(&self.form(), false);
        let fields = validate(&normalized, today).map_err(|e| self.invalid(e.to_string()))?;

        Ok(derive_record(
            fields,
            self.patient_id.to_string(),
            created_at,
            created_at,
        ))
    }

    fn invalid(&self, reason: String) -> RegistryError {
        RegistryError::InvalidSeed {
            patient_id: self.patient_id.to_string(),
            reason,
        }
    }
}
