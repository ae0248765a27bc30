//! Validation-and-derivation pipeline for patient forms.
//!
//! Pipeline: Raw form → Normalization → Validation → Derivation → Store

mod derive;
mod normalizer;
mod seed;
mod validator;

pub use derive::*;
pub use normalizer::*;
pub use seed::*;
pub use validator::*;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::clock::{Clock, SystemClock};
use crate::db::{DbError, PatientStore};
use crate::export::RosterExport;
use crate::models::{Locale, PatientForm, PatientRecord, PatientView};

/// Registry errors.
///
/// Validation failures are not errors; they come back as
/// [`Submission::Rejected`].
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Patient not found: {0}")]
    NotFound(String),

    #[error("Store error: {0}")]
    Store(#[from] DbError),

    #[error("Invalid seed record {patient_id}: {reason}")]
    InvalidSeed { patient_id: String, reason: String },
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// A form that failed validation, echoed back for re-display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rejection {
    pub errors: ValidationErrors,
    /// Exactly what was submitted
    pub form: PatientForm,
    /// Consent as resolved from the submitted toggle
    pub consent_data_processing: bool,
}

/// Outcome of a create or edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Submission {
    /// Record written; carries the stored record and its derived view
    Saved(PatientView),
    /// Nothing written
    Rejected(Rejection),
}

impl Submission {
    pub fn is_saved(&self) -> bool {
        matches!(self, Submission::Saved(_))
    }

    pub fn saved(&self) -> Option<&PatientView> {
        match self {
            Submission::Saved(view) => Some(view),
            Submission::Rejected(_) => None,
        }
    }

    pub fn rejected(&self) -> Option<&Rejection> {
        match self {
            Submission::Saved(_) => None,
            Submission::Rejected(rejection) => Some(rejection),
        }
    }
}

/// Liveness report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: String,
}

impl HealthStatus {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Orchestrates the pipeline over an injected store and clock.
pub struct Registry<S, C = SystemClock> {
    store: S,
    clock: C,
    normalizer: Normalizer,
    locale: Locale,
}

impl<S: PatientStore> Registry<S, SystemClock> {
    /// Create a registry on the wall clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: PatientStore, C: Clock> Registry<S, C> {
    /// Create a registry with an explicit clock.
    pub fn with_clock(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            normalizer: Normalizer::new(),
            locale: Locale::default(),
        }
    }

    /// Set the display locale used for edit forms and exports.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Get the normalizer for custom aliases.
    pub fn normalizer_mut(&mut self) -> &mut Normalizer {
        &mut self.normalizer
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Validate and store a new patient.
    pub fn create(&mut self, form: PatientForm) -> RegistryResult<Submission> {
        let normalized = self.normalizer.normalize(&form, false);

        let fields = match validate(&normalized, self.clock.today()) {
            Ok(fields) => fields,
            Err(errors) => return Ok(reject(form, errors, normalized.consent_data_processing)),
        };

        let now = self.clock.now();
        let record = derive_record(fields, uuid::Uuid::new_v4().to_string(), now, now);
        self.store.insert_patient(&record)?;

        info!(patient_id = %record.patient_id, has_bmi = record.bmi.is_some(), "Patient created");
        Ok(Submission::Saved(self.view(record)))
    }

    /// Validate and overwrite an existing patient.
    ///
    /// The full field set is required; previous BMI values are replaced, not
    /// merged. `patient_id` and `created_at` never change.
    pub fn update(&mut self, patient_id: &str, form: PatientForm) -> RegistryResult<Submission> {
        let existing = self
            .store
            .get_patient(patient_id)?
            .ok_or_else(|| RegistryError::NotFound(patient_id.to_string()))?;

        let normalized = self
            .normalizer
            .normalize(&form, existing.consent_data_processing);

        let fields = match validate(&normalized, self.clock.today()) {
            Ok(fields) => fields,
            Err(errors) => return Ok(reject(form, errors, normalized.consent_data_processing)),
        };

        let record = derive_record(
            fields,
            existing.patient_id,
            existing.created_at,
            self.clock.now(),
        );
        if !self.store.update_patient(&record)? {
            return Err(RegistryError::NotFound(patient_id.to_string()));
        }

        info!(patient_id = %record.patient_id, has_bmi = record.bmi.is_some(), "Patient updated");
        Ok(Submission::Saved(self.view(record)))
    }

    /// Delete a patient. Unknown ids are a no-op; returns whether a record
    /// was removed.
    pub fn delete(&mut self, patient_id: &str) -> RegistryResult<bool> {
        let removed = self.store.delete_patient(patient_id)?;
        if removed {
            info!(patient_id, "Patient deleted");
        } else {
            debug!(patient_id, "Delete of unknown patient ignored");
        }
        Ok(removed)
    }

    /// Get a patient with its derived view.
    pub fn get(&self, patient_id: &str) -> RegistryResult<Option<PatientView>> {
        Ok(self
            .store
            .get_patient(patient_id)?
            .map(|record| self.view(record)))
    }

    /// All patients, sorted by last then first name.
    pub fn list(&self) -> RegistryResult<Vec<PatientView>> {
        Ok(self
            .store
            .list_patients()?
            .into_iter()
            .map(|record| self.view(record))
            .collect())
    }

    /// Pre-populated form for editing a stored patient.
    pub fn edit_form(&self, patient_id: &str) -> RegistryResult<PatientForm> {
        let record = self
            .store
            .get_patient(patient_id)?
            .ok_or_else(|| RegistryError::NotFound(patient_id.to_string()))?;
        Ok(PatientForm::from_record(&record, self.locale))
    }

    /// Fixed liveness status.
    pub fn health(&self) -> HealthStatus {
        HealthStatus::ok()
    }

    /// Load the demo patients into an empty store. Returns how many were added.
    pub fn seed_demo_patients(&mut self) -> RegistryResult<usize> {
        if self.store.count_patients()? > 0 {
            debug!("Store not empty, skipping demo seed");
            return Ok(0);
        }

        let today = self.clock.today();
        let mut added = 0;
        for demo in DEMO_PATIENTS {
            let record = demo.to_record(&self.normalizer, today)?;
            self.store.insert_patient(&record)?;
            added += 1;
        }

        info!(count = added, "Seeded demo patients");
        Ok(added)
    }

    /// Export the sorted listing.
    pub fn export_roster(&self) -> RegistryResult<RosterExport> {
        let views = self.list()?;
        Ok(RosterExport::from_views(&views, self.locale, self.clock.now()))
    }

    /// Attach derived fields relative to the current date.
    fn view(&self, record: PatientRecord) -> PatientView {
        let computed = computed_fields(&record, self.clock.today());
        PatientView { record, computed }
    }
}

fn reject(form: PatientForm, errors: ValidationErrors, consent_data_processing: bool) -> Submission {
    warn!(
        fields = ?errors.fields().map(|f| f.as_str()).collect::<Vec<_>>(),
        "Submission rejected"
    );
    Submission::Rejected(Rejection {
        errors,
        form,
        consent_data_processing,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::db::MemoryStore;
    use crate::models::BmiCategory;
    use chrono::NaiveDate;

    fn registry() -> Registry<MemoryStore, FixedClock> {
        let today = NaiveDate::from_ymd_opt(2025, 10, 26).unwrap();
        Registry::with_clock(MemoryStore::new(), FixedClock::at_date(today))
    }

    fn form(first: &str, last: &str) -> PatientForm {
        PatientForm {
            first_name: Some(first.into()),
            last_name: Some(last.into()),
            date_of_birth: Some("1992-04-15".into()),
            sex_at_birth: Some("Femenino".into()),
            consent_data_processing: Some("on".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_assigns_id_and_view() {
        let mut registry = registry();

        let outcome = registry.create(form("laura", "gómez")).unwrap();
        let view = outcome.saved().unwrap();

        assert_eq!(view.patient_id().len(), 36);
        assert_eq!(view.record.first_name, "Laura");
        assert_eq!(view.computed.display_name, "Gómez, Laura");
        assert_eq!(view.computed.age_years, Some(33));
        assert_eq!(view.record.created_at, view.record.updated_at);
    }

    #[test]
    fn test_rejection_echoes_submitted_form() {
        let mut registry = registry();

        let mut submitted = form("  laura ", "gómez");
        submitted.height_cm = Some("tall".into());
        submitted.consent_data_processing = Some("off".into());

        let outcome = registry.create(submitted.clone()).unwrap();
        let rejection = outcome.rejected().unwrap();

        assert_eq!(rejection.form, submitted);
        assert!(!rejection.consent_data_processing);
        assert!(rejection.errors.contains(Field::HeightCm));
        assert!(rejection.errors.contains(Field::ConsentDataProcessing));
        assert_eq!(registry.store().count_patients().unwrap(), 0);
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let mut registry = registry();
        let result = registry.update("missing", form("Ana", "Ruiz"));
        assert!(matches!(result, Err(RegistryError::NotFound(id)) if id == "missing"));
    }

    #[test]
    fn test_update_without_toggle_keeps_consent() {
        let mut registry = registry();
        let id = registry
            .create(form("Ana", "Ruiz"))
            .unwrap()
            .saved()
            .unwrap()
            .patient_id()
            .to_string();

        let mut edit = form("Ana", "Ruiz");
        edit.consent_data_processing = None;
        assert!(registry.update(&id, edit).unwrap().is_saved());
    }

    #[test]
    fn test_update_replaces_bmi() {
        let mut registry = registry();
        let mut create = form("Ana", "Ruiz");
        create.height_cm = Some("165".into());
        create.weight_kg = Some("60".into());
        let id = registry
            .create(create)
            .unwrap()
            .saved()
            .unwrap()
            .patient_id()
            .to_string();

        let mut edit = form("Ana", "Ruiz");
        edit.height_cm = Some("165".into());
        let view = registry.update(&id, edit).unwrap().saved().cloned().unwrap();

        assert_eq!(view.record.height_cm, Some(165.0));
        assert_eq!(view.record.weight_kg, None);
        assert!(view.record.bmi.is_none());
    }

    #[test]
    fn test_edit_form_uses_locale() {
        let mut registry = registry().with_locale(Locale::Es);
        let mut create = form("Ana", "Ruiz");
        create.sex_at_birth = Some("female".into());
        create.weight_kg = Some("58.5".into());
        let id = registry
            .create(create)
            .unwrap()
            .saved()
            .unwrap()
            .patient_id()
            .to_string();

        let edit = registry.edit_form(&id).unwrap();
        assert_eq!(edit.sex_at_birth.as_deref(), Some("Femenino"));
        assert_eq!(edit.date_of_birth.as_deref(), Some("1992-04-15"));
        assert_eq!(edit.weight_kg.as_deref(), Some("58.5"));
        assert_eq!(edit.height_cm, None);

        // The pre-populated form is accepted as-is
        assert!(registry.update(&id, edit).unwrap().is_saved());
    }

    #[test]
    fn test_seed_only_into_empty_store() {
        let mut registry = registry();
        assert_eq!(registry.seed_demo_patients().unwrap(), 2);
        assert_eq!(registry.seed_demo_patients().unwrap(), 0);

        let list = registry.list().unwrap();
        assert_eq!(list[0].computed.display_name, "Gómez, Laura");
        assert_eq!(list[1].record.bmi_category_last(), Some(BmiCategory::Overweight));
    }

    #[test]
    fn test_health() {
        assert_eq!(registry().health().status, "ok");
    }
}
