//! Patient Registry Core Library
//!
//! Validation-and-derivation pipeline for a small clinical patient registry.
//!
//! # Architecture
//!
//! ```text
//! PatientForm (raw strings)
//!        │
//!        ▼
//!   Normalization ── trim, title-case names, parse dates/numbers, sex aliases
//!        │
//!        ▼
//!    Validation ───── consent gate, ranges, formats ──► Rejected{errors, form}
//!        │
//!        ▼
//!    Derivation ───── BMI + category + timestamps
//!        │
//!        ▼
//!   PatientStore (SQLite or memory)
//!        │
//!        ▼
//!   PatientView ───── display name, age, adulthood, contactability
//! ```
//!
//! # Core Principle
//!
//! **No record without consent.** A submission either passes every rule and
//! is stored, or nothing is written and every violation is reported.
//!
//! # Modules
//!
//! - [`models`]: Domain types (PatientForm, PatientRecord, PatientView, Locale)
//! - [`pipeline`]: Normalizer, validator, derivation and the `Registry`
//! - [`db`]: `PatientStore` trait with SQLite and in-memory stores
//! - [`export`]: Roster export (JSON, CSV)
//! - [`config`]: Environment configuration
//! - [`logging`]: Tracing subscriber setup

pub mod clock;
pub mod config;
pub mod db;
pub mod export;
pub mod logging;
pub mod models;
pub mod pipeline;

// Re-export commonly used types
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ConfigError, RegistryConfig};
pub use db::{Database, DbError, MemoryStore, PatientStore};
pub use export::{ExportError, RosterExport};
pub use logging::{init_logging, LogConfig, LogFormat, LoggingError};
pub use models::{
    BmiCategory, Locale, PatientFields, PatientForm, PatientRecord, PatientView, SexAtBirth,
};
pub use pipeline::{
    Field, FieldError, HealthStatus, Normalizer, Registry, RegistryError, Rejection, Submission,
    ValidationErrors,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use tracing::info;

type SharedRegistry = Registry<Box<dyn PatientStore + Send>>;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PatientRegistryError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<DbError> for PatientRegistryError {
    fn from(e: DbError) -> Self {
        PatientRegistryError::DatabaseError(e.to_string())
    }
}

impl From<RegistryError> for PatientRegistryError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(id) => PatientRegistryError::NotFound(id),
            RegistryError::Store(db) => db.into(),
            other @ RegistryError::InvalidSeed { .. } => {
                PatientRegistryError::InvalidInput(other.to_string())
            }
        }
    }
}

impl From<serde_json::Error> for PatientRegistryError {
    fn from(e: serde_json::Error) -> Self {
        PatientRegistryError::SerializationError(e.to_string())
    }
}

impl From<ExportError> for PatientRegistryError {
    fn from(e: ExportError) -> Self {
        PatientRegistryError::SerializationError(e.to_string())
    }
}

impl From<ConfigError> for PatientRegistryError {
    fn from(e: ConfigError) -> Self {
        PatientRegistryError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PatientRegistryError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PatientRegistryError::DatabaseError(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Open or create a SQLite-backed registry at the given path.
#[uniffi::export]
pub fn open_registry(path: String) -> Result<Arc<PatientRegistryCore>, PatientRegistryError> {
    let store: Box<dyn PatientStore + Send> = Box::new(Database::open(&path)?);
    info!(path = %path, "Opened patient registry");
    Ok(PatientRegistryCore::wrap(Registry::new(store)))
}

/// Create an in-memory registry (for testing).
#[uniffi::export]
pub fn open_registry_in_memory() -> Result<Arc<PatientRegistryCore>, PatientRegistryError> {
    let store: Box<dyn PatientStore + Send> = Box::new(MemoryStore::new());
    Ok(PatientRegistryCore::wrap(Registry::new(store)))
}

/// Open a registry from `PATIENT_REGISTRY_*` environment variables.
///
/// Installs the tracing subscriber unless the host already has one, and
/// seeds the demo patients into an empty store when configured.
#[uniffi::export]
pub fn open_registry_from_config() -> Result<Arc<PatientRegistryCore>, PatientRegistryError> {
    let config = RegistryConfig::from_env()?;
    open_with_config(&config)
}

fn open_with_config(
    config: &RegistryConfig,
) -> Result<Arc<PatientRegistryCore>, PatientRegistryError> {
    match init_logging(&config.log) {
        Ok(()) | Err(LoggingError::AlreadyInitialized(_)) => {}
        Err(e) => return Err(ConfigError::from(e).into()),
    }

    let store: Box<dyn PatientStore + Send> = match &config.database_path {
        Some(path) => Box::new(Database::open(path)?),
        None => Box::new(MemoryStore::new()),
    };

    let mut registry = Registry::new(store).with_locale(config.locale);
    if config.seed_demo_data {
        registry.seed_demo_patients()?;
    }

    info!(
        persistent = config.database_path.is_some(),
        locale = %config.locale,
        "Opened patient registry"
    );
    Ok(PatientRegistryCore::wrap(registry))
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe registry wrapper for FFI.
#[derive(uniffi::Object)]
pub struct PatientRegistryCore {
    registry: Arc<Mutex<SharedRegistry>>,
}

impl PatientRegistryCore {
    fn wrap(registry: SharedRegistry) -> Arc<Self> {
        Arc::new(Self {
            registry: Arc::new(Mutex::new(registry)),
        })
    }
}

#[uniffi::export]
impl PatientRegistryCore {
    // =========================================================================
    // Patient Operations
    // =========================================================================

    /// Submit a new patient form.
    pub fn create_patient(
        &self,
        form: FfiPatientForm,
    ) -> Result<FfiSubmission, PatientRegistryError> {
        let mut registry = self.registry.lock()?;
        let outcome = registry.create(form.into())?;
        Ok(FfiSubmission::new(outcome, registry.locale()))
    }

    /// Submit an edit of an existing patient.
    pub fn update_patient(
        &self,
        patient_id: String,
        form: FfiPatientForm,
    ) -> Result<FfiSubmission, PatientRegistryError> {
        let mut registry = self.registry.lock()?;
        let outcome = registry.update(&patient_id, form.into())?;
        Ok(FfiSubmission::new(outcome, registry.locale()))
    }

    /// Delete a patient. Returns false when the id was unknown.
    pub fn delete_patient(&self, patient_id: String) -> Result<bool, PatientRegistryError> {
        let mut registry = self.registry.lock()?;
        Ok(registry.delete(&patient_id)?)
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, patient_id: String) -> Result<Option<FfiPatient>, PatientRegistryError> {
        let registry = self.registry.lock()?;
        let locale = registry.locale();
        let view = registry.get(&patient_id)?;
        Ok(view.map(|v| FfiPatient::from_view(v, locale)))
    }

    /// All patients sorted by last then first name.
    pub fn list_patients(&self) -> Result<Vec<FfiPatient>, PatientRegistryError> {
        let registry = self.registry.lock()?;
        let locale = registry.locale();
        let views = registry.list()?;
        Ok(views
            .into_iter()
            .map(|v| FfiPatient::from_view(v, locale))
            .collect())
    }

    /// Pre-populated form for the edit screen.
    pub fn edit_form(&self, patient_id: String) -> Result<FfiPatientForm, PatientRegistryError> {
        let registry = self.registry.lock()?;
        Ok(registry.edit_form(&patient_id)?.into())
    }

    /// Load the demo patients into an empty registry.
    pub fn seed_demo_patients(&self) -> Result<u32, PatientRegistryError> {
        let mut registry = self.registry.lock()?;
        let added = registry.seed_demo_patients()?;
        Ok(added as u32)
    }

    pub fn health(&self) -> Result<FfiHealthStatus, PatientRegistryError> {
        let registry = self.registry.lock()?;
        Ok(registry.health().into())
    }

    // =========================================================================
    // Export Operations
    // =========================================================================

    /// Export the roster as JSON.
    pub fn export_roster_json(&self) -> Result<String, PatientRegistryError> {
        let registry = self.registry.lock()?;
        let export = registry.export_roster()?;
        Ok(export.to_json()?)
    }

    /// Export the roster as CSV.
    pub fn export_roster_csv(&self) -> Result<String, PatientRegistryError> {
        let registry = self.registry.lock()?;
        let export = registry.export_roster()?;
        Ok(export.to_csv()?)
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe raw form.
#[derive(Debug, Clone, Default, uniffi::Record)]
pub struct FfiPatientForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub sex_at_birth: Option<String>,
    pub gender_identity: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub height_cm: Option<String>,
    pub weight_kg: Option<String>,
    pub consent_data_processing: Option<String>,
}

impl From<FfiPatientForm> for PatientForm {
    fn from(form: FfiPatientForm) -> Self {
        PatientForm {
            first_name: form.first_name,
            last_name: form.last_name,
            date_of_birth: form.date_of_birth,
            sex_at_birth: form.sex_at_birth,
            gender_identity: form.gender_identity,
            email: form.email,
            phone: form.phone,
            notes: form.notes,
            height_cm: form.height_cm,
            weight_kg: form.weight_kg,
            consent_data_processing: form.consent_data_processing,
        }
    }
}

impl From<PatientForm> for FfiPatientForm {
    fn from(form: PatientForm) -> Self {
        Self {
            first_name: form.first_name,
            last_name: form.last_name,
            date_of_birth: form.date_of_birth,
            sex_at_birth: form.sex_at_birth,
            gender_identity: form.gender_identity,
            email: form.email,
            phone: form.phone,
            notes: form.notes,
            height_cm: form.height_cm,
            weight_kg: form.weight_kg,
            consent_data_processing: form.consent_data_processing,
        }
    }
}

/// FFI-safe patient with derived fields. Dates are ISO 8601 strings.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiPatient {
    pub patient_id: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub sex_at_birth: String,
    pub sex_at_birth_label: String,
    pub gender_identity: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub notes: Option<String>,
    pub consent_data_processing: bool,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub bmi_last: Option<f64>,
    pub bmi_category_last: Option<String>,
    pub bmi_category_label: Option<String>,
    pub bmi_last_measured_at: Option<String>,
    pub bmi_inputs_updated_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub display_name: String,
    pub age_years: Option<u32>,
    pub is_adult: Option<bool>,
    pub contactable: bool,
}

impl FfiPatient {
    fn from_view(view: PatientView, locale: Locale) -> Self {
        let PatientView { record, computed } = view;
        Self {
            date_of_birth: record.date_of_birth.format("%Y-%m-%d").to_string(),
            sex_at_birth: record.sex_at_birth.as_str().to_string(),
            sex_at_birth_label: locale.sex_label(record.sex_at_birth).to_string(),
            bmi_last: record.bmi_last(),
            bmi_category_last: record.bmi_category_last().map(|c| c.as_str().to_string()),
            bmi_category_label: record
                .bmi_category_last()
                .map(|c| locale.bmi_category_label(c).to_string()),
            bmi_last_measured_at: record.bmi_last_measured_at().map(|t| t.to_rfc3339()),
            bmi_inputs_updated_at: record.bmi_inputs_updated_at().map(|t| t.to_rfc3339()),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
            patient_id: record.patient_id,
            first_name: record.first_name,
            last_name: record.last_name,
            gender_identity: record.gender_identity,
            email: record.email,
            phone: record.phone,
            notes: record.notes,
            consent_data_processing: record.consent_data_processing,
            height_cm: record.height_cm,
            weight_kg: record.weight_kg,
            display_name: computed.display_name,
            age_years: computed.age_years,
            is_adult: computed.is_adult,
            contactable: computed.contactable,
        }
    }
}

/// Rendered messages for one field.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiFieldErrors {
    pub field: String,
    pub messages: Vec<String>,
}

/// FFI-safe submission outcome.
#[derive(Debug, Clone, uniffi::Enum)]
pub enum FfiSubmission {
    Saved {
        patient: FfiPatient,
    },
    Rejected {
        errors: Vec<FfiFieldErrors>,
        /// Every message flattened, for a summary banner
        errors_list: Vec<String>,
        form: FfiPatientForm,
        consent_data_processing: bool,
    },
}

impl FfiSubmission {
    fn new(outcome: Submission, locale: Locale) -> Self {
        match outcome {
            Submission::Saved(view) => FfiSubmission::Saved {
                patient: FfiPatient::from_view(view, locale),
            },
            Submission::Rejected(rejection) => FfiSubmission::Rejected {
                errors: rejection
                    .errors
                    .messages(locale)
                    .into_iter()
                    .map(|(field, messages)| FfiFieldErrors {
                        field: field.to_string(),
                        messages,
                    })
                    .collect(),
                errors_list: rejection.errors.messages_flat(locale),
                form: rejection.form.into(),
                consent_data_processing: rejection.consent_data_processing,
            },
        }
    }
}

/// FFI-safe liveness status.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiHealthStatus {
    pub status: String,
}

impl From<HealthStatus> for FfiHealthStatus {
    fn from(health: HealthStatus) -> Self {
        Self {
            status: health.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laura() -> FfiPatientForm {
        FfiPatientForm {
            first_name: Some("laura".into()),
            last_name: Some("gómez".into()),
            date_of_birth: Some("1992-04-15".into()),
            sex_at_birth: Some("Femenino".into()),
            height_cm: Some("165".into()),
            weight_kg: Some("60".into()),
            consent_data_processing: Some("on".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_ffi_create_and_list() {
        let core = open_registry_in_memory().unwrap();

        let patient = match core.create_patient(laura()).unwrap() {
            FfiSubmission::Saved { patient } => patient,
            FfiSubmission::Rejected { errors_list, .. } => panic!("rejected: {:?}", errors_list),
        };
        assert_eq!(patient.display_name, "Gómez, Laura");
        assert_eq!(patient.bmi_last, Some(22.04));
        assert_eq!(patient.bmi_category_last.as_deref(), Some("normal"));
        assert_eq!(patient.sex_at_birth, "female");

        let listed = core.list_patients().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].patient_id, patient.patient_id);
    }

    #[test]
    fn test_ffi_rejection_lists_messages() {
        let core = open_registry_in_memory().unwrap();
        let mut form = laura();
        form.consent_data_processing = None;

        match core.create_patient(form).unwrap() {
            FfiSubmission::Rejected {
                errors,
                errors_list,
                consent_data_processing,
                ..
            } => {
                assert!(!consent_data_processing);
                assert_eq!(errors[0].field, "consent_data_processing");
                assert_eq!(errors_list.len(), 1);
            }
            FfiSubmission::Saved { .. } => panic!("saved without consent"),
        }
        assert!(core.list_patients().unwrap().is_empty());
    }

    #[test]
    fn test_ffi_update_unknown_is_not_found() {
        let core = open_registry_in_memory().unwrap();
        let result = core.update_patient("missing".into(), laura());
        assert!(matches!(result, Err(PatientRegistryError::NotFound(_))));
    }

    #[test]
    fn test_ffi_seed_health_export() {
        let core = open_registry_in_memory().unwrap();
        assert_eq!(core.seed_demo_patients().unwrap(), 2);
        assert_eq!(core.health().unwrap().status, "ok");

        let csv = core.export_roster_csv().unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(core.export_roster_json().unwrap().contains("López, Carlos"));

        assert!(core
            .delete_patient("f0b5a2e1-1a9d-4c6b-9e11-aaa111aaa111".into())
            .unwrap());
        assert!(!core
            .delete_patient("f0b5a2e1-1a9d-4c6b-9e11-aaa111aaa111".into())
            .unwrap());
    }

    #[test]
    fn test_open_with_config_spanish_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let config = RegistryConfig {
            database_path: Some(dir.path().join("registry.db")),
            locale: Locale::Es,
            ..Default::default()
        };

        let core = open_with_config(&config).unwrap();
        let listed = core.list_patients().unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].sex_at_birth_label, "Masculino");
        assert_eq!(listed[1].bmi_category_label.as_deref(), Some("sobrepeso"));

        let edit = core.edit_form(listed[0].patient_id.clone()).unwrap();
        assert_eq!(edit.sex_at_birth.as_deref(), Some("Femenino"));
    }
}
