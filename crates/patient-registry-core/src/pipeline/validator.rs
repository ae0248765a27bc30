//! Field rules for patient forms.
//!
//! Every rule runs on every submission so the caller can show all problems at
//! once. Errors are grouped per field, fields ordered as the rules run.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::normalizer::{NormalizeError, NormalizedForm};
use crate::models::{Locale, PatientFields};

pub const NAME_MAX_CHARS: usize = 60;
pub const PHONE_MIN_CHARS: usize = 7;
pub const PHONE_MAX_CHARS: usize = 20;
pub const GENDER_IDENTITY_MAX_CHARS: usize = 30;
pub const NOTES_MAX_CHARS: usize = 500;
pub const HEIGHT_CM_RANGE: (f64, f64) = (100.0, 250.0);
pub const WEIGHT_KG_RANGE: (f64, f64) = (20.0, 300.0);

/// Form fields that can carry errors, in reporting order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    FirstName,
    LastName,
    ConsentDataProcessing,
    DateOfBirth,
    SexAtBirth,
    Email,
    Phone,
    HeightCm,
    WeightKg,
    GenderIdentity,
    Notes,
}

impl Field {
    /// Form key for this field.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::FirstName => "first_name",
            Field::LastName => "last_name",
            Field::ConsentDataProcessing => "consent_data_processing",
            Field::DateOfBirth => "date_of_birth",
            Field::SexAtBirth => "sex_at_birth",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::HeightCm => "height_cm",
            Field::WeightKg => "weight_kg",
            Field::GenderIdentity => "gender_identity",
            Field::Notes => "notes",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single rule violation.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FieldError {
    #[error("This field is required.")]
    Required,

    #[error("Must be at most {max} characters.")]
    TooLong { max: usize },

    #[error("You must accept consent for data processing.")]
    ConsentRequired,

    #[error("Enter a valid date (YYYY-MM-DD).")]
    InvalidDate,

    #[error("Date must be in the past.")]
    DateNotInPast,

    #[error("Invalid value. Choose Male, Female or Other.")]
    InvalidChoice,

    #[error("Enter a valid email address.")]
    InvalidEmail,

    #[error("Must be at least {min} characters.")]
    TooShort { min: usize },

    #[error("Only digits, spaces, +, -, ( and ) are allowed.")]
    InvalidPhoneCharacters,

    #[error("Enter a number.")]
    NotANumber,

    #[error("Must be between {min} and {max}.")]
    OutOfRange { min: f64, max: f64 },
}

impl FieldError {
    /// Human-readable message in the given locale.
    pub fn message(&self, locale: Locale) -> String {
        match locale {
            Locale::En => self.to_string(),
            Locale::Es => match self {
                FieldError::Required => "Este campo es obligatorio.".to_string(),
                FieldError::TooLong { .. } => "El texto es demasiado largo.".to_string(),
                FieldError::ConsentRequired => {
                    "Debes aceptar el consentimiento para el tratamiento de datos.".to_string()
                }
                FieldError::InvalidDate => "Debe ingresar una fecha válida.".to_string(),
                FieldError::DateNotInPast => "La fecha debe ser anterior a hoy.".to_string(),
                FieldError::InvalidChoice => {
                    "Valor inválido. Debe seleccionar Masculino, Femenino u Otro.".to_string()
                }
                FieldError::InvalidEmail => {
                    "Debe ingresar un correo electrónico válido.".to_string()
                }
                FieldError::TooShort { min } => {
                    format!("Debe tener al menos {} caracteres.", min)
                }
                FieldError::InvalidPhoneCharacters => {
                    "Solo se permiten dígitos, espacios, +, -, ( y ).".to_string()
                }
                FieldError::NotANumber => "Debe ingresar un número.".to_string(),
                FieldError::OutOfRange { min, max } => {
                    format!("Debe estar entre {} y {}.", min, max)
                }
            },
        }
    }
}

/// All violations of one submission, grouped by field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ValidationErrors {
    errors: BTreeMap<Field, Vec<FieldError>>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a violation on a field.
    pub fn add(&mut self, field: Field, error: FieldError) {
        self.errors.entry(field).or_default().push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of fields with at least one error.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn contains(&self, field: Field) -> bool {
        self.errors.contains_key(&field)
    }

    /// Errors for one field, empty when the field passed.
    pub fn get(&self, field: Field) -> &[FieldError] {
        self.errors.get(&field).map(Vec::as_slice).unwrap_or_default()
    }

    /// Fields with errors, in reporting order.
    pub fn fields(&self) -> impl Iterator<Item = Field> + '_ {
        self.errors.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &[FieldError])> + '_ {
        self.errors.iter().map(|(field, errs)| (*field, errs.as_slice()))
    }

    /// Field key → rendered messages, in reporting order.
    pub fn messages(&self, locale: Locale) -> Vec<(&'static str, Vec<String>)> {
        self.iter()
            .map(|(field, errs)| {
                (
                    field.as_str(),
                    errs.iter().map(|e| e.message(locale)).collect(),
                )
            })
            .collect()
    }

    /// Every rendered message, flattened in reporting order.
    pub fn messages_flat(&self, locale: Locale) -> Vec<String> {
        self.errors
            .values()
            .flatten()
            .map(|e| e.message(locale))
            .collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .iter()
            .map(|(field, errs)| {
                let msgs: Vec<String> = errs.iter().map(ToString::to_string).collect();
                format!("{}: {}", field, msgs.join(" "))
            })
            .collect();
        f.write_str(&parts.join("; "))
    }
}

/// Validate a normalized form against the field rules.
///
/// `today` is the reference date for the date-of-birth rule.
pub fn validate(form: &NormalizedForm, today: NaiveDate) -> Result<PatientFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    check_name(&mut errors, Field::FirstName, &form.first_name);
    check_name(&mut errors, Field::LastName, &form.last_name);

    if !form.consent_data_processing {
        errors.add(Field::ConsentDataProcessing, FieldError::ConsentRequired);
    }

    let date_of_birth = match &form.date_of_birth {
        None => {
            errors.add(Field::DateOfBirth, FieldError::Required);
            None
        }
        Some(Err(_)) => {
            errors.add(Field::DateOfBirth, FieldError::InvalidDate);
            None
        }
        Some(Ok(dob)) if *dob >= today => {
            errors.add(Field::DateOfBirth, FieldError::DateNotInPast);
            None
        }
        Some(Ok(dob)) => Some(*dob),
    };

    let sex_at_birth = match &form.sex_at_birth {
        None => {
            errors.add(Field::SexAtBirth, FieldError::Required);
            None
        }
        Some(Err(_)) => {
            errors.add(Field::SexAtBirth, FieldError::InvalidChoice);
            None
        }
        Some(Ok(sex)) => Some(*sex),
    };

    if let Some(email) = &form.email {
        if !email.contains('@') {
            errors.add(Field::Email, FieldError::InvalidEmail);
        }
    }

    if let Some(phone) = &form.phone {
        check_phone(&mut errors, phone);
    }

    let height_cm = check_measure(&mut errors, Field::HeightCm, &form.height_cm, HEIGHT_CM_RANGE);
    let weight_kg = check_measure(&mut errors, Field::WeightKg, &form.weight_kg, WEIGHT_KG_RANGE);

    check_max_len(&mut errors, Field::GenderIdentity, form.gender_identity.as_deref(), GENDER_IDENTITY_MAX_CHARS);
    check_max_len(&mut errors, Field::Notes, form.notes.as_deref(), NOTES_MAX_CHARS);

    match (date_of_birth, sex_at_birth) {
        (Some(date_of_birth), Some(sex_at_birth)) if errors.is_empty() => Ok(PatientFields {
            first_name: form.first_name.clone(),
            last_name: form.last_name.clone(),
            date_of_birth,
            sex_at_birth,
            gender_identity: form.gender_identity.clone(),
            email: form.email.clone(),
            phone: form.phone.clone(),
            notes: form.notes.clone(),
            consent_data_processing: form.consent_data_processing,
            height_cm,
            weight_kg,
        }),
        _ => Err(errors),
    }
}

fn check_name(errors: &mut ValidationErrors, field: Field, value: &str) {
    let len = value.chars().count();
    if len == 0 {
        errors.add(field, FieldError::Required);
    } else if len > NAME_MAX_CHARS {
        errors.add(field, FieldError::TooLong { max: NAME_MAX_CHARS });
    }
}

fn check_phone(errors: &mut ValidationErrors, phone: &str) {
    let len = phone.chars().count();
    if len < PHONE_MIN_CHARS {
        errors.add(Field::Phone, FieldError::TooShort { min: PHONE_MIN_CHARS });
    } else if len > PHONE_MAX_CHARS {
        errors.add(Field::Phone, FieldError::TooLong { max: PHONE_MAX_CHARS });
    }

    let allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')');
    if !phone.chars().all(allowed) {
        errors.add(Field::Phone, FieldError::InvalidPhoneCharacters);
    }
}

fn check_measure(
    errors: &mut ValidationErrors,
    field: Field,
    value: &Result<Option<f64>, NormalizeError>,
    (min, max): (f64, f64),
) -> Option<f64> {
    match value {
        Err(_) => {
            errors.add(field, FieldError::NotANumber);
            None
        }
        Ok(Some(v)) if *v < min || *v > max => {
            errors.add(field, FieldError::OutOfRange { min, max });
            None
        }
        Ok(v) => *v,
    }
}

fn check_max_len(errors: &mut ValidationErrors, field: Field, value: Option<&str>, max: usize) {
    if value.is_some_and(|v| v.chars().count() > max) {
        errors.add(field, FieldError::TooLong { max });
    }
}
