//! Derived-field computation.
//!
//! Everything here is a pure function of its arguments. The write timestamp
//! and the current date are passed in, never read from a clock.

use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::models::{BmiCategory, BmiReading, ComputedFields, PatientFields, PatientRecord};

/// Age of majority used for `is_adult`.
pub const ADULT_AGE_YEARS: u32 = 18;

/// Whole years between `dob` and `today`, floored at zero.
pub fn age_years(dob: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Body-mass index rounded to two decimals (half away from zero).
pub fn bmi(weight_kg: f64, height_cm: f64) -> f64 {
    let height_m = height_cm / 100.0;
    round2(weight_kg / (height_m * height_m))
}

/// BMI band for a value.
pub fn bmi_category(bmi: f64) -> BmiCategory {
    BmiCategory::from_bmi(bmi)
}

/// "{last}, {first}".
pub fn display_name(last_name: &str, first_name: &str) -> String {
    format!("{}, {}", last_name, first_name)
}

/// True when either contact channel has a non-blank value.
pub fn contactable(email: Option<&str>, phone: Option<&str>) -> bool {
    [email, phone]
        .into_iter()
        .flatten()
        .any(|value| !value.trim().is_empty())
}

/// BMI reading for a height/weight pair; `None` unless both are present.
pub fn bmi_reading(
    height_cm: Option<f64>,
    weight_kg: Option<f64>,
    now: DateTime<Utc>,
) -> Option<BmiReading> {
    let (height_cm, weight_kg) = (height_cm?, weight_kg?);
    let value = bmi(weight_kg, height_cm);
    Some(BmiReading {
        value,
        category: bmi_category(value),
        measured_at: now,
        inputs_updated_at: now,
    })
}

/// The derived view of a record as of `today`.
pub fn computed_fields(record: &PatientRecord, today: NaiveDate) -> ComputedFields {
    let age = Some(age_years(record.date_of_birth, today));
    ComputedFields {
        display_name: display_name(&record.last_name, &record.first_name),
        age_years: age,
        is_adult: age.map(|years| years >= ADULT_AGE_YEARS),
        contactable: contactable(record.email.as_deref(), record.phone.as_deref()),
    }
}

/// Build a record from validated fields.
///
/// BMI is recomputed from scratch: any previous reading is discarded.
pub fn derive_record(
    fields: PatientFields,
    patient_id: String,
    created_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> PatientRecord {
    let bmi = bmi_reading(fields.height_cm, fields.weight_kg, now);
    PatientRecord {
        patient_id,
        first_name: fields.first_name,
        last_name: fields.last_name,
        date_of_birth: fields.date_of_birth,
        sex_at_birth: fields.sex_at_birth,
        gender_identity: fields.gender_identity,
        email: fields.email,
        phone: fields.phone,
        notes: fields.notes,
        consent_data_processing: fields.consent_data_processing,
        height_cm: fields.height_cm,
        weight_kg: fields.weight_kg,
        bmi,
        created_at,
        updated_at: now,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
