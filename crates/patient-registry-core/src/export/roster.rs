//! Patient roster export.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Locale, PatientView};

const CSV_HEADER: [&str; 12] = [
    "patient_id",
    "display_name",
    "date_of_birth",
    "age_years",
    "sex_at_birth",
    "email",
    "phone",
    "height_cm",
    "weight_kg",
    "bmi_last",
    "bmi_category_last",
    "updated_at",
];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// One patient row, flattened with display labels.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterRow {
    pub patient_id: String,
    pub display_name: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub age_years: Option<u32>,
    pub is_adult: Option<bool>,
    /// Localized label
    pub sex_at_birth: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub contactable: bool,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub bmi_last: Option<f64>,
    /// Localized label
    pub bmi_category_last: Option<String>,
    pub bmi_last_measured_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl RosterRow {
    pub fn from_view(view: &PatientView, locale: Locale) -> Self {
        let record = &view.record;
        Self {
            patient_id: record.patient_id.clone(),
            display_name: view.computed.display_name.clone(),
            first_name: record.first_name.clone(),
            last_name: record.last_name.clone(),
            date_of_birth: record.date_of_birth.format("%Y-%m-%d").to_string(),
            age_years: view.computed.age_years,
            is_adult: view.computed.is_adult,
            sex_at_birth: locale.sex_label(record.sex_at_birth).to_string(),
            email: record.email.clone(),
            phone: record.phone.clone(),
            contactable: view.computed.contactable,
            height_cm: record.height_cm,
            weight_kg: record.weight_kg,
            bmi_last: record.bmi_last(),
            bmi_category_last: record
                .bmi_category_last()
                .map(|c| locale.bmi_category_label(c).to_string()),
            bmi_last_measured_at: record.bmi_last_measured_at().map(|t| t.to_rfc3339()),
            created_at: record.created_at.to_rfc3339(),
            updated_at: record.updated_at.to_rfc3339(),
        }
    }
}

/// The sorted patient listing at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterExport {
    /// Export timestamp
    pub exported_at: String,
    pub locale: Locale,
    pub patients: Vec<RosterRow>,
}

impl RosterExport {
    /// Build from views already in listing order.
    pub fn from_views(views: &[PatientView], locale: Locale, exported_at: DateTime<Utc>) -> Self {
        Self {
            exported_at: exported_at.to_rfc3339(),
            locale,
            patients: views.iter().map(|v| RosterRow::from_view(v, locale)).collect(),
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CSV_HEADER)?;

        for row in &self.patients {
            writer.write_record([
                row.patient_id.clone(),
                row.display_name.clone(),
                row.date_of_birth.clone(),
                opt(row.age_years),
                row.sex_at_birth.clone(),
                row.email.clone().unwrap_or_default(),
                row.phone.clone().unwrap_or_default(),
                opt(row.height_cm),
                opt(row.weight_kg),
                opt(row.bmi_last),
                row.bmi_category_last.clone().unwrap_or_default(),
                row.updated_at.clone(),
            ])?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| ExportError::Encoding(e.to_string()))?;
        String::from_utf8(bytes).map_err(|e| ExportError::Encoding(e.to_string()))
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
