//! Patient database operations.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbResult, PatientStore};
use crate::models::{BmiReading, PatientRecord, UnknownVariant};

const PATIENT_COLUMNS: &str = r#"
    patient_id, first_name, last_name, date_of_birth, sex_at_birth,
    gender_identity, email, phone, notes, consent_data_processing,
    height_cm, weight_kg, bmi_last, bmi_category_last,
    bmi_last_measured_at, bmi_inputs_updated_at, created_at, updated_at
"#;

impl PatientStore for Database {
    fn insert_patient(&mut self, record: &PatientRecord) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO patients ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
                PATIENT_COLUMNS
            ),
            params![
                record.patient_id,
                record.first_name,
                record.last_name,
                record.date_of_birth,
                record.sex_at_birth.as_str(),
                record.gender_identity,
                record.email,
                record.phone,
                record.notes,
                record.consent_data_processing,
                record.height_cm,
                record.weight_kg,
                record.bmi_last(),
                record.bmi_category_last().map(|c| c.as_str()),
                record.bmi_last_measured_at(),
                record.bmi_inputs_updated_at(),
                record.created_at,
                record.updated_at,
            ],
        )?;
        Ok(())
    }

    fn get_patient(&self, patient_id: &str) -> DbResult<Option<PatientRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM patients WHERE patient_id = ?", PATIENT_COLUMNS),
                [patient_id],
                row_to_patient,
            )
            .optional()
            .map_err(Into::into)
    }

    /// `patient_id` and `created_at` are never rewritten.
    fn update_patient(&mut self, record: &PatientRecord) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE patients SET
                first_name = ?2,
                last_name = ?3,
                date_of_birth = ?4,
                sex_at_birth = ?5,
                gender_identity = ?6,
                email = ?7,
                phone = ?8,
                notes = ?9,
                consent_data_processing = ?10,
                height_cm = ?11,
                weight_kg = ?12,
                bmi_last = ?13,
                bmi_category_last = ?14,
                bmi_last_measured_at = ?15,
                bmi_inputs_updated_at = ?16,
                updated_at = ?17
            WHERE patient_id = ?1
            "#,
            params![
                record.patient_id,
                record.first_name,
                record.last_name,
                record.date_of_birth,
                record.sex_at_birth.as_str(),
                record.gender_identity,
                record.email,
                record.phone,
                record.notes,
                record.consent_data_processing,
                record.height_cm,
                record.weight_kg,
                record.bmi_last(),
                record.bmi_category_last().map(|c| c.as_str()),
                record.bmi_last_measured_at(),
                record.bmi_inputs_updated_at(),
                record.updated_at,
            ],
        )?;
        Ok(rows_affected > 0)
    }

    fn delete_patient(&mut self, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM patients WHERE patient_id = ?", [patient_id])?;
        Ok(rows_affected > 0)
    }

    fn list_patients(&self) -> DbResult<Vec<PatientRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM patients ORDER BY last_name, first_name, rowid",
            PATIENT_COLUMNS
        ))?;

        let rows = stmt.query_map([], row_to_patient)?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn count_patients(&self) -> DbResult<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM patients", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }
}

fn row_to_patient(row: &Row<'_>) -> rusqlite::Result<PatientRecord> {
    let bmi_value: Option<f64> = row.get(12)?;
    let bmi_category: Option<String> = row.get(13)?;
    let measured_at: Option<DateTime<Utc>> = row.get(14)?;
    let inputs_updated_at: Option<DateTime<Utc>> = row.get(15)?;

    let bmi = match (bmi_value, bmi_category, measured_at, inputs_updated_at) {
        (Some(value), Some(category), Some(measured_at), Some(inputs_updated_at)) => {
            Some(BmiReading {
                value,
                category: parse_column(13, &category)?,
                measured_at,
                inputs_updated_at,
            })
        }
        _ => None,
    };

    let sex_at_birth: String = row.get(4)?;

    Ok(PatientRecord {
        patient_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        date_of_birth: row.get(3)?,
        sex_at_birth: parse_column(4, &sex_at_birth)?,
        gender_identity: row.get(5)?,
        email: row.get(6)?,
        phone: row.get(7)?,
        notes: row.get(8)?,
        consent_data_processing: row.get(9)?,
        height_cm: row.get(10)?,
        weight_kg: row.get(11)?,
        bmi,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
    })
}

fn parse_column<T>(idx: usize, value: &str) -> rusqlite::Result<T>
where
    T: FromStr<Err = UnknownVariant>,
{
    value
        .parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
