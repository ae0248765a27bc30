//! SQLite schema definition.

/// Complete database schema for the patient registry.
pub const SCHEMA: &str = r#"
-- ============================================================================
-- Patients
-- ============================================================================

CREATE TABLE IF NOT EXISTS patients (
    patient_id TEXT PRIMARY KEY,
    first_name TEXT NOT NULL CHECK (length(first_name) BETWEEN 1 AND 60),
    last_name TEXT NOT NULL CHECK (length(last_name) BETWEEN 1 AND 60),
    date_of_birth TEXT NOT NULL,                 -- YYYY-MM-DD
    sex_at_birth TEXT NOT NULL CHECK (sex_at_birth IN ('male', 'female', 'other')),
    gender_identity TEXT,
    email TEXT,
    phone TEXT,
    notes TEXT,
    consent_data_processing INTEGER NOT NULL CHECK (consent_data_processing = 1),
    height_cm REAL CHECK (height_cm IS NULL OR height_cm BETWEEN 100 AND 250),
    weight_kg REAL CHECK (weight_kg IS NULL OR weight_kg BETWEEN 20 AND 300),
    bmi_last REAL,
    bmi_category_last TEXT CHECK (
        bmi_category_last IS NULL
        OR bmi_category_last IN ('underweight', 'normal', 'overweight', 'obese')
    ),
    bmi_last_measured_at TEXT,
    bmi_inputs_updated_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,

    -- BMI exists exactly when both inputs exist
    CHECK ((bmi_last IS NULL) = (height_cm IS NULL OR weight_kg IS NULL)),
    -- BMI columns are set and cleared together
    CHECK (
        (bmi_last IS NULL) = (bmi_category_last IS NULL)
        AND (bmi_last IS NULL) = (bmi_last_measured_at IS NULL)
        AND (bmi_last IS NULL) = (bmi_inputs_updated_at IS NULL)
    )
);

-- Listing order; rowid breaks ties in insertion order
CREATE INDEX IF NOT EXISTS idx_patients_name ON patients(last_name, first_name);
"#;
