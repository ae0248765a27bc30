//! Storage layer for patient records.
//!
//! [`PatientStore`] is the seam the pipeline writes through. Two stores
//! implement it: [`Database`] (SQLite) and [`MemoryStore`].

mod memory;
mod patients;
mod schema;

pub use memory::*;
pub use schema::*;

use rusqlite::Connection;
use std::path::Path;
use thiserror::Error;

use crate::models::PatientRecord;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Keyed collection of patient records.
///
/// Each call is atomic on its own; there are no multi-call transactions.
pub trait PatientStore {
    /// Insert a new record. Fails if the id is already present.
    fn insert_patient(&mut self, record: &PatientRecord) -> DbResult<()>;

    /// Get a record by id.
    fn get_patient(&self, patient_id: &str) -> DbResult<Option<PatientRecord>>;

    /// Replace a stored record. Returns false if the id is unknown.
    fn update_patient(&mut self, record: &PatientRecord) -> DbResult<bool>;

    /// Remove a record. Returns false if nothing was removed.
    fn delete_patient(&mut self, patient_id: &str) -> DbResult<bool>;

    /// All records sorted by (last_name, first_name), insertion order on ties.
    fn list_patients(&self) -> DbResult<Vec<PatientRecord>>;

    /// Number of stored records.
    fn count_patients(&self) -> DbResult<usize> {
        Ok(self.list_patients()?.len())
    }
}

impl<S: PatientStore + ?Sized> PatientStore for Box<S> {
    fn insert_patient(&mut self, record: &PatientRecord) -> DbResult<()> {
        (**self).insert_patient(record)
    }

    fn get_patient(&self, patient_id: &str) -> DbResult<Option<PatientRecord>> {
        (**self).get_patient(patient_id)
    }

    fn update_patient(&mut self, record: &PatientRecord) -> DbResult<bool> {
        (**self).update_patient(record)
    }

    fn delete_patient(&mut self, patient_id: &str) -> DbResult<bool> {
        (**self).delete_patient(patient_id)
    }

    fn list_patients(&self) -> DbResult<Vec<PatientRecord>> {
        (**self).list_patients()
    }

    fn count_patients(&self) -> DbResult<usize> {
        (**self).count_patients()
    }
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(tables, vec!["patients".to_string()]);
    }

    #[test]
    fn test_open_on_disk_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.db");

        Database::open(&path).unwrap();
        // Schema creation is idempotent
        assert!(Database::open(&path).is_ok());
    }
}
