//! In-memory patient store.

use super::{DbError, DbResult, PatientStore};
use crate::models::PatientRecord;

/// Records kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    patients: Vec<PatientRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, patient_id: &str) -> Option<usize> {
        self.patients
            .iter()
            .position(|p| p.patient_id == patient_id)
    }
}

impl PatientStore for MemoryStore {
    fn insert_patient(&mut self, record: &PatientRecord) -> DbResult<()> {
        if self.position(&record.patient_id).is_some() {
            return Err(DbError::Constraint(format!(
                "duplicate patient_id: {}",
                record.patient_id
            )));
        }
        self.patients.push(record.clone());
        Ok(())
    }

    fn get_patient(&self, patient_id: &str) -> DbResult<Option<PatientRecord>> {
        Ok(self.position(patient_id).map(|i| self.patients[i].clone()))
    }

    fn update_patient(&mut self, record: &PatientRecord) -> DbResult<bool> {
        match self.position(&record.patient_id) {
            Some(i) => {
                // Keep the original creation stamp
                let created_at = self.patients[i].created_at;
                self.patients[i] = PatientRecord {
                    created_at,
                    ..record.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_patient(&mut self, patient_id: &str) -> DbResult<bool> {
        match self.position(patient_id) {
            Some(i) => {
                self.patients.remove(i);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn list_patients(&self) -> DbResult<Vec<PatientRecord>> {
        let mut sorted = self.patients.clone();
        // Stable sort keeps insertion order for equal names
        sorted.sort_by(|a, b| {
            (&a.last_name, &a.first_name).cmp(&(&b.last_name, &b.first_name))
        });
        Ok(sorted)
    }

    fn count_patients(&self) -> DbResult<usize> {
        Ok(self.patients.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SexAtBirth;
    use chrono::{NaiveDate, Utc};

    fn patient(id: &str, first: &str, last: &str) -> PatientRecord {
        let now = Utc::now();
        PatientRecord {
            patient_id: id.into(),
            first_name: first.into(),
            last_name: last.into(),
            date_of_birth: NaiveDate::from_ymd_opt(1988, 9, 10).unwrap(),
            sex_at_birth: SexAtBirth::Male,
            gender_identity: None,
            email: None,
            phone: Some("+34 611 223 344".into()),
            notes: None,
            consent_data_processing: true,
            height_cm: None,
            weight_kg: None,
            bmi: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_insert_get_update() {
        let mut store = MemoryStore::new();
        let mut record = patient("p-1", "Carlos", "López");
        store.insert_patient(&record).unwrap();

        let original_created = record.created_at;
        record.first_name = "Carla".into();
        record.created_at = Utc::now() + chrono::Duration::days(1);
        assert!(store.update_patient(&record).unwrap());

        let stored = store.get_patient("p-1").unwrap().unwrap();
        assert_eq!(stored.first_name, "Carla");
        assert_eq!(stored.created_at, original_created);
    }

    #[test]
    fn test_duplicate_insert_rejected() {
        let mut store = MemoryStore::new();
        let record = patient("p-1", "Carlos", "López");
        store.insert_patient(&record).unwrap();
        assert!(matches!(
            store.insert_patient(&record),
            Err(DbError::Constraint(_))
        ));
    }

    #[test]
    fn test_list_sorted_with_insertion_tiebreak() {
        let mut store = MemoryStore::new();
        store.insert_patient(&patient("p-1", "Carlos", "López")).unwrap();
        store.insert_patient(&patient("p-2", "Laura", "Gómez")).unwrap();
        store.insert_patient(&patient("p-3", "Laura", "Gómez")).unwrap();

        let ids: Vec<String> = store
            .list_patients()
            .unwrap()
            .into_iter()
            .map(|p| p.patient_id)
            .collect();
        assert_eq!(ids, vec!["p-2", "p-3", "p-1"]);
    }

    #[test]
    fn test_update_keeps_list_position() {
        let mut store = MemoryStore::new();
        store.insert_patient(&patient("p-1", "Ana", "Ruiz")).unwrap();
        store.insert_patient(&patient("p-2", "Ana", "Ruiz")).unwrap();

        let mut first = store.get_patient("p-1").unwrap().unwrap();
        first.notes = Some("updated".into());
        store.update_patient(&first).unwrap();

        let ids: Vec<String> = store
            .list_patients()
            .unwrap()
            .into_iter()
            .map(|p| p.patient_id)
            .collect();
        assert_eq!(ids, vec!["p-1", "p-2"]);
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = MemoryStore::new();
        store.insert_patient(&patient("p-1", "Carlos", "López")).unwrap();

        assert!(store.delete_patient("p-1").unwrap());
        assert!(!store.delete_patient("p-1").unwrap());
        assert!(!store.delete_patient("nope").unwrap());
        assert_eq!(store.count_patients().unwrap(), 0);
    }
}
