//! Registry pipeline integration tests.

use chrono::{DateTime, NaiveDate, Utc};
use proptest::prelude::*;

use patient_registry_core::clock::FixedClock;
use patient_registry_core::db::{Database, MemoryStore, PatientStore};
use patient_registry_core::models::{BmiCategory, PatientForm, PatientView};
use patient_registry_core::pipeline::{
    bmi_category, derive_record, normalize_name, validate, Field, Normalizer, Registry,
};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 26).unwrap()
}

fn registry() -> Registry<MemoryStore, FixedClock> {
    Registry::with_clock(MemoryStore::new(), FixedClock::at_date(today()))
}

fn make_form(first: &str, last: &str) -> PatientForm {
    PatientForm {
        first_name: Some(first.to_string()),
        last_name: Some(last.to_string()),
        date_of_birth: Some("1992-04-15".to_string()),
        sex_at_birth: Some("Femenino".to_string()),
        email: Some("laura.gomez@example.com".to_string()),
        consent_data_processing: Some("on".to_string()),
        ..Default::default()
    }
}

fn with_measures(mut form: PatientForm, height: Option<&str>, weight: Option<&str>) -> PatientForm {
    form.height_cm = height.map(str::to_string);
    form.weight_kg = weight.map(str::to_string);
    form
}

fn saved<S: PatientStore>(registry: &mut Registry<S, FixedClock>, form: PatientForm) -> PatientView {
    registry
        .create(form)
        .unwrap()
        .saved()
        .cloned()
        .expect("form should be accepted")
}

#[test]
fn test_rederivation_is_idempotent() {
    let normalizer = Normalizer::new();
    let form = with_measures(make_form("Laura", "Gómez"), Some("165"), Some("60"));
    let fields = validate(&normalizer.normalize(&form, false), today()).unwrap();
    let at = "2025-10-26T10:00:00Z".parse::<DateTime<Utc>>().unwrap();

    let first = derive_record(fields.clone(), "p-1".to_string(), at, at);
    let second = derive_record(fields, "p-1".to_string(), at, at);
    assert_eq!(first, second);
}

#[test]
fn test_bmi_create_then_edit() {
    let mut registry = registry();

    let created = saved(
        &mut registry,
        with_measures(make_form("Laura", "Gómez"), Some("165"), Some("60")),
    );
    assert_eq!(created.record.bmi_last(), Some(22.04));
    assert_eq!(created.record.bmi_category_last(), Some(BmiCategory::Normal));

    let edited = registry
        .update(
            created.patient_id(),
            with_measures(make_form("Laura", "Gómez"), Some("178"), Some("92")),
        )
        .unwrap()
        .saved()
        .cloned()
        .unwrap();
    assert_eq!(edited.record.bmi_last(), Some(29.04));
    assert_eq!(edited.record.bmi_category_last(), Some(BmiCategory::Overweight));
    assert_eq!(edited.record.created_at, created.record.created_at);
    assert_eq!(edited.patient_id(), created.patient_id());
}

#[test]
fn test_bmi_category_boundaries() {
    assert_eq!(bmi_category(18.49999), BmiCategory::Underweight);
    assert_eq!(bmi_category(18.5), BmiCategory::Normal);
    assert_eq!(bmi_category(24.99), BmiCategory::Normal);
    assert_eq!(bmi_category(25.0), BmiCategory::Overweight);
    assert_eq!(bmi_category(29.99), BmiCategory::Overweight);
    assert_eq!(bmi_category(30.0), BmiCategory::Obese);
}

#[test]
fn test_consent_gate_blocks_write() {
    let mut registry = registry();

    for toggle in [None, Some("off"), Some(""), Some("no")] {
        let mut form = make_form("Laura", "Gómez");
        form.consent_data_processing = toggle.map(str::to_string);

        let outcome = registry.create(form).unwrap();
        let rejection = outcome.rejected().expect("should be rejected");
        assert!(rejection.errors.contains(Field::ConsentDataProcessing));
        assert!(!rejection.consent_data_processing);
    }

    assert_eq!(registry.store().count_patients().unwrap(), 0);
}

#[test]
fn test_half_measured_pair_has_no_bmi() {
    let mut registry = registry();

    let height_only = saved(
        &mut registry,
        with_measures(make_form("Ana", "Ruiz"), Some("165"), None),
    );
    assert_eq!(height_only.record.height_cm, Some(165.0));
    assert!(height_only.record.bmi.is_none());
    assert!(height_only.record.bmi_last_measured_at().is_none());
    assert!(height_only.record.bmi_inputs_updated_at().is_none());

    let weight_only = saved(
        &mut registry,
        with_measures(make_form("Eva", "Ruiz"), None, Some("60")),
    );
    assert_eq!(weight_only.record.weight_kg, Some(60.0));
    assert!(weight_only.record.bmi.is_none());
}

#[test]
fn test_list_sorted_by_last_then_first() {
    let mut registry = registry();

    saved(&mut registry, make_form("Carlos", "López"));
    saved(&mut registry, make_form("Laura", "Gómez"));

    let names: Vec<String> = registry
        .list()
        .unwrap()
        .into_iter()
        .map(|v| v.computed.display_name)
        .collect();
    assert_eq!(names, vec!["Gómez, Laura", "López, Carlos"]);
}

#[test]
fn test_delete_never_fails() {
    let mut registry = registry();
    let view = saved(&mut registry, make_form("Laura", "Gómez"));

    assert!(registry.delete(view.patient_id()).unwrap());
    assert!(!registry.delete(view.patient_id()).unwrap());
    assert!(!registry.delete("00000000-0000-0000-0000-000000000000").unwrap());
    assert!(registry.get(view.patient_id()).unwrap().is_none());
}

#[test]
fn test_adult_age_boundary() {
    let mut registry = registry();

    let mut exactly_eighteen = make_form("Ana", "Ruiz");
    exactly_eighteen.date_of_birth = Some("2007-10-26".to_string());
    let view = saved(&mut registry, exactly_eighteen);
    assert_eq!(view.computed.age_years, Some(18));
    assert_eq!(view.computed.is_adult, Some(true));

    let mut one_day_short = make_form("Eva", "Ruiz");
    one_day_short.date_of_birth = Some("2007-10-27".to_string());
    let view = saved(&mut registry, one_day_short);
    assert_eq!(view.computed.age_years, Some(17));
    assert_eq!(view.computed.is_adult, Some(false));
}

#[test]
fn test_age_follows_read_date_not_write_date() {
    let written_on = NaiveDate::from_ymd_opt(2025, 10, 25).unwrap();
    let mut registry = Registry::with_clock(MemoryStore::new(), FixedClock::at_date(written_on));

    let mut form = make_form("Ana", "Ruiz");
    form.date_of_birth = Some("2007-10-26".to_string());
    let created = saved(&mut registry, form);
    assert_eq!(created.computed.age_years, Some(17));
    assert_eq!(created.computed.is_adult, Some(false));

    let read_on = written_on.succ_opt().unwrap();
    let registry = Registry::with_clock(registry.into_store(), FixedClock::at_date(read_on));

    let fetched = registry.get(created.patient_id()).unwrap().unwrap();
    assert_eq!(fetched.computed.age_years, Some(18));
    assert_eq!(fetched.computed.is_adult, Some(true));
    // No write happened
    assert_eq!(fetched.record, created.record);

    let listed = registry.list().unwrap();
    assert_eq!(listed[0].computed.age_years, Some(18));
    assert_eq!(listed[0].computed.is_adult, Some(true));
}

#[test]
fn test_roster_csv_keeps_rows_intact() {
    let mut registry = registry();

    let mut form = make_form("Ana", "Ruiz");
    form.email = Some("ana\revil@x.com".to_string());
    saved(&mut registry, form);
    saved(&mut registry, make_form("Laura", "Gómez"));

    let out = registry.export_roster().unwrap().to_csv().unwrap();
    let mut reader = csv::Reader::from_reader(out.as_bytes());
    let records: Vec<csv::StringRecord> = reader.records().collect::<Result<_, _>>().unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][1], "Gómez, Laura");
    assert_eq!(&records[1][1], "Ruiz, Ana");
    assert_eq!(&records[1][5], "ana\revil@x.com");
    assert_eq!(records[1].len(), records[0].len());
}

#[test]
fn test_every_violation_reported_at_once() {
    let mut registry = registry();

    let form = PatientForm {
        first_name: Some("   ".to_string()),
        last_name: Some("x".repeat(61)),
        date_of_birth: Some("2030-01-01".to_string()),
        sex_at_birth: Some("unknown".to_string()),
        email: Some("not-an-email".to_string()),
        phone: Some("12ab".to_string()),
        height_cm: Some("99".to_string()),
        weight_kg: Some("heavy".to_string()),
        consent_data_processing: Some("on".to_string()),
        ..Default::default()
    };

    let outcome = registry.create(form).unwrap();
    let errors = &outcome.rejected().unwrap().errors;

    let fields: Vec<Field> = errors.fields().collect();
    assert_eq!(
        fields,
        vec![
            Field::FirstName,
            Field::LastName,
            Field::DateOfBirth,
            Field::SexAtBirth,
            Field::Email,
            Field::Phone,
            Field::HeightCm,
            Field::WeightKg,
        ]
    );
    // Too short and bad characters
    assert_eq!(errors.get(Field::Phone).len(), 2);
}

#[test]
fn test_sqlite_store_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("registry.db");

    let created = {
        let db = Database::open(&path).unwrap();
        let mut registry = Registry::with_clock(db, FixedClock::at_date(today()));
        assert_eq!(registry.seed_demo_patients().unwrap(), 2);
        saved(
            &mut registry,
            with_measures(make_form("ana", "ruiz"), Some("170"), Some("65")),
        )
    };

    let db = Database::open(&path).unwrap();
    let mut registry = Registry::with_clock(db, FixedClock::at_date(today()));
    assert_eq!(registry.seed_demo_patients().unwrap(), 0);

    let listed = registry.list().unwrap();
    let names: Vec<&str> = listed
        .iter()
        .map(|v| v.computed.display_name.as_str())
        .collect();
    assert_eq!(names, vec!["Gómez, Laura", "López, Carlos", "Ruiz, Ana"]);

    let reloaded = registry.get(created.patient_id()).unwrap().unwrap();
    assert_eq!(reloaded, created);
}

proptest! {
    #[test]
    fn prop_name_normalization_is_idempotent(raw in "[a-zA-ZáéíóúñÑ' -]{0,40}") {
        let once = normalize_name(&raw);
        prop_assert_eq!(normalize_name(&once), once.clone());
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }

    #[test]
    fn prop_bmi_present_iff_both_measures(
        height in proptest::option::of(100.0f64..=250.0),
        weight in proptest::option::of(20.0f64..=300.0),
    ) {
        let mut registry = registry();
        let form = PatientForm {
            height_cm: height.map(|h| h.to_string()),
            weight_kg: weight.map(|w| w.to_string()),
            ..make_form("Laura", "Gómez")
        };

        let view = saved(&mut registry, form);
        prop_assert_eq!(view.record.bmi.is_some(), height.is_some() && weight.is_some());

        if let Some(reading) = &view.record.bmi {
            prop_assert_eq!(reading.category, BmiCategory::from_bmi(reading.value));
            prop_assert_eq!(reading.measured_at, view.record.updated_at);
            prop_assert_eq!(reading.inputs_updated_at, view.record.updated_at);
        }
    }

    #[test]
    fn prop_out_of_range_height_rejected(height in 0.0f64..99.99) {
        let mut registry = registry();
        let form = with_measures(make_form("Laura", "Gómez"), Some(&height.to_string()), Some("60"));

        let outcome = registry.create(form).unwrap();
        prop_assert!(outcome.rejected().is_some_and(|r| r.errors.contains(Field::HeightCm)));
        prop_assert_eq!(registry.store().count_patients().unwrap(), 0);
    }
}
