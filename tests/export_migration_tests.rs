//! Tests for the backup export bundle and the one-shot migration helper.

mod support;

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use sustituciones_rust::db::{AdapterFactory, LocalStore, StoreError};
use sustituciones_rust::models::{
    NewAvailability, NewSubject, NewSubstitution, NewTeacher, ScheduleSlot,
};
use sustituciones_rust::store::batch::BatchPolicy;
use sustituciones_rust::store::export::backup_file_name;
use sustituciones_rust::store::{NoopPacer, Store};

use support::FakeRemote;

async fn open_local(root: &Path) -> Store {
    let local = LocalStore::new(root);
    let adapter = AdapterFactory::create_local(local.clone());
    Store::open_with_pacer(adapter, local, BatchPolicy::without_pause(), Box::new(NoopPacer))
        .await
        .unwrap()
}

async fn open_remote(remote: Arc<FakeRemote>, root: &Path) -> Store {
    Store::open_with_pacer(
        remote,
        LocalStore::new(root),
        BatchPolicy::without_pause(),
        Box::new(NoopPacer),
    )
    .await
    .unwrap()
}

async fn populate(store: &mut Store) {
    store
        .add_teacher(NewTeacher {
            name: "Maria Garcia".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .add_teacher(NewTeacher {
            name: "Juan Lopez".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .add_subject(NewSubject {
            teacher: "Maria Garcia".into(),
            day: "lunes".into(),
            time: "08:00 - 09:00".into(),
            subject: "MAT".into(),
            course_group: "1A".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    store
        .add_availability(vec![NewAvailability {
            teacher: "Juan Lopez".into(),
            day: "lunes".into(),
            start_time: "08:00".into(),
            end_time: "10:00".into(),
            options: String::new(),
        }])
        .await
        .unwrap();
    store
        .add_substitution(NewSubstitution {
            teacher_id: store.teachers()[0].id.clone(),
            teacher_name: "Maria Garcia".into(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            reason: "Enfermedad".into(),
            schedule: vec![ScheduleSlot {
                time: "08:00 - 09:00".into(),
                subject: "MAT".into(),
                course_group: "1A".into(),
                substitute: Some("Juan Lopez".into()),
                ..Default::default()
            }],
            ..Default::default()
        })
        .await
        .unwrap();
}

#[test]
fn test_backup_file_name_is_date_stamped() {
    let name = backup_file_name(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
    assert_eq!(name, "backup-control-sustituciones-2026-03-02.json");
}

#[tokio::test]
async fn test_export_bundle_holds_all_four_collections() {
    let root = support::temp_dir("export-bundle");
    let mut store = open_local(&root).await;
    populate(&mut store).await;

    let bundle = store.export_bundle();
    assert_eq!(bundle.teachers.len(), 2);
    assert_eq!(bundle.subjects.len(), 1);
    assert_eq!(bundle.substitutions.len(), 1);
    assert_eq!(bundle.substitution_schedule.len(), 1);

    // The frontend reads these exact keys out of the downloaded file.
    let json = serde_json::to_value(&bundle).unwrap();
    for key in [
        "teachers",
        "subjects",
        "substitutions",
        "substitutionSchedule",
        "exportDate",
    ] {
        assert!(json.get(key).is_some(), "missing key {key}");
    }

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_export_to_file_writes_parseable_json() {
    let root = support::temp_dir("export-file");
    let mut store = open_local(&root).await;
    populate(&mut store).await;

    let path = root.join("backup.json");
    store.export_to_file(&path).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed["teachers"].as_array().unwrap().len(), 2);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_migrate_requires_active_remote() {
    let root = support::temp_dir("migrate-local-only");
    let mut store = open_local(&root).await;

    let result = store.migrate_to_remote(&root.join("backups")).await;
    assert!(matches!(result, Err(StoreError::ConfigurationError { .. })));

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_migrate_pushes_dataset_and_reconciles_ids() {
    let root = support::temp_dir("migrate-success");
    let remote = Arc::new(FakeRemote::new());
    let mut store = open_remote(remote.clone(), &root).await;

    // Build up a dataset the remote never saw: every mutation is rejected,
    // so the records only exist in memory and on the local floor.
    remote.set_rejecting(true);
    populate(&mut store).await;
    assert!(remote.data().teachers.is_empty());

    remote.set_rejecting(false);
    let backups = root.join("backups");
    let report = store.migrate_to_remote(&backups).await.unwrap();

    // 2 teachers + 1 subject + 1 availability + 1 substitution.
    assert_eq!(report.migrated, 5);
    assert_eq!(report.failed, 0);

    let pushed = remote.data();
    assert_eq!(pushed.teachers.len(), 2);
    assert_eq!(pushed.subjects.len(), 1);
    assert_eq!(pushed.availability.len(), 1);
    assert_eq!(pushed.substitutions.len(), 1);

    // Every in-memory record now carries the backend's serial identity.
    assert!(store.teachers().iter().all(|t| t.id.parse::<i64>().is_ok()));
    assert!(store.subjects().iter().all(|s| s.id.parse::<i64>().is_ok()));
    assert!(store
        .availability()
        .iter()
        .all(|e| e.id.parse::<i64>().is_ok()));
    assert!(store
        .substitutions()
        .iter()
        .all(|s| s.id.parse::<i64>().is_ok()));

    // A backup landed before anything was pushed.
    let backup_files: Vec<_> = std::fs::read_dir(&backups).unwrap().collect();
    assert_eq!(backup_files.len(), 1);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_migrate_tallies_failures_without_aborting() {
    let root = support::temp_dir("migrate-failures");
    let remote = Arc::new(FakeRemote::new());
    let mut store = open_remote(remote.clone(), &root).await;

    remote.set_rejecting(true);
    populate(&mut store).await;

    // The remote stays unwilling; every record fails but the run completes.
    let report = store.migrate_to_remote(&root.join("backups")).await.unwrap();
    assert_eq!(report.migrated, 0);
    assert_eq!(report.failed, 5);

    let _ = std::fs::remove_dir_all(&root);
}

#[tokio::test]
async fn test_migrate_empty_dataset_is_a_no_op() {
    let root = support::temp_dir("migrate-empty");
    let remote = Arc::new(FakeRemote::new());
    let mut store = open_remote(remote, &root).await;

    let report = store.migrate_to_remote(&root.join("backups")).await.unwrap();
    assert_eq!(report.migrated, 0);
    assert_eq!(report.failed, 0);

    let _ = std::fs::remove_dir_all(&root);
}
