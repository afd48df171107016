//! Schedule import tests
//!
//! CSV uploads go through ScheduleImporter into a temporary SQLite database,
//! then the weekly schedule is read back through CatalogService.

use std::sync::Arc;

use chrono::NaiveDate;
use studiopass::config::{BookingConfig, ImportConfig};
use studiopass::errors::StudioError;
use studiopass::services::{CatalogService, ScheduleImporter};
use studiopass::storage::{BookingRules, SeaOrmStorage};
use tempfile::TempDir;

const HEADER: &str = "class_name,instructor,level,temperature_cel,max_capacity,day_of_week,start_time,end_time";

async fn create_temp_storage() -> (Arc<SeaOrmStorage>, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("import_test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");
    (Arc::new(storage), temp_dir)
}

fn importer(storage: Arc<SeaOrmStorage>, max_file_size: usize) -> ScheduleImporter {
    ScheduleImporter::new(storage, &ImportConfig { max_file_size })
}

fn monday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
}

#[tokio::test]
async fn test_import_creates_classes_and_sessions() {
    let (storage, _dir) = create_temp_storage().await;
    let importer = importer(storage.clone(), 1024 * 1024);
    let csv = format!(
        "{}\nHot Flow,Maya,Intermediate,40,20,1,07:00,08:00\nHot Flow,Maya,Intermediate,40,20,3,18:00,19:00\nYin,Bo,,,,0,10:00,11:15\n",
        HEADER
    );

    let report = importer
        .import("week.csv", "front-desk", csv.as_bytes())
        .await
        .unwrap();
    assert!(report.success);
    assert_eq!(report.total_classes, 3);
    assert_eq!(report.processed_classes, 3);
    assert!(report.errors.is_empty());

    let upload = storage.get_upload(report.upload_id).await.unwrap().unwrap();
    assert_eq!(upload.status, "completed");
    assert_eq!(upload.uploaded_by, "front-desk");
    assert_eq!(upload.filename, "week.csv");
    assert!(upload.error_message.is_none());

    let templates = storage.active_schedule_templates().await.unwrap();
    assert_eq!(templates.len(), 3);
    let yin = templates
        .iter()
        .find(|(_, class)| class.class_name == "Yin")
        .unwrap();
    assert_eq!(yin.1.level, "All Levels");
    assert_eq!(yin.1.max_capacity, 24);
    assert_eq!(yin.1.duration_minute, 60);
}

#[tokio::test]
async fn test_reimport_updates_in_place() {
    let (storage, _dir) = create_temp_storage().await;
    let importer = importer(storage.clone(), 1024 * 1024);

    let first = format!("{}\nHot Flow,Maya,,,20,1,07:00,08:00\n", HEADER);
    importer
        .import("v1.csv", "admin", first.as_bytes())
        .await
        .unwrap();
    let second = format!("{}\nHot Flow,Jo,,,12,1,07:00,08:30\n", HEADER);
    importer
        .import("v2.csv", "admin", second.as_bytes())
        .await
        .unwrap();

    let templates = storage.active_schedule_templates().await.unwrap();
    assert_eq!(templates.len(), 1);
    let (session, class) = &templates[0];
    assert_eq!(class.instructor, "Jo");
    assert_eq!(class.max_capacity, 12);
    assert_eq!(session.end_time.format("%H:%M").to_string(), "08:30");

    assert_eq!(storage.recent_uploads(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_bad_rows_are_reported_per_row() {
    let (storage, _dir) = create_temp_storage().await;
    let importer = importer(storage.clone(), 1024 * 1024);
    let csv = format!(
        "{}\nHot Flow,Maya,,,,1,07:00,08:00\n,Maya,,,,2,07:00,08:00\nYin,Bo,,,,9,10:00,11:00\nNidra,Kai,,,,4,21:00,20:00\n",
        HEADER
    );

    let report = importer
        .import("week.csv", "admin", csv.as_bytes())
        .await
        .unwrap();
    assert!(report.success);
    assert_eq!(report.total_classes, 4);
    assert_eq!(report.processed_classes, 1);
    assert_eq!(report.errors.len(), 3);
    assert!(report.errors[0].starts_with("Row 3:"));
    assert!(report.errors[1].starts_with("Row 4:"));
    assert!(report.errors[2].starts_with("Row 5:"));

    let upload = storage.get_upload(report.upload_id).await.unwrap().unwrap();
    assert_eq!(upload.status, "failed");
    assert_eq!(upload.processed_classes, 1);
    assert_eq!(upload.total_classes, 4);
    let message = upload.error_message.unwrap();
    assert_eq!(message.split("; ").count(), 3);

    assert_eq!(storage.active_schedule_templates().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_columns_rejects_before_recording_upload() {
    let (storage, _dir) = create_temp_storage().await;
    let importer = importer(storage.clone(), 1024 * 1024);

    let err = importer
        .import("week.csv", "admin", b"class_name,instructor\nYin,Bo\n")
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::CsvParse(_)));
    assert!(err.message().contains("day_of_week"));
    assert!(storage.recent_uploads(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_oversized_upload_is_rejected() {
    let (storage, _dir) = create_temp_storage().await;
    let importer = importer(storage.clone(), 32);
    let csv = format!("{}\nHot Flow,Maya,,,,1,07:00,08:00\n", HEADER);

    let err = importer
        .import("week.csv", "admin", csv.as_bytes())
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Validation(_)));
    assert!(storage.recent_uploads(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_import_file_uses_file_name() {
    let (storage, dir) = create_temp_storage().await;
    let importer = importer(storage.clone(), 1024 * 1024);
    let path = dir.path().join("june.csv");
    std::fs::write(&path, format!("{}\nYin,Bo,,,,0,10:00,11:00\n", HEADER)).unwrap();

    let report = importer.import_file(&path, "cli").await.unwrap();
    let upload = storage.get_upload(report.upload_id).await.unwrap().unwrap();
    assert_eq!(upload.filename, "june.csv");
    assert_eq!(upload.uploaded_by, "cli");
}

#[tokio::test]
async fn test_imported_schedule_expands_into_week() {
    let (storage, _dir) = create_temp_storage().await;
    let importer = importer(storage.clone(), 1024 * 1024);
    let csv = format!(
        "{}\nHot Flow,Maya,,,20,1,07:00,08:00\nYin,Bo,,,,3,18:00,19:00\n",
        HEADER
    );
    importer
        .import("week.csv", "admin", csv.as_bytes())
        .await
        .unwrap();

    let catalog = CatalogService::new(storage, BookingRules::default(), &BookingConfig::default());
    let week = catalog.weekly_schedule(Some(monday()), Some(7)).await.unwrap();

    assert_eq!(week.len(), 2);
    assert_eq!(week[0].class_name, "Hot Flow");
    assert_eq!(week[0].date, monday());
    assert_eq!(week[0].spots_left, 20);
    assert_eq!(week[1].class_name, "Yin");
    assert_eq!(week[1].date, NaiveDate::from_ymd_opt(2025, 6, 4).unwrap());

    let err = catalog
        .weekly_schedule(Some(monday()), Some(0))
        .await
        .unwrap_err();
    assert!(matches!(err, StudioError::Validation(_)));
}
