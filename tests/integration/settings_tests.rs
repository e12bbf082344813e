#[path = "support.rs"]
mod support;

use std::collections::HashMap;
use std::sync::Arc;

use attendance_tracker_lib::db::repositories::settings_repository::SettingsRepository;
use attendance_tracker_lib::db::DbPool;
use attendance_tracker_lib::error::AppError;
use attendance_tracker_lib::models::settings::AttendanceSettings;
use attendance_tracker_lib::utils::clock::FixedClock;
use attendance_tracker_lib::{AppConfig, AppState};
use support::{harness, taipei, RecordingNotifier};

fn changes(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn fresh_store_reports_defaults() {
    let h = harness(taipei(2024, 6, 10, 9, 0));

    let settings = h.state.settings().get();
    assert_eq!(settings, AttendanceSettings::default());
    assert!(!settings.enable_alerts);

    let raw = h.state.settings().get_raw();
    assert_eq!(raw.get("workStartTime").map(String::as_str), Some("09:00"));
    assert_eq!(raw.get("timezone").map(String::as_str), Some("Asia/Taipei"));
}

#[test]
fn update_persists_known_keys_only() {
    let h = harness(taipei(2024, 6, 10, 9, 0));

    let updated = h
        .state
        .settings()
        .update(&changes(&[
            ("workStartTime", "08:30"),
            ("lateThreshold", " 5 "),
            ("enableAlerts", "true"),
            ("favouriteColour", "blue"),
        ]))
        .expect("update");
    assert_eq!(updated.work_start_time, "08:30");
    assert_eq!(updated.late_threshold_minutes, 5);
    assert!(updated.enable_alerts);

    // A second service over the same store sees the change immediately.
    assert_eq!(h.state.settings().get(), updated);

    let stored = h
        .pool
        .with_connection(SettingsRepository::load_map)
        .expect("stored");
    assert_eq!(stored.get("lateThreshold").map(String::as_str), Some("5"));
    assert!(!stored.contains_key("favouriteColour"));
}

#[test]
fn invalid_values_are_reported_together_and_nothing_is_written() {
    let h = harness(taipei(2024, 6, 10, 9, 0));

    let err = h
        .state
        .settings()
        .update(&changes(&[
            ("workStartTime", "9am"),
            ("storeLatitude", "95"),
            ("earlyThreshold", "-3"),
            ("workEndTime", "17:30"),
        ]))
        .unwrap_err();

    let details = err.validation_details().expect("details").clone();
    let errors = details["errors"].as_array().expect("errors array");
    assert_eq!(errors.len(), 3);
    match err {
        AppError::Validation { message, .. } => assert!(message.contains("；")),
        other => panic!("unexpected error: {other:?}"),
    }

    assert_eq!(h.state.settings().get().work_end_time, "18:00");
}

#[test]
fn unparsable_stored_value_falls_back_per_key() {
    let h = harness(taipei(2024, 6, 10, 9, 0));
    h.pool
        .with_connection(|conn| {
            SettingsRepository::upsert(conn, "lateThreshold", "fifteen")?;
            SettingsRepository::upsert(conn, "workEndTime", "17:00")
        })
        .expect("seed");

    let settings = h.state.settings().get();
    assert_eq!(settings.late_threshold_minutes, 15);
    assert_eq!(settings.work_end_time, "17:00");
}

#[test]
fn unreadable_store_yields_defaults_but_writes_fail() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("attendance.sqlite");
    let pool = DbPool::new(&path).expect("db pool");
    std::fs::remove_file(&path).expect("remove db file");
    std::fs::create_dir(&path).expect("directory in its place");

    let state = AppState::new(
        pool,
        Arc::new(RecordingNotifier::default()),
        Arc::new(FixedClock::new(taipei(2024, 6, 10, 9, 0))),
    );

    assert!(state.settings().try_get_raw().unwrap_err().is_store_unavailable());
    assert_eq!(state.settings().get(), AttendanceSettings::default());
    assert!(state
        .settings()
        .update(&changes(&[("workStartTime", "08:00")]))
        .is_err());
}

#[test]
fn bootstrap_from_config_without_line_token() {
    let dir = tempfile::tempdir().expect("temp dir");
    let db_path = dir.path().join("data").join("attendance.sqlite");
    let log_dir = dir.path().join("logs");
    let lookup = |key: &str| match key {
        "ATTENDANCE_DB_PATH" => Some(db_path.display().to_string()),
        "ATTENDANCE_LOG_DIR" => Some(log_dir.display().to_string()),
        "LINE_CHANNEL_ACCESS_TOKEN" => Some("   ".to_string()),
        _ => None,
    };

    let config = AppConfig::from_lookup(lookup).expect("config");
    assert!(config.line_channel_access_token.is_none());

    let state = AppState::bootstrap(&config).expect("bootstrap");
    assert!(db_path.exists());
    assert!(log_dir.is_dir());
    assert_eq!(state.settings().get(), AttendanceSettings::default());
}
