#[path = "support.rs"]
mod support;

use std::collections::HashMap;

use attendance_tracker_lib::error::AppError;
use attendance_tracker_lib::models::anomaly::{AnomalyType, Severity};
use attendance_tracker_lib::models::attendance::EventType;
use attendance_tracker_lib::models::employee::EmployeeStatus;
use support::{harness, register, seed_punch, taipei, Harness};

const TODAY: &str = "2024-06-10";

/// Four employees at 10:30: one late, one absent, one double punch, one inactive.
fn seeded_morning() -> Harness {
    let h = harness(taipei(2024, 6, 10, 10, 30));
    register(&h.state, "U0001", "小明");
    register(&h.state, "U0002", "小華");
    register(&h.state, "U0003", "小美");
    register(&h.state, "U0004", "阿哲");
    h.state
        .employees()
        .set_status("U0004", EmployeeStatus::Inactive)
        .expect("deactivate");

    seed_punch(&h.pool, "U0001", "小明", EventType::In, TODAY, "09:45:00");
    seed_punch(&h.pool, "U0003", "小美", EventType::In, TODAY, "08:55:00");
    seed_punch(&h.pool, "U0003", "小美", EventType::In, TODAY, "08:56:10");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-09", "23:30:00");
    h
}

#[test]
fn check_today_finds_and_logs_anomalies() {
    let h = seeded_morning();

    let mut found = h.state.anomalies().check_today().expect("check");
    found.sort_by(|a, b| a.employee_id.cmp(&b.employee_id));

    let summary: Vec<(&str, AnomalyType, Severity)> = found
        .iter()
        .map(|a| (a.employee_id.as_str(), a.anomaly_type, a.severity))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("U0001", AnomalyType::Late, Severity::High),
            ("U0002", AnomalyType::Missing, Severity::High),
            ("U0003", AnomalyType::Duplicate, Severity::Low),
        ]
    );
    assert!(found.iter().all(|a| a.date == TODAY));
    assert!(found.iter().all(|a| a.detected_at.starts_with("2024-06-10T10:30:00")));
    assert_eq!(found[0].message, "遲到 45 分鐘");

    let logged = h.state.anomalies().today_anomalies();
    assert_eq!(logged.len(), 3);
    let mut logged_ids: Vec<&str> = logged.iter().map(|r| r.anomaly.employee_id.as_str()).collect();
    logged_ids.sort();
    assert_eq!(logged_ids, vec!["U0001", "U0002", "U0003"]);
}

#[test]
fn settings_changes_apply_to_next_check() {
    let h = seeded_morning();
    let changes: HashMap<String, String> =
        [("lateThreshold".to_string(), "60".to_string())].into_iter().collect();
    h.state.settings().update(&changes).expect("settings");

    let found = h.state.anomalies().check_today().expect("check");
    assert!(found.iter().all(|a| a.anomaly_type != AnomalyType::Late));
    assert_eq!(found.len(), 2);
}

#[test]
fn nothing_fires_before_grace_period() {
    let h = harness(taipei(2024, 6, 10, 9, 59));
    register(&h.state, "U0001", "小明");

    assert!(h.state.anomalies().check_today().expect("check").is_empty());
    assert!(h.state.anomalies().today_anomalies().is_empty());
}

#[test]
fn stats_group_by_type_severity_and_employee() {
    let h = seeded_morning();
    h.state.anomalies().check_today().expect("check");

    let stats = h.state.anomalies().anomaly_stats(None, None).expect("stats");
    assert_eq!(stats.total, 3);
    assert_eq!(stats.by_type.get("late"), Some(&1));
    assert_eq!(stats.by_type.get("missing"), Some(&1));
    assert_eq!(stats.by_type.get("duplicate"), Some(&1));
    assert_eq!(stats.by_severity.get("high"), Some(&2));
    assert_eq!(stats.by_severity.get("low"), Some(&1));
    assert_eq!(stats.by_severity.get("medium"), None);

    let xiaoming = stats.by_employee.get("小明").expect("小明 stats");
    assert_eq!(xiaoming.count, 1);
    assert_eq!(xiaoming.types.get("late"), Some(&1));

    let earlier = h
        .state
        .anomalies()
        .anomaly_stats(Some("2024-05-01"), Some("2024-06-09"))
        .expect("stats");
    assert_eq!(earlier.total, 0);
    assert!(earlier.by_employee.is_empty());
}

#[test]
fn stats_reject_inverted_or_malformed_range() {
    let h = harness(taipei(2024, 6, 10, 12, 0));

    assert!(matches!(
        h.state.anomalies().anomaly_stats(Some("2024-06-10"), Some("2024-06-01")),
        Err(AppError::Validation { .. })
    ));
    assert!(matches!(
        h.state.anomalies().anomaly_stats(Some("June"), None),
        Err(AppError::Validation { .. })
    ));
}
