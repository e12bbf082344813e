#[path = "support.rs"]
mod support;

use attendance_tracker_lib::error::AppError;
use attendance_tracker_lib::models::attendance::EventType;
use attendance_tracker_lib::models::stats::LateEarlyOverrides;
use support::{harness, register, seed_punch, taipei, Harness};

fn seeded_june() -> Harness {
    let h = harness(taipei(2024, 6, 20, 12, 0));
    register(&h.state, "U0001", "小明");
    register(&h.state, "U0002", "小華");
    register(&h.state, "U0003", "小美");

    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-03", "09:10:00");
    seed_punch(&h.pool, "U0002", "小華", EventType::In, "2024-06-03", "08:00:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::Out, "2024-06-03", "18:00:00");
    seed_punch(&h.pool, "U0002", "小華", EventType::Out, "2024-06-03", "18:30:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-04", "08:55:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::Out, "2024-06-04", "17:30:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-05-31", "11:00:00");
    h
}

#[test]
fn late_early_counts_for_current_month() {
    let h = seeded_june();

    let stats = h.state.stats().late_early_stats(None, None).expect("stats");
    assert_eq!(stats.month, "2024-06");
    assert_eq!(stats.work_start_time, "09:00");
    assert_eq!(stats.employees.len(), 2);

    let xiaoming = stats
        .employees
        .iter()
        .find(|e| e.employee_id == "U0001")
        .expect("小明");
    assert_eq!(xiaoming.total_days, 2);
    assert_eq!(xiaoming.late_count, 1);
    assert_eq!(xiaoming.early_count, 1);
    assert_eq!(xiaoming.late_rate, 50.0);
    assert_eq!(xiaoming.late_days[0].date, "2024-06-03");
    assert_eq!(xiaoming.early_days[0].time, "17:30:00");

    assert_eq!(stats.summary.total, 3);
    assert_eq!(stats.summary.late_count, 1);
    assert_eq!(stats.summary.early_count, 1);
}

#[test]
fn overrides_replace_configured_work_hours() {
    let h = seeded_june();
    let overrides = LateEarlyOverrides {
        work_start_time: Some("09:15".to_string()),
        work_end_time: Some("17:00".to_string()),
    };

    let stats = h
        .state
        .stats()
        .late_early_stats(Some("2024-06"), Some(&overrides))
        .expect("stats");
    assert_eq!(stats.work_start_time, "09:15");
    assert_eq!(stats.summary.late_count, 0);
    assert_eq!(stats.summary.early_count, 0);

    let sloppy = LateEarlyOverrides {
        work_start_time: Some("9:15".to_string()),
        work_end_time: None,
    };
    assert!(matches!(
        h.state.stats().late_early_stats(None, Some(&sloppy)),
        Err(AppError::Validation { .. })
    ));
}

#[test]
fn hours_ranking_orders_by_worked_minutes() {
    let h = seeded_june();

    let ranking = h.state.stats().hours_ranking(Some("2024-06")).expect("ranking");
    let order: Vec<&str> = ranking.iter().map(|e| e.employee_id.as_str()).collect();
    assert_eq!(order, vec!["U0001", "U0002"]);

    assert_eq!(ranking[0].total_minutes, 1045);
    assert_eq!(ranking[0].total_hours, 17.0);
    assert_eq!(ranking[0].work_days, 2);
    assert_eq!(ranking[0].avg_hours, 8.7);
    assert_eq!(ranking[1].total_hours, 10.0);

    let may = h.state.stats().hours_ranking(Some("2024-05")).expect("ranking");
    assert_eq!(may.len(), 1);
    assert_eq!(may[0].work_days, 0);
    assert_eq!(may[0].total_hours, 0.0);
}

#[test]
fn malformed_month_is_rejected() {
    let h = seeded_june();

    for month in ["2024-13", "2024-6", "June"] {
        assert!(matches!(
            h.state.stats().hours_ranking(Some(month)),
            Err(AppError::Validation { .. })
        ));
    }
    assert!(h.state.stats().late_early_stats(Some("2023-01"), None).expect("stats").employees.is_empty());
}

#[test]
fn unpadded_stored_start_time_still_counts_late_arrivals() {
    let h = seeded_june();
    h.pool
        .with_connection(|conn| {
            conn.execute(
                "UPDATE app_settings SET value = '9:00' WHERE key = 'workStartTime'",
                [],
            )?;
            Ok(())
        })
        .expect("store loose time");

    let stats = h.state.stats().late_early_stats(Some("2024-06"), None).expect("stats");
    assert_eq!(stats.work_start_time, "09:00");

    let xiaoming = stats
        .employees
        .iter()
        .find(|e| e.employee_id == "U0001")
        .expect("小明");
    assert_eq!(xiaoming.late_count, 1);
}
