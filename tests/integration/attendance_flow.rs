#[path = "support.rs"]
mod support;

use std::collections::HashMap;

use attendance_tracker_lib::error::AppError;
use attendance_tracker_lib::models::attendance::{
    AttendanceRecordFilter, DateRange, EventType, GeoLocation, PunchInput,
};
use attendance_tracker_lib::models::employee::EmployeeStatus;
use chrono::NaiveDate;
use support::{harness, register, seed_punch, taipei};

const FAR_AWAY: GeoLocation = GeoLocation {
    latitude: 25.0330,
    longitude: 121.5654,
};

fn punch(user_id: &str, event_type: EventType, location: Option<GeoLocation>) -> PunchInput {
    PunchInput {
        employee_id: user_id.to_string(),
        event_type,
        location,
    }
}

fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn punch_uses_business_timezone() {
    // 01:05 UTC is 09:05 in Taipei.
    let h = harness(taipei(2024, 6, 10, 9, 5));
    register(&h.state, "U0001", "小明");

    let record = h
        .state
        .attendance()
        .punch(punch("U0001", EventType::In, None))
        .expect("punch");

    assert_eq!(record.date, "2024-06-10");
    assert_eq!(record.time, "09:05:00");
    assert_eq!(record.employee_name, "小明");
    assert!(record.full_timestamp.ends_with("+08:00"));

    let today = h.state.attendance().today_records("U0001").expect("today");
    assert_eq!(today, vec![record]);
    assert!(h.state.attendance().today_records("U9999").expect("today").is_empty());
}

#[test]
fn unknown_or_inactive_employee_cannot_punch() {
    let h = harness(taipei(2024, 6, 10, 9, 0));

    let err = h
        .state
        .attendance()
        .punch(punch("ghost", EventType::In, None))
        .unwrap_err();
    assert!(err.is_not_found());

    register(&h.state, "U0002", "小華");
    h.state
        .employees()
        .set_status("U0002", EmployeeStatus::Inactive)
        .expect("deactivate");
    let err = h
        .state
        .attendance()
        .punch(punch("U0002", EventType::In, None))
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[test]
fn location_outside_radius_is_rejected() {
    let h = harness(taipei(2024, 6, 10, 9, 0));
    register(&h.state, "U0001", "小明");
    h.state
        .settings()
        .update(&settings(&[("storeRadius", "100")]))
        .expect("settings");

    let err = h
        .state
        .attendance()
        .punch(punch("U0001", EventType::In, Some(FAR_AWAY)))
        .unwrap_err();
    match err {
        AppError::Validation { message, .. } => assert!(message.contains("超出打卡範圍")),
        other => panic!("unexpected error: {other:?}"),
    }

    let store = GeoLocation {
        latitude: 24.8356,
        longitude: 121.0145,
    };
    let record = h
        .state
        .attendance()
        .punch(punch("U0001", EventType::In, Some(store)))
        .expect("punch at store");
    assert_eq!(record.location, Some(store));

    // Stored location survives the round trip through the "lat,lng" column.
    let today = h.state.attendance().today_records("U0001").expect("today");
    assert_eq!(today[0].location, Some(store));
}

#[test]
fn disabled_location_check_accepts_any_location() {
    let h = harness(taipei(2024, 6, 10, 9, 0));
    register(&h.state, "U0001", "小明");
    h.state
        .settings()
        .update(&settings(&[("storeRadius", "100"), ("enableLocationCheck", "false")]))
        .expect("settings");

    assert!(h
        .state
        .attendance()
        .punch(punch("U0001", EventType::Out, Some(FAR_AWAY)))
        .is_ok());
}

#[test]
fn sessions_and_work_minutes_from_stored_punches() {
    let h = harness(taipei(2024, 6, 12, 12, 0));
    register(&h.state, "U0001", "小明");
    register(&h.state, "U0002", "小華");

    seed_punch(&h.pool, "U0001", "小明", EventType::Out, "2024-06-10", "18:10:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-10", "09:00:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-10", "09:30:00");
    seed_punch(&h.pool, "U0002", "小華", EventType::In, "2024-06-10", "08:50:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-11", "09:00:00");

    let attendance = h.state.attendance();
    let day = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let sessions = attendance
        .daily_sessions(Some("U0001"), Some(DateRange::single(day)))
        .expect("sessions");

    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].check_in.as_deref(), Some("09:00:00"));
    assert_eq!(sessions[0].check_out.as_deref(), Some("18:10:00"));
    assert_eq!(attendance.work_minutes(&sessions[0]), Some(550.0));

    let all = attendance.daily_sessions(None, None).expect("sessions");
    assert_eq!(all.len(), 3);
    assert!(all.iter().filter(|s| s.check_out.is_none()).all(|s| attendance.work_minutes(s).is_none()));
}

#[test]
fn record_filter_validates_dates() {
    let h = harness(taipei(2024, 6, 12, 12, 0));
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-10", "09:00:00");
    seed_punch(&h.pool, "U0001", "小明", EventType::In, "2024-06-11", "09:00:00");

    let filter = AttendanceRecordFilter {
        employee_id: Some("U0001".to_string()),
        start_date: Some("2024-06-11".to_string()),
        end_date: None,
    };
    let records = h.state.attendance().list_records(&filter).expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].date, "2024-06-11");

    let bad = AttendanceRecordFilter {
        start_date: Some("11/06/2024".to_string()),
        ..AttendanceRecordFilter::default()
    };
    assert!(matches!(
        h.state.attendance().list_records(&bad),
        Err(AppError::Validation { .. })
    ));
}
