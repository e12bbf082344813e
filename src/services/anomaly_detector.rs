//! Per employee-day punch checks.
//!
//! Each check is independent and looks only at one employee's records for a
//! single day. Any subset may fire for the same day.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use chrono_tz::Tz;

use crate::models::anomaly::{Anomaly, AnomalyDetails, AnomalyFinding, AnomalyType, Severity};
use crate::models::attendance::{AttendanceRecord, EventType};
use crate::models::employee::Employee;
use crate::models::settings::AttendanceSettings;
use crate::utils::time::{format_date, hour_of, minutes_from_midnight, minutes_of_hhmm};

/// Minutes past which a late arrival or early leave becomes high severity.
const HIGH_SEVERITY_MINUTES: i64 = 30;
/// Fixed grace after start/end of day before a missing punch is reported.
const MISSING_GRACE_MINUTES: i64 = 60;
const UNUSUAL_FROM_HOUR: u32 = 23;
const UNUSUAL_UNTIL_HOUR: u32 = 5;

fn first_of(records: &[AttendanceRecord], event_type: EventType) -> Option<&AttendanceRecord> {
    records.iter().find(|record| record.event_type == event_type)
}

fn count_of(records: &[AttendanceRecord], event_type: EventType) -> usize {
    records
        .iter()
        .filter(|record| record.event_type == event_type)
        .count()
}

fn severity_for(minutes: i64) -> Severity {
    if minutes > HIGH_SEVERITY_MINUTES {
        Severity::High
    } else {
        Severity::Medium
    }
}

/// Fires when the first `in` is later than start time plus the late threshold.
pub fn check_late(records: &[AttendanceRecord], settings: &AttendanceSettings) -> Option<AnomalyFinding> {
    let check_in = first_of(records, EventType::In)?;
    let punched = minutes_of_hhmm(&check_in.time)?;
    let expected = settings.work_start_minutes();

    if punched <= expected + settings.late_threshold_minutes {
        return None;
    }

    let minutes_late = (punched - expected).abs();
    Some(AnomalyFinding {
        anomaly_type: AnomalyType::Late,
        severity: severity_for(minutes_late),
        message: format!("遲到 {minutes_late} 分鐘"),
        details: AnomalyDetails::Late {
            time: check_in.time.clone(),
            expected_time: settings.work_start_time.clone(),
            minutes_late,
        },
    })
}

/// Fires when the first `out` is earlier than end time minus the early threshold.
pub fn check_early(records: &[AttendanceRecord], settings: &AttendanceSettings) -> Option<AnomalyFinding> {
    let check_out = first_of(records, EventType::Out)?;
    let punched = minutes_of_hhmm(&check_out.time)?;
    let expected = settings.work_end_minutes();

    if punched >= expected - settings.early_threshold_minutes {
        return None;
    }

    let minutes_early = (expected - punched).abs();
    Some(AnomalyFinding {
        anomaly_type: AnomalyType::Early,
        severity: severity_for(minutes_early),
        message: format!("早退 {minutes_early} 分鐘"),
        details: AnomalyDetails::Early {
            time: check_out.time.clone(),
            expected_time: settings.work_end_time.clone(),
            minutes_early,
        },
    })
}

/// Missing punches relative to `now`. Only a day equal to `now`'s date is
/// checked; past days are never reported as missing.
pub fn check_missing(
    records: &[AttendanceRecord],
    settings: &AttendanceSettings,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Option<AnomalyFinding> {
    if date != now.date() {
        return None;
    }

    let now_minutes = minutes_from_midnight(now.time());
    let has_in = count_of(records, EventType::In) > 0;
    let has_out = count_of(records, EventType::Out) > 0;

    if !has_in && now_minutes >= settings.work_start_minutes() + MISSING_GRACE_MINUTES {
        return Some(AnomalyFinding {
            anomaly_type: AnomalyType::Missing,
            severity: Severity::High,
            message: "未打上班卡".to_string(),
            details: AnomalyDetails::Missing {
                expected_time: settings.work_start_time.clone(),
                missing_type: EventType::In.punch_label().to_string(),
            },
        });
    }

    if has_in && !has_out && now_minutes >= settings.work_end_minutes() + MISSING_GRACE_MINUTES {
        return Some(AnomalyFinding {
            anomaly_type: AnomalyType::Missing,
            severity: Severity::Medium,
            message: "未打下班卡".to_string(),
            details: AnomalyDetails::Missing {
                expected_time: settings.work_end_time.clone(),
                missing_type: EventType::Out.punch_label().to_string(),
            },
        });
    }

    None
}

/// Duplicate punches of a single type.
pub fn check_duplicate_of(records: &[AttendanceRecord], event_type: EventType) -> Option<AnomalyFinding> {
    let count = count_of(records, event_type);
    if count <= 1 {
        return None;
    }

    let message = match event_type {
        EventType::In => format!("重複上班打卡 {count} 次"),
        EventType::Out => format!("重複下班打卡 {count} 次"),
    };

    Some(AnomalyFinding {
        anomaly_type: AnomalyType::Duplicate,
        severity: Severity::Low,
        message,
        details: AnomalyDetails::Duplicate {
            count,
            duplicate_type: event_type.punch_label().to_string(),
        },
    })
}

/// Reports at most one duplicate; `in` wins when both types are duplicated.
/// Use [`check_duplicate_of`] for each type when both are needed.
pub fn check_duplicate(records: &[AttendanceRecord]) -> Option<AnomalyFinding> {
    check_duplicate_of(records, EventType::In).or_else(|| check_duplicate_of(records, EventType::Out))
}

/// First punch between 23:00 and 04:59, in store order.
pub fn check_unusual_time(records: &[AttendanceRecord]) -> Option<AnomalyFinding> {
    records.iter().find_map(|record| {
        let hour = hour_of(&record.time)?;
        if hour < UNUSUAL_FROM_HOUR && hour >= UNUSUAL_UNTIL_HOUR {
            return None;
        }

        Some(AnomalyFinding {
            anomaly_type: AnomalyType::Unusual,
            severity: Severity::Medium,
            message: format!("非常規時間打卡（{}）", record.time),
            details: AnomalyDetails::Unusual {
                time: record.time.clone(),
                record_type: record.event_type,
            },
        })
    })
}

/// All five checks for one employee-day, in a fixed order.
pub fn check_employee_day(
    records: &[AttendanceRecord],
    settings: &AttendanceSettings,
    date: NaiveDate,
    now: NaiveDateTime,
) -> Vec<AnomalyFinding> {
    [
        check_late(records, settings),
        check_early(records, settings),
        check_missing(records, settings, date, now),
        check_duplicate(records),
        check_unusual_time(records),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Runs every check for each active employee against today's records.
///
/// `now` is already in the business time zone; its date is "today". Records
/// for other dates or other employees are ignored per employee.
pub fn check_all_anomalies(
    records_today: &[AttendanceRecord],
    active_employees: &[Employee],
    settings: &AttendanceSettings,
    now: DateTime<Tz>,
) -> Vec<Anomaly> {
    let today = now.date_naive();
    let today_key = format_date(today);
    let detected_at = now.to_rfc3339();
    let local_now = now.naive_local();

    active_employees
        .iter()
        .filter(|employee| employee.is_active())
        .flat_map(|employee| {
            let own: Vec<AttendanceRecord> = records_today
                .iter()
                .filter(|record| record.employee_id == employee.user_id && record.date == today_key)
                .cloned()
                .collect();

            check_employee_day(&own, settings, today, local_now)
                .into_iter()
                .map(|finding| Anomaly {
                    anomaly_type: finding.anomaly_type,
                    severity: finding.severity,
                    employee_id: employee.user_id.clone(),
                    employee_name: employee.name.clone(),
                    message: finding.message,
                    detected_at: detected_at.clone(),
                    date: today_key.clone(),
                    details: finding.details,
                })
                .collect::<Vec<_>>()
        })
        .collect()
}
