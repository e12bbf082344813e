use std::collections::HashMap;

use crate::models::attendance::{AttendanceRecord, DailySession, DateRange, EventType};
use crate::models::stats::HoursRankingEntry;
use crate::utils::time::{parse_date, parse_time_of_day, round1};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Folds raw punches into one session per (employee, date), in first-seen order.
///
/// Only the first `in` and the first `out` of a day are kept; extra punches are
/// the duplicate check's business, not the session's. When a range is given,
/// records whose date cannot be parsed are dropped.
pub fn build_daily_sessions(
    records: &[AttendanceRecord],
    employee_id: Option<&str>,
    range: Option<DateRange>,
) -> Vec<DailySession> {
    let mut sessions: Vec<DailySession> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();

    for record in records {
        if record.employee_id.is_empty() || record.date.is_empty() || record.time.is_empty() {
            continue;
        }
        if let Some(target) = employee_id {
            if record.employee_id != target {
                continue;
            }
        }
        if let Some(range) = range {
            match parse_date(&record.date) {
                Ok(day) if range.contains(day) => {}
                _ => continue,
            }
        }

        let key = (record.employee_id.clone(), record.date.clone());
        let slot = *index.entry(key).or_insert_with(|| {
            sessions.push(DailySession {
                employee_id: record.employee_id.clone(),
                employee_name: record.employee_name.clone(),
                date: record.date.clone(),
                check_in: None,
                check_out: None,
            });
            sessions.len() - 1
        });

        let session = &mut sessions[slot];
        match record.event_type {
            EventType::In if session.check_in.is_none() => {
                session.check_in = Some(record.time.clone());
            }
            EventType::Out if session.check_out.is_none() => {
                session.check_out = Some(record.time.clone());
            }
            _ => {}
        }
    }

    sessions
}

/// Seconds between two same-day times. `None` when the span is not strictly
/// positive or reaches a full day; such sessions never count.
fn work_seconds(check_in: &str, check_out: &str) -> Option<i64> {
    let start = parse_time_of_day(check_in)?;
    let end = parse_time_of_day(check_out)?;
    let seconds = end.signed_duration_since(start).num_seconds();

    (seconds > 0 && seconds < SECONDS_PER_DAY).then_some(seconds)
}

fn session_seconds(session: &DailySession) -> Option<i64> {
    match (session.check_in.as_deref(), session.check_out.as_deref()) {
        (Some(check_in), Some(check_out)) => work_seconds(check_in, check_out),
        _ => None,
    }
}

/// Minutes between two same-day times, seconds kept as the fraction.
pub fn compute_work_minutes(check_in: &str, check_out: &str) -> Option<f64> {
    work_seconds(check_in, check_out).map(|seconds| seconds as f64 / 60.0)
}

pub fn session_minutes(session: &DailySession) -> Option<f64> {
    session_seconds(session).map(|seconds| seconds as f64 / 60.0)
}

/// Monthly work-hour ranking, most hours first.
///
/// `month` is a `YYYY-MM` prefix. Every employee with a punch in the month is
/// listed, even with zero valid days. Ties keep first-seen order.
pub fn monthly_hours_ranking(records: &[AttendanceRecord], month: &str) -> Vec<HoursRankingEntry> {
    let month_records: Vec<AttendanceRecord> = records
        .iter()
        .filter(|record| record.date.starts_with(month))
        .cloned()
        .collect();

    let mut entries: Vec<HoursRankingEntry> = Vec::new();
    let mut worked_seconds: Vec<i64> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for session in build_daily_sessions(&month_records, None, None) {
        let slot = *index.entry(session.employee_id.clone()).or_insert_with(|| {
            entries.push(HoursRankingEntry {
                employee_id: session.employee_id.clone(),
                name: session.employee_name.clone(),
                total_minutes: 0,
                total_hours: 0.0,
                work_days: 0,
                avg_hours: 0.0,
            });
            worked_seconds.push(0);
            entries.len() - 1
        });

        if let Some(seconds) = session_seconds(&session) {
            worked_seconds[slot] += seconds;
            entries[slot].work_days += 1;
        }
    }

    // Seconds are summed unrounded; only the derived totals are floored.
    for (entry, seconds) in entries.iter_mut().zip(worked_seconds) {
        entry.total_minutes = seconds / 60;
        entry.total_hours = (seconds / 3600) as f64;
        entry.avg_hours = if entry.work_days > 0 {
            round1(seconds as f64 / 3600.0 / entry.work_days as f64)
        } else {
            0.0
        };
    }

    // `sort_by` is stable, so equal totals stay in first-seen order.
    entries.sort_by(|a, b| b.total_minutes.cmp(&a.total_minutes));
    entries
}
