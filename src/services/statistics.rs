use std::collections::{BTreeSet, HashMap};

use crate::models::attendance::{AttendanceRecord, EventType};
use crate::models::stats::{EmployeeLateEarly, LateEarlyStats, LateEarlySummary, PunchDay};
use crate::utils::time::{hhmm_prefix, round1};

struct Tally {
    employee_id: String,
    name: String,
    dates: BTreeSet<String>,
    late_days: Vec<PunchDay>,
    early_days: Vec<PunchDay>,
}

fn rate(count: usize, total_days: usize) -> f64 {
    if total_days == 0 {
        return 0.0;
    }
    round1(count as f64 / total_days as f64 * 100.0)
}

/// Monthly late/early rates per employee.
///
/// Unlike the anomaly checks this has no grace window: an `in` whose `HH:MM`
/// sorts after `work_start_time` is late and an `out` that sorts before
/// `work_end_time` is early. Every qualifying punch counts, not every day.
pub fn late_early_stats(
    records: &[AttendanceRecord],
    month: &str,
    work_start_time: &str,
    work_end_time: &str,
) -> LateEarlyStats {
    let mut tallies: Vec<Tally> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for record in records.iter().filter(|record| record.date.starts_with(month)) {
        if record.employee_id.is_empty() || record.date.is_empty() || record.time.is_empty() {
            continue;
        }

        let slot = *index.entry(record.employee_id.as_str()).or_insert_with(|| {
            tallies.push(Tally {
                employee_id: record.employee_id.clone(),
                name: record.employee_name.clone(),
                dates: BTreeSet::new(),
                late_days: Vec::new(),
                early_days: Vec::new(),
            });
            tallies.len() - 1
        });
        let tally = &mut tallies[slot];
        tally.dates.insert(record.date.clone());

        let punched = hhmm_prefix(&record.time);
        let day = || PunchDay {
            date: record.date.clone(),
            time: record.time.clone(),
        };
        match record.event_type {
            EventType::In if punched.as_str() > work_start_time => tally.late_days.push(day()),
            EventType::Out if punched.as_str() < work_end_time => tally.early_days.push(day()),
            _ => {}
        }
    }

    let employees: Vec<EmployeeLateEarly> = tallies
        .into_iter()
        .map(|tally| {
            let total_days = tally.dates.len();
            EmployeeLateEarly {
                employee_id: tally.employee_id,
                name: tally.name,
                total_days: total_days as i64,
                late_count: tally.late_days.len() as i64,
                early_count: tally.early_days.len() as i64,
                late_rate: rate(tally.late_days.len(), total_days),
                early_rate: rate(tally.early_days.len(), total_days),
                late_days: tally.late_days,
                early_days: tally.early_days,
            }
        })
        .collect();

    let summary = employees
        .iter()
        .fold(LateEarlySummary::default(), |mut summary, employee| {
            summary.total += employee.total_days;
            summary.late_count += employee.late_count;
            summary.early_count += employee.early_count;
            summary
        });

    LateEarlyStats {
        month: month.to_string(),
        work_start_time: work_start_time.to_string(),
        work_end_time: work_end_time.to_string(),
        employees,
        summary,
    }
}
