use chrono::NaiveDate;
use tracing::warn;

use crate::models::leave::{LeaveRequest, LeaveStatus};
use crate::utils::time::DATE_FORMAT;

/// Inclusive day count; a single-day leave is 1.
pub fn calc_days(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Closed-interval overlap: the ranges share at least one day.
pub fn dates_overlap(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 <= e2 && e1 >= s2
}

/// First non-rejected leave overlapping `[start, end]`.
///
/// `existing` must already be scoped to one employee. Leaves with unreadable
/// dates are skipped.
pub fn find_conflict<'a>(
    existing: &'a [LeaveRequest],
    start: NaiveDate,
    end: NaiveDate,
) -> Option<&'a LeaveRequest> {
    existing
        .iter()
        .filter(|leave| leave.status != LeaveStatus::Rejected)
        .find(|leave| {
            let bounds = (
                NaiveDate::parse_from_str(&leave.start_date, DATE_FORMAT),
                NaiveDate::parse_from_str(&leave.end_date, DATE_FORMAT),
            );
            match bounds {
                (Ok(s), Ok(e)) => dates_overlap(s, e, start, end),
                _ => {
                    warn!(target: "app::leave", leave_id = %leave.leave_id, "skipping leave with unreadable dates");
                    false
                }
            }
        })
}

pub fn has_conflict(existing: &[LeaveRequest], start: NaiveDate, end: NaiveDate) -> bool {
    find_conflict(existing, start, end).is_some()
}
