use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PunchDay {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeLateEarly {
    pub employee_id: String,
    pub name: String,
    /// Distinct dates with at least one punch in the month.
    pub total_days: i64,
    pub late_count: i64,
    pub early_count: i64,
    /// Percent of `total_days`, one decimal.
    pub late_rate: f64,
    pub early_rate: f64,
    pub late_days: Vec<PunchDay>,
    pub early_days: Vec<PunchDay>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LateEarlySummary {
    pub total: i64,
    pub late_count: i64,
    pub early_count: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LateEarlyStats {
    pub month: String,
    pub work_start_time: String,
    pub work_end_time: String,
    pub employees: Vec<EmployeeLateEarly>,
    pub summary: LateEarlySummary,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HoursRankingEntry {
    pub employee_id: String,
    pub name: String,
    /// Whole minutes, floored after summing every session's seconds.
    pub total_minutes: i64,
    /// Whole hours, floored.
    pub total_hours: f64,
    /// Days with a valid in/out pair.
    pub work_days: i64,
    /// Average hours per work day, rounded to one decimal.
    pub avg_hours: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateEarlyOverrides {
    pub work_start_time: Option<String>,
    pub work_end_time: Option<String>,
}
