use std::convert::TryFrom;

use rusqlite::{named_params, Connection, OptionalExtension, Row};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::leave::{LeaveRequest, LeaveStatus, LeaveType};

#[derive(Debug, Clone)]
pub struct LeaveRow {
    pub leave_id: String,
    pub employee_id: String,
    pub employee_name: String,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub days: i64,
    pub reason: String,
    pub status: String,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub reject_reason: Option<String>,
    pub created_at: String,
}

impl LeaveRow {
    pub fn into_request(self) -> AppResult<LeaveRequest> {
        // Unknown stored types degrade to `other`, matching how the sheet was read.
        let leave_type = LeaveType::try_from(self.leave_type.as_str()).unwrap_or(LeaveType::Other);
        let status = LeaveStatus::try_from(self.status.as_str()).map_err(AppError::validation)?;

        Ok(LeaveRequest {
            leave_id: self.leave_id,
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            leave_type,
            start_date: self.start_date,
            end_date: self.end_date,
            days: self.days.max(1),
            reason: self.reason,
            status,
            reviewed_by: self.reviewed_by.filter(|value| !value.is_empty()),
            reviewed_at: self.reviewed_at.filter(|value| !value.is_empty()),
            reject_reason: self.reject_reason.filter(|value| !value.is_empty()),
            created_at: self.created_at,
        })
    }
}

impl TryFrom<&Row<'_>> for LeaveRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            leave_id: row.get("leave_id")?,
            employee_id: row.get("employee_id")?,
            employee_name: row.get("employee_name")?,
            leave_type: row.get("leave_type")?,
            start_date: row.get("start_date")?,
            end_date: row.get("end_date")?,
            days: row.get("days")?,
            reason: row.get("reason")?,
            status: row.get("status")?,
            reviewed_by: row.get("reviewed_by")?,
            reviewed_at: row.get("reviewed_at")?,
            reject_reason: row.get("reject_reason")?,
            created_at: row.get("created_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        leave_id,
        employee_id,
        employee_name,
        leave_type,
        start_date,
        end_date,
        days,
        reason,
        status,
        reviewed_by,
        reviewed_at,
        reject_reason,
        created_at
    FROM leave_requests
"#;

#[derive(Debug, Clone)]
pub struct LeaveReviewUpdate<'a> {
    pub status: LeaveStatus,
    pub reviewed_by: &'a str,
    pub reviewed_at: &'a str,
    pub reject_reason: Option<&'a str>,
}

pub struct LeaveRepository;

impl LeaveRepository {
    pub fn insert(conn: &Connection, leave: &LeaveRequest) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO leave_requests (
                    leave_id,
                    employee_id,
                    employee_name,
                    leave_type,
                    start_date,
                    end_date,
                    days,
                    reason,
                    status,
                    created_at
                ) VALUES (
                    :leave_id,
                    :employee_id,
                    :employee_name,
                    :leave_type,
                    :start_date,
                    :end_date,
                    :days,
                    :reason,
                    :status,
                    :created_at
                )
            "#,
            named_params! {
                ":leave_id": &leave.leave_id,
                ":employee_id": &leave.employee_id,
                ":employee_name": &leave.employee_name,
                ":leave_type": leave.leave_type.as_str(),
                ":start_date": &leave.start_date,
                ":end_date": &leave.end_date,
                ":days": leave.days,
                ":reason": &leave.reason,
                ":status": leave.status.as_str(),
                ":created_at": &leave.created_at,
            },
        )?;

        Ok(())
    }

    pub fn find(conn: &Connection, leave_id: &str) -> AppResult<Option<LeaveRequest>> {
        let sql = format!("{SELECT_COLUMNS} WHERE leave_id = :leave_id");
        let mut stmt = conn.prepare(&sql)?;

        let row = stmt
            .query_row(named_params! {":leave_id": leave_id}, |row| {
                LeaveRow::try_from(row)
            })
            .optional()?;

        row.map(LeaveRow::into_request).transpose()
    }

    pub fn list_all(conn: &Connection) -> AppResult<Vec<LeaveRequest>> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY created_at ASC, leave_id ASC");
        let mut stmt = conn.prepare(&sql)?;

        let leaves = stmt
            .query_map([], |row| LeaveRow::try_from(row))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_requests(leaves))
    }

    pub fn list_by_employee(conn: &Connection, employee_id: &str) -> AppResult<Vec<LeaveRequest>> {
        let sql = format!(
            "{SELECT_COLUMNS} WHERE employee_id = :employee_id ORDER BY created_at ASC, leave_id ASC"
        );
        let mut stmt = conn.prepare(&sql)?;

        let leaves = stmt
            .query_map(named_params! {":employee_id": employee_id}, |row| {
                LeaveRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_requests(leaves))
    }

    pub fn list_by_status(conn: &Connection, status: LeaveStatus) -> AppResult<Vec<LeaveRequest>> {
        let sql =
            format!("{SELECT_COLUMNS} WHERE status = :status ORDER BY created_at ASC, leave_id ASC");
        let mut stmt = conn.prepare(&sql)?;

        let leaves = stmt
            .query_map(named_params! {":status": status.as_str()}, |row| {
                LeaveRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_requests(leaves))
    }

    /// Only a pending leave can be reviewed; returns the number of rows changed.
    pub fn update_review(
        conn: &Connection,
        leave_id: &str,
        update: &LeaveReviewUpdate<'_>,
    ) -> AppResult<usize> {
        let changed = conn.execute(
            r#"
                UPDATE leave_requests
                SET status = :status,
                    reviewed_by = :reviewed_by,
                    reviewed_at = :reviewed_at,
                    reject_reason = :reject_reason
                WHERE leave_id = :leave_id
                  AND status = 'pending'
            "#,
            named_params! {
                ":status": update.status.as_str(),
                ":reviewed_by": update.reviewed_by,
                ":reviewed_at": update.reviewed_at,
                ":reject_reason": update.reject_reason,
                ":leave_id": leave_id,
            },
        )?;

        Ok(changed)
    }
}

/// A row with an unknown status is skipped so it cannot block the employee's other leaves.
fn into_requests(rows: Vec<LeaveRow>) -> Vec<LeaveRequest> {
    rows.into_iter()
        .filter_map(|row| {
            let leave_id = row.leave_id.clone();
            match row.into_request() {
                Ok(leave) => Some(leave),
                Err(err) => {
                    warn!(target: "app::leave", leave_id = %leave_id, error = %err, "skipping malformed leave row");
                    None
                }
            }
        })
        .collect()
}
