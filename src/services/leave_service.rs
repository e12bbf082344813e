use std::sync::Arc;

use tracing::info;

use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::repositories::leave_repository::{LeaveRepository, LeaveReviewUpdate};
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::leave::{
    LeaveApplyInput, LeaveApplyResult, LeaveRequest, LeaveReviewInput, LeaveStatus, LeaveType,
    ReviewAction,
};
use crate::services::leave_conflict::{calc_days, find_conflict};
use crate::services::settings_service::SettingsService;
use crate::utils::clock::Clock;
use crate::utils::time::{format_date, parse_date};

const LEAVE_ID_USER_SUFFIX: usize = 6;

pub struct LeaveService {
    db: DbPool,
    settings: Arc<SettingsService>,
    clock: Arc<dyn Clock>,
}

impl LeaveService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            settings,
            clock,
        }
    }

    /// Files a pending leave after checking it against the employee's own
    /// non-rejected leaves.
    ///
    /// The conflict check and the insert are not atomic; two concurrent
    /// applications for the same employee can both pass.
    pub fn apply(&self, input: LeaveApplyInput) -> AppResult<LeaveApplyResult> {
        let employee_id = input.employee_id.trim().to_string();
        if employee_id.is_empty() {
            return Err(AppError::validation("缺少員工 ID"));
        }

        let leave_type = match non_blank(input.leave_type) {
            Some(value) => LeaveType::try_from(value.as_str()).map_err(AppError::validation)?,
            None => return Err(AppError::validation("請選擇假別")),
        };
        let (start_raw, end_raw) = match (non_blank(input.start_date), non_blank(input.end_date)) {
            (Some(start), Some(end)) => (start, end),
            _ => return Err(AppError::validation("請填寫請假起訖日期")),
        };
        let start = parse_date(&start_raw)?;
        let end = parse_date(&end_raw)?;
        if start > end {
            return Err(AppError::validation("結束日期必須大於或等於開始日期"));
        }
        let days = calc_days(start, end);

        let employee = self
            .db
            .with_connection(|conn| EmployeeRepository::find(conn, &employee_id))?
            .ok_or_else(|| AppError::not_found(format!("找不到員工: {employee_id}")))?;
        let employee_name = non_blank(input.employee_name).unwrap_or(employee.name);

        let existing = self
            .db
            .with_connection(|conn| LeaveRepository::list_by_employee(conn, &employee_id))?;
        if let Some(conflict) = find_conflict(&existing, start, end) {
            return Err(AppError::conflict(format!(
                "與既有請假（{}~{}）重疊",
                conflict.start_date, conflict.end_date
            )));
        }

        let now = self.clock.now();
        let tz = self.settings.get().timezone;
        let leave = LeaveRequest {
            leave_id: format!(
                "{}-{}-{}",
                start.format("%Y%m%d"),
                user_suffix(&employee_id),
                now.timestamp_millis()
            ),
            employee_id,
            employee_name,
            leave_type,
            start_date: format_date(start),
            end_date: format_date(end),
            days,
            reason: input.reason.unwrap_or_default().trim().to_string(),
            status: LeaveStatus::Pending,
            reviewed_by: None,
            reviewed_at: None,
            reject_reason: None,
            created_at: now.with_timezone(&tz).to_rfc3339(),
        };

        self.db
            .with_connection(|conn| LeaveRepository::insert(conn, &leave))?;

        info!(
            target: "app::leave",
            leave_id = %leave.leave_id,
            employee = %leave.employee_name,
            start = %leave.start_date,
            end = %leave.end_date,
            days,
            "leave applied"
        );
        Ok(LeaveApplyResult {
            leave_id: leave.leave_id,
            days,
        })
    }

    /// Moves a pending leave to approved or rejected. Reviewed leaves never change again.
    pub fn review(&self, input: LeaveReviewInput) -> AppResult<LeaveRequest> {
        let reject_reason = non_blank(input.reject_reason);
        if input.action == ReviewAction::Reject && reject_reason.is_none() {
            return Err(AppError::validation("拒絕請假時必須填寫原因"));
        }
        if input.reviewer_id.trim().is_empty() {
            return Err(AppError::validation("缺少審核者"));
        }

        let leave_id = input.leave_id.trim();
        let current = self.find_required(leave_id)?;
        if current.status.is_terminal() {
            return Err(AppError::conflict(format!(
                "此請假申請已審核（{}）",
                current.status
            )));
        }

        let tz = self.settings.get().timezone;
        let reviewed_at = self.clock.now_in(tz).to_rfc3339();
        let status = input.action.resulting_status();
        let update = LeaveReviewUpdate {
            status,
            reviewed_by: input.reviewer_id.trim(),
            reviewed_at: &reviewed_at,
            reject_reason: match input.action {
                ReviewAction::Reject => reject_reason.as_deref(),
                ReviewAction::Approve => None,
            },
        };

        let changed = self
            .db
            .with_connection(|conn| LeaveRepository::update_review(conn, leave_id, &update))?;
        if changed == 0 {
            // Reviewed by someone else between the read and the write.
            return Err(AppError::conflict("此請假申請已被其他人審核"));
        }

        info!(target: "app::leave", %leave_id, status = %status, reviewer = %update.reviewed_by, "leave reviewed");
        self.find_required(leave_id)
    }

    pub fn get(&self, leave_id: &str) -> AppResult<LeaveRequest> {
        self.find_required(leave_id)
    }

    pub fn list_all(&self) -> AppResult<Vec<LeaveRequest>> {
        self.db.with_connection(LeaveRepository::list_all)
    }

    pub fn list_for_employee(&self, employee_id: &str) -> AppResult<Vec<LeaveRequest>> {
        self.db
            .with_connection(|conn| LeaveRepository::list_by_employee(conn, employee_id))
    }

    pub fn list_pending(&self) -> AppResult<Vec<LeaveRequest>> {
        self.db
            .with_connection(|conn| LeaveRepository::list_by_status(conn, LeaveStatus::Pending))
    }

    fn find_required(&self, leave_id: &str) -> AppResult<LeaveRequest> {
        self.db
            .with_connection(|conn| LeaveRepository::find(conn, leave_id))?
            .ok_or_else(|| AppError::not_found("找不到此請假申請"))
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Last six characters of the user id.
fn user_suffix(user_id: &str) -> String {
    let chars: Vec<char> = user_id.chars().collect();
    let from = chars.len().saturating_sub(LEAVE_ID_USER_SUFFIX);
    chars[from..].iter().collect()
}
