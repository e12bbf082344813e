use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::info;

use crate::db::repositories::attendance_repository::AttendanceRepository;
use crate::db::DbPool;
use crate::error::AppResult;
use crate::models::attendance::{AttendanceRecord, EventType};
use crate::services::employee_service::EmployeeService;
use crate::services::notification_service::NotificationService;
use crate::services::settings_service::SettingsService;
use crate::utils::clock::Clock;
use crate::utils::time::{format_date, parse_time_of_day};

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOutcome {
    /// Employees selected for a reminder.
    pub targeted: usize,
    pub sent: usize,
    pub failed: usize,
    /// Reminders are switched off in settings.
    pub skipped: bool,
}

pub struct ReminderService {
    db: DbPool,
    settings: Arc<SettingsService>,
    employees: Arc<EmployeeService>,
    notifications: Arc<NotificationService>,
    clock: Arc<dyn Clock>,
}

impl ReminderService {
    pub fn new(
        db: DbPool,
        settings: Arc<SettingsService>,
        employees: Arc<EmployeeService>,
        notifications: Arc<NotificationService>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            settings,
            employees,
            notifications,
            clock,
        }
    }

    /// Clock-in reminder for every active employee.
    pub async fn morning(&self) -> AppResult<ReminderOutcome> {
        if !self.settings.get().enable_reminders {
            info!(target: "app::notify", "reminders disabled, skipping morning reminder");
            return Ok(skipped());
        }

        let messages: Vec<(String, String)> = self
            .employees
            .list_active()?
            .into_iter()
            .map(|employee| {
                let text = format!("早安，{}！新的一天開始了，別忘了打卡喔！", employee.name);
                (employee.user_id, text)
            })
            .collect();

        self.deliver("morning", messages).await
    }

    /// Clock-out reminder for active employees who clocked in today but not out.
    pub async fn evening(&self) -> AppResult<ReminderOutcome> {
        let settings = self.settings.get();
        if !settings.enable_reminders {
            info!(target: "app::notify", "reminders disabled, skipping evening reminder");
            return Ok(skipped());
        }

        let now = self.clock.now_in(settings.timezone);
        let today = format_date(now.date_naive());
        let records = self
            .db
            .with_connection(|conn| AttendanceRepository::list_by_date(conn, &today))?;

        let messages: Vec<(String, String)> = self
            .employees
            .list_active()?
            .into_iter()
            .filter_map(|employee| {
                let own: Vec<&AttendanceRecord> = records
                    .iter()
                    .filter(|record| record.employee_id == employee.user_id)
                    .collect();
                let check_in = own.iter().find(|record| record.event_type == EventType::In)?;
                if own.iter().any(|record| record.event_type == EventType::Out) {
                    return None;
                }

                let mut text = format!(
                    "辛苦了，{}！一天的工作結束了，記得打卡下班喔！",
                    employee.name
                );
                if let Some(elapsed) = elapsed_since(&check_in.time, now.naive_local()) {
                    text.push_str(&format!("（{elapsed}）"));
                }
                Some((employee.user_id, text))
            })
            .collect();

        self.deliver("evening", messages).await
    }

    async fn deliver(&self, kind: &str, messages: Vec<(String, String)>) -> AppResult<ReminderOutcome> {
        let targeted = messages.len();
        let outcome = self.notifications.send_each(messages).await;

        info!(
            target: "app::notify",
            kind,
            targeted,
            sent = outcome.sent,
            failed = outcome.failed,
            "reminders dispatched"
        );
        Ok(ReminderOutcome {
            targeted,
            sent: outcome.sent,
            failed: outcome.failed,
            skipped: false,
        })
    }
}

fn skipped() -> ReminderOutcome {
    ReminderOutcome {
        skipped: true,
        ..ReminderOutcome::default()
    }
}

/// `已工作 H 小時 M 分鐘` between today's clock-in and `now`.
fn elapsed_since(check_in: &str, now: NaiveDateTime) -> Option<String> {
    let started = now.date().and_time(parse_time_of_day(check_in)?);
    let minutes = now.signed_duration_since(started).num_minutes().max(0);
    Some(format!("已工作 {} 小時 {} 分鐘", minutes / 60, minutes % 60))
}
