use std::sync::Arc;

use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::services::alert_dispatcher::AlertDispatcher;
use crate::services::anomaly_service::AnomalyService;
use crate::services::attendance_service::AttendanceService;
use crate::services::employee_service::EmployeeService;
use crate::services::leave_service::LeaveService;
use crate::services::notification_service::{LineNotifier, NoopNotifier, NotificationService, Notifier};
use crate::services::reminder_service::ReminderService;
use crate::services::settings_service::SettingsService;
use crate::services::stats_service::StatsService;
use crate::utils::clock::{Clock, SystemClock};

/// Every service wired over one database, one notifier and one clock.
#[derive(Clone)]
pub struct AppState {
    db_pool: DbPool,
    settings_service: Arc<SettingsService>,
    employee_service: Arc<EmployeeService>,
    attendance_service: Arc<AttendanceService>,
    anomaly_service: Arc<AnomalyService>,
    stats_service: Arc<StatsService>,
    leave_service: Arc<LeaveService>,
    notification_service: Arc<NotificationService>,
    alert_dispatcher: Arc<AlertDispatcher>,
    reminder_service: Arc<ReminderService>,
}

impl AppState {
    pub fn new(db_pool: DbPool, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        let settings_service = Arc::new(SettingsService::new(db_pool.clone()));
        let employee_service = Arc::new(EmployeeService::new(db_pool.clone(), Arc::clone(&clock)));
        let attendance_service = Arc::new(AttendanceService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&clock),
        ));
        let anomaly_service = Arc::new(AnomalyService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&clock),
        ));
        let stats_service = Arc::new(StatsService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&clock),
        ));
        let leave_service = Arc::new(LeaveService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&clock),
        ));
        let notification_service = Arc::new(NotificationService::new(notifier));
        let alert_dispatcher = Arc::new(AlertDispatcher::new(
            Arc::clone(&settings_service),
            Arc::clone(&anomaly_service),
            Arc::clone(&employee_service),
            Arc::clone(&notification_service),
        ));
        let reminder_service = Arc::new(ReminderService::new(
            db_pool.clone(),
            Arc::clone(&settings_service),
            Arc::clone(&employee_service),
            Arc::clone(&notification_service),
            clock,
        ));

        Self {
            db_pool,
            settings_service,
            employee_service,
            attendance_service,
            anomaly_service,
            stats_service,
            leave_service,
            notification_service,
            alert_dispatcher,
            reminder_service,
        }
    }

    /// Production wiring: logging, the SQLite file, LINE pushes when a token
    /// is configured and the system clock.
    pub fn bootstrap(config: &AppConfig) -> AppResult<Self> {
        crate::utils::logger::init_logging(&config.log_dir)?;

        let pool = DbPool::new(&config.db_path)?;
        let notifier: Arc<dyn Notifier> = match &config.line_channel_access_token {
            Some(token) => Arc::new(LineNotifier::try_new(
                &config.line_api_base_url,
                token.clone(),
                config.line_http_timeout,
            )?),
            None => {
                warn!(target: "app::notify", "LINE_CHANNEL_ACCESS_TOKEN not set, notifications disabled");
                Arc::new(NoopNotifier)
            }
        };

        info!(target: "app::config", db_path = %config.db_path.display(), "attendance core ready");
        Ok(Self::new(pool, notifier, Arc::new(SystemClock)))
    }

    pub fn db(&self) -> DbPool {
        self.db_pool.clone()
    }

    pub fn settings(&self) -> Arc<SettingsService> {
        Arc::clone(&self.settings_service)
    }

    pub fn employees(&self) -> Arc<EmployeeService> {
        Arc::clone(&self.employee_service)
    }

    pub fn attendance(&self) -> Arc<AttendanceService> {
        Arc::clone(&self.attendance_service)
    }

    pub fn anomalies(&self) -> Arc<AnomalyService> {
        Arc::clone(&self.anomaly_service)
    }

    pub fn stats(&self) -> Arc<StatsService> {
        Arc::clone(&self.stats_service)
    }

    pub fn leaves(&self) -> Arc<LeaveService> {
        Arc::clone(&self.leave_service)
    }

    pub fn notifications(&self) -> Arc<NotificationService> {
        Arc::clone(&self.notification_service)
    }

    pub fn alerts(&self) -> Arc<AlertDispatcher> {
        Arc::clone(&self.alert_dispatcher)
    }

    pub fn reminders(&self) -> Arc<ReminderService> {
        Arc::clone(&self.reminder_service)
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Error shape handed to the HTTP and chat layers.
#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, details: Option<JsonValue>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details,
        }
    }
}

impl From<AppError> for ApiError {
    fn from(error: AppError) -> Self {
        match error {
            AppError::Validation { message, details } => {
                ApiError::new("VALIDATION_ERROR", message, details)
            }
            AppError::NotFound { message } => ApiError::new("NOT_FOUND", message, None),
            AppError::Conflict { message } => ApiError::new("CONFLICT", message, None),
            AppError::StoreUnavailable { message } => {
                error!(target: "app::api", %message, "store unavailable in request");
                ApiError::new("STORE_UNAVAILABLE", "資料儲存暫時無法使用", None)
            }
            AppError::Notification { message } => ApiError::new("NOTIFICATION_FAILED", message, None),
            AppError::Config { message } => {
                error!(target: "app::api", %message, "configuration error in request");
                ApiError::new("CONFIG_ERROR", message, None)
            }
            AppError::Serialization(err) => {
                error!(target: "app::api", error = %err, "serialization error in request");
                ApiError::new("UNKNOWN", "序列化失敗", None)
            }
            AppError::Io(err) => {
                error!(target: "app::api", error = %err, "io error in request");
                ApiError::new("UNKNOWN", "檔案讀寫失敗", None)
            }
            AppError::Other(message) => {
                error!(target: "app::api", %message, "unexpected error in request");
                ApiError::new("UNKNOWN", message, None)
            }
        }
    }
}
