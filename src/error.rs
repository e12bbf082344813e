use serde_json::Value as JsonValue;
use thiserror::Error;
use tracing::{error, warn};

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("資料儲存不可用: {message}")]
    StoreUnavailable { message: String },

    #[error("{message}")]
    NotFound { message: String },

    #[error("資料衝突: {message}")]
    Conflict { message: String },

    #[error("驗證失敗: {message}")]
    Validation {
        message: String,
        details: Option<JsonValue>,
    },

    #[error("推播失敗: {message}")]
    Notification { message: String },

    #[error("設定錯誤: {message}")]
    Config { message: String },

    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO 錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, "validation error");
        AppError::Validation {
            message,
            details: None,
        }
    }

    pub fn validation_with_details(message: impl Into<String>, details: JsonValue) -> Self {
        let message = message.into();
        warn!(target: "app::validation", %message, details = %details, "validation error with details");
        AppError::Validation {
            message,
            details: Some(details),
        }
    }

    pub fn validation_details(&self) -> Option<&JsonValue> {
        match self {
            AppError::Validation { details, .. } => details.as_ref(),
            _ => None,
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::conflict", %message, "conflict error");
        AppError::Conflict { message }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::db", %message, "resource not found");
        AppError::NotFound { message }
    }

    pub fn store_unavailable(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::db", %message, "store unavailable");
        AppError::StoreUnavailable { message }
    }

    pub fn notification(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(target: "app::notify", %message, "notification failed");
        AppError::Notification { message }
    }

    pub fn config(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::config", %message, "configuration error");
        AppError::Config { message }
    }

    pub fn other(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(target: "app::other", %message, "other error");
        AppError::Other(message)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound { .. })
    }

    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable { .. })
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(error: rusqlite::Error) -> Self {
        use rusqlite::Error::{QueryReturnedNoRows, SqliteFailure};
        use rusqlite::ErrorCode;

        match &error {
            QueryReturnedNoRows => AppError::not_found("找不到資料"),
            SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation => {
                AppError::conflict("違反唯一性或約束限制")
            }
            _ => {
                error!(target: "app::db", error = ?error, "sqlite error");
                AppError::store_unavailable(error.to_string())
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::notification(error.to_string())
    }
}
