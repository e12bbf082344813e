use std::env;
use std::path::PathBuf;
use std::time::Duration;

use dotenvy::dotenv;

use crate::error::{AppError, AppResult};

const DEFAULT_DB_PATH: &str = "data/attendance.sqlite";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LINE_API_BASE_URL: &str = "https://api.line.me";
const DEFAULT_LINE_TIMEOUT_SECS: u64 = 10;

/// Process-level configuration. Business rules live in the settings table instead.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    /// Without a token, pushes go to a no-op notifier.
    pub line_channel_access_token: Option<String>,
    pub line_api_base_url: String,
    pub line_http_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let line_http_timeout = match get("LINE_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::config(format!("LINE_HTTP_TIMEOUT_SECS 必須是正整數: {raw}"))
            })?,
            None => DEFAULT_LINE_TIMEOUT_SECS,
        };

        Ok(Self {
            db_path: get("ATTENDANCE_DB_PATH")
                .unwrap_or_else(|| DEFAULT_DB_PATH.to_string())
                .into(),
            log_dir: get("ATTENDANCE_LOG_DIR")
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())
                .into(),
            line_channel_access_token: get("LINE_CHANNEL_ACCESS_TOKEN"),
            line_api_base_url: get("LINE_API_BASE_URL")
                .unwrap_or_else(|| DEFAULT_LINE_API_BASE_URL.to_string()),
            line_http_timeout: Duration::from_secs(line_http_timeout),
        })
    }
}
