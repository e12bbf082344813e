use std::collections::HashMap;

use chrono_tz::Tz;
use regex::Regex;
use serde_json::json;
use tracing::{info, warn};

use crate::db::repositories::settings_repository::SettingsRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::settings::{
    default_raw_settings, AttendanceSettings, KEY_EARLY_THRESHOLD, KEY_ENABLE_ALERTS,
    KEY_ENABLE_LOCATION_CHECK, KEY_ENABLE_REMINDERS, KEY_EVENING_REMINDER_TIME,
    KEY_LATE_THRESHOLD, KEY_MORNING_REMINDER_TIME, KEY_STORE_LATITUDE, KEY_STORE_LONGITUDE,
    KEY_STORE_RADIUS, KEY_TIMEZONE, KEY_WORK_END_TIME, KEY_WORK_START_TIME, KNOWN_KEYS,
};

const HHMM_PATTERN: &str = r"^([0-1][0-9]|2[0-3]):[0-5][0-9]$";

/// Business settings backed by the `app_settings` table.
///
/// Nothing is cached: every read goes to the store so a change made by one
/// caller is seen by the next computation.
pub struct SettingsService {
    db: DbPool,
}

impl SettingsService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Stored values layered over the defaults.
    pub fn try_get_raw(&self) -> AppResult<HashMap<String, String>> {
        let stored = self.db.with_connection(SettingsRepository::load_map)?;
        let mut merged = default_raw_settings();
        merged.extend(stored);
        Ok(merged)
    }

    /// Like [`Self::try_get_raw`] but an unreadable store yields the defaults.
    pub fn get_raw(&self) -> HashMap<String, String> {
        self.try_get_raw().unwrap_or_else(|err| {
            warn!(target: "app::settings", error = %err, "settings unavailable, using defaults");
            default_raw_settings()
        })
    }

    pub fn get(&self) -> AttendanceSettings {
        AttendanceSettings::from_raw(&self.get_raw())
    }

    /// Validates and stores known keys in one transaction; unknown keys are ignored.
    pub fn update(&self, changes: &HashMap<String, String>) -> AppResult<AttendanceSettings> {
        let errors = validate_settings(changes)?;
        if !errors.is_empty() {
            return Err(AppError::validation_with_details(
                errors.join("；"),
                json!({ "errors": errors }),
            ));
        }

        let mut pairs: Vec<(String, String)> = changes
            .iter()
            .filter(|(key, _)| KNOWN_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.trim().to_string()))
            .collect();
        pairs.sort();

        let ignored = changes.len() - pairs.len();
        if ignored > 0 {
            warn!(target: "app::settings", ignored, "ignoring unknown setting keys");
        }

        if !pairs.is_empty() {
            self.db.with_transaction(|tx| {
                pairs
                    .iter()
                    .try_for_each(|(key, value)| SettingsRepository::upsert(tx, key, value))
            })?;
            info!(target: "app::settings", updated = pairs.len(), "settings updated");
        }

        Ok(AttendanceSettings::from_raw(&self.try_get_raw()?))
    }
}

/// Human-readable problems with the supplied values, empty when all are valid.
/// Only keys present in `changes` are checked.
pub fn validate_settings(changes: &HashMap<String, String>) -> AppResult<Vec<String>> {
    let hhmm = Regex::new(HHMM_PATTERN)
        .map_err(|err| AppError::other(format!("時間格式規則無效: {err}")))?;
    let mut errors = Vec::new();
    let value_of = |key: &str| changes.get(key).map(|value| value.trim());

    for (key, label) in [
        (KEY_WORK_START_TIME, "上班時間"),
        (KEY_WORK_END_TIME, "下班時間"),
        (KEY_MORNING_REMINDER_TIME, "早上提醒時間"),
        (KEY_EVENING_REMINDER_TIME, "晚上提醒時間"),
    ] {
        if let Some(value) = value_of(key) {
            if !hhmm.is_match(value) {
                errors.push(format!("{label}格式錯誤，應為 HH:MM"));
            }
        }
    }

    if let Some(value) = value_of(KEY_STORE_LATITUDE) {
        if !in_range(value, -90.0, 90.0) {
            errors.push("緯度必須在 -90 到 90 之間".to_string());
        }
    }

    if let Some(value) = value_of(KEY_STORE_LONGITUDE) {
        if !in_range(value, -180.0, 180.0) {
            errors.push("經度必須在 -180 到 180 之間".to_string());
        }
    }

    if let Some(value) = value_of(KEY_STORE_RADIUS) {
        if !is_non_negative_int(value) {
            errors.push("打卡範圍必須是正整數".to_string());
        }
    }

    for (key, label) in [
        (KEY_LATE_THRESHOLD, "遲到容忍分鐘數"),
        (KEY_EARLY_THRESHOLD, "早退容忍分鐘數"),
    ] {
        if let Some(value) = value_of(key) {
            if !is_non_negative_int(value) {
                errors.push(format!("{label}必須是非負整數"));
            }
        }
    }

    for (key, label) in [
        (KEY_ENABLE_ALERTS, "啟用異常警報"),
        (KEY_ENABLE_REMINDERS, "啟用提醒"),
        (KEY_ENABLE_LOCATION_CHECK, "啟用位置驗證"),
    ] {
        if let Some(value) = value_of(key) {
            if value != "true" && value != "false" {
                errors.push(format!("{label}必須是 true 或 false"));
            }
        }
    }

    if let Some(value) = value_of(KEY_TIMEZONE) {
        if value.parse::<Tz>().is_err() {
            errors.push(format!("時區無效: {value}"));
        }
    }

    Ok(errors)
}

fn in_range(value: &str, min: f64, max: f64) -> bool {
    value
        .parse::<f64>()
        .map(|parsed| parsed.is_finite() && parsed >= min && parsed <= max)
        .unwrap_or(false)
}

fn is_non_negative_int(value: &str) -> bool {
    value.parse::<i64>().map(|parsed| parsed >= 0).unwrap_or(false)
}
