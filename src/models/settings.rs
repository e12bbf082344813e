use std::collections::HashMap;

use chrono_tz::Tz;
use serde::{Serialize, Serializer};
use tracing::warn;

use crate::utils::time::minutes_of_hhmm;

pub const KEY_WORK_START_TIME: &str = "workStartTime";
pub const KEY_WORK_END_TIME: &str = "workEndTime";
pub const KEY_LATE_THRESHOLD: &str = "lateThreshold";
pub const KEY_EARLY_THRESHOLD: &str = "earlyThreshold";
pub const KEY_ENABLE_ALERTS: &str = "enableAlerts";
pub const KEY_ENABLE_REMINDERS: &str = "enableReminders";
pub const KEY_ENABLE_LOCATION_CHECK: &str = "enableLocationCheck";
pub const KEY_STORE_LATITUDE: &str = "storeLatitude";
pub const KEY_STORE_LONGITUDE: &str = "storeLongitude";
pub const KEY_STORE_RADIUS: &str = "storeRadius";
pub const KEY_STORE_ADDRESS: &str = "storeAddress";
pub const KEY_MORNING_REMINDER_TIME: &str = "morningReminderTime";
pub const KEY_EVENING_REMINDER_TIME: &str = "eveningReminderTime";
pub const KEY_TIMEZONE: &str = "timezone";

pub const KNOWN_KEYS: [&str; 14] = [
    KEY_WORK_START_TIME,
    KEY_WORK_END_TIME,
    KEY_LATE_THRESHOLD,
    KEY_EARLY_THRESHOLD,
    KEY_ENABLE_ALERTS,
    KEY_ENABLE_REMINDERS,
    KEY_ENABLE_LOCATION_CHECK,
    KEY_STORE_LATITUDE,
    KEY_STORE_LONGITUDE,
    KEY_STORE_RADIUS,
    KEY_STORE_ADDRESS,
    KEY_MORNING_REMINDER_TIME,
    KEY_EVENING_REMINDER_TIME,
    KEY_TIMEZONE,
];

/// Raw defaults, in the same string form the settings table stores.
pub fn default_raw_settings() -> HashMap<String, String> {
    [
        (KEY_WORK_START_TIME, "09:00"),
        (KEY_WORK_END_TIME, "18:00"),
        (KEY_LATE_THRESHOLD, "15"),
        (KEY_EARLY_THRESHOLD, "15"),
        (KEY_ENABLE_ALERTS, "false"),
        (KEY_ENABLE_REMINDERS, "true"),
        (KEY_ENABLE_LOCATION_CHECK, "true"),
        (KEY_STORE_LATITUDE, "24.8356"),
        (KEY_STORE_LONGITUDE, "121.0145"),
        (KEY_STORE_RADIUS, "50000"),
        (KEY_STORE_ADDRESS, "30268新竹縣竹北市縣政二路422號1樓"),
        (KEY_MORNING_REMINDER_TIME, "09:00"),
        (KEY_EVENING_REMINDER_TIME, "18:00"),
        (KEY_TIMEZONE, "Asia/Taipei"),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.to_string()))
    .collect()
}

/// Typed view of the key/value settings table, parsed once per read.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSettings {
    pub work_start_time: String,
    pub work_end_time: String,
    pub late_threshold_minutes: i64,
    pub early_threshold_minutes: i64,
    pub enable_alerts: bool,
    pub enable_reminders: bool,
    pub enable_location_check: bool,
    pub store_latitude: f64,
    pub store_longitude: f64,
    pub store_radius_meters: f64,
    pub store_address: String,
    pub morning_reminder_time: String,
    pub evening_reminder_time: String,
    #[serde(serialize_with = "serialize_tz")]
    pub timezone: Tz,
}

impl Default for AttendanceSettings {
    fn default() -> Self {
        Self {
            work_start_time: "09:00".to_string(),
            work_end_time: "18:00".to_string(),
            late_threshold_minutes: 15,
            early_threshold_minutes: 15,
            enable_alerts: false,
            enable_reminders: true,
            enable_location_check: true,
            store_latitude: 24.8356,
            store_longitude: 121.0145,
            store_radius_meters: 50_000.0,
            store_address: "30268新竹縣竹北市縣政二路422號1樓".to_string(),
            morning_reminder_time: "09:00".to_string(),
            evening_reminder_time: "18:00".to_string(),
            timezone: chrono_tz::Asia::Taipei,
        }
    }
}

impl AttendanceSettings {
    /// Builds typed settings from raw strings. Absent keys take their default;
    /// unparsable values also take their default and are logged.
    pub fn from_raw(raw: &HashMap<String, String>) -> Self {
        let defaults = Self::default();

        Self {
            work_start_time: hhmm_or(raw, KEY_WORK_START_TIME, defaults.work_start_time),
            work_end_time: hhmm_or(raw, KEY_WORK_END_TIME, defaults.work_end_time),
            late_threshold_minutes: parsed_or(
                raw,
                KEY_LATE_THRESHOLD,
                defaults.late_threshold_minutes,
            ),
            early_threshold_minutes: parsed_or(
                raw,
                KEY_EARLY_THRESHOLD,
                defaults.early_threshold_minutes,
            ),
            enable_alerts: parsed_or(raw, KEY_ENABLE_ALERTS, defaults.enable_alerts),
            enable_reminders: parsed_or(raw, KEY_ENABLE_REMINDERS, defaults.enable_reminders),
            enable_location_check: parsed_or(
                raw,
                KEY_ENABLE_LOCATION_CHECK,
                defaults.enable_location_check,
            ),
            store_latitude: parsed_or(raw, KEY_STORE_LATITUDE, defaults.store_latitude),
            store_longitude: parsed_or(raw, KEY_STORE_LONGITUDE, defaults.store_longitude),
            store_radius_meters: parsed_or(raw, KEY_STORE_RADIUS, defaults.store_radius_meters),
            store_address: raw
                .get(KEY_STORE_ADDRESS)
                .cloned()
                .unwrap_or(defaults.store_address),
            morning_reminder_time: hhmm_or(
                raw,
                KEY_MORNING_REMINDER_TIME,
                defaults.morning_reminder_time,
            ),
            evening_reminder_time: hhmm_or(
                raw,
                KEY_EVENING_REMINDER_TIME,
                defaults.evening_reminder_time,
            ),
            timezone: parsed_or(raw, KEY_TIMEZONE, defaults.timezone),
        }
    }

    pub fn work_start_minutes(&self) -> i64 {
        minutes_of_hhmm(&self.work_start_time).unwrap_or(9 * 60)
    }

    pub fn work_end_minutes(&self) -> i64 {
        minutes_of_hhmm(&self.work_end_time).unwrap_or(18 * 60)
    }
}

fn parsed_or<T>(raw: &HashMap<String, String>, key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    match raw.get(key) {
        None => default,
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!(target: "app::settings", key, value = %value, "unparsable setting, using default");
                default
            }
        },
    }
}

/// Stored times are re-rendered as zero-padded `HH:MM`; statistics compare them as strings.
fn hhmm_or(raw: &HashMap<String, String>, key: &str, default: String) -> String {
    let Some(value) = raw.get(key) else {
        return default;
    };
    match minutes_of_hhmm(value) {
        Some(minutes) => format!("{:02}:{:02}", minutes / 60, minutes % 60),
        None => {
            warn!(target: "app::settings", key, value = %value, "invalid HH:MM setting, using default");
            default
        }
    }
}

fn serialize_tz<S>(tz: &Tz, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(tz.name())
}
