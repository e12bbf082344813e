use chrono::{NaiveDate, NaiveTime, Timelike};
use serde_json::json;

use crate::error::{AppError, AppResult};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Minutes since midnight of an `HH:MM` or `HH:MM:SS` string; seconds are ignored.
pub fn minutes_of_hhmm(value: &str) -> Option<i64> {
    let mut parts = value.trim().split(':');
    let hours = parts.next()?.parse::<i64>().ok()?;
    let minutes = parts.next()?.parse::<i64>().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    Some(hours * 60 + minutes)
}

/// Hour-of-day of an `HH:MM[:SS]` string.
pub fn hour_of(value: &str) -> Option<u32> {
    let hours = value.trim().split(':').next()?.parse::<u32>().ok()?;
    (hours < 24).then_some(hours)
}

/// The `HH:MM` prefix of a punch time, used for zero-padded string comparison.
pub fn hhmm_prefix(value: &str) -> String {
    value.split(':').take(2).collect::<Vec<_>>().join(":")
}

pub fn parse_time_of_day(value: &str) -> Option<NaiveTime> {
    let trimmed = value.trim();
    NaiveTime::parse_from_str(trimmed, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .ok()
}

pub fn minutes_from_midnight(time: NaiveTime) -> i64 {
    (time.hour() as i64) * 60 + (time.minute() as i64)
}

pub fn parse_date(value: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|err| {
        AppError::validation_with_details(
            "日期格式錯誤，應為 YYYY-MM-DD",
            json!({"value": value, "error": err.to_string()}),
        )
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Validates a `YYYY-MM` month key.
pub fn parse_month(value: &str) -> AppResult<(i32, u32)> {
    let trimmed = value.trim();
    let parsed = trimmed
        .split_once('-')
        .filter(|(year, month)| year.len() == 4 && month.len() == 2)
        .and_then(|(year, month)| Some((year.parse::<i32>().ok()?, month.parse::<u32>().ok()?)))
        .filter(|(_, month)| (1..=12).contains(month));

    parsed.ok_or_else(|| {
        AppError::validation_with_details("月份格式錯誤，應為 YYYY-MM", json!({"value": value}))
    })
}

/// Rounds half away from zero to one decimal place.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
