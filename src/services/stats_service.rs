use std::sync::Arc;

use serde_json::json;
use tracing::{debug, warn};

use crate::db::repositories::attendance_repository::AttendanceRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::attendance::AttendanceRecord;
use crate::models::stats::{HoursRankingEntry, LateEarlyOverrides, LateEarlyStats};
use crate::services::aggregation::monthly_hours_ranking;
use crate::services::settings_service::SettingsService;
use crate::services::statistics::late_early_stats;
use crate::utils::clock::Clock;
use crate::utils::time::{minutes_of_hhmm, parse_month};

pub struct StatsService {
    db: DbPool,
    settings: Arc<SettingsService>,
    clock: Arc<dyn Clock>,
}

impl StatsService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            settings,
            clock,
        }
    }

    pub fn late_early_stats(
        &self,
        month: Option<&str>,
        overrides: Option<&LateEarlyOverrides>,
    ) -> AppResult<LateEarlyStats> {
        let month = self.resolve_month(month)?;
        let settings = self.settings.get();

        let overrides = overrides.cloned().unwrap_or_default();
        let work_start = checked_hhmm(overrides.work_start_time, settings.work_start_time)?;
        let work_end = checked_hhmm(overrides.work_end_time, settings.work_end_time)?;

        let records = self.month_records(&month);
        Ok(late_early_stats(&records, &month, &work_start, &work_end))
    }

    pub fn hours_ranking(&self, month: Option<&str>) -> AppResult<Vec<HoursRankingEntry>> {
        let month = self.resolve_month(month)?;
        let records = self.month_records(&month);
        Ok(monthly_hours_ranking(&records, &month))
    }

    fn resolve_month(&self, month: Option<&str>) -> AppResult<String> {
        match month.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => {
                parse_month(value)?;
                Ok(value.to_string())
            }
            None => {
                let tz = self.settings.get().timezone;
                Ok(self.clock.today_in(tz).format("%Y-%m").to_string())
            }
        }
    }

    /// Statistics are read-only, so an unreadable store reports an empty month.
    fn month_records(&self, month: &str) -> Vec<AttendanceRecord> {
        match self
            .db
            .with_connection(|conn| AttendanceRepository::list_by_month(conn, month))
        {
            Ok(records) => {
                debug!(target: "app::stats", %month, records = records.len(), "loaded month records");
                records
            }
            Err(err) => {
                warn!(target: "app::stats", %month, error = %err, "attendance records unavailable");
                Vec::new()
            }
        }
    }
}

fn checked_hhmm(candidate: Option<String>, fallback: String) -> AppResult<String> {
    match candidate.map(|value| value.trim().to_string()) {
        None => Ok(fallback),
        Some(value) if value.len() == 5 && minutes_of_hhmm(&value).is_some() => Ok(value),
        Some(value) => Err(AppError::validation_with_details(
            "時間格式錯誤，應為 HH:MM",
            json!({ "value": value }),
        )),
    }
}
