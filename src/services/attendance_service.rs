use std::sync::Arc;

use tracing::{debug, info};

use crate::db::repositories::attendance_repository::AttendanceRepository;
use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::attendance::{
    AttendanceRecord, AttendanceRecordFilter, DailySession, DateRange, GeoLocation, PunchInput,
};
use crate::services::aggregation::{build_daily_sessions, session_minutes};
use crate::services::settings_service::SettingsService;
use crate::utils::clock::Clock;
use crate::utils::geo::distance_meters;
use crate::utils::time::{format_date, parse_date, DATE_FORMAT, TIME_FORMAT};

pub struct AttendanceService {
    db: DbPool,
    settings: Arc<SettingsService>,
    clock: Arc<dyn Clock>,
}

impl AttendanceService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            settings,
            clock,
        }
    }

    /// Records a clock-in or clock-out for a registered, active employee.
    pub fn punch(&self, input: PunchInput) -> AppResult<AttendanceRecord> {
        let employee = self
            .db
            .with_connection(|conn| EmployeeRepository::find(conn, &input.employee_id))?
            .ok_or_else(|| AppError::not_found("尚未註冊，請先完成員工註冊"))?;
        if !employee.is_active() {
            return Err(AppError::validation("帳號已停用，無法打卡"));
        }

        let settings = self.settings.get();
        if settings.enable_location_check {
            if let Some(location) = input.location {
                let store = GeoLocation {
                    latitude: settings.store_latitude,
                    longitude: settings.store_longitude,
                };
                let distance = distance_meters(location, store);
                if distance > settings.store_radius_meters {
                    return Err(AppError::validation(format!(
                        "超出打卡範圍（距離 {:.0} 公尺，允許 {:.0} 公尺）",
                        distance, settings.store_radius_meters
                    )));
                }
                debug!(target: "app::attendance", user_id = %employee.user_id, distance, "punch location accepted");
            }
        }

        let now = self.clock.now_in(settings.timezone);
        let record = AttendanceRecord {
            employee_id: employee.user_id.clone(),
            employee_name: employee.name.clone(),
            event_type: input.event_type,
            date: now.format(DATE_FORMAT).to_string(),
            time: now.format(TIME_FORMAT).to_string(),
            full_timestamp: now.to_rfc3339(),
            location: input.location,
        };

        self.db
            .with_connection(|conn| AttendanceRepository::append(conn, &record))?;

        info!(
            target: "app::attendance",
            user_id = %record.employee_id,
            event_type = %record.event_type,
            time = %record.time,
            "punch recorded"
        );
        Ok(record)
    }

    pub fn today_records(&self, employee_id: &str) -> AppResult<Vec<AttendanceRecord>> {
        let today = self.today_key();
        let records = self
            .db
            .with_connection(|conn| AttendanceRepository::list_by_date(conn, &today))?;
        Ok(records
            .into_iter()
            .filter(|record| record.employee_id == employee_id)
            .collect())
    }

    pub fn list_records(&self, filter: &AttendanceRecordFilter) -> AppResult<Vec<AttendanceRecord>> {
        for bound in [&filter.start_date, &filter.end_date].into_iter().flatten() {
            parse_date(bound)?;
        }
        self.db
            .with_connection(|conn| AttendanceRepository::list_filtered(conn, filter))
    }

    pub fn daily_sessions(
        &self,
        employee_id: Option<&str>,
        range: Option<DateRange>,
    ) -> AppResult<Vec<DailySession>> {
        let filter = AttendanceRecordFilter {
            employee_id: employee_id.map(str::to_string),
            start_date: range.map(|range| format_date(range.start)),
            end_date: range.map(|range| format_date(range.end)),
        };
        let records = self.list_records(&filter)?;
        Ok(build_daily_sessions(&records, employee_id, range))
    }

    /// Valid worked minutes for a session, `None` if incomplete or out of bounds.
    pub fn work_minutes(&self, session: &DailySession) -> Option<f64> {
        session_minutes(session)
    }

    fn today_key(&self) -> String {
        let tz = self.settings.get().timezone;
        format_date(self.clock.today_in(tz))
    }
}
