use std::sync::Arc;

use chrono::Duration;
use tracing::{info, warn};

use crate::db::repositories::anomaly_repository::AnomalyRepository;
use crate::db::repositories::attendance_repository::AttendanceRepository;
use crate::db::repositories::employee_repository::EmployeeRepository;
use crate::db::DbPool;
use crate::error::{AppError, AppResult};
use crate::models::anomaly::{Anomaly, AnomalyRecord, AnomalyStats};
use crate::models::employee::Employee;
use crate::services::anomaly_detector::check_all_anomalies;
use crate::services::settings_service::SettingsService;
use crate::utils::clock::Clock;
use crate::utils::time::{format_date, parse_date};

const DEFAULT_STATS_WINDOW_DAYS: i64 = 30;

pub struct AnomalyService {
    db: DbPool,
    settings: Arc<SettingsService>,
    clock: Arc<dyn Clock>,
}

impl AnomalyService {
    pub fn new(db: DbPool, settings: Arc<SettingsService>, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            settings,
            clock,
        }
    }

    /// Runs every check for today's active employees and appends what fires
    /// to the anomaly log.
    ///
    /// A failed record read is returned as an error: treating it as "no
    /// punches" would report every employee as missing.
    pub fn check_today(&self) -> AppResult<Vec<Anomaly>> {
        let settings = self.settings.get();
        let now = self.clock.now_in(settings.timezone);
        let today = format_date(now.date_naive());

        let (employees, records) = self.db.with_connection(|conn| {
            let employees: Vec<Employee> = EmployeeRepository::list_all(conn)?
                .into_iter()
                .filter(Employee::is_active)
                .collect();
            let records = AttendanceRepository::list_by_date(conn, &today)?;
            Ok((employees, records))
        })?;

        let anomalies = check_all_anomalies(&records, &employees, &settings, now);

        if !anomalies.is_empty() {
            self.db.with_transaction(|tx| {
                for anomaly in &anomalies {
                    AnomalyRepository::append(tx, anomaly)?;
                }
                Ok(())
            })?;
        }

        info!(
            target: "app::anomaly",
            date = %today,
            employees = employees.len(),
            records = records.len(),
            anomalies = anomalies.len(),
            "anomaly check finished"
        );
        Ok(anomalies)
    }

    /// Logged anomalies dated today; empty if the log cannot be read.
    pub fn today_anomalies(&self) -> Vec<AnomalyRecord> {
        let tz = self.settings.get().timezone;
        let today = format_date(self.clock.today_in(tz));

        self.db
            .with_connection(|conn| AnomalyRepository::list_by_date(conn, &today))
            .unwrap_or_else(|err| {
                warn!(target: "app::anomaly", error = %err, "anomaly log unavailable");
                Vec::new()
            })
    }

    /// Counts over an inclusive date range, defaulting to the last 30 days.
    pub fn anomaly_stats(
        &self,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> AppResult<AnomalyStats> {
        let tz = self.settings.get().timezone;
        let today = self.clock.today_in(tz);

        let end = match end_date {
            Some(value) => parse_date(value)?,
            None => today,
        };
        let start = match start_date {
            Some(value) => parse_date(value)?,
            None => today - Duration::days(DEFAULT_STATS_WINDOW_DAYS),
        };
        if start > end {
            return Err(AppError::validation("開始日期不可晚於結束日期"));
        }

        let (start, end) = (format_date(start), format_date(end));
        let records = self
            .db
            .with_connection(|conn| AnomalyRepository::list_between(conn, &start, &end))
            .unwrap_or_else(|err| {
                warn!(target: "app::anomaly", error = %err, "anomaly log unavailable, reporting empty stats");
                Vec::new()
            });

        Ok(summarize_anomalies(&records))
    }
}

pub fn summarize_anomalies(records: &[AnomalyRecord]) -> AnomalyStats {
    records
        .iter()
        .fold(AnomalyStats::default(), |mut stats, record| {
            let anomaly = &record.anomaly;
            let kind = anomaly.anomaly_type.as_str().to_string();

            stats.total += 1;
            *stats.by_type.entry(kind.clone()).or_default() += 1;
            *stats
                .by_severity
                .entry(anomaly.severity.as_str().to_string())
                .or_default() += 1;

            let employee = stats
                .by_employee
                .entry(anomaly.employee_name.clone())
                .or_default();
            employee.count += 1;
            *employee.types.entry(kind).or_default() += 1;

            stats
        })
}
