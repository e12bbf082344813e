use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::models::attendance::{AttendanceRecord, AttendanceRecordFilter, EventType, GeoLocation};

#[derive(Debug, Clone)]
pub struct AttendanceRow {
    pub id: i64,
    pub employee_id: String,
    pub employee_name: String,
    pub event_type: String,
    pub date: String,
    pub time: String,
    pub full_timestamp: String,
    pub location: Option<String>,
}

impl AttendanceRow {
    pub fn into_record(self) -> AppResult<AttendanceRecord> {
        let event_type =
            EventType::try_from(self.event_type.as_str()).map_err(AppError::validation)?;

        let location = match self.location.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                let parsed = GeoLocation::parse(raw);
                if parsed.is_none() {
                    warn!(target: "app::attendance", id = self.id, location = %raw, "ignoring unparsable punch location");
                }
                parsed
            }
            _ => None,
        };

        Ok(AttendanceRecord {
            employee_id: self.employee_id,
            employee_name: self.employee_name,
            event_type,
            date: self.date,
            time: self.time,
            full_timestamp: self.full_timestamp,
            location,
        })
    }
}

impl TryFrom<&Row<'_>> for AttendanceRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            employee_id: row.get("employee_id")?,
            employee_name: row.get("employee_name")?,
            event_type: row.get("event_type")?,
            date: row.get("date")?,
            time: row.get("time")?,
            full_timestamp: row.get("full_timestamp")?,
            location: row.get("location")?,
        })
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        id,
        employee_id,
        employee_name,
        event_type,
        date,
        time,
        full_timestamp,
        location
    FROM attendance_records
"#;

pub struct AttendanceRepository;

impl AttendanceRepository {
    pub fn append(conn: &Connection, record: &AttendanceRecord) -> AppResult<i64> {
        let location = record.location.map(|loc| loc.to_string());

        conn.execute(
            r#"
                INSERT INTO attendance_records (
                    employee_id,
                    employee_name,
                    event_type,
                    date,
                    time,
                    full_timestamp,
                    location
                ) VALUES (
                    :employee_id,
                    :employee_name,
                    :event_type,
                    :date,
                    :time,
                    :full_timestamp,
                    :location
                )
            "#,
            named_params! {
                ":employee_id": &record.employee_id,
                ":employee_name": &record.employee_name,
                ":event_type": record.event_type.as_str(),
                ":date": &record.date,
                ":time": &record.time,
                ":full_timestamp": &record.full_timestamp,
                ":location": &location,
            },
        )?;

        Ok(conn.last_insert_rowid())
    }

    pub fn list_by_date(conn: &Connection, date: &str) -> AppResult<Vec<AttendanceRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE date = :date ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(named_params! {":date": date}, |row| {
                AttendanceRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_records(rows))
    }

    /// `month` is a `YYYY-MM` prefix of the record date.
    pub fn list_by_month(conn: &Connection, month: &str) -> AppResult<Vec<AttendanceRecord>> {
        let sql = format!("{SELECT_COLUMNS} WHERE substr(date, 1, 7) = :month ORDER BY id ASC");
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(named_params! {":month": month}, |row| {
                AttendanceRow::try_from(row)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_records(rows))
    }

    pub fn list_filtered(
        conn: &Connection,
        filter: &AttendanceRecordFilter,
    ) -> AppResult<Vec<AttendanceRecord>> {
        let sql = format!(
            r#"{SELECT_COLUMNS}
            WHERE (:employee_id IS NULL OR employee_id = :employee_id)
              AND (:start_date IS NULL OR date >= :start_date)
              AND (:end_date IS NULL OR date <= :end_date)
            ORDER BY id ASC"#
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(
                named_params! {
                    ":employee_id": &filter.employee_id,
                    ":start_date": &filter.start_date,
                    ":end_date": &filter.end_date,
                },
                |row| AttendanceRow::try_from(row),
            )?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(into_records(rows))
    }
}

/// Rows with an unknown punch type are skipped rather than failing the whole read.
fn into_records(rows: Vec<AttendanceRow>) -> Vec<AttendanceRecord> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id;
            match row.into_record() {
                Ok(record) => Some(record),
                Err(err) => {
                    warn!(target: "app::attendance", id, error = %err, "skipping malformed attendance row");
                    None
                }
            }
        })
        .collect()
}
