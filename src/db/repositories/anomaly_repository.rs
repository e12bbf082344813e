use std::convert::TryFrom;

use rusqlite::{named_params, Connection, Row};

use crate::error::{AppError, AppResult};
use crate::models::anomaly::{Anomaly, AnomalyDetails, AnomalyRecord, AnomalyType, Severity};

#[derive(Debug, Clone)]
pub struct AnomalyRow {
    pub id: i64,
    pub date: String,
    pub detected_at: String,
    pub employee_id: String,
    pub employee_name: String,
    pub anomaly_type: String,
    pub severity: String,
    pub message: String,
    pub details: String,
}

impl AnomalyRow {
    pub fn into_record(self) -> AppResult<AnomalyRecord> {
        let anomaly_type =
            AnomalyType::try_from(self.anomaly_type.as_str()).map_err(AppError::validation)?;
        let severity = Severity::try_from(self.severity.as_str()).map_err(AppError::validation)?;
        let details: AnomalyDetails = serde_json::from_str(&self.details)?;

        Ok(AnomalyRecord {
            id: self.id,
            anomaly: Anomaly {
                anomaly_type,
                severity,
                employee_id: self.employee_id,
                employee_name: self.employee_name,
                message: self.message,
                detected_at: self.detected_at,
                date: self.date,
                details,
            },
        })
    }
}

impl TryFrom<&Row<'_>> for AnomalyRow {
    type Error = rusqlite::Error;

    fn try_from(row: &Row<'_>) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.get("id")?,
            date: row.get("date")?,
            detected_at: row.get("detected_at")?,
            employee_id: row.get("employee_id")?,
            employee_name: row.get("employee_name")?,
            anomaly_type: row.get("anomaly_type")?,
            severity: row.get("severity")?,
            message: row.get("message")?,
            details: row.get("details")?,
        })
    }
}

/// Append-only log; rows are never updated.
pub struct AnomalyRepository;

impl AnomalyRepository {
    pub fn append(conn: &Connection, anomaly: &Anomaly) -> AppResult<i64> {
        let details = serde_json::to_string(&anomaly.details)?;

        conn.execute(
            r#"
                INSERT INTO anomaly_log (
                    date,
                    detected_at,
                    employee_id,
                    employee_name,
                    anomaly_type,
                    severity,
                    message,
                    details
                ) VALUES (
                    :date,
                    :detected_at,
                    :employee_id,
                    :employee_name,
                    :anomaly_type,
                    :severity,
                    :message,
                    :details
                )
            "#,
            named_params! {
                ":date": &anomaly.date,
                ":detected_at": &anomaly.detected_at,
                ":employee_id": &anomaly.employee_id,
                ":employee_name": &anomaly.employee_name,
                ":anomaly_type": anomaly.anomaly_type.as_str(),
                ":severity": anomaly.severity.as_str(),
                ":message": &anomaly.message,
                ":details": &details,
            },
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Inclusive `YYYY-MM-DD` range.
    pub fn list_between(
        conn: &Connection,
        start_date: &str,
        end_date: &str,
    ) -> AppResult<Vec<AnomalyRecord>> {
        let mut stmt = conn.prepare(
            r#"
                SELECT
                    id,
                    date,
                    detected_at,
                    employee_id,
                    employee_name,
                    anomaly_type,
                    severity,
                    message,
                    details
                FROM anomaly_log
                WHERE date >= :start_date AND date <= :end_date
                ORDER BY id ASC
            "#,
        )?;

        let records = stmt
            .query_map(
                named_params! {":start_date": start_date, ":end_date": end_date},
                |row| AnomalyRow::try_from(row),
            )?
            .map(|row| row.map_err(AppError::from).and_then(|row| row.into_record()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(records)
    }

    pub fn list_by_date(conn: &Connection, date: &str) -> AppResult<Vec<AnomalyRecord>> {
        Self::list_between(conn, date, date)
    }
}
