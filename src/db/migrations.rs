use chrono::Utc;
use rusqlite::Connection;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::settings::default_raw_settings;

struct Migration {
    version: i32,
    description: &'static str,
    apply: fn(&Connection) -> AppResult<()>,
    rollback_sql: Option<&'static str>,
}

/// Ordered by version; `user_version` tracks the last one applied.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Seed default attendance settings",
        apply: seed_default_settings,
        rollback_sql: None,
    },
    Migration {
        version: 2,
        description: "Add leave status and anomaly employee indexes",
        apply: add_lookup_indexes,
        rollback_sql: Some(
            r#"
            DROP INDEX IF EXISTS idx_leave_requests_status;
            DROP INDEX IF EXISTS idx_anomaly_log_employee;
            "#,
        ),
    },
];

fn latest_version() -> i32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

fn user_version(conn: &Connection) -> AppResult<i32> {
    Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
}

fn set_user_version(conn: &Connection, version: i32) -> AppResult<()> {
    conn.pragma_update(None, "user_version", version)?;
    Ok(())
}

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL,
            rollback_sql TEXT
        );
        "#,
    )?;

    let current = user_version(conn)?;
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        info!(target: "app::db", version = migration.version, description = migration.description, "applying migration");
        (migration.apply)(conn)?;
        conn.execute(
            "INSERT OR REPLACE INTO migration_history (version, description, applied_at, rollback_sql) VALUES (?1, ?2, ?3, ?4)",
            (
                migration.version,
                migration.description,
                Utc::now().to_rfc3339(),
                migration.rollback_sql,
            ),
        )?;
        set_user_version(conn, migration.version)?;
    }

    if current > latest_version() {
        warn!(target: "app::db", current, latest = latest_version(), "database is newer than this build");
    }
    Ok(())
}

/// Undoes recorded migrations above `target_version`, newest first.
pub fn rollback_to_version(conn: &Connection, target_version: i32) -> AppResult<()> {
    let current = user_version(conn)?;
    if target_version >= current {
        warn!(target: "app::db", target_version, current, "nothing to roll back");
        return Ok(());
    }

    let mut stmt = conn.prepare(
        "SELECT version, rollback_sql FROM migration_history WHERE version > ?1 ORDER BY version DESC",
    )?;
    let recorded = stmt
        .query_map([target_version], |row| {
            Ok((row.get::<_, i32>(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    for (version, rollback_sql) in recorded {
        match rollback_sql {
            Some(sql) => conn.execute_batch(&sql)?,
            None => warn!(target: "app::db", version, "migration has no rollback script"),
        }
        conn.execute("DELETE FROM migration_history WHERE version = ?1", [version])?;
        info!(target: "app::db", version, "migration rolled back");
    }

    set_user_version(conn, target_version)
}

/// Existing values win, so re-seeding never overwrites an admin's edits.
fn seed_default_settings(conn: &Connection) -> AppResult<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO app_settings (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO NOTHING",
    )?;
    for (key, value) in default_raw_settings() {
        stmt.execute((key.as_str(), value.as_str()))?;
    }
    Ok(())
}

fn add_lookup_indexes(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_leave_requests_status
            ON leave_requests(status);
        CREATE INDEX IF NOT EXISTS idx_anomaly_log_employee
            ON anomaly_log(employee_id, date);
        "#,
    )?;
    Ok(())
}
