use std::collections::HashMap;

use rusqlite::{named_params, Connection};
use tracing::debug;

use crate::error::AppResult;

/// Flat key/value store behind the business settings.
pub struct SettingsRepository;

impl SettingsRepository {
    /// Every stored pair; rows with a blank key are ignored.
    pub fn load_map(conn: &Connection) -> AppResult<HashMap<String, String>> {
        let mut stmt = conn.prepare("SELECT key, value FROM app_settings")?;
        let pairs = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let map: HashMap<String, String> = pairs
            .into_iter()
            .filter(|(key, _)| !key.trim().is_empty())
            .collect();
        debug!(target: "app::db", stored = map.len(), "loaded settings");
        Ok(map)
    }

    /// Inserts or replaces one value and stamps `updated_at`.
    pub fn upsert(conn: &Connection, key: &str, value: &str) -> AppResult<()> {
        conn.execute(
            r#"
                INSERT INTO app_settings (key, value)
                VALUES (:key, :value)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = CURRENT_TIMESTAMP
            "#,
            named_params! {":key": key, ":value": value},
        )?;
        Ok(())
    }
}
