use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::AppError;

/// A runtime setting for display and editing.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SettingDisplay {
    pub id: i64,
    pub name: String,
    pub value: String,
    pub label: String,
    pub description: String,
    pub setting_type: String, // "text", "number", "boolean"
}

pub fn find_all(conn: &Connection) -> Result<Vec<SettingDisplay>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, value, label, description, setting_type
         FROM settings ORDER BY name",
    )?;
    let settings = stmt
        .query_map([], |row| {
            Ok(SettingDisplay {
                id: row.get("id")?,
                name: row.get("name")?,
                value: row.get("value")?,
                label: row.get("label")?,
                description: row.get("description")?,
                setting_type: row.get("setting_type")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(settings)
}

pub fn get(conn: &Connection, name: &str) -> Result<Option<String>, AppError> {
    let value = conn
        .query_row(
            "SELECT value FROM settings WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value)
}

pub fn get_i64(conn: &Connection, name: &str, default: i64) -> i64 {
    get(conn, name)
        .ok()
        .flatten()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

pub fn get_bool(conn: &Connection, name: &str) -> bool {
    matches!(
        get(conn, name).ok().flatten().as_deref(),
        Some("1") | Some("true")
    )
}

pub fn set(conn: &Connection, name: &str, value: &str) -> Result<(), AppError> {
    conn.execute(
        "INSERT INTO settings (name, value) VALUES (?1, ?2)
         ON CONFLICT(name) DO UPDATE SET value = excluded.value",
        params![name, value],
    )?;
    Ok(())
}
