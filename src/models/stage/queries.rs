use rusqlite::{Connection, params};

use crate::errors::AppError;
use super::types::Stage;

const STAGE_COLUMNS: &str = "id, stage_code, stage_name, stage_name_en, stage_type, color, icon, \
     requires_approval, max_duration_hours, auto_advance, is_active";

fn map_stage(row: &rusqlite::Row<'_>) -> rusqlite::Result<Stage> {
    Ok(Stage {
        id: row.get("id")?,
        stage_code: row.get("stage_code")?,
        stage_name: row.get("stage_name")?,
        stage_name_en: row.get("stage_name_en")?,
        stage_type: row.get("stage_type")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        requires_approval: row.get::<_, i64>("requires_approval")? != 0,
        max_duration_hours: row.get("max_duration_hours")?,
        auto_advance: row.get::<_, i64>("auto_advance")? != 0,
        is_active: row.get::<_, i64>("is_active")? != 0,
    })
}

pub fn find_by_id(conn: &Connection, stage_id: i64) -> Result<Stage, AppError> {
    let sql = format!("SELECT {STAGE_COLUMNS} FROM stages WHERE id = ?1");
    conn.query_row(&sql, params![stage_id], map_stage)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::NotFound(format!("stage {stage_id}"))
            }
            other => AppError::Db(other),
        })
}

pub fn find_all_active(conn: &Connection) -> Result<Vec<Stage>, AppError> {
    let sql = format!("SELECT {STAGE_COLUMNS} FROM stages WHERE is_active = 1 ORDER BY id");
    let mut stmt = conn.prepare(&sql)?;
    let stages = stmt
        .query_map([], map_stage)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(stages)
}

/// Departments responsible for a stage: the notification fan-out targets.
pub fn departments_for(conn: &Connection, stage_id: i64) -> Result<Vec<String>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT department FROM stage_departments WHERE stage_id = ?1 ORDER BY department",
    )?;
    let departments = stmt
        .query_map(params![stage_id], |row| row.get(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(departments)
}
