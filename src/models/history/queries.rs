use rusqlite::{Connection, params};

use crate::db;
use crate::errors::AppError;
use super::types::{HistoryEntry, NewHistoryEntry};

/// Append one audit row. There is deliberately no update or delete query in
/// this module: history rows are immutable once written.
pub fn append(conn: &Connection, entry: &NewHistoryEntry<'_>) -> Result<i64, AppError> {
    conn.execute(
        "INSERT INTO workflow_history
             (order_id, order_type, from_stage_id, to_stage_id,
              from_stage_name, to_stage_name, action_type,
              performed_by_username, performed_by_department,
              duration_seconds, reason, notes, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            entry.order_id,
            entry.order_type,
            entry.from_stage_id,
            entry.to_stage_id,
            entry.from_stage_name,
            entry.to_stage_name,
            entry.action_type,
            entry.performed_by_username,
            entry.performed_by_department,
            entry.duration_seconds,
            entry.reason,
            entry.notes,
            db::now_utc(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Full trail for one order, newest first.
pub fn find_for_order(conn: &Connection, order_id: i64, order_type: &str) -> Result<Vec<HistoryEntry>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, order_id, order_type, from_stage_id, to_stage_id,
                from_stage_name, to_stage_name, action_type,
                performed_by_username, performed_by_department,
                duration_seconds, reason, notes, created_at
         FROM workflow_history
         WHERE order_id = ?1 AND order_type = ?2
         ORDER BY created_at DESC, id DESC",
    )?;
    let entries = stmt
        .query_map(params![order_id, order_type], |row| {
            Ok(HistoryEntry {
                id: row.get("id")?,
                order_id: row.get("order_id")?,
                order_type: row.get("order_type")?,
                from_stage_id: row.get("from_stage_id")?,
                to_stage_id: row.get("to_stage_id")?,
                from_stage_name: row.get("from_stage_name")?,
                to_stage_name: row.get("to_stage_name")?,
                action_type: row.get("action_type")?,
                performed_by_username: row.get("performed_by_username")?,
                performed_by_department: row.get("performed_by_department")?,
                duration_seconds: row.get("duration_seconds")?,
                reason: row.get("reason")?,
                notes: row.get("notes")?,
                created_at: row.get("created_at")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(entries)
}
