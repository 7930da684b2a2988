use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::AppError;
use super::types::{OrderWorkflowStatus, OverdueCandidate, StageCount, WorkflowStatistics};

const STATUS_SELECT: &str = "\
    SELECT s.id, s.order_id, s.order_type, s.order_number, s.sequence_id,
           s.current_stage_id, st.stage_code AS current_stage_code,
           st.stage_name AS current_stage_name,
           s.current_step_order, s.assigned_to_department, s.assigned_to_user,
           s.stage_start_time, s.expected_completion_time, s.is_overdue,
           s.priority_level, s.notes, s.version
    FROM order_workflow_status s
    JOIN stages st ON st.id = s.current_stage_id";

fn map_status(row: &rusqlite::Row<'_>) -> rusqlite::Result<OrderWorkflowStatus> {
    Ok(OrderWorkflowStatus {
        id: row.get("id")?,
        order_id: row.get("order_id")?,
        order_type: row.get("order_type")?,
        order_number: row.get("order_number")?,
        sequence_id: row.get("sequence_id")?,
        current_stage_id: row.get("current_stage_id")?,
        current_stage_code: row.get("current_stage_code")?,
        current_stage_name: row.get("current_stage_name")?,
        current_step_order: row.get("current_step_order")?,
        assigned_to_department: row.get("assigned_to_department")?,
        assigned_to_user: row.get("assigned_to_user")?,
        stage_start_time: row.get("stage_start_time")?,
        expected_completion_time: row.get("expected_completion_time")?,
        is_overdue: row.get::<_, i64>("is_overdue")? != 0,
        priority_level: row.get("priority_level")?,
        notes: row.get("notes")?,
        version: row.get("version")?,
    })
}

pub fn find(conn: &Connection, order_id: i64, order_type: &str) -> Result<Option<OrderWorkflowStatus>, AppError> {
    let sql = format!("{STATUS_SELECT} WHERE s.order_id = ?1 AND s.order_type = ?2");
    let status = conn
        .query_row(&sql, params![order_id, order_type], map_status)
        .optional()?;
    Ok(status)
}

#[allow(clippy::too_many_arguments)]
pub fn insert(
    conn: &Connection,
    order_id: i64,
    order_type: &str,
    order_number: &str,
    sequence_id: i64,
    stage_id: i64,
    step_order: i64,
    department: Option<&str>,
    assigned_to_user: Option<i64>,
    priority_level: &str,
    stage_start_time: &str,
    expected_completion_time: Option<&str>,
) -> Result<i64, AppError> {
    conn.execute(
        "INSERT INTO order_workflow_status
             (order_id, order_type, order_number, sequence_id, current_stage_id,
              current_step_order, assigned_to_department, assigned_to_user,
              stage_start_time, expected_completion_time, priority_level)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            order_id, order_type, order_number, sequence_id, stage_id, step_order,
            department, assigned_to_user, stage_start_time, expected_completion_time,
            priority_level,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Compare-and-swap transition update. Returns `Conflict` when another
/// transition already bumped the version.
#[allow(clippy::too_many_arguments)]
pub fn cas_transition(
    conn: &Connection,
    status_id: i64,
    expected_version: i64,
    new_stage_id: i64,
    new_step_order: i64,
    stage_start_time: &str,
    expected_completion_time: Option<&str>,
) -> Result<(), AppError> {
    let updated = conn.execute(
        "UPDATE order_workflow_status
         SET current_stage_id = ?1,
             current_step_order = ?2,
             stage_start_time = ?3,
             expected_completion_time = ?4,
             is_overdue = 0,
             version = version + 1
         WHERE id = ?5 AND version = ?6",
        params![
            new_stage_id, new_step_order, stage_start_time, expected_completion_time,
            status_id, expected_version,
        ],
    )?;
    if updated == 0 {
        return Err(AppError::Conflict(format!(
            "workflow status {status_id} was modified concurrently"
        )));
    }
    Ok(())
}

/// Flag a status row as overdue. The `is_overdue = 0` guard makes the sweep
/// idempotent and safe against concurrent sweep instances.
pub fn cas_mark_overdue(conn: &Connection, status_id: i64) -> Result<bool, AppError> {
    let updated = conn.execute(
        "UPDATE order_workflow_status
         SET is_overdue = 1, version = version + 1
         WHERE id = ?1 AND is_overdue = 0",
        params![status_id],
    )?;
    Ok(updated > 0)
}

/// Status rows whose time in stage exceeds the owning stage's threshold
/// (or `default_hours` when the stage sets none), excluding rows already
/// flagged overdue.
pub fn overdue_candidates(conn: &Connection, default_hours: i64) -> Result<Vec<OverdueCandidate>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT s.id AS status_id, s.order_id, s.order_type, s.order_number,
                s.current_stage_id AS stage_id, st.stage_name, s.assigned_to_department
         FROM order_workflow_status s
         JOIN stages st ON st.id = s.current_stage_id
         WHERE s.is_overdue = 0
           AND (julianday('now') - julianday(s.stage_start_time)) * 24.0
               > COALESCE(st.max_duration_hours, ?1)",
    )?;
    let candidates = stmt
        .query_map(params![default_hours], |row| {
            Ok(OverdueCandidate {
                status_id: row.get("status_id")?,
                order_id: row.get("order_id")?,
                order_type: row.get("order_type")?,
                order_number: row.get("order_number")?,
                stage_id: row.get("stage_id")?,
                stage_name: row.get("stage_name")?,
                assigned_to_department: row.get("assigned_to_department")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(candidates)
}

pub fn find_by_stage(
    conn: &Connection,
    stage_id: i64,
    department: Option<&str>,
) -> Result<Vec<OrderWorkflowStatus>, AppError> {
    let sql = format!(
        "{STATUS_SELECT}
         WHERE s.current_stage_id = ?1
           AND (?2 IS NULL OR s.assigned_to_department = ?2)
         ORDER BY s.stage_start_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![stage_id, department], map_status)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn statistics(conn: &Connection, department: Option<&str>) -> Result<WorkflowStatistics, AppError> {
    let total_orders: i64 = conn.query_row(
        "SELECT COUNT(*) FROM order_workflow_status
         WHERE (?1 IS NULL OR assigned_to_department = ?1)",
        params![department],
        |row| row.get(0),
    )?;
    let overdue_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM order_workflow_status
         WHERE is_overdue = 1 AND (?1 IS NULL OR assigned_to_department = ?1)",
        params![department],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(
        "SELECT st.id AS stage_id, st.stage_code, st.stage_name, COUNT(s.id) AS order_count
         FROM order_workflow_status s
         JOIN stages st ON st.id = s.current_stage_id
         WHERE (?1 IS NULL OR s.assigned_to_department = ?1)
         GROUP BY st.id, st.stage_code, st.stage_name
         ORDER BY st.id",
    )?;
    let by_stage = stmt
        .query_map(params![department], |row| {
            Ok(StageCount {
                stage_id: row.get("stage_id")?,
                stage_code: row.get("stage_code")?,
                stage_name: row.get("stage_name")?,
                order_count: row.get("order_count")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let avg_stage_duration_seconds: Option<f64> = conn.query_row(
        "SELECT AVG(duration_seconds) FROM workflow_history
         WHERE duration_seconds IS NOT NULL
           AND (?1 IS NULL OR performed_by_department = ?1)",
        params![department],
        |row| row.get(0),
    )?;

    Ok(WorkflowStatistics {
        total_orders,
        overdue_count,
        by_stage,
        avg_stage_duration_seconds,
    })
}
