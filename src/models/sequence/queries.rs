use rusqlite::{Connection, params};

use crate::errors::AppError;
use super::types::{Sequence, SequenceStep};

fn map_sequence(row: &rusqlite::Row<'_>) -> rusqlite::Result<Sequence> {
    Ok(Sequence {
        id: row.get("id")?,
        sequence_name: row.get("sequence_name")?,
        sequence_type: row.get("sequence_type")?,
        is_default: row.get::<_, i64>("is_default")? != 0,
        is_active: row.get::<_, i64>("is_active")? != 0,
    })
}

/// The single active default sequence for an order type.
///
/// Zero matches is a `NotFound`; more than one is ambiguous configuration and
/// is refused rather than resolved first-row-wins.
pub fn default_for_type(conn: &Connection, sequence_type: &str) -> Result<Sequence, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, sequence_name, sequence_type, is_default, is_active
         FROM sequences
         WHERE sequence_type = ?1 AND is_default = 1 AND is_active = 1",
    )?;
    let mut matches = stmt
        .query_map(params![sequence_type], map_sequence)?
        .collect::<Result<Vec<_>, _>>()?;

    match matches.len() {
        0 => Err(AppError::NotFound(format!(
            "no default active sequence for type '{sequence_type}'"
        ))),
        1 => Ok(matches.remove(0)),
        n => Err(AppError::Validation(format!(
            "{n} default sequences configured for type '{sequence_type}'"
        ))),
    }
}

pub fn find_all_active(conn: &Connection) -> Result<Vec<Sequence>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, sequence_name, sequence_type, is_default, is_active
         FROM sequences WHERE is_active = 1 ORDER BY sequence_type, id",
    )?;
    let sequences = stmt
        .query_map([], map_sequence)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(sequences)
}

/// Steps of a sequence in `step_order` ascending, joined with stage display
/// names. An empty result means the sequence cannot host a workflow.
pub fn steps_for_sequence(conn: &Connection, sequence_id: i64) -> Result<Vec<SequenceStep>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT ss.id, ss.sequence_id, ss.step_order, ss.stage_id,
                st.stage_code, st.stage_name,
                ss.next_stage_id, ss.alternative_stage_id, ss.is_optional, ss.conditions
         FROM sequence_steps ss
         JOIN stages st ON st.id = ss.stage_id
         WHERE ss.sequence_id = ?1
         ORDER BY ss.step_order ASC",
    )?;
    let steps = stmt
        .query_map(params![sequence_id], |row| {
            Ok(SequenceStep {
                id: row.get("id")?,
                sequence_id: row.get("sequence_id")?,
                step_order: row.get("step_order")?,
                stage_id: row.get("stage_id")?,
                stage_code: row.get("stage_code")?,
                stage_name: row.get("stage_name")?,
                next_stage_id: row.get("next_stage_id")?,
                alternative_stage_id: row.get("alternative_stage_id")?,
                is_optional: row.get::<_, i64>("is_optional")? != 0,
                conditions: row.get("conditions")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(steps)
}

/// Publish-time checks for one sequence. Returns human-readable findings;
/// an empty list means the sequence is safe to run orders through.
pub fn validate_sequence(conn: &Connection, sequence_id: i64) -> Result<Vec<String>, AppError> {
    let steps = steps_for_sequence(conn, sequence_id)?;
    let mut findings = Vec::new();

    if steps.is_empty() {
        findings.push(format!("sequence {sequence_id} has no steps"));
        return Ok(findings);
    }

    for (i, step) in steps.iter().enumerate() {
        let expected = i as i64 + 1;
        if step.step_order != expected {
            findings.push(format!(
                "sequence {sequence_id}: step order {} found where {} expected",
                step.step_order, expected
            ));
        }
    }

    let stage_ids: Vec<i64> = steps.iter().map(|s| s.stage_id).collect();
    for step in &steps {
        for (label, dest) in [("next", step.next_stage_id), ("alternative", step.alternative_stage_id)] {
            let Some(dest_id) = dest else { continue };
            if !stage_ids.contains(&dest_id) {
                findings.push(format!(
                    "sequence {sequence_id}, step {}: {label} stage {dest_id} is not a step of the sequence",
                    step.step_order
                ));
                continue;
            }
            let stage = crate::models::stage::find_by_id(conn, dest_id)?;
            if !stage.is_active {
                findings.push(format!(
                    "sequence {sequence_id}, step {}: {label} stage '{}' is inactive",
                    step.step_order, stage.stage_code
                ));
            }
        }
        // Every advance destination needs someone to notify
        if let Some(dest_id) = step.next_stage_id {
            let departments = crate::models::stage::departments_for(conn, dest_id)?;
            if departments.is_empty() {
                findings.push(format!(
                    "sequence {sequence_id}, step {}: destination stage {dest_id} has no responsible department",
                    step.step_order
                ));
            }
        }
    }

    // A linear sequence should end on a terminal step
    if steps.last().is_some_and(|s| s.next_stage_id.is_some()) {
        findings.push(format!(
            "sequence {sequence_id}: last step is not terminal (next stage still set)"
        ));
    }

    Ok(findings)
}

/// Validate every active sequence plus the one-default-per-type rule.
/// Run at startup and exposed on the admin API.
pub fn validate_all(conn: &Connection) -> Result<Vec<String>, AppError> {
    let mut findings = Vec::new();

    for seq_type in ["sales_order", "purchase_order"] {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM sequences WHERE sequence_type = ?1 AND is_default = 1 AND is_active = 1",
            params![seq_type],
            |row| row.get(0),
        )?;
        match count {
            0 => findings.push(format!("no default sequence for type '{seq_type}'")),
            1 => {}
            n => findings.push(format!("{n} default sequences for type '{seq_type}'")),
        }
    }

    for sequence in find_all_active(conn)? {
        findings.extend(validate_sequence(conn, sequence.id)?);
    }

    Ok(findings)
}
