//! The order workflow engine: sequence-driven staged approval for sales and
//! purchase orders.
//!
//! A transition is the transactional pair {status CAS update, history append}.
//! Notification fan-out happens after commit and is best-effort: a failure is
//! logged and the transition stands.

use rusqlite::Connection;

use crate::errors::AppError;
use crate::models::history::{self, NewHistoryEntry};
use crate::models::notification::{OrderLink, Recipient};
use crate::models::sequence::{self, TransitionTable};
use crate::models::stage::{self, Stage};
use crate::models::status::{self, NewOrderWorkflow, OrderWorkflowStatus};
use crate::notifier;
use crate::db;

/// Default assignment department per order type.
const SALES_DEPARTMENT: &str = "المبيعات";
const PURCHASE_DEPARTMENT: &str = "المشتريات";

/// Who performed a transition, for the audit trail.
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub username: &'a str,
    pub department: Option<&'a str>,
    pub notes: Option<&'a str>,
}

pub fn sequence_type_for(order_type: &str) -> Result<&'static str, AppError> {
    match order_type {
        "sales" => Ok("sales_order"),
        "purchase" => Ok("purchase_order"),
        other => Err(AppError::Validation(format!("unknown order type '{other}'"))),
    }
}

fn default_department_for(order_type: &str) -> &'static str {
    if order_type == "purchase" {
        PURCHASE_DEPARTMENT
    } else {
        SALES_DEPARTMENT
    }
}

fn expected_completion(stage: &Stage, from: &str) -> Option<String> {
    let hours = stage.max_duration_hours?;
    let start = db::parse_utc(from)?;
    Some(
        (start + chrono::Duration::hours(hours))
            .format("%Y-%m-%dT%H:%M:%SZ")
            .to_string(),
    )
}

/// Create the workflow status row for a freshly persisted order. Called once
/// by the order-save collaborator; a second call for the same order is a
/// validation error.
pub fn create_status(conn: &mut Connection, new: &NewOrderWorkflow) -> Result<OrderWorkflowStatus, AppError> {
    if status::find(conn, new.order_id, &new.order_type)?.is_some() {
        return Err(AppError::Validation(format!(
            "order {} ({}) already has a workflow status",
            new.order_id, new.order_type
        )));
    }

    let seq_type = sequence_type_for(&new.order_type)?;
    let seq = sequence::default_for_type(conn, seq_type)?;
    let steps = sequence::steps_for_sequence(conn, seq.id)?;
    let first = steps.first().ok_or_else(|| {
        AppError::Validation(format!("sequence '{}' has no steps", seq.sequence_name))
    })?;

    let first_stage = stage::find_by_id(conn, first.stage_id)?;
    let now = db::now_utc();
    let department = new
        .department
        .clone()
        .unwrap_or_else(|| default_department_for(&new.order_type).to_string());
    let expected = expected_completion(&first_stage, &now);
    let priority = new.priority_level.as_deref().unwrap_or("normal");

    let tx = conn.transaction()?;
    status::insert(
        &tx,
        new.order_id,
        &new.order_type,
        &new.order_number,
        seq.id,
        first.stage_id,
        first.step_order,
        Some(&department),
        new.assigned_to_user,
        priority,
        &now,
        expected.as_deref(),
    )?;
    history::append(
        &tx,
        &NewHistoryEntry {
            order_id: new.order_id,
            order_type: &new.order_type,
            from_stage_id: None,
            to_stage_id: first.stage_id,
            from_stage_name: None,
            to_stage_name: &first_stage.stage_name,
            action_type: "advance",
            performed_by_username: "system",
            performed_by_department: Some(&department),
            duration_seconds: None,
            reason: None,
            notes: Some("order created"),
        },
    )?;
    tx.commit()?;

    notify_departments(
        conn,
        "ORDER_CREATED",
        &[department.clone()],
        &new.order_number,
        &first_stage.stage_name,
        new.order_id,
        &new.order_type,
        first.stage_id,
        None,
    );

    status::find(conn, new.order_id, &new.order_type)?
        .ok_or_else(|| AppError::NotFound("workflow status vanished after insert".to_string()))
}

/// Move an order to its next stage. Fails with `NoNextStage` at a terminal
/// stage, which callers treat as "cannot advance further".
pub fn advance(
    conn: &mut Connection,
    order_id: i64,
    order_type: &str,
    actor: Actor<'_>,
) -> Result<OrderWorkflowStatus, AppError> {
    transition(conn, order_id, order_type, actor, TransitionKind::Advance)
}

/// Send an order back to its step's alternative stage. The reason is
/// mandatory here in the core, not just at the UI layer.
pub fn reject(
    conn: &mut Connection,
    order_id: i64,
    order_type: &str,
    actor: Actor<'_>,
    reason: &str,
) -> Result<OrderWorkflowStatus, AppError> {
    if reason.trim().is_empty() {
        return Err(AppError::Validation("a rejection reason is required".to_string()));
    }
    transition(conn, order_id, order_type, actor, TransitionKind::Reject { reason })
}

#[derive(Clone, Copy)]
enum TransitionKind<'a> {
    Advance,
    Reject { reason: &'a str },
}

fn transition(
    conn: &mut Connection,
    order_id: i64,
    order_type: &str,
    actor: Actor<'_>,
    kind: TransitionKind<'_>,
) -> Result<OrderWorkflowStatus, AppError> {
    let current = status::find(conn, order_id, order_type)?.ok_or_else(|| {
        AppError::NotFound(format!("no workflow status for order {order_id} ({order_type})"))
    })?;

    let steps = sequence::steps_for_sequence(conn, current.sequence_id)?;
    let table = TransitionTable::build(&steps);
    let trans = table.for_stage(current.current_stage_id).ok_or_else(|| {
        AppError::NoNextStage(format!(
            "stage '{}' is not a step of sequence {}",
            current.current_stage_code, current.sequence_id
        ))
    })?;

    let (dest_stage_id, action_type, reason) = match kind {
        TransitionKind::Advance => {
            let dest = trans.on_advance.ok_or_else(|| {
                AppError::NoNextStage(format!(
                    "order {} is at terminal stage '{}'",
                    current.order_number, current.current_stage_code
                ))
            })?;
            (dest, "advance", None)
        }
        TransitionKind::Reject { reason } => {
            let dest = trans.on_reject.ok_or_else(|| {
                AppError::NoNextStage(format!(
                    "stage '{}' has no alternative stage to reject to",
                    current.current_stage_code
                ))
            })?;
            (dest, "reject", Some(reason))
        }
    };

    let dest_stage = stage::find_by_id(conn, dest_stage_id)?;
    let dest_step_order = table
        .order_of_stage(dest_stage_id)
        .unwrap_or(current.current_step_order + 1);

    let now = db::now_utc();
    let duration_seconds = db::parse_utc(&current.stage_start_time)
        .zip(db::parse_utc(&now))
        .map(|(start, end)| (end - start).num_seconds().max(0));
    let expected = expected_completion(&dest_stage, &now);

    let tx = conn.transaction()?;
    status::cas_transition(
        &tx,
        current.id,
        current.version,
        dest_stage_id,
        dest_step_order,
        &now,
        expected.as_deref(),
    )?;
    history::append(
        &tx,
        &NewHistoryEntry {
            order_id,
            order_type,
            from_stage_id: Some(current.current_stage_id),
            to_stage_id: dest_stage_id,
            from_stage_name: Some(&current.current_stage_name),
            to_stage_name: &dest_stage.stage_name,
            action_type,
            performed_by_username: actor.username,
            performed_by_department: actor.department,
            duration_seconds,
            reason,
            notes: actor.notes,
        },
    )?;
    tx.commit()?;

    // Best-effort fan-out, after the transition is durable
    match kind {
        TransitionKind::Advance => {
            let departments = match stage::departments_for(conn, dest_stage_id) {
                Ok(d) => d,
                Err(e) => {
                    log::error!("Department lookup for stage {dest_stage_id} failed: {e}");
                    Vec::new()
                }
            };
            if departments.is_empty() {
                log::warn!(
                    "Stage '{}' has no responsible department, skipping notifications",
                    dest_stage.stage_code
                );
            }
            notify_departments(
                conn,
                "ORDER_STAGE_ADVANCED",
                &departments,
                &current.order_number,
                &dest_stage.stage_name,
                order_id,
                order_type,
                dest_stage_id,
                None,
            );
        }
        TransitionKind::Reject { reason } => {
            // Rejections notify back to the side that rejected, not forward
            let dept = actor
                .department
                .map(str::to_string)
                .or(current.assigned_to_department.clone());
            if let Some(dept) = dept {
                notify_departments(
                    conn,
                    "ORDER_STAGE_REJECTED",
                    &[dept],
                    &current.order_number,
                    &dest_stage.stage_name,
                    order_id,
                    order_type,
                    dest_stage_id,
                    Some(reason),
                );
            }
        }
    }

    status::find(conn, order_id, order_type)?
        .ok_or_else(|| AppError::NotFound("workflow status vanished after update".to_string()))
}

#[allow(clippy::too_many_arguments)]
fn notify_departments(
    conn: &Connection,
    template_code: &str,
    departments: &[String],
    order_number: &str,
    stage_name: &str,
    order_id: i64,
    order_type: &str,
    stage_id: i64,
    reason: Option<&str>,
) {
    for department in departments {
        let mut variables = vec![
            ("order_number", order_number.to_string()),
            ("stage_name", stage_name.to_string()),
            ("department", department.clone()),
        ];
        if let Some(reason) = reason {
            variables.push(("reason", reason.to_string()));
        }
        let result = notifier::create_from_template(
            conn,
            template_code,
            &variables,
            Recipient {
                department: Some(department.clone()),
                ..Recipient::default()
            },
            Some(OrderLink {
                order_id,
                order_type,
                stage_id: Some(stage_id),
            }),
        );
        if let Err(e) = result {
            log::error!(
                "Notification '{template_code}' for order {order_number} to '{department}' failed: {e}"
            );
        }
    }
}

pub fn status_for_order(conn: &Connection, order_id: i64, order_type: &str) -> Result<OrderWorkflowStatus, AppError> {
    status::find(conn, order_id, order_type)?.ok_or_else(|| {
        AppError::NotFound(format!("no workflow status for order {order_id} ({order_type})"))
    })
}

pub fn history_for_order(
    conn: &Connection,
    order_id: i64,
    order_type: &str,
) -> Result<Vec<crate::models::history::HistoryEntry>, AppError> {
    history::find_for_order(conn, order_id, order_type)
}

pub fn orders_by_stage(
    conn: &Connection,
    stage_id: i64,
    department: Option<&str>,
) -> Result<Vec<OrderWorkflowStatus>, AppError> {
    status::find_by_stage(conn, stage_id, department)
}

pub fn statistics(
    conn: &Connection,
    department: Option<&str>,
) -> Result<crate::models::status::WorkflowStatistics, AppError> {
    status::statistics(conn, department)
}
