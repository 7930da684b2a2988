//! Overdue detection: a pull-based sweep over live status rows, invoked by
//! the scheduler and by the cron endpoint.

use rusqlite::Connection;

use crate::errors::AppError;
use crate::models::notification::{OrderLink, Recipient};
use crate::models::{setting, status};
use crate::notifier;

/// Hours an order may sit in a stage that sets no `max_duration_hours`,
/// unless overridden by the `workflow.default_stage_hours` setting.
pub const DEFAULT_STAGE_HOURS: i64 = 24;

/// Flag every status row that outstayed its stage threshold and notify the
/// assigned department. Returns how many rows were newly flagged.
///
/// Idempotent: flagged rows are excluded from the candidate query, and the
/// flag itself is set with an `is_overdue = 0` guard, so concurrent sweep
/// instances cannot double-notify.
pub fn sweep(conn: &Connection) -> Result<usize, AppError> {
    let default_hours = setting::get_i64(conn, "workflow.default_stage_hours", DEFAULT_STAGE_HOURS);
    let candidates = status::overdue_candidates(conn, default_hours)?;

    let mut flagged = 0;
    for candidate in candidates {
        if !status::cas_mark_overdue(conn, candidate.status_id)? {
            // Another sweep instance claimed this row first
            continue;
        }
        flagged += 1;
        log::info!(
            "Order {} ({}) is overdue in stage '{}'",
            candidate.order_number,
            candidate.order_type,
            candidate.stage_name
        );

        let Some(department) = candidate.assigned_to_department.clone() else {
            log::warn!(
                "Overdue order {} has no assigned department, skipping notification",
                candidate.order_number
            );
            continue;
        };
        let variables = [
            ("order_number", candidate.order_number.clone()),
            ("stage_name", candidate.stage_name.clone()),
            ("department", department.clone()),
        ];
        let result = notifier::create_from_template(
            conn,
            "ORDER_OVERDUE",
            &variables,
            Recipient {
                department: Some(department),
                ..Recipient::default()
            },
            Some(OrderLink {
                order_id: candidate.order_id,
                order_type: &candidate.order_type,
                stage_id: Some(candidate.stage_id),
            }),
        );
        if let Err(e) = result {
            log::error!(
                "Overdue notification for order {} failed: {e}",
                candidate.order_number
            );
        }
    }
    Ok(flagged)
}
