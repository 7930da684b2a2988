//! Notification dispatcher: turns workflow events into persisted in-app
//! notification rows and pumps the WhatsApp outbox.
//!
//! The outbox keeps delivery strictly outside the workflow transaction:
//! transitions only insert rows, and the scheduler later attempts delivery.
//! A delivery failure marks the row and moves on; there is no retry.

use rusqlite::Connection;

use crate::errors::AppError;
use crate::models::notification::{self, NewNotification, OrderLink, Recipient};
use crate::models::order;
use crate::db::DbPool;
use crate::whatsapp::MessageGateway;

/// Persist a notification row. This is the outbox insert: nothing is sent
/// here.
pub fn create_notification(conn: &Connection, n: &NewNotification<'_>) -> Result<i64, AppError> {
    notification::insert(conn, n)
}

/// Render the named active template with `{{key}}` substitution and persist
/// the result. Unknown placeholders pass through verbatim; priority and
/// channel flags are inherited from the template.
pub fn create_from_template(
    conn: &Connection,
    template_code: &str,
    variables: &[(&str, String)],
    recipient: Recipient,
    order: Option<OrderLink<'_>>,
) -> Result<i64, AppError> {
    let template = notification::find_template(conn, template_code)?;

    let title = render(&template.title_template, variables);
    let message = render(&template.message_template, variables);

    create_notification(
        conn,
        &NewNotification {
            notification_type: template_code,
            title,
            message,
            recipient,
            order,
            priority_level: template.default_priority.clone(),
            send_email: template.send_email,
            send_sms: template.send_sms,
            send_whatsapp: template.send_whatsapp,
            scheduled_send_time: None,
        },
    )
}

/// Naive global replacement, one pass per supplied variable.
fn render(template: &str, variables: &[(&str, String)]) -> String {
    let mut out = template.to_string();
    for (key, value) in variables {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

/// Pump the WhatsApp outbox: resolve each pending row's counterparty phone
/// and attempt delivery through the gateway. Returns the number of messages
/// delivered. Failures are terminal per row and never bubble up past a log
/// line.
pub async fn dispatch_pending(pool: &DbPool, gateway: &dyn MessageGateway) -> Result<usize, AppError> {
    let pending = {
        let conn = pool.get()?;
        notification::pending_whatsapp(&conn, 50)?
    };

    let mut delivered = 0;
    for item in pending {
        let phone = {
            let conn = pool.get()?;
            match (item.order_id, item.order_type.as_deref()) {
                (Some(order_id), Some(order_type)) => {
                    order::counterparty_phone(&conn, order_id, order_type)?
                }
                // No order linkage means no one to message
                _ => None,
            }
        };

        let Some(phone) = phone else {
            let conn = pool.get()?;
            notification::mark_send_failed(&conn, item.notification_id, "no phone on file")?;
            log::debug!(
                "Notification {} skipped: no counterparty phone",
                item.notification_id
            );
            continue;
        };

        match gateway.send_text(&phone, &item.message, None).await {
            Ok(()) => {
                let conn = pool.get()?;
                notification::mark_sent(&conn, item.notification_id)?;
                delivered += 1;
            }
            Err(e) => {
                log::error!(
                    "WhatsApp delivery for notification {} failed: {e}",
                    item.notification_id
                );
                let conn = pool.get()?;
                notification::mark_send_failed(&conn, item.notification_id, &e.to_string())?;
            }
        }
    }
    Ok(delivered)
}
