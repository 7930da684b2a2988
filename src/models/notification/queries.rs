use rusqlite::{Connection, OptionalExtension, params};

use crate::db;
use crate::errors::AppError;
use super::types::{NewNotification, Notification, NotificationTemplate, PendingDelivery, Scope};

const NOTIFICATION_COLUMNS: &str = "\
    id, notification_type, title, message,
    recipient_user_id, recipient_department, recipient_role,
    related_order_id, related_order_type, related_stage_id,
    priority_level, is_read, is_sent, send_email, send_sms, send_whatsapp,
    send_error, scheduled_send_time, sent_at, read_at, created_at";

fn map_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    Ok(Notification {
        id: row.get("id")?,
        notification_type: row.get("notification_type")?,
        title: row.get("title")?,
        message: row.get("message")?,
        recipient_user_id: row.get("recipient_user_id")?,
        recipient_department: row.get("recipient_department")?,
        recipient_role: row.get("recipient_role")?,
        related_order_id: row.get("related_order_id")?,
        related_order_type: row.get("related_order_type")?,
        related_stage_id: row.get("related_stage_id")?,
        priority_level: row.get("priority_level")?,
        is_read: row.get::<_, i64>("is_read")? != 0,
        is_sent: row.get::<_, i64>("is_sent")? != 0,
        send_email: row.get::<_, i64>("send_email")? != 0,
        send_sms: row.get::<_, i64>("send_sms")? != 0,
        send_whatsapp: row.get::<_, i64>("send_whatsapp")? != 0,
        send_error: row.get("send_error")?,
        scheduled_send_time: row.get("scheduled_send_time")?,
        sent_at: row.get("sent_at")?,
        read_at: row.get("read_at")?,
        created_at: row.get("created_at")?,
    })
}

pub fn insert(conn: &Connection, n: &NewNotification<'_>) -> Result<i64, AppError> {
    if n.recipient.user_id.is_none()
        && n.recipient.department.is_none()
        && n.recipient.role.is_none()
    {
        return Err(AppError::Validation(
            "notification needs a recipient user, department or role".to_string(),
        ));
    }

    let (order_id, order_type, stage_id) = match &n.order {
        Some(link) => (Some(link.order_id), Some(link.order_type), link.stage_id),
        None => (None, None, None),
    };

    conn.execute(
        "INSERT INTO notifications
             (notification_type, title, message,
              recipient_user_id, recipient_department, recipient_role,
              related_order_id, related_order_type, related_stage_id,
              priority_level, send_email, send_sms, send_whatsapp,
              scheduled_send_time, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        params![
            n.notification_type,
            n.title,
            n.message,
            n.recipient.user_id,
            n.recipient.department,
            n.recipient.role,
            order_id,
            order_type,
            stage_id,
            n.priority_level,
            n.send_email as i64,
            n.send_sms as i64,
            n.send_whatsapp as i64,
            n.scheduled_send_time,
            db::now_utc(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Notification, AppError> {
    let sql = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = ?1");
    conn.query_row(&sql, params![id], map_notification)
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                AppError::NotFound(format!("notification {id}"))
            }
            other => AppError::Db(other),
        })
}

pub fn find_template(conn: &Connection, template_code: &str) -> Result<NotificationTemplate, AppError> {
    conn.query_row(
        "SELECT id, template_code, title_template, message_template,
                default_priority, send_email, send_sms, send_whatsapp, is_active
         FROM notification_templates
         WHERE template_code = ?1 AND is_active = 1",
        params![template_code],
        |row| {
            Ok(NotificationTemplate {
                id: row.get("id")?,
                template_code: row.get("template_code")?,
                title_template: row.get("title_template")?,
                message_template: row.get("message_template")?,
                default_priority: row.get("default_priority")?,
                send_email: row.get::<_, i64>("send_email")? != 0,
                send_sms: row.get::<_, i64>("send_sms")? != 0,
                send_whatsapp: row.get::<_, i64>("send_whatsapp")? != 0,
                is_active: row.get::<_, i64>("is_active")? != 0,
            })
        },
    )
    .optional()?
    .ok_or_else(|| AppError::TemplateNotFound(template_code.to_string()))
}

pub fn list_for_scope(
    conn: &Connection,
    scope: Scope<'_>,
    page: i64,
    per_page: i64,
) -> Result<Vec<Notification>, AppError> {
    let page = page.max(1);
    let per_page = per_page.clamp(1, 100);
    let sql = format!(
        "SELECT {NOTIFICATION_COLUMNS} FROM notifications
         WHERE (?1 IS NULL OR recipient_user_id = ?1)
           AND (?2 IS NULL OR recipient_department = ?2)
         ORDER BY is_read ASC, created_at DESC, id DESC
         LIMIT ?3 OFFSET ?4"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            params![scope.user_id, scope.department, per_page, (page - 1) * per_page],
            map_notification,
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn unread_count(conn: &Connection, scope: Scope<'_>) -> Result<i64, AppError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM notifications
         WHERE is_read = 0
           AND (?1 IS NULL OR recipient_user_id = ?1)
           AND (?2 IS NULL OR recipient_department = ?2)",
        params![scope.user_id, scope.department],
        |row| row.get(0),
    )?;
    Ok(count)
}

pub fn mark_read(conn: &Connection, id: i64) -> Result<(), AppError> {
    let updated = conn.execute(
        "UPDATE notifications SET is_read = 1, read_at = ?1 WHERE id = ?2 AND is_read = 0",
        params![db::now_utc(), id],
    )?;
    if updated == 0 {
        // Either missing or already read; only the former is an error
        find_by_id(conn, id)?;
    }
    Ok(())
}

pub fn mark_all_read(conn: &Connection, scope: Scope<'_>) -> Result<usize, AppError> {
    let updated = conn.execute(
        "UPDATE notifications SET is_read = 1, read_at = ?1
         WHERE is_read = 0
           AND (?2 IS NULL OR recipient_user_id = ?2)
           AND (?3 IS NULL OR recipient_department = ?3)",
        params![db::now_utc(), scope.user_id, scope.department],
    )?;
    Ok(updated)
}

/// Delete read notifications older than the threshold. Unread rows are never
/// auto-deleted regardless of age.
pub fn cleanup_old(conn: &Connection, days_to_keep: i64) -> Result<usize, AppError> {
    let cutoff = chrono::Utc::now()
        .checked_sub_signed(chrono::Duration::days(days_to_keep))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
        .unwrap_or_default();
    let deleted = conn.execute(
        "DELETE FROM notifications WHERE is_read = 1 AND created_at < ?1",
        params![cutoff],
    )?;
    Ok(deleted)
}

/// Outbox rows awaiting WhatsApp delivery: unsent, WhatsApp-flagged, not
/// already failed terminally, and past any scheduled send time.
pub fn pending_whatsapp(conn: &Connection, limit: i64) -> Result<Vec<PendingDelivery>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id AS notification_id, message, related_order_id, related_order_type
         FROM notifications
         WHERE is_sent = 0 AND send_whatsapp = 1 AND send_error IS NULL
           AND (scheduled_send_time IS NULL OR scheduled_send_time <= ?1)
         ORDER BY id ASC
         LIMIT ?2",
    )?;
    let rows = stmt
        .query_map(params![db::now_utc(), limit], |row| {
            Ok(PendingDelivery {
                notification_id: row.get("notification_id")?,
                message: row.get("message")?,
                order_id: row.get("related_order_id")?,
                order_type: row.get("related_order_type")?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn mark_sent(conn: &Connection, id: i64) -> Result<(), AppError> {
    conn.execute(
        "UPDATE notifications SET is_sent = 1, sent_at = ?1 WHERE id = ?2",
        params![db::now_utc(), id],
    )?;
    Ok(())
}

/// Record a terminal delivery failure. The row stays for in-app display but
/// is excluded from future outbox runs: no retry, no backoff.
pub fn mark_send_failed(conn: &Connection, id: i64, error: &str) -> Result<(), AppError> {
    conn.execute(
        "UPDATE notifications SET send_error = ?1 WHERE id = ?2",
        params![error, id],
    )?;
    Ok(())
}
