use serde::{Deserialize, Serialize};

/// One outbound message attempt, persisted before any delivery is tried.
/// Unsent WhatsApp-flagged rows form the delivery outbox.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub recipient_user_id: Option<i64>,
    pub recipient_department: Option<String>,
    pub recipient_role: Option<String>,
    pub related_order_id: Option<i64>,
    pub related_order_type: Option<String>,
    pub related_stage_id: Option<i64>,
    pub priority_level: String,
    pub is_read: bool,
    pub is_sent: bool,
    pub send_email: bool,
    pub send_sms: bool,
    pub send_whatsapp: bool,
    pub send_error: Option<String>,
    pub scheduled_send_time: Option<String>,
    pub sent_at: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
}

/// Recipient of a new notification. At least one axis must be set.
#[derive(Debug, Clone, Default)]
pub struct Recipient {
    pub user_id: Option<i64>,
    pub department: Option<String>,
    pub role: Option<String>,
}

/// Link back to the order a notification is about; also drives counterparty
/// phone resolution for WhatsApp delivery.
#[derive(Debug, Clone, Copy)]
pub struct OrderLink<'a> {
    pub order_id: i64,
    pub order_type: &'a str,
    pub stage_id: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct NewNotification<'a> {
    pub notification_type: &'a str,
    pub title: String,
    pub message: String,
    pub recipient: Recipient,
    pub order: Option<OrderLink<'a>>,
    pub priority_level: String,
    pub send_email: bool,
    pub send_sms: bool,
    pub send_whatsapp: bool,
    pub scheduled_send_time: Option<String>,
}

/// Read-side filter: a user id, a department, or both ANDed together.
#[derive(Debug, Clone, Copy, Default)]
pub struct Scope<'a> {
    pub user_id: Option<i64>,
    pub department: Option<&'a str>,
}

/// A `{{variable}}`-substituted message template, read-only at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationTemplate {
    pub id: i64,
    pub template_code: String,
    pub title_template: String,
    pub message_template: String,
    pub default_priority: String,
    pub send_email: bool,
    pub send_sms: bool,
    pub send_whatsapp: bool,
    pub is_active: bool,
}

/// An outbox row awaiting delivery; the counterparty phone is resolved from
/// the order linkage at dispatch time.
#[derive(Debug, Clone)]
pub struct PendingDelivery {
    pub notification_id: i64,
    pub message: String,
    pub order_id: Option<i64>,
    pub order_type: Option<String>,
}
