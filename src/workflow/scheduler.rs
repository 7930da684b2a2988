use std::time::Duration;

use crate::db::DbPool;
use crate::models::{notification, setting};
use crate::notifier;
use crate::whatsapp::WhatsAppClient;

/// Spawn the periodic maintenance loop: overdue sweep, WhatsApp outbox pump,
/// and notification retention cleanup.
pub fn spawn_scheduler(pool: DbPool) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(300)); // 5 minutes
        loop {
            interval.tick().await;
            log::info!("Running workflow scheduler");
            run_once(&pool).await;
        }
    });
}

pub async fn run_once(pool: &DbPool) {
    let conn = match pool.get() {
        Ok(c) => c,
        Err(e) => {
            log::error!("Scheduler: failed to get DB connection: {e}");
            return;
        }
    };

    match super::overdue::sweep(&conn) {
        Ok(0) => {}
        Ok(n) => log::info!("Overdue sweep flagged {n} order(s)"),
        Err(e) => log::error!("Overdue sweep failed: {e}"),
    }

    // Outbox pump; rows stay pending while the provider is unconfigured
    match WhatsAppClient::from_settings(&conn) {
        Ok(gateway) => match notifier::dispatch_pending(pool, &gateway).await {
            Ok(0) => {}
            Ok(n) => log::info!("Delivered {n} WhatsApp notification(s)"),
            Err(e) => log::error!("Outbox dispatch failed: {e}"),
        },
        Err(e) => log::debug!("WhatsApp not configured, skipping outbox: {e}"),
    }

    let retention_days = setting::get_i64(&conn, "notifications.retention_days", 30);
    match notification::cleanup_old(&conn, retention_days) {
        Ok(0) => {}
        Ok(n) => log::info!("Cleaned up {n} read notification(s)"),
        Err(e) => log::error!("Notification cleanup failed: {e}"),
    }
}
