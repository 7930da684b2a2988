use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};

pub type DbPool = Pool<SqliteConnectionManager>;

pub const MIGRATIONS: &str = include_str!("schema.sql");

pub fn init_pool(database_url: &str) -> DbPool {
    let manager = SqliteConnectionManager::file(database_url).with_init(|conn| {
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(())
    });
    Pool::builder()
        .max_size(8)
        .build(manager)
        .expect("Failed to create DB pool")
}

pub fn run_migrations(pool: &DbPool) {
    let conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.execute_batch(MIGRATIONS)
        .expect("Failed to run migrations");
    log::info!("Database migrations complete");
}

/// Current UTC time in the canonical column format (RFC 3339, seconds).
pub fn now_utc() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

/// Parse a stored timestamp back into a chrono instant.
pub fn parse_utc(value: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    chrono::DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&chrono::Utc))
}

/// Seed the stage catalog, default sequences, notification templates and
/// settings if the database is empty. Idempotent: skipped when any stage
/// already exists.
pub fn seed_defaults(pool: &DbPool) {
    let conn = pool.get().expect("Failed to get DB connection for seeding");

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM stages", [], |row| row.get(0))
        .unwrap_or(0);
    if count > 0 {
        log::info!("Database already seeded ({} stages), skipping seed", count);
        return;
    }

    seed_catalog(&conn).expect("Failed to seed workflow catalog");
    log::info!("Default workflow catalog seed complete");
}

fn insert_stage(
    conn: &Connection,
    code: &str,
    name: &str,
    name_en: &str,
    stage_type: &str,
    color: &str,
    max_hours: Option<i64>,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO stages (stage_code, stage_name, stage_name_en, stage_type, color, max_duration_hours)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![code, name, name_en, stage_type, color, max_hours],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_step(
    conn: &Connection,
    sequence_id: i64,
    step_order: i64,
    stage_id: i64,
    next_stage_id: Option<i64>,
    alternative_stage_id: Option<i64>,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO sequence_steps (sequence_id, step_order, stage_id, next_stage_id, alternative_stage_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![sequence_id, step_order, stage_id, next_stage_id, alternative_stage_id],
    )?;
    Ok(())
}

fn seed_catalog(conn: &Connection) -> rusqlite::Result<()> {
    // Stage catalog shared by the sales and purchase flows
    let draft = insert_stage(conn, "DRAFT", "مسودة", "Draft", "start", "#9e9e9e", None)?;
    let review = insert_stage(conn, "REVIEW", "قيد المراجعة", "Under Review", "normal", "#ff9800", Some(24))?;
    let approved = insert_stage(conn, "APPROVED", "معتمد", "Approved", "normal", "#2196f3", Some(48))?;
    let done = insert_stage(conn, "COMPLETED", "مكتمل", "Completed", "end", "#4caf50", None)?;

    for (stage_id, department) in [
        (review, "المبيعات"),
        (review, "المشتريات"),
        (approved, "المالية"),
        (done, "المستودع"),
    ] {
        conn.execute(
            "INSERT INTO stage_departments (stage_id, department) VALUES (?1, ?2)",
            params![stage_id, department],
        )?;
    }

    for (name, seq_type) in [
        ("مسار المبيعات القياسي", "sales_order"),
        ("مسار المشتريات القياسي", "purchase_order"),
    ] {
        conn.execute(
            "INSERT INTO sequences (sequence_name, sequence_type, is_default, is_active)
             VALUES (?1, ?2, 1, 1)",
            params![name, seq_type],
        )?;
        let seq_id = conn.last_insert_rowid();
        insert_step(conn, seq_id, 1, draft, Some(review), None)?;
        insert_step(conn, seq_id, 2, review, Some(approved), Some(draft))?;
        insert_step(conn, seq_id, 3, approved, Some(done), Some(review))?;
        insert_step(conn, seq_id, 4, done, None, None)?;
    }

    let templates: [(&str, &str, &str, &str, i64); 4] = [
        (
            "ORDER_CREATED",
            "طلب جديد {{order_number}}",
            "تم إنشاء الطلب {{order_number}} وهو الآن في مرحلة {{stage_name}}",
            "normal",
            0,
        ),
        (
            "ORDER_STAGE_ADVANCED",
            "الطلب {{order_number}} انتقل إلى {{stage_name}}",
            "الطلب {{order_number}} بانتظار إجراء قسم {{department}} في مرحلة {{stage_name}}",
            "normal",
            1,
        ),
        (
            "ORDER_STAGE_REJECTED",
            "تم رفض الطلب {{order_number}}",
            "أعيد الطلب {{order_number}} إلى مرحلة {{stage_name}}. السبب: {{reason}}",
            "high",
            1,
        ),
        (
            "ORDER_OVERDUE",
            "الطلب {{order_number}} متأخر",
            "تجاوز الطلب {{order_number}} المدة المسموحة في مرحلة {{stage_name}}",
            "urgent",
            1,
        ),
    ];
    for (code, title, message, priority, whatsapp) in templates {
        conn.execute(
            "INSERT INTO notification_templates
                 (template_code, title_template, message_template, default_priority, send_whatsapp)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![code, title, message, priority, whatsapp],
        )?;
    }

    let settings: [(&str, &str, &str, &str); 7] = [
        ("whatsapp.enabled", "0", "تفعيل واتساب", "boolean"),
        ("whatsapp.api_url", "https://graph.facebook.com/v18.0", "عنوان واجهة واتساب", "text"),
        ("whatsapp.api_token", "", "رمز واتساب", "text"),
        ("whatsapp.phone_number_id", "", "معرف رقم واتساب", "text"),
        ("whatsapp.display_name", "نظام الطلبات", "اسم المرسل", "text"),
        ("workflow.default_stage_hours", "24", "المدة الافتراضية للمرحلة (ساعات)", "number"),
        ("notifications.retention_days", "30", "مدة حفظ الإشعارات (أيام)", "number"),
    ];
    for (name, value, label, setting_type) in settings {
        conn.execute(
            "INSERT INTO settings (name, value, label, setting_type) VALUES (?1, ?2, ?3, ?4)",
            params![name, value, label, setting_type],
        )?;
    }

    Ok(())
}
