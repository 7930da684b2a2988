//! Shared test infrastructure: temp-file SQLite databases with the schema
//! applied, plus a canonical sales workflow fixture.

use rusqlite::{Connection, params};
use tempfile::TempDir;

use tijara::db::{self, DbPool, MIGRATIONS};

/// Stage/sequence ids of the canonical fixture, for assertions.
#[allow(dead_code)]
pub struct SalesFixture {
    pub sequence_id: i64,
    pub draft: i64,
    pub review: i64,
    pub approved: i64,
}

pub fn setup_test_db() -> (TempDir, Connection) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let conn = Connection::open(&db_path).expect("Failed to open test DB");

    conn.execute_batch("PRAGMA foreign_keys=ON; PRAGMA journal_mode=WAL;")
        .expect("Failed to set pragmas");
    conn.execute_batch(MIGRATIONS)
        .expect("Failed to run migrations");

    (dir, conn)
}

/// Pool-backed variant for code paths that take a `DbPool`.
#[allow(dead_code)]
pub fn setup_test_pool() -> (TempDir, DbPool) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");
    let pool = db::init_pool(db_path.to_str().expect("utf-8 path"));
    db::run_migrations(&pool);
    (dir, pool)
}

pub fn insert_stage(conn: &Connection, code: &str, name: &str, stage_type: &str, max_hours: Option<i64>) -> i64 {
    conn.execute(
        "INSERT INTO stages (stage_code, stage_name, stage_type, max_duration_hours)
         VALUES (?1, ?2, ?3, ?4)",
        params![code, name, stage_type, max_hours],
    )
    .expect("insert stage");
    conn.last_insert_rowid()
}

pub fn assign_department(conn: &Connection, stage_id: i64, department: &str) {
    conn.execute(
        "INSERT INTO stage_departments (stage_id, department) VALUES (?1, ?2)",
        params![stage_id, department],
    )
    .expect("insert stage department");
}

pub fn insert_sequence(conn: &Connection, name: &str, seq_type: &str, is_default: bool) -> i64 {
    conn.execute(
        "INSERT INTO sequences (sequence_name, sequence_type, is_default, is_active)
         VALUES (?1, ?2, ?3, 1)",
        params![name, seq_type, is_default as i64],
    )
    .expect("insert sequence");
    conn.last_insert_rowid()
}

pub fn insert_step(
    conn: &Connection,
    sequence_id: i64,
    step_order: i64,
    stage_id: i64,
    next_stage_id: Option<i64>,
    alternative_stage_id: Option<i64>,
) {
    conn.execute(
        "INSERT INTO sequence_steps (sequence_id, step_order, stage_id, next_stage_id, alternative_stage_id)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![sequence_id, step_order, stage_id, next_stage_id, alternative_stage_id],
    )
    .expect("insert step");
}

pub fn insert_template(conn: &Connection, code: &str, title: &str, message: &str, send_whatsapp: bool) {
    conn.execute(
        "INSERT INTO notification_templates
             (template_code, title_template, message_template, send_whatsapp)
         VALUES (?1, ?2, ?3, ?4)",
        params![code, title, message, send_whatsapp as i64],
    )
    .expect("insert template");
}

/// Standard Sales: Draft → Review → Approved, with Review owned by "Sales"
/// and Approved by "Finance". Rejection from Review returns to Draft.
pub fn seed_sales_workflow(conn: &Connection) -> SalesFixture {
    let draft = insert_stage(conn, "DRAFT", "Draft", "start", None);
    let review = insert_stage(conn, "REVIEW", "Review", "normal", Some(1));
    let approved = insert_stage(conn, "APPROVED", "Approved", "end", None);

    assign_department(conn, draft, "Sales");
    assign_department(conn, review, "Sales");
    assign_department(conn, approved, "Finance");

    let sequence_id = insert_sequence(conn, "Standard Sales", "sales_order", true);
    insert_step(conn, sequence_id, 1, draft, Some(review), None);
    insert_step(conn, sequence_id, 2, review, Some(approved), Some(draft));
    insert_step(conn, sequence_id, 3, approved, None, Some(review));

    insert_template(
        conn,
        "ORDER_CREATED",
        "New order {{order_number}}",
        "Order {{order_number}} created in stage {{stage_name}}",
        false,
    );
    insert_template(
        conn,
        "ORDER_STAGE_ADVANCED",
        "Order {{order_number}} moved to {{stage_name}}",
        "Order {{order_number}} awaits {{department}} in stage {{stage_name}}",
        true,
    );
    insert_template(
        conn,
        "ORDER_STAGE_REJECTED",
        "Order {{order_number}} rejected",
        "Order {{order_number}} returned to {{stage_name}}. Reason: {{reason}}",
        true,
    );
    insert_template(
        conn,
        "ORDER_OVERDUE",
        "Order {{order_number}} overdue",
        "Order {{order_number}} exceeded its time in stage {{stage_name}}",
        true,
    );

    SalesFixture {
        sequence_id,
        draft,
        review,
        approved,
    }
}

/// A customer with a WhatsApp number and one sales order, returning the
/// order id.
#[allow(dead_code)]
pub fn seed_sales_order(conn: &Connection, order_number: &str, whatsapp: Option<&str>) -> i64 {
    conn.execute(
        "INSERT INTO customers (customer_name, phone, whatsapp_number) VALUES (?1, ?2, ?3)",
        params!["شركة الاختبار", whatsapp, whatsapp],
    )
    .expect("insert customer");
    let customer_id = conn.last_insert_rowid();
    conn.execute(
        "INSERT INTO sales_orders (order_number, customer_id) VALUES (?1, ?2)",
        params![order_number, customer_id],
    )
    .expect("insert sales order");
    conn.last_insert_rowid()
}
