use rusqlite::{Connection, OptionalExtension, params};

use crate::errors::AppError;

/// Phone number of the order's counterparty for WhatsApp delivery: the
/// customer for a sales order, the supplier for a purchase order. The
/// dedicated WhatsApp number wins over the plain phone; `None` when neither
/// is on file (delivery then no-ops).
pub fn counterparty_phone(
    conn: &Connection,
    order_id: i64,
    order_type: &str,
) -> Result<Option<String>, AppError> {
    let sql = match order_type {
        "sales" => {
            "SELECT COALESCE(NULLIF(c.whatsapp_number, ''), NULLIF(c.phone, ''))
             FROM sales_orders o
             JOIN customers c ON c.id = o.customer_id
             WHERE o.id = ?1"
        }
        "purchase" => {
            "SELECT COALESCE(NULLIF(s.whatsapp_number, ''), NULLIF(s.phone, ''))
             FROM purchase_orders o
             JOIN suppliers s ON s.id = o.supplier_id
             WHERE o.id = ?1"
        }
        other => {
            return Err(AppError::Validation(format!("unknown order type '{other}'")));
        }
    };
    let phone: Option<Option<String>> = conn
        .query_row(sql, params![order_id], |row| row.get(0))
        .optional()?;
    Ok(phone.flatten())
}
