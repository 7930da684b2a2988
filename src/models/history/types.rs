use serde::{Deserialize, Serialize};

/// One transition in the append-only audit trail. Stage names are the values
/// captured when the transition happened, not a live join, so renaming a
/// stage never rewrites history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    pub order_id: i64,
    pub order_type: String,
    pub from_stage_id: Option<i64>,
    pub to_stage_id: i64,
    pub from_stage_name: Option<String>,
    pub to_stage_name: String,
    pub action_type: String, // "advance", "reject", "return", "reassign"
    pub performed_by_username: String,
    pub performed_by_department: Option<String>,
    pub duration_seconds: Option<i64>,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
}

/// Fields for appending a new audit row.
#[derive(Debug, Clone)]
pub struct NewHistoryEntry<'a> {
    pub order_id: i64,
    pub order_type: &'a str,
    pub from_stage_id: Option<i64>,
    pub to_stage_id: i64,
    pub from_stage_name: Option<&'a str>,
    pub to_stage_name: &'a str,
    pub action_type: &'a str,
    pub performed_by_username: &'a str,
    pub performed_by_department: Option<&'a str>,
    pub duration_seconds: Option<i64>,
    pub reason: Option<&'a str>,
    pub notes: Option<&'a str>,
}
