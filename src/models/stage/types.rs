use serde::{Deserialize, Serialize};

/// A named position an order can occupy in its approval lifecycle.
/// Reference data: created administratively, never deleted once any history
/// row points at it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: i64,
    pub stage_code: String,
    pub stage_name: String,
    pub stage_name_en: Option<String>,
    pub stage_type: String, // "start", "normal", "end", "conditional"
    pub color: Option<String>,
    pub icon: Option<String>,
    pub requires_approval: bool,
    pub max_duration_hours: Option<i64>,
    pub auto_advance: bool,
    pub is_active: bool,
}
