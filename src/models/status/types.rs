use serde::{Deserialize, Serialize};

/// The live pointer recording which stage/step an order currently occupies.
/// Exactly one row per (order_id, order_type); mutated in place by every
/// transition, never deleted. `version` is the optimistic-concurrency token:
/// every mutation is a compare-and-swap against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWorkflowStatus {
    pub id: i64,
    pub order_id: i64,
    pub order_type: String, // "sales" or "purchase"
    pub order_number: String,
    pub sequence_id: i64,
    pub current_stage_id: i64,
    pub current_stage_code: String,
    pub current_stage_name: String,
    pub current_step_order: i64,
    pub assigned_to_department: Option<String>,
    pub assigned_to_user: Option<i64>,
    pub stage_start_time: String,
    pub expected_completion_time: Option<String>,
    pub is_overdue: bool,
    pub priority_level: String,
    pub notes: Option<String>,
    pub version: i64,
}

/// Fields for the one-time status creation at order persistence.
#[derive(Debug, Clone)]
pub struct NewOrderWorkflow {
    pub order_id: i64,
    pub order_type: String,
    pub order_number: String,
    pub department: Option<String>,
    pub assigned_to_user: Option<i64>,
    pub priority_level: Option<String>,
}

/// A status row that exceeded its stage duration threshold, as selected by
/// the overdue sweep.
#[derive(Debug, Clone)]
pub struct OverdueCandidate {
    pub status_id: i64,
    pub order_id: i64,
    pub order_type: String,
    pub order_number: String,
    pub stage_id: i64,
    pub stage_name: String,
    pub assigned_to_department: Option<String>,
}

/// Per-stage order count for the statistics endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct StageCount {
    pub stage_id: i64,
    pub stage_code: String,
    pub stage_name: String,
    pub order_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowStatistics {
    pub total_orders: i64,
    pub overdue_count: i64,
    pub by_stage: Vec<StageCount>,
    pub avg_stage_duration_seconds: Option<f64>,
}
