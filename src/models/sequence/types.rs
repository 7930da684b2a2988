use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// An ordered approval path for one order type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sequence {
    pub id: i64,
    pub sequence_name: String,
    pub sequence_type: String, // "sales_order" or "purchase_order"
    pub is_default: bool,
    pub is_active: bool,
}

/// One position within a sequence, joined with stage display data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceStep {
    pub id: i64,
    pub sequence_id: i64,
    pub step_order: i64,
    pub stage_id: i64,
    pub stage_code: String,
    pub stage_name: String,
    pub next_stage_id: Option<i64>,
    pub alternative_stage_id: Option<i64>,
    pub is_optional: bool,
    pub conditions: Option<String>,
}

/// Destinations reachable from one stage of a sequence.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub step_order: i64,
    pub on_advance: Option<i64>,
    pub on_reject: Option<i64>,
}

/// Explicit transition table built once from the sequence steps, so that a
/// terminal or unconfigured destination is a plain lookup miss instead of an
/// empty join result.
#[derive(Debug)]
pub struct TransitionTable {
    by_stage: HashMap<i64, Transition>,
}

impl TransitionTable {
    pub fn build(steps: &[SequenceStep]) -> Self {
        let by_stage = steps
            .iter()
            .map(|s| {
                (
                    s.stage_id,
                    Transition {
                        step_order: s.step_order,
                        on_advance: s.next_stage_id,
                        on_reject: s.alternative_stage_id,
                    },
                )
            })
            .collect();
        TransitionTable { by_stage }
    }

    pub fn for_stage(&self, stage_id: i64) -> Option<Transition> {
        self.by_stage.get(&stage_id).copied()
    }

    /// The step order a given stage occupies in the sequence, if any.
    pub fn order_of_stage(&self, stage_id: i64) -> Option<i64> {
        self.by_stage.get(&stage_id).map(|t| t.step_order)
    }
}
