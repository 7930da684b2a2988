//! Engine behavior: status creation, advance/reject transitions, audit
//! trail ordering, and optimistic concurrency.

mod common;

use rusqlite::params;

use tijara::errors::AppError;
use tijara::models::status::{self, NewOrderWorkflow};
use tijara::workflow::{self, Actor};

fn new_order(order_id: i64) -> NewOrderWorkflow {
    NewOrderWorkflow {
        order_id,
        order_type: "sales".to_string(),
        order_number: format!("SO-{order_id}"),
        department: Some("Sales".to_string()),
        assigned_to_user: None,
        priority_level: None,
    }
}

fn actor<'a>() -> Actor<'a> {
    Actor {
        username: "alice",
        department: Some("Sales"),
        notes: None,
    }
}

#[test]
fn create_lands_on_first_step_with_one_history_row() {
    let (_dir, mut conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);

    let status = workflow::create_status(&mut conn, &new_order(1)).unwrap();

    assert_eq!(status.current_stage_id, fixture.draft);
    assert_eq!(status.current_step_order, 1);
    assert_eq!(status.assigned_to_department.as_deref(), Some("Sales"));
    assert!(!status.is_overdue);
    assert_eq!(status.version, 1);

    let history = workflow::history_for_order(&conn, 1, "sales").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].from_stage_id, None);
    assert_eq!(history[0].to_stage_id, fixture.draft);
    assert_eq!(history[0].action_type, "advance");
    assert_eq!(history[0].notes.as_deref(), Some("order created"));
}

#[test]
fn create_twice_is_a_validation_error() {
    let (_dir, mut conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);

    workflow::create_status(&mut conn, &new_order(1)).unwrap();
    let err = workflow::create_status(&mut conn, &new_order(1)).unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[test]
fn create_without_default_sequence_is_not_found() {
    let (_dir, mut conn) = common::setup_test_db();
    // No sequences seeded at all
    let err = workflow::create_status(&mut conn, &new_order(1)).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[test]
fn advance_is_monotonic_until_terminal() {
    let (_dir, mut conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);

    workflow::create_status(&mut conn, &new_order(1)).unwrap();

    let status = workflow::advance(&mut conn, 1, "sales", actor()).unwrap();
    assert_eq!(status.current_stage_id, fixture.review);
    assert_eq!(status.current_step_order, 2);

    let status = workflow::advance(&mut conn, 1, "sales", actor()).unwrap();
    assert_eq!(status.current_stage_id, fixture.approved);
    assert_eq!(status.current_step_order, 3);

    let err = workflow::advance(&mut conn, 1, "sales", actor()).unwrap_err();
    assert!(matches!(err, AppError::NoNextStage(_)), "got {err:?}");

    // Terminal failure leaves the status untouched
    let status = workflow::status_for_order(&conn, 1, "sales").unwrap();
    assert_eq!(status.current_stage_id, fixture.approved);
}

#[test]
fn advance_notifies_destination_departments() {
    let (_dir, mut conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);
    workflow::create_status(&mut conn, &new_order(7)).unwrap();

    workflow::advance(&mut conn, 7, "sales", actor()).unwrap();
    let dept: String = conn
        .query_row(
            "SELECT recipient_department FROM notifications
             WHERE notification_type = 'ORDER_STAGE_ADVANCED' AND related_order_id = 7",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dept, "Sales");

    workflow::advance(&mut conn, 7, "sales", actor()).unwrap();
    let dept: String = conn
        .query_row(
            "SELECT recipient_department FROM notifications
             WHERE notification_type = 'ORDER_STAGE_ADVANCED' AND related_order_id = 7
             ORDER BY id DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dept, "Finance");
}

#[test]
fn advance_missing_order_is_not_found() {
    let (_dir, mut conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);
    let err = workflow::advance(&mut conn, 99, "sales", actor()).unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[test]
fn reject_requires_a_reason() {
    let (_dir, mut conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);
    workflow::create_status(&mut conn, &new_order(1)).unwrap();
    workflow::advance(&mut conn, 1, "sales", actor()).unwrap();

    for blank in ["", "   ", "\t\n"] {
        let err = workflow::reject(&mut conn, 1, "sales", actor(), blank).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
    }

    // Nothing was written for the refused attempts
    let history = workflow::history_for_order(&conn, 1, "sales").unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|h| h.action_type != "reject"));
}

#[test]
fn reject_returns_to_alternative_stage_with_reason() {
    let (_dir, mut conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);
    workflow::create_status(&mut conn, &new_order(1)).unwrap();
    workflow::advance(&mut conn, 1, "sales", actor()).unwrap();

    let status = workflow::reject(&mut conn, 1, "sales", actor(), "missing signature").unwrap();
    assert_eq!(status.current_stage_id, fixture.draft);
    assert_eq!(status.current_step_order, 1);

    let history = workflow::history_for_order(&conn, 1, "sales").unwrap();
    assert_eq!(history[0].action_type, "reject");
    assert_eq!(history[0].reason.as_deref(), Some("missing signature"));
    assert_eq!(history[0].from_stage_id, Some(fixture.review));
    assert_eq!(history[0].to_stage_id, fixture.draft);

    // The rejection notifies back to the rejecting department
    let dept: String = conn
        .query_row(
            "SELECT recipient_department FROM notifications
             WHERE notification_type = 'ORDER_STAGE_REJECTED' AND related_order_id = 1",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(dept, "Sales");
}

#[test]
fn reject_from_stage_without_alternative_fails() {
    let (_dir, mut conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);
    workflow::create_status(&mut conn, &new_order(1)).unwrap();

    // Draft has no alternative stage configured
    let err = workflow::reject(&mut conn, 1, "sales", actor(), "nope").unwrap_err();
    assert!(matches!(err, AppError::NoNextStage(_)), "got {err:?}");
}

#[test]
fn history_is_returned_newest_first() {
    let (_dir, mut conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);
    workflow::create_status(&mut conn, &new_order(1)).unwrap();
    workflow::advance(&mut conn, 1, "sales", actor()).unwrap();
    workflow::advance(&mut conn, 1, "sales", actor()).unwrap();

    let history = workflow::history_for_order(&conn, 1, "sales").unwrap();
    assert_eq!(history.len(), 3);
    // Insertion order reversed: ids strictly descending
    assert!(history.windows(2).all(|w| w[0].id > w[1].id));
    assert_eq!(history[0].to_stage_id, fixture.approved);
    assert_eq!(history[2].from_stage_id, None);

    // Captured display names survive a stage rename
    conn.execute(
        "UPDATE stages SET stage_name = 'Renamed' WHERE id = ?1",
        params![fixture.review],
    )
    .unwrap();
    let history = workflow::history_for_order(&conn, 1, "sales").unwrap();
    assert_eq!(history[1].to_stage_name, "Review");
}

#[test]
fn stale_version_update_is_a_conflict() {
    let (_dir, mut conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);
    workflow::create_status(&mut conn, &new_order(1)).unwrap();

    let before = workflow::status_for_order(&conn, 1, "sales").unwrap();

    // Another request advances the order first
    workflow::advance(&mut conn, 1, "sales", actor()).unwrap();

    // Writing with the stale version token must fail
    let err = status::cas_transition(
        &conn,
        before.id,
        before.version,
        fixture.review,
        2,
        &before.stage_start_time,
        None,
    )
    .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");
}

#[test]
fn transition_records_duration_in_previous_stage() {
    let (_dir, mut conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);
    workflow::create_status(&mut conn, &new_order(1)).unwrap();

    // Backdate the stage entry to get a non-zero duration
    conn.execute(
        "UPDATE order_workflow_status
         SET stage_start_time = strftime('%Y-%m-%dT%H:%M:%SZ', 'now', '-90 seconds')
         WHERE order_id = 1",
        [],
    )
    .unwrap();

    workflow::advance(&mut conn, 1, "sales", actor()).unwrap();
    let history = workflow::history_for_order(&conn, 1, "sales").unwrap();
    let duration = history[0].duration_seconds.unwrap();
    assert!((85..=95).contains(&duration), "duration was {duration}");
}

#[test]
fn statistics_counts_orders_per_stage() {
    let (_dir, mut conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);
    for order_id in 1..=3 {
        workflow::create_status(&mut conn, &new_order(order_id)).unwrap();
    }
    workflow::advance(&mut conn, 3, "sales", actor()).unwrap();

    let stats = workflow::statistics(&conn, None).unwrap();
    assert_eq!(stats.total_orders, 3);
    assert_eq!(stats.overdue_count, 0);
    let draft_count = stats
        .by_stage
        .iter()
        .find(|s| s.stage_id == fixture.draft)
        .map(|s| s.order_count)
        .unwrap_or(0);
    assert_eq!(draft_count, 2);

    let in_review = workflow::orders_by_stage(&conn, fixture.review, None).unwrap();
    assert_eq!(in_review.len(), 1);
    assert_eq!(in_review[0].order_id, 3);
}
