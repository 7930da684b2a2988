//! Sequence resolution, the transition table, and publish-time validation.

mod common;

use tijara::errors::AppError;
use tijara::models::sequence::{self, TransitionTable};

#[test]
fn default_sequence_is_resolved_per_type() {
    let (_dir, conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);

    let seq = sequence::default_for_type(&conn, "sales_order").unwrap();
    assert_eq!(seq.id, fixture.sequence_id);
    assert_eq!(seq.sequence_name, "Standard Sales");

    let err = sequence::default_for_type(&conn, "purchase_order").unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");
}

#[test]
fn ambiguous_defaults_are_refused() {
    let (_dir, conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);
    common::insert_sequence(&conn, "Second Default", "sales_order", true);

    let err = sequence::default_for_type(&conn, "sales_order").unwrap_err();
    assert!(matches!(err, AppError::Validation(_)), "got {err:?}");
}

#[test]
fn steps_come_back_in_order_with_stage_names() {
    let (_dir, conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);

    let steps = sequence::steps_for_sequence(&conn, fixture.sequence_id).unwrap();
    assert_eq!(steps.len(), 3);
    assert_eq!(
        steps.iter().map(|s| s.step_order).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert_eq!(steps[0].stage_code, "DRAFT");
    assert_eq!(steps[1].stage_name, "Review");
}

#[test]
fn transition_table_makes_terminals_lookup_misses() {
    let (_dir, conn) = common::setup_test_db();
    let fixture = common::seed_sales_workflow(&conn);
    let steps = sequence::steps_for_sequence(&conn, fixture.sequence_id).unwrap();
    let table = TransitionTable::build(&steps);

    let draft = table.for_stage(fixture.draft).unwrap();
    assert_eq!(draft.on_advance, Some(fixture.review));
    assert_eq!(draft.on_reject, None);

    let review = table.for_stage(fixture.review).unwrap();
    assert_eq!(review.on_advance, Some(fixture.approved));
    assert_eq!(review.on_reject, Some(fixture.draft));

    let approved = table.for_stage(fixture.approved).unwrap();
    assert_eq!(approved.on_advance, None);

    assert!(table.for_stage(9999).is_none());
    assert_eq!(table.order_of_stage(fixture.approved), Some(3));
}

#[test]
fn validation_flags_empty_sequences() {
    let (_dir, conn) = common::setup_test_db();
    let empty = common::insert_sequence(&conn, "Empty", "purchase_order", true);

    let findings = sequence::validate_sequence(&conn, empty).unwrap();
    assert_eq!(findings.len(), 1);
    assert!(findings[0].contains("no steps"));
}

#[test]
fn validation_flags_destination_without_department() {
    let (_dir, conn) = common::setup_test_db();
    let a = common::insert_stage(&conn, "A", "A", "start", None);
    let b = common::insert_stage(&conn, "B", "B", "end", None);
    // No department assigned to stage B
    let seq = common::insert_sequence(&conn, "Bare", "purchase_order", true);
    common::insert_step(&conn, seq, 1, a, Some(b), None);
    common::insert_step(&conn, seq, 2, b, None, None);

    let findings = sequence::validate_sequence(&conn, seq).unwrap();
    assert_eq!(findings.len(), 1);
    assert!(findings[0].contains("no responsible department"));
}

#[test]
fn validation_flags_gaps_and_foreign_destinations() {
    let (_dir, conn) = common::setup_test_db();
    let a = common::insert_stage(&conn, "A", "A", "start", None);
    let b = common::insert_stage(&conn, "B", "B", "end", None);
    let outsider = common::insert_stage(&conn, "X", "X", "normal", None);
    common::assign_department(&conn, b, "Ops");

    let seq = common::insert_sequence(&conn, "Holey", "purchase_order", true);
    common::insert_step(&conn, seq, 1, a, Some(b), Some(outsider));
    common::insert_step(&conn, seq, 3, b, None, None); // gap: no step 2

    let findings = sequence::validate_sequence(&conn, seq).unwrap();
    assert!(findings.iter().any(|f| f.contains("step order 3")), "{findings:?}");
    assert!(
        findings.iter().any(|f| f.contains("not a step of the sequence")),
        "{findings:?}"
    );
}

#[test]
fn validate_all_reports_missing_and_duplicate_defaults() {
    let (_dir, conn) = common::setup_test_db();
    common::seed_sales_workflow(&conn);

    let findings = sequence::validate_all(&conn).unwrap();
    assert!(
        findings.iter().any(|f| f.contains("no default sequence for type 'purchase_order'")),
        "{findings:?}"
    );

    common::insert_sequence(&conn, "Dup", "sales_order", true);
    let findings = sequence::validate_all(&conn).unwrap();
    assert!(
        findings.iter().any(|f| f.contains("2 default sequences for type 'sales_order'")),
        "{findings:?}"
    );
}

#[test]
fn non_terminal_last_step_is_flagged() {
    let (_dir, conn) = common::setup_test_db();
    let a = common::insert_stage(&conn, "A", "A", "start", None);
    let b = common::insert_stage(&conn, "B", "B", "normal", None);
    common::assign_department(&conn, a, "Ops");
    common::assign_department(&conn, b, "Ops");

    let seq = common::insert_sequence(&conn, "Loopy", "purchase_order", true);
    common::insert_step(&conn, seq, 1, a, Some(b), None);
    common::insert_step(&conn, seq, 2, b, Some(a), None);

    let findings = sequence::validate_sequence(&conn, seq).unwrap();
    assert!(
        findings.iter().any(|f| f.contains("last step is not terminal")),
        "{findings:?}"
    );
}
