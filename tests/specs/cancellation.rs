//! User cancellation paths.

use crate::prelude::*;
use rig_core::ExecutionStatus;
use rig_engine::EngineError;

#[tokio::test]
async fn cancelling_a_queued_execution_ends_scheduling() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_1", vec![passing_step("s1")]));

    let started = rig
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();
    assert!(rig.store.get_queue_item(&started.execution_id).is_some());

    let cancelled = rig
        .service
        .update_status(
            "user-1",
            &started.execution_id,
            ExecutionStatus::Cancelled,
            Some("not needed".to_string()),
            None,
        )
        .unwrap();
    assert_eq!(cancelled.status, ExecutionStatus::Cancelled);
    assert!(cancelled.completed_at.is_some());

    // The queue row is gone; a worker poll finds nothing to run.
    assert!(rig.store.get_queue_item(&started.execution_id).is_none());
    rig.clock.advance(chrono::Duration::seconds(1));
    assert!(rig.queue.dequeue().is_none());
}

#[tokio::test]
async fn cancellation_is_scoped_to_the_owner() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_1", vec![passing_step("s1")]));
    let started = rig
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    let err = rig
        .service
        .update_status(
            "user-2",
            &started.execution_id,
            ExecutionStatus::Cancelled,
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(
        rig.store.trace_status(&started.execution_id),
        Some(ExecutionStatus::Queued)
    );
}

#[tokio::test]
async fn cancelled_execution_cannot_be_cancelled_again() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_1", vec![passing_step("s1")]));
    let started = rig
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();
    rig.service
        .update_status(
            "user-1",
            &started.execution_id,
            ExecutionStatus::Cancelled,
            None,
            None,
        )
        .unwrap();

    let err = rig
        .service
        .update_status(
            "user-1",
            &started.execution_id,
            ExecutionStatus::Cancelled,
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::StateTransition { .. }));
}

#[tokio::test]
async fn progress_reflects_cancellation() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_1", vec![passing_step("s1")]));
    let started = rig
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();
    rig.service
        .update_status(
            "user-1",
            &started.execution_id,
            ExecutionStatus::Cancelled,
            None,
            None,
        )
        .unwrap();

    let progress = rig
        .service
        .progress("user-1", &started.execution_id)
        .unwrap();
    assert_eq!(progress.status, ExecutionStatus::Cancelled);
}
