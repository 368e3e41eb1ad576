//! Queue retry, dead-letter, and priority behavior.

use crate::prelude::*;
use rig_core::{ExecutionStatus, QueuePriority};
use rig_engine::QueueConfig;

#[tokio::test]
async fn retry_limit_exceeded_moves_to_dead_letter() {
    let rig = Rig::with_queue_config(QueueConfig {
        default_max_retries: 2,
        ..QueueConfig::default()
    });
    rig.catalog
        .insert_case(case("TC_BAD", vec![failing_step("s1")]));

    let started = rig
        .service
        .start_test_case("user-1", start_request("TC_BAD"))
        .await
        .unwrap();
    let id = started.execution_id.clone();

    // Attempt 1 fails and schedules retry 1; attempt 2 fails and
    // schedules retry 2; attempt 3 exhausts the budget.
    for round in 0..3 {
        rig.clock.advance(chrono::Duration::minutes(10));
        rig.drain_queue().await;
        let row = rig.store.get_queue_item(&id);
        if round < 2 {
            let row = row.unwrap_or_else(|| panic!("round {round}: row should remain"));
            assert_eq!(row.retry_count, round + 1);
        } else {
            assert!(row.is_none(), "round {round}: row should be dead-lettered");
        }
    }

    let dead = rig.store.dead_letter_for(&id).unwrap();
    assert_eq!(dead.failure_reason, "Retry limit exceeded");
    assert_eq!(dead.item.retry_count, 2);
    assert_eq!(dead.item.retry_count, dead.item.max_retries);

    // The trace keeps its terminal FAILED status for forensics.
    assert_eq!(rig.store.trace_status(&id), Some(ExecutionStatus::Failed));
}

#[tokio::test]
async fn priority_one_runs_before_priority_ten() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_1", vec![passing_step("s1")]));

    let mut low = start_request("TC_1");
    low.priority = 10;
    let low_trace = rig.service.start_test_case("user-1", low).await.unwrap();

    let mut high = start_request("TC_1");
    high.priority = 1;
    let high_trace = rig.service.start_test_case("user-1", high).await.unwrap();

    rig.clock.advance(chrono::Duration::seconds(1));
    let first = rig.queue.dequeue().unwrap();
    assert_eq!(first.execution_id, high_trace.execution_id);
    assert_eq!(first.priority, QueuePriority::Critical);
    let second = rig.queue.dequeue().unwrap();
    assert_eq!(second.execution_id, low_trace.execution_id);
}

#[tokio::test]
async fn queue_status_reflects_pause_and_depth() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_1", vec![passing_step("s1")]));
    rig.service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    rig.queue.pause();
    rig.clock.advance(chrono::Duration::seconds(1));
    assert!(rig.queue.dequeue().is_none());

    let report = rig.queue.status_report();
    assert_eq!(report.total_queued, 1);
    assert_eq!(report.processing, 0);
    assert_eq!(report.queue_state, rig_core::QueueState::Paused);

    rig.queue.resume();
    assert!(rig.queue.dequeue().is_some());
}

#[tokio::test]
async fn queue_row_removal_paths_are_exactly_success_and_dead_letter() {
    let rig = Rig::with_queue_config(QueueConfig {
        default_max_retries: 0,
        ..QueueConfig::default()
    });
    rig.catalog
        .insert_case(case("TC_OK", vec![passing_step("s1")]));
    rig.catalog
        .insert_case(case("TC_BAD", vec![failing_step("s1")]));

    let ok = rig
        .service
        .start_test_case("user-1", start_request("TC_OK"))
        .await
        .unwrap();
    let bad = rig
        .service
        .start_test_case("user-1", start_request("TC_BAD"))
        .await
        .unwrap();

    rig.clock.advance(chrono::Duration::seconds(1));
    rig.drain_queue().await;

    // Success removed one row; failure dead-lettered the other. No
    // third removal path exists.
    assert!(rig.store.get_queue_item(&ok.execution_id).is_none());
    assert!(rig.store.get_queue_item(&bad.execution_id).is_none());
    assert!(rig.store.dead_letter_for(&ok.execution_id).is_none());
    assert!(rig.store.dead_letter_for(&bad.execution_id).is_some());
    assert_eq!(rig.store.dead_letter_count(), 1);
}
