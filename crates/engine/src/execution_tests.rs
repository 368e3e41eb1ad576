// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::bus::EventBus;
use crate::config::{InsightThresholds, QueueConfig};
use chrono::{TimeZone, Utc};
use rig_core::{
    FakeClock, SequentialIdGen, StaticCatalog, SuiteCaseRef, TestCase, TestStep, TestSuite,
};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

struct Harness {
    service: ExecutionService<FakeClock, SequentialIdGen>,
    store: Arc<TraceStore>,
    catalog: Arc<StaticCatalog>,
    clock: FakeClock,
}

fn harness() -> Harness {
    let store = Arc::new(TraceStore::new());
    let clock = FakeClock::new(t0());
    let catalog = Arc::new(StaticCatalog::new());
    let state = StateService::new(Arc::clone(&store), Arc::new(EventBus::new()), clock.clone());
    let queue = Arc::new(QueueService::new(
        Arc::clone(&store),
        QueueConfig::default(),
        clock.clone(),
    ));
    let results = ResultProcessor::new(
        Arc::clone(&store),
        InsightThresholds::default(),
        clock.clone(),
    );
    let service = ExecutionService::new(
        Arc::clone(&store),
        state,
        queue,
        results,
        Arc::clone(&catalog) as Arc<dyn TestCaseLoader>,
        Arc::clone(&catalog) as Arc<dyn TestSuiteLoader>,
        SequentialIdGen::new(),
        clock.clone(),
    );
    Harness {
        service,
        store,
        catalog,
        clock,
    }
}

fn sample_case(id: &str, steps: usize) -> TestCase {
    TestCase {
        id: id.to_string(),
        title: format!("Case {id}"),
        test_type: "generic".to_string(),
        steps: (0..steps)
            .map(|i| {
                let mut step = TestStep::new(format!("{id}_s{i}"), format!("Step {i}"));
                step.action = Some("click".to_string());
                step
            })
            .collect(),
    }
}

fn start_request(case_id: &str) -> StartTestCase {
    StartTestCase {
        test_case_id: case_id.to_string(),
        execution_context: ExecutionContext::default(),
        execution_config: ExecutionConfig::default(),
        tags: vec!["smoke".to_string()],
        metadata: HashMap::new(),
        priority: 5,
    }
}

#[tokio::test]
async fn start_inserts_queued_trace_and_queue_row() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 3));

    let trace = harness
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    assert_eq!(trace.status, ExecutionStatus::Queued);
    assert_eq!(trace.execution_type, ExecutionType::TestCase);
    assert_eq!(trace.triggered_by, "user-1");
    assert_eq!(trace.estimated_step_count, 3);
    assert!(!trace.is_partitioned);
    assert!(harness.store.get_queue_item(&trace.execution_id).is_some());
}

#[tokio::test]
async fn start_then_get_round_trips_core_fields() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 3));
    let started = harness
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    let (fetched, steps) = harness
        .service
        .get_execution("user-1", &started.execution_id)
        .unwrap();
    assert_eq!(fetched.execution_id, started.execution_id);
    assert_eq!(fetched.status, started.status);
    assert_eq!(fetched.execution_type, started.execution_type);
    assert_eq!(fetched.triggered_by, started.triggered_by);
    assert_eq!(fetched.triggered_at, started.triggered_at);
    assert!(steps.is_empty());
}

#[tokio::test]
async fn large_case_partitions_at_the_threshold() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_BIG", 50));
    let trace = harness
        .service
        .start_test_case("user-1", start_request("TC_BIG"))
        .await
        .unwrap();
    assert!(trace.is_partitioned);
    assert!(trace.embedded_steps.is_empty());
    assert!(trace.step_results_collection.is_some());
}

#[tokio::test]
async fn unknown_case_is_a_business_error() {
    let harness = harness();
    let err = harness
        .service
        .start_test_case("user-1", start_request("TC_NOPE"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Execution(_)));
}

#[tokio::test]
async fn out_of_range_priority_rejected() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    for priority in [0u8, 11] {
        let mut request = start_request("TC_1");
        request.priority = priority;
        let err = harness
            .service
            .start_test_case("user-1", request)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)), "priority {priority}");
    }
}

#[tokio::test]
async fn too_many_tags_rejected() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    let mut request = start_request("TC_1");
    request.tags = (0..21).map(|i| format!("tag{i}")).collect();
    let err = harness
        .service
        .start_test_case("user-1", request)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn equal_step_and_run_timeouts_rejected() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    let mut request = start_request("TC_1");
    request.execution_config.timeout_ms = 60_000;
    request.execution_config.step_timeout_ms = 60_000;
    let err = harness
        .service
        .start_test_case("user-1", request)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn start_suite_carries_suite_config() {
    let harness = harness();
    harness.catalog.insert_suite(TestSuite {
        id: "TS_1".to_string(),
        title: "Suite".to_string(),
        test_cases: vec![SuiteCaseRef {
            test_case_id: "TC_1".to_string(),
        }],
    });

    let trace = harness
        .service
        .start_test_suite(
            "user-1",
            StartTestSuite {
                test_suite_id: "TS_1".to_string(),
                execution_context: ExecutionContext::default(),
                execution_config: ExecutionConfig::default(),
                suite_config: SuiteConfig {
                    parallel_execution: true,
                    max_parallel_cases: 2,
                    continue_on_failure: false,
                },
                tags: Vec::new(),
                metadata: HashMap::new(),
                priority: 3,
            },
        )
        .await
        .unwrap();
    assert_eq!(trace.execution_type, ExecutionType::TestSuite);
    assert!(trace.suite_config.unwrap().parallel_execution);
    let item = harness.store.get_queue_item(&trace.execution_id).unwrap();
    assert_eq!(item.priority, QueuePriority::High);
    assert!(item.payload.suite_config.is_some());
}

#[tokio::test]
async fn other_users_executions_are_invisible() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    let trace = harness
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    let err = harness
        .service
        .get_execution("user-2", &trace.execution_id)
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn malformed_id_is_a_validation_error() {
    let harness = harness();
    let err = harness
        .service
        .get_execution("user-1", "not-a-hex-id")
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn list_scopes_to_the_calling_user() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    for user in ["user-1", "user-1", "user-2"] {
        harness
            .service
            .start_test_case(user, start_request("TC_1"))
            .await
            .unwrap();
    }

    let page = harness
        .service
        .list_executions(
            "user-1",
            TraceQuery::default(),
            SortField::TriggeredAt,
            SortDirection::Desc,
            Page::default(),
        )
        .unwrap();
    assert_eq!(page.total, 2);
    assert!(page.items.iter().all(|t| t.triggered_by == "user-1"));
}

#[tokio::test]
async fn list_paginates() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    for _ in 0..5 {
        harness.clock.advance(chrono::Duration::seconds(1));
        harness
            .service
            .start_test_case("user-1", start_request("TC_1"))
            .await
            .unwrap();
    }

    let page = harness
        .service
        .list_executions(
            "user-1",
            TraceQuery::default(),
            SortField::TriggeredAt,
            SortDirection::Desc,
            Page {
                page: 2,
                page_size: 2,
            },
        )
        .unwrap();
    assert_eq!(page.total, 5);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total_pages, 3);
}

#[tokio::test]
async fn page_size_bounds() {
    let harness = harness();
    let full = harness.service.list_executions(
        "user-1",
        TraceQuery::default(),
        SortField::TriggeredAt,
        SortDirection::Desc,
        Page {
            page: 1,
            page_size: 100,
        },
    );
    assert!(full.is_ok());

    let over = harness.service.list_executions(
        "user-1",
        TraceQuery::default(),
        SortField::TriggeredAt,
        SortDirection::Desc,
        Page {
            page: 1,
            page_size: 101,
        },
    );
    assert!(matches!(over.unwrap_err(), EngineError::Validation(_)));
}

#[tokio::test]
async fn update_status_rejects_illegal_transition_distinctly() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    let trace = harness
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    // QUEUED -> PASSED is not in the table.
    let err = harness
        .service
        .update_status(
            "user-1",
            &trace.execution_id,
            ExecutionStatus::Passed,
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::StateTransition { .. }));

    // Unknown id gives NotFound instead.
    let err = harness
        .service
        .update_status(
            "user-1",
            "ffffffffffffffffffffffff",
            ExecutionStatus::Cancelled,
            None,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn cancellation_records_the_reason() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 1));
    let trace = harness
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    let updated = harness
        .service
        .update_status(
            "user-1",
            &trace.execution_id,
            ExecutionStatus::Cancelled,
            Some("superseded by nightly run".to_string()),
            None,
        )
        .unwrap();
    assert_eq!(updated.status, ExecutionStatus::Cancelled);
    let history = harness.store.history_for(&trace.execution_id, 1);
    assert_eq!(history[0].metadata["reason"], "superseded by nightly run");
}

#[tokio::test]
async fn progress_projects_current_statistics() {
    let harness = harness();
    harness.catalog.insert_case(sample_case("TC_1", 2));
    let trace = harness
        .service
        .start_test_case("user-1", start_request("TC_1"))
        .await
        .unwrap();

    let progress = harness
        .service
        .progress("user-1", &trace.execution_id)
        .unwrap();
    assert_eq!(progress.execution_id, trace.execution_id);
    assert_eq!(progress.status, ExecutionStatus::Queued);
    assert!(progress.progress_percentage.abs() < f64::EPSILON);
}
