//! Suite execution: parallel pools, aggregation, empty suites.

use crate::prelude::*;
use rig_core::{ExecutionStatus, SuiteCaseRef, SuiteConfig, TestSuite};
use rig_engine::StartTestSuite;
use std::collections::HashMap;

fn suite_request(suite_id: &str, suite_config: SuiteConfig) -> StartTestSuite {
    let base = start_request("ignored");
    StartTestSuite {
        test_suite_id: suite_id.to_string(),
        execution_context: base.execution_context,
        execution_config: base.execution_config,
        suite_config,
        tags: Vec::new(),
        metadata: HashMap::new(),
        priority: 5,
    }
}

#[tokio::test]
async fn parallel_suite_continues_past_one_failure() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_A", vec![passing_step("s1")]));
    rig.catalog
        .insert_case(case("TC_B", vec![failing_step("s1")]));
    rig.catalog
        .insert_case(case("TC_C", vec![passing_step("s1")]));
    rig.catalog.insert_suite(TestSuite {
        id: "TS_1".to_string(),
        title: "Smoke suite".to_string(),
        test_cases: vec![
            SuiteCaseRef {
                test_case_id: "TC_A".to_string(),
            },
            SuiteCaseRef {
                test_case_id: "TC_B".to_string(),
            },
            SuiteCaseRef {
                test_case_id: "TC_C".to_string(),
            },
        ],
    });

    let started = rig
        .service
        .start_test_suite(
            "user-1",
            suite_request(
                "TS_1",
                SuiteConfig {
                    parallel_execution: true,
                    max_parallel_cases: 3,
                    continue_on_failure: true,
                },
            ),
        )
        .await
        .unwrap();

    rig.clock.advance(chrono::Duration::seconds(1));
    rig.drain_queue().await;

    let (trace, steps) = rig
        .service
        .get_execution("user-1", &started.execution_id)
        .unwrap();
    // All three children executed even though one failed.
    assert_eq!(steps.len(), 3);

    let summary = rig.store.suite_summary_for(&started.execution_id).unwrap();
    assert_eq!(summary.total_test_cases, 3);
    assert_eq!(summary.passed_cases, 2);
    assert_eq!(summary.failed_cases, 1);
    assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.overall_status, ExecutionStatus::Failed);
    // The trace followed the retry path after failure; its last settled
    // outcome is recorded in the processed result.
    let result = rig.store.result_for(&started.execution_id).unwrap();
    assert_eq!(result.status, ExecutionStatus::Failed);
    let _ = trace;
}

#[tokio::test]
async fn empty_suite_passes_with_zero_child_steps() {
    let rig = Rig::new();
    rig.catalog.insert_suite(TestSuite {
        id: "TS_EMPTY".to_string(),
        title: "Empty".to_string(),
        test_cases: Vec::new(),
    });

    let started = rig
        .service
        .start_test_suite("user-1", suite_request("TS_EMPTY", SuiteConfig::default()))
        .await
        .unwrap();
    rig.clock.advance(chrono::Duration::seconds(1));
    rig.drain_queue().await;

    let (trace, steps) = rig
        .service
        .get_execution("user-1", &started.execution_id)
        .unwrap();
    assert_eq!(trace.status, ExecutionStatus::Passed);
    assert!(steps.is_empty());
    assert_eq!(trace.statistics.total_steps, 0);
}

#[tokio::test]
async fn sequential_suite_respects_continue_on_failure_off() {
    let rig = Rig::new();
    rig.catalog
        .insert_case(case("TC_A", vec![failing_step("s1")]));
    rig.catalog
        .insert_case(case("TC_B", vec![passing_step("s1")]));
    rig.catalog.insert_suite(TestSuite {
        id: "TS_2".to_string(),
        title: "Strict suite".to_string(),
        test_cases: vec![
            SuiteCaseRef {
                test_case_id: "TC_A".to_string(),
            },
            SuiteCaseRef {
                test_case_id: "TC_B".to_string(),
            },
        ],
    });

    let started = rig
        .service
        .start_test_suite(
            "user-1",
            suite_request(
                "TS_2",
                SuiteConfig {
                    parallel_execution: false,
                    max_parallel_cases: 1,
                    continue_on_failure: false,
                },
            ),
        )
        .await
        .unwrap();
    rig.clock.advance(chrono::Duration::seconds(1));
    rig.drain_queue().await;

    let (_, steps) = rig
        .service
        .get_execution("user-1", &started.execution_id)
        .unwrap();
    // The suite stopped after the first child failed.
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step_id, "TC_A");
}
