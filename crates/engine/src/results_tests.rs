// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone, Utc};
use rig_core::{
    ExecutionConfig, ExecutionContext, ExecutionType, FakeClock, StepErrorDetails, TraceConfig,
};

fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

fn processor() -> (ResultProcessor<FakeClock>, Arc<TraceStore>) {
    let store = Arc::new(TraceStore::new());
    let processor = ResultProcessor::new(
        Arc::clone(&store),
        InsightThresholds::default(),
        FakeClock::new(t0()),
    );
    (processor, store)
}

fn settled_step(order: u32, status: StepStatus, duration_ms: i64) -> StepResult {
    let mut step =
        StepResult::started(format!("s{order}"), format!("Step {order}"), order, t0());
    step.finish(status, t0() + Duration::milliseconds(duration_ms));
    step
}

fn failed_step(order: u32, error_type: &str, duration_ms: i64) -> StepResult {
    let mut step =
        StepResult::started(format!("s{order}"), format!("Step {order}"), order, t0());
    step.fail(
        StepErrorDetails::new(error_type, "boom"),
        t0() + Duration::milliseconds(duration_ms),
    );
    step
}

fn outcome(id: &str, status: ExecutionStatus, duration_ms: u64) -> CaseOutcome {
    CaseOutcome {
        test_case_id: id.to_string(),
        status,
        duration_ms,
        error: None,
    }
}

#[test]
fn processing_recomputes_authoritative_statistics() {
    let (processor, store) = processor();
    let steps = vec![
        settled_step(0, StepStatus::Passed, 100),
        settled_step(1, StepStatus::Passed, 300),
        failed_step(2, "AssertionError", 200),
    ];
    let result = processor.process_execution("e1", 3, &steps, ExecutionStatus::Failed);

    assert_eq!(result.statistics.total_steps, 3);
    assert_eq!(result.statistics.passed_steps, 2);
    assert_eq!(result.statistics.failed_steps, 1);
    assert_eq!(result.statistics.total_duration_ms, Some(600));
    assert!(store.result_for("e1").is_some());
}

#[test]
fn performance_insights_cover_spread() {
    let (processor, _store) = processor();
    let steps = vec![
        settled_step(0, StepStatus::Passed, 100),
        settled_step(1, StepStatus::Passed, 500),
        settled_step(2, StepStatus::Passed, 300),
    ];
    let result = processor.process_execution("e1", 3, &steps, ExecutionStatus::Passed);
    let perf = result.insights.performance.unwrap();
    assert_eq!(perf.fastest_step_ms, 100);
    assert_eq!(perf.slowest_step_ms, 500);
    assert_eq!(perf.median_step_ms, 300);
    assert_eq!(perf.duration_variance_ms, 400);
    assert!(result.insights.uniform_outcome);
}

#[test]
fn reliability_insights_histogram_errors() {
    let (processor, _store) = processor();
    let steps = vec![
        failed_step(0, "TimeoutError", 100),
        failed_step(1, "TimeoutError", 100),
        failed_step(2, "AssertionError", 100),
        settled_step(3, StepStatus::Passed, 100),
    ];
    let result = processor.process_execution("e1", 4, &steps, ExecutionStatus::Failed);
    let reliability = result.insights.reliability.unwrap();
    assert_eq!(reliability.failure_count, 3);
    assert_eq!(reliability.common_errors["TimeoutError"], 2);
    assert_eq!(reliability.common_errors["AssertionError"], 1);
    assert!((reliability.failure_rate - 0.75).abs() < f64::EPSILON);
}

#[test]
fn recommendations_follow_thresholds() {
    let (processor, _store) = processor();
    // Slow step above the 30s threshold plus timeout/assertion errors.
    let steps = vec![
        settled_step(0, StepStatus::Passed, 31_000),
        failed_step(1, "TimeoutError", 100),
        failed_step(2, "AssertionError", 100),
    ];
    let result = processor.process_execution("e1", 3, &steps, ExecutionStatus::Failed);

    let text = result.recommendations.join("\n");
    assert!(text.contains("slow steps"), "{text}");
    assert!(text.contains("failure rate"), "{text}");
    assert!(text.contains("timeout"), "{text}");
    assert!(text.contains("assertion"), "{text}");
}

#[test]
fn clean_run_gets_the_default_recommendation() {
    let (processor, _store) = processor();
    let steps = vec![settled_step(0, StepStatus::Passed, 100)];
    let result = processor.process_execution("e1", 1, &steps, ExecutionStatus::Passed);
    assert_eq!(result.recommendations.len(), 1);
    assert!(result.recommendations[0].contains("no specific recommendations"));
}

#[yare::parameterized(
    any_failed_wins      = { vec![ExecutionStatus::Passed, ExecutionStatus::Failed, ExecutionStatus::Cancelled], ExecutionStatus::Failed },
    cancelled_beats_pass = { vec![ExecutionStatus::Passed, ExecutionStatus::Cancelled], ExecutionStatus::Cancelled },
    all_passed           = { vec![ExecutionStatus::Passed, ExecutionStatus::Passed], ExecutionStatus::Passed },
)]
fn suite_overall_status_rule(statuses: Vec<ExecutionStatus>, expected: ExecutionStatus) {
    let (processor, _store) = processor();
    let outcomes: Vec<CaseOutcome> = statuses
        .into_iter()
        .enumerate()
        .map(|(i, status)| outcome(&format!("TC_{i}"), status, 100))
        .collect();
    let summary = processor.aggregate_suite("suite-1", &outcomes);
    assert_eq!(summary.overall_status, expected);
}

#[test]
fn suite_aggregation_computes_rates_and_durations() {
    let (processor, store) = processor();
    let outcomes = vec![
        outcome("TC_A", ExecutionStatus::Passed, 100),
        outcome("TC_B", ExecutionStatus::Failed, 300),
        outcome("TC_C", ExecutionStatus::Passed, 200),
    ];
    let summary = processor.aggregate_suite("suite-1", &outcomes);

    assert_eq!(summary.total_test_cases, 3);
    assert_eq!(summary.passed_cases, 2);
    assert_eq!(summary.failed_cases, 1);
    assert!((summary.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(summary.total_duration_ms, 600);
    assert!((summary.average_case_duration_ms - 200.0).abs() < f64::EPSILON);
    assert_eq!(summary.insights.fastest_case_ms, Some(100));
    assert_eq!(summary.insights.slowest_case_ms, Some(300));
    assert!(store.suite_summary_for("suite-1").is_some());
}

fn terminal_trace() -> ExecutionTrace {
    let mut trace = ExecutionTrace::new(
        TraceConfig {
            execution_id: "0123456789abcdef01234567".to_string(),
            execution_type: ExecutionType::TestCase,
            test_case_id: Some("TC_1".to_string()),
            test_suite_id: None,
            parent_execution_id: None,
            triggered_by: "user-1".to_string(),
            execution_context: ExecutionContext::default(),
            execution_config: ExecutionConfig::default(),
            suite_config: None,
            tags: Vec::new(),
            metadata: HashMap::new(),
            priority: 5,
            estimated_step_count: 1,
        },
        t0(),
    );
    trace.status = ExecutionStatus::Passed;
    trace.statistics = ExecutionStatistics::from_steps(
        1,
        &[settled_step(0, StepStatus::Passed, 100)],
    );
    trace
}

#[test]
fn json_report_is_stable_for_terminal_executions() {
    let (processor, _store) = processor();
    let trace = terminal_trace();
    let steps = vec![settled_step(0, StepStatus::Passed, 100)];

    let first = processor.render_report(&trace, &steps, ReportFormat::Json, true);
    let second = processor.render_report(&trace, &steps, ReportFormat::Json, true);
    assert_eq!(first.body, second.body);
    assert_eq!(first.content_type, "application/json");

    let parsed: serde_json::Value = serde_json::from_str(&first.body).unwrap();
    assert_eq!(parsed["status"], "PASSED");
    assert_eq!(parsed["steps"].as_array().unwrap().len(), 1);
}

#[test]
fn json_report_without_details_omits_steps() {
    let (processor, _store) = processor();
    let report = processor.render_report(
        &terminal_trace(),
        &[settled_step(0, StepStatus::Passed, 100)],
        ReportFormat::Json,
        false,
    );
    let parsed: serde_json::Value = serde_json::from_str(&report.body).unwrap();
    assert!(parsed.get("steps").is_none());
}

#[test]
fn html_report_contains_summary_and_step_table() {
    let (processor, _store) = processor();
    let report = processor.render_report(
        &terminal_trace(),
        &[settled_step(0, StepStatus::Passed, 100)],
        ReportFormat::Html,
        true,
    );
    assert_eq!(report.content_type, "text/html; charset=utf-8");
    assert!(report.body.contains("<h1>Execution Report</h1>"));
    assert!(report.body.contains("PASSED"));
    assert!(report.body.contains("<table>"));
}

#[test]
fn csv_report_has_one_row_per_execution_and_step() {
    let (processor, _store) = processor();
    let report = processor.render_report(
        &terminal_trace(),
        &[
            settled_step(0, StepStatus::Passed, 100),
            settled_step(1, StepStatus::Passed, 200),
        ],
        ReportFormat::Csv,
        true,
    );
    assert_eq!(report.content_type, "text/csv");
    let lines: Vec<&str> = report.body.lines().collect();
    assert!(lines[0].starts_with("execution_id,"));
    assert!(lines[1].starts_with("0123456789abcdef01234567,test_case,PASSED"));
    // Step section: header plus two rows.
    assert!(report.body.contains("step_order,step_id,step_name,status,duration_ms"));
    assert_eq!(lines.len(), 6);
}

#[test]
fn csv_escapes_commas_in_names() {
    assert_eq!(escape_csv("plain"), "plain");
    assert_eq!(escape_csv("a,b"), "\"a,b\"");
    assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
}
