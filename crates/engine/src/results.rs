// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result processor: statistics, insights, recommendations, suite
//! aggregation, and report rendering.

use crate::config::InsightThresholds;
use rig_core::{
    CaseOutcome, Clock, ExecutionInsights, ExecutionStatistics, ExecutionStatus, ExecutionTrace,
    PerformanceInsights, ProcessedResult, ReliabilityInsights, ReportFormat, StepResult,
    StepStatus, SuiteInsights, SuiteSummary,
};
use rig_storage::TraceStore;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

/// A rendered report.
#[derive(Debug, Clone)]
pub struct Report {
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Clone)]
pub struct ResultProcessor<C: Clock> {
    store: Arc<TraceStore>,
    thresholds: InsightThresholds,
    clock: C,
}

impl<C: Clock> ResultProcessor<C> {
    pub fn new(store: Arc<TraceStore>, thresholds: InsightThresholds, clock: C) -> Self {
        Self {
            store,
            thresholds,
            clock,
        }
    }

    /// Compute the authoritative result for a finished execution and
    /// persist it.
    pub fn process_execution(
        &self,
        execution_id: &str,
        planned_total: u32,
        steps: &[StepResult],
        final_status: ExecutionStatus,
    ) -> ProcessedResult {
        let statistics = ExecutionStatistics::from_steps(planned_total, steps);
        let insights = self.generate_insights(steps, final_status);
        let recommendations = self.recommend(&insights);

        let result = ProcessedResult {
            execution_id: execution_id.to_string(),
            status: final_status,
            statistics,
            step_results: steps.to_vec(),
            insights,
            recommendations,
            processed_at: self.clock.now(),
        };
        self.store.insert_result(result.clone());
        tracing::info!(execution_id, status = %final_status, "execution result processed");
        result
    }

    /// Aggregate child-case outcomes for a suite execution and persist
    /// the summary. Overall status: any FAILED child wins, then any
    /// CANCELLED, otherwise PASSED.
    pub fn aggregate_suite(
        &self,
        suite_execution_id: &str,
        outcomes: &[CaseOutcome],
    ) -> SuiteSummary {
        let total = outcomes.len() as u32;
        let passed = outcomes
            .iter()
            .filter(|o| o.status == ExecutionStatus::Passed)
            .count() as u32;
        let failed = outcomes
            .iter()
            .filter(|o| o.status == ExecutionStatus::Failed)
            .count() as u32;
        let cancelled = outcomes
            .iter()
            .filter(|o| o.status == ExecutionStatus::Cancelled)
            .count() as u32;

        let overall_status = if failed > 0 {
            ExecutionStatus::Failed
        } else if cancelled > 0 {
            ExecutionStatus::Cancelled
        } else {
            ExecutionStatus::Passed
        };

        let durations: Vec<u64> = outcomes.iter().map(|o| o.duration_ms).collect();
        let total_duration: u64 = durations.iter().sum();
        let average = if total > 0 {
            total_duration as f64 / total as f64
        } else {
            0.0
        };

        let summary = SuiteSummary {
            suite_execution_id: suite_execution_id.to_string(),
            total_test_cases: total,
            passed_cases: passed,
            failed_cases: failed,
            cancelled_cases: cancelled,
            success_rate: if total > 0 {
                passed as f64 / total as f64
            } else {
                0.0
            },
            overall_status,
            total_duration_ms: total_duration,
            average_case_duration_ms: average,
            insights: SuiteInsights {
                fastest_case_ms: durations.iter().min().copied(),
                slowest_case_ms: durations.iter().max().copied(),
                average_case_duration_ms: (total > 0).then_some(average),
            },
            aggregated_at: self.clock.now(),
        };
        self.store.insert_suite_summary(summary.clone());
        summary
    }

    pub fn result_for(&self, execution_id: &str) -> Option<ProcessedResult> {
        self.store.result_for(execution_id)
    }

    /// Render a report for an execution. JSON output for a terminal
    /// execution is stable across calls.
    pub fn render_report(
        &self,
        trace: &ExecutionTrace,
        steps: &[StepResult],
        format: ReportFormat,
        include_details: bool,
    ) -> Report {
        let result = self.store.result_for(&trace.execution_id);
        let suite_summary = self.store.suite_summary_for(&trace.execution_id);
        let body = match format {
            ReportFormat::Json => {
                render_json(trace, steps, result.as_ref(), suite_summary.as_ref(), include_details)
            }
            ReportFormat::Html => render_html(trace, steps, result.as_ref(), include_details),
            ReportFormat::Csv => render_csv(trace, steps, include_details),
        };
        Report {
            content_type: format.content_type(),
            body,
        }
    }

    fn generate_insights(
        &self,
        steps: &[StepResult],
        final_status: ExecutionStatus,
    ) -> ExecutionInsights {
        let mut insights = ExecutionInsights::default();
        if steps.is_empty() {
            return insights;
        }

        let mut durations: Vec<u64> = steps.iter().filter_map(|s| s.duration_ms).collect();
        if !durations.is_empty() {
            durations.sort_unstable();
            let fastest = durations[0];
            let slowest = durations[durations.len() - 1];
            insights.performance = Some(PerformanceInsights {
                fastest_step_ms: fastest,
                slowest_step_ms: slowest,
                median_step_ms: durations[durations.len() / 2],
                duration_variance_ms: slowest - fastest,
            });
        }

        let failed: Vec<&StepResult> = steps
            .iter()
            .filter(|s| s.status == StepStatus::Failed)
            .collect();
        if !failed.is_empty() {
            let mut common_errors: HashMap<String, u32> = HashMap::new();
            for step in &failed {
                let error_type = step
                    .error_details
                    .as_ref()
                    .map_or("Unknown", |e| e.error_type.as_str());
                *common_errors.entry(error_type.to_string()).or_insert(0) += 1;
            }
            insights.reliability = Some(ReliabilityInsights {
                failure_count: failed.len() as u32,
                failure_rate: failed.len() as f64 / steps.len() as f64,
                common_errors,
            });
        }

        let first_status = steps[0].status;
        insights.uniform_outcome = steps.iter().all(|s| s.status == first_status);

        if final_status == ExecutionStatus::Failed {
            insights
                .issues
                .push("execution failed - review failed steps".to_string());
        }
        if let Some(perf) = &insights.performance {
            if perf.duration_variance_ms > self.thresholds.variance_warning_ms {
                insights
                    .issues
                    .push("high step duration variance detected".to_string());
            }
        }
        insights
    }

    fn recommend(&self, insights: &ExecutionInsights) -> Vec<String> {
        let mut recommendations = Vec::new();
        if let Some(perf) = &insights.performance {
            if perf.slowest_step_ms > self.thresholds.slow_step_ms {
                recommendations
                    .push("consider optimizing slow steps or increasing timeouts".to_string());
            }
        }
        if let Some(reliability) = &insights.reliability {
            if reliability.failure_rate > self.thresholds.high_failure_rate {
                recommendations
                    .push("high failure rate detected - review test case stability".to_string());
            }
            if reliability.common_errors.contains_key("TimeoutError") {
                recommendations.push(
                    "timeout errors detected - consider increasing step timeouts".to_string(),
                );
            }
            if reliability.common_errors.contains_key("AssertionError") {
                recommendations.push(
                    "assertion failures detected - review expected vs actual results".to_string(),
                );
            }
        }
        if recommendations.is_empty() {
            recommendations
                .push("execution completed successfully - no specific recommendations".to_string());
        }
        recommendations
    }
}

fn render_json(
    trace: &ExecutionTrace,
    steps: &[StepResult],
    result: Option<&ProcessedResult>,
    suite_summary: Option<&SuiteSummary>,
    include_details: bool,
) -> String {
    let mut report = serde_json::json!({
        "execution_id": trace.execution_id,
        "execution_type": trace.execution_type,
        "status": trace.status,
        "triggered_by": trace.triggered_by,
        "triggered_at": trace.triggered_at,
        "started_at": trace.started_at,
        "completed_at": trace.completed_at,
        "total_duration_ms": trace.total_duration_ms,
        "statistics": trace.statistics,
    });
    if let Some(result) = result {
        report["insights"] = serde_json::json!(result.insights);
        report["recommendations"] = serde_json::json!(result.recommendations);
    }
    if let Some(summary) = suite_summary {
        report["suite_summary"] = serde_json::json!(summary);
    }
    if include_details {
        report["steps"] = serde_json::json!(steps);
    }
    serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
}

fn render_html(
    trace: &ExecutionTrace,
    steps: &[StepResult],
    result: Option<&ProcessedResult>,
    include_details: bool,
) -> String {
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html>\n<head><title>Execution Report {id}</title></head>\n<body>\n\
         <h1>Execution Report</h1>\n\
         <p>Execution: <code>{id}</code></p>\n\
         <p>Status: <strong>{status}</strong></p>\n\
         <p>Progress: {progress:.1}%</p>\n",
        id = trace.execution_id,
        status = trace.status,
        progress = trace.statistics.progress_percentage,
    );
    if let Some(result) = result {
        html.push_str("<h2>Recommendations</h2>\n<ul>\n");
        for rec in &result.recommendations {
            let _ = writeln!(html, "<li>{rec}</li>");
        }
        html.push_str("</ul>\n");
    }
    if include_details && !steps.is_empty() {
        html.push_str(
            "<h2>Steps</h2>\n<table>\n<tr><th>#</th><th>Name</th><th>Status</th>\
             <th>Duration (ms)</th></tr>\n",
        );
        for step in steps {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                step.step_order,
                step.step_name,
                step.status,
                step.duration_ms.unwrap_or(0),
            );
        }
        html.push_str("</table>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn render_csv(trace: &ExecutionTrace, steps: &[StepResult], include_details: bool) -> String {
    let mut csv = String::from(
        "execution_id,execution_type,status,triggered_by,total_steps,passed,failed,duration_ms\n",
    );
    let _ = writeln!(
        csv,
        "{},{},{},{},{},{},{},{}",
        trace.execution_id,
        trace.execution_type,
        trace.status,
        trace.triggered_by,
        trace.statistics.total_steps,
        trace.statistics.passed_steps,
        trace.statistics.failed_steps,
        trace.total_duration_ms.unwrap_or(0),
    );
    if include_details && !steps.is_empty() {
        csv.push_str("\nstep_order,step_id,step_name,status,duration_ms\n");
        for step in steps {
            let _ = writeln!(
                csv,
                "{},{},{},{},{}",
                step.step_order,
                step.step_id,
                escape_csv(&step.step_name),
                step.status,
                step.duration_ms.unwrap_or(0),
            );
        }
    }
    csv
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
#[path = "results_tests.rs"]
mod tests;
