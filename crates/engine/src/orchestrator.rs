// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution orchestrator.
//!
//! Drives a dequeued work item through its lifecycle: loads the test
//! artifact, selects a runner, iterates steps (or suite children),
//! keeps statistics current, and settles the trace in a terminal
//! state. Re-invocation on a running or finished trace is a conflict,
//! never silent corruption.

use crate::error::EngineError;
use crate::results::ResultProcessor;
use crate::runner::RunnerRegistry;
use crate::state::StateService;
use chrono::{DateTime, Utc};
use rig_core::{
    CaseOutcome, Clock, ExecutionConfig, ExecutionContext, ExecutionStatistics, ExecutionStatus,
    ExecutionTrace, ExecutionType, StepErrorDetails, StepResult, StepStatus, TestCaseLoader,
    TestSuite, TestSuiteLoader,
};
use rig_storage::TraceStore;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Estimated wall time per suite child, used for remaining-time hints.
const CASE_DURATION_ESTIMATE_MS: u64 = 300_000;

/// Snapshot of an execution's progress.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionProgress {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub progress_percentage: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_remaining_ms: Option<u64>,
    pub statistics: ExecutionStatistics,
    pub last_update: DateTime<Utc>,
}

struct RunOutcome {
    final_status: ExecutionStatus,
    planned_total: u32,
    steps: Vec<StepResult>,
    case_outcomes: Vec<CaseOutcome>,
}

#[derive(Clone)]
pub struct Orchestrator<C: Clock> {
    store: Arc<TraceStore>,
    state: StateService<C>,
    runners: Arc<RunnerRegistry>,
    case_loader: Arc<dyn TestCaseLoader>,
    suite_loader: Arc<dyn TestSuiteLoader>,
    results: ResultProcessor<C>,
    clock: C,
}

impl<C: Clock> Orchestrator<C> {
    pub fn new(
        store: Arc<TraceStore>,
        state: StateService<C>,
        runners: Arc<RunnerRegistry>,
        case_loader: Arc<dyn TestCaseLoader>,
        suite_loader: Arc<dyn TestSuiteLoader>,
        results: ResultProcessor<C>,
        clock: C,
    ) -> Self {
        Self {
            store,
            state,
            runners,
            case_loader,
            suite_loader,
            results,
            clock,
        }
    }

    /// Run an execution to a settled state.
    pub async fn orchestrate(
        &self,
        execution_id: &str,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> Result<ExecutionProgress, EngineError> {
        tracing::info!(execution_id, "starting orchestration");
        let trace = self
            .store
            .get_trace(execution_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))?;

        match trace.status {
            ExecutionStatus::Pending => {
                // Direct invocation bypassed the queue; catch the trace up.
                self.state
                    .transition(execution_id, ExecutionStatus::Queued, None, None)?;
            }
            ExecutionStatus::Queued => {}
            other => {
                return Err(EngineError::Execution(format!(
                    "cannot start execution in status {other}"
                )));
            }
        }
        if !self
            .state
            .transition(execution_id, ExecutionStatus::Running, None, None)?
        {
            return Err(EngineError::Conflict(format!(
                "execution {execution_id} changed state during start"
            )));
        }
        // Retried runs start from a clean step slate.
        self.store.clear_steps(execution_id);

        let deadline =
            self.clock.now() + chrono::Duration::milliseconds(config.timeout_ms as i64);
        let run = match trace.execution_type {
            ExecutionType::TestCase => {
                self.run_test_case(&trace, context, config, deadline).await
            }
            ExecutionType::TestSuite => {
                self.run_test_suite(&trace, context, config, deadline).await
            }
            other => Err(EngineError::Execution(format!(
                "unsupported execution type: {other}"
            ))),
        };

        match run {
            Ok(run) => self.finalize(&trace, run),
            Err(error) => {
                self.handle_fatal(execution_id, &error);
                Err(error)
            }
        }
    }

    /// Progress projection for an execution.
    pub fn progress(&self, execution_id: &str) -> Result<ExecutionProgress, EngineError> {
        let trace = self
            .store
            .get_trace(execution_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))?;
        Ok(ExecutionProgress {
            execution_id: trace.execution_id,
            status: trace.status,
            progress_percentage: trace.statistics.progress_percentage,
            current_step: trace.current_step,
            estimated_remaining_ms: trace.statistics.estimated_remaining_ms,
            statistics: trace.statistics,
            last_update: trace.updated_at.unwrap_or(trace.last_state_change),
        })
    }

    async fn run_test_case(
        &self,
        trace: &ExecutionTrace,
        context: &ExecutionContext,
        config: &ExecutionConfig,
        deadline: DateTime<Utc>,
    ) -> Result<RunOutcome, EngineError> {
        let execution_id = trace.execution_id.as_str();
        let case_id = trace.test_case_id.clone().ok_or_else(|| {
            EngineError::Execution(format!("execution {execution_id} has no test_case_id"))
        })?;
        let case = self.case_loader.load(&case_id).await?;
        let runner = self.runners.resolve(&case.test_type);

        let report = runner.validate_test_case(&case);
        if !report.valid {
            return Err(EngineError::Execution(format!(
                "test case validation failed: {}",
                report.errors.join("; ")
            )));
        }
        for warning in &report.warnings {
            tracing::warn!(execution_id, test_case_id = %case_id, warning, "validation warning");
        }

        let planned_total = case.steps.len() as u32;
        self.store.append_log(
            execution_id,
            format!("loaded test case {case_id} ({planned_total} steps, runner {})", runner.name()),
        );
        let mut statistics = ExecutionStatistics::for_total(
            planned_total,
            Some(planned_total as u64 * config.step_timeout_ms),
        );
        self.state
            .update_progress(execution_id, statistics.clone(), None)?;

        let mut steps: Vec<StepResult> = Vec::new();
        let mut cancelled = false;
        let mut timed_out = false;
        for (i, step_def) in case.steps.iter().enumerate() {
            // A cancellation never interrupts the in-flight step; it
            // stops further steps from starting.
            if self.store.trace_status(execution_id) == Some(ExecutionStatus::Cancelled) {
                cancelled = true;
                break;
            }
            if self.clock.now() >= deadline {
                timed_out = true;
                break;
            }

            let result = runner.execute_step(step_def, i as u32, context, config).await;
            self.record_step(trace, result.clone());
            let failed = matches!(result.status, StepStatus::Failed | StepStatus::Blocked);
            steps.push(result);

            statistics = ExecutionStatistics::from_steps(planned_total, &steps);
            let remaining = planned_total.saturating_sub(steps.len() as u32) as u64;
            statistics.estimated_remaining_ms = Some(remaining * config.step_timeout_ms);
            self.state.update_progress(
                execution_id,
                statistics.clone(),
                Some(step_def.name.clone()),
            )?;

            if failed && config.fail_fast {
                tracing::warn!(execution_id, step = i, "failing fast after step failure");
                break;
            }
        }

        let final_status = if cancelled {
            ExecutionStatus::Cancelled
        } else if timed_out {
            ExecutionStatus::Timeout
        } else if steps
            .iter()
            .any(|s| matches!(s.status, StepStatus::Failed | StepStatus::Blocked))
        {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Passed
        };

        Ok(RunOutcome {
            final_status,
            planned_total,
            steps,
            case_outcomes: Vec::new(),
        })
    }

    async fn run_test_suite(
        &self,
        trace: &ExecutionTrace,
        context: &ExecutionContext,
        config: &ExecutionConfig,
        deadline: DateTime<Utc>,
    ) -> Result<RunOutcome, EngineError> {
        let execution_id = trace.execution_id.as_str();
        let suite_id = trace.test_suite_id.clone().ok_or_else(|| {
            EngineError::Execution(format!("execution {execution_id} has no test_suite_id"))
        })?;
        let suite = self.suite_loader.load(&suite_id).await?;
        let suite_config = trace.suite_config.unwrap_or_default();

        let planned_total = suite.test_cases.len() as u32;
        if planned_total == 0 {
            // Intentional: an empty suite is a successful no-op.
            tracing::warn!(execution_id, test_suite_id = %suite_id, "suite has no test cases");
            return Ok(RunOutcome {
                final_status: ExecutionStatus::Passed,
                planned_total: 0,
                steps: Vec::new(),
                case_outcomes: Vec::new(),
            });
        }

        self.store.append_log(
            execution_id,
            format!("loaded test suite {suite_id} ({planned_total} cases)"),
        );
        let statistics = ExecutionStatistics::for_total(
            planned_total,
            Some(planned_total as u64 * CASE_DURATION_ESTIMATE_MS),
        );
        self.state
            .update_progress(execution_id, statistics, None)?;

        let (case_outcomes, cancelled, timed_out) = if suite_config.parallel_execution {
            let outcomes = self
                .run_cases_parallel(
                    &suite,
                    context,
                    config,
                    suite_config.max_parallel_cases as usize,
                )
                .await;
            let cancelled =
                self.store.trace_status(execution_id) == Some(ExecutionStatus::Cancelled);
            let timed_out = self.clock.now() >= deadline;
            (outcomes, cancelled, timed_out)
        } else {
            self.run_cases_sequential(
                execution_id,
                &suite,
                context,
                config,
                suite_config.continue_on_failure,
                deadline,
            )
            .await
        };

        // Each child case outcome is one suite-level "step".
        let mut steps = Vec::with_capacity(case_outcomes.len());
        for (i, outcome) in case_outcomes.iter().enumerate() {
            let step = self.synthesize_case_step(outcome, i as u32);
            self.record_step(trace, step.clone());
            steps.push(step);
        }

        let final_status = if cancelled {
            ExecutionStatus::Cancelled
        } else if timed_out {
            ExecutionStatus::Timeout
        } else if case_outcomes
            .iter()
            .any(|o| o.status == ExecutionStatus::Failed)
        {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Passed
        };

        Ok(RunOutcome {
            final_status,
            planned_total,
            steps,
            case_outcomes,
        })
    }

    async fn run_cases_sequential(
        &self,
        execution_id: &str,
        suite: &TestSuite,
        context: &ExecutionContext,
        config: &ExecutionConfig,
        continue_on_failure: bool,
        deadline: DateTime<Utc>,
    ) -> (Vec<CaseOutcome>, bool, bool) {
        let total = suite.test_cases.len() as u32;
        let mut statistics = ExecutionStatistics::for_total(
            total,
            Some(total as u64 * CASE_DURATION_ESTIMATE_MS),
        );
        let mut outcomes = Vec::new();
        let mut cancelled = false;
        let mut timed_out = false;

        for case_ref in &suite.test_cases {
            if self.store.trace_status(execution_id) == Some(ExecutionStatus::Cancelled) {
                cancelled = true;
                break;
            }
            if self.clock.now() >= deadline {
                timed_out = true;
                break;
            }

            let outcome = self
                .run_single_case(&case_ref.test_case_id, context, config)
                .await;
            let failed = outcome.status == ExecutionStatus::Failed;
            match outcome.status {
                ExecutionStatus::Passed => statistics.passed_steps += 1,
                _ => statistics.failed_steps += 1,
            }
            statistics.completed_steps += 1;
            statistics.recompute_rates();
            let remaining = total.saturating_sub(statistics.completed_steps) as u64;
            statistics.estimated_remaining_ms = Some(remaining * CASE_DURATION_ESTIMATE_MS);
            let _ = self.state.update_progress(
                execution_id,
                statistics.clone(),
                Some(case_ref.test_case_id.clone()),
            );
            outcomes.push(outcome);

            if failed && !continue_on_failure {
                tracing::warn!(execution_id, "stopping suite after case failure");
                break;
            }
        }
        (outcomes, cancelled, timed_out)
    }

    /// Fixed-size worker pool fed by a bounded channel; the join below
    /// is the completion barrier.
    async fn run_cases_parallel(
        &self,
        suite: &TestSuite,
        context: &ExecutionContext,
        config: &ExecutionConfig,
        pool_size: usize,
    ) -> Vec<CaseOutcome> {
        let case_count = suite.test_cases.len();
        let (tx, rx) = mpsc::channel::<(usize, String)>(case_count);
        for (idx, case_ref) in suite.test_cases.iter().enumerate() {
            // Channel is sized to hold the whole suite.
            let _ = tx.try_send((idx, case_ref.test_case_id.clone()));
        }
        drop(tx);

        let rx = Arc::new(tokio::sync::Mutex::new(rx));
        let collected = Arc::new(parking_lot::Mutex::new(Vec::<(usize, CaseOutcome)>::new()));
        let workers = pool_size.clamp(1, case_count);

        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let this = self.clone();
            let rx = Arc::clone(&rx);
            let collected = Arc::clone(&collected);
            let context = context.clone();
            let config = config.clone();
            handles.push(tokio::spawn(async move {
                loop {
                    let next = { rx.lock().await.recv().await };
                    let Some((idx, case_id)) = next else { break };
                    let outcome = this.run_single_case(&case_id, &context, &config).await;
                    collected.lock().push((idx, outcome));
                }
            }));
        }
        for handle in handles {
            let _ = handle.await;
        }

        let mut results = collected.lock().clone();
        results.sort_by_key(|(idx, _)| *idx);
        results.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn run_single_case(
        &self,
        test_case_id: &str,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> CaseOutcome {
        let started = self.clock.now();
        match self.case_loader.load(test_case_id).await {
            Ok(case) => {
                let runner = self.runners.resolve(&case.test_type);
                let steps = runner.execute_test(&case, context, config).await;
                let failed = steps
                    .iter()
                    .any(|s| matches!(s.status, StepStatus::Failed | StepStatus::Blocked));
                let duration_ms =
                    (self.clock.now() - started).num_milliseconds().max(0) as u64;
                CaseOutcome {
                    test_case_id: test_case_id.to_string(),
                    status: if failed {
                        ExecutionStatus::Failed
                    } else {
                        ExecutionStatus::Passed
                    },
                    duration_ms,
                    error: None,
                }
            }
            Err(error) => {
                tracing::error!(test_case_id, error = %error, "suite child failed to load");
                CaseOutcome {
                    test_case_id: test_case_id.to_string(),
                    status: ExecutionStatus::Failed,
                    duration_ms: 0,
                    error: Some(error.to_string()),
                }
            }
        }
    }

    fn synthesize_case_step(&self, outcome: &CaseOutcome, order: u32) -> StepResult {
        let mut step = StepResult::started(
            outcome.test_case_id.clone(),
            outcome.test_case_id.clone(),
            order,
            self.clock.now(),
        );
        step.step_type = Some("test_case".to_string());
        match outcome.status {
            ExecutionStatus::Passed => step.finish(StepStatus::Passed, self.clock.now()),
            _ => {
                let message = outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "test case failed".to_string());
                step.fail(
                    StepErrorDetails::new("CaseExecutionError", message),
                    self.clock.now(),
                );
            }
        }
        step.duration_ms = Some(outcome.duration_ms);
        step
    }

    fn record_step(&self, trace: &ExecutionTrace, step: StepResult) {
        if trace.is_partitioned {
            self.store
                .append_partitioned_step(&trace.execution_id, step);
        } else {
            self.store
                .push_embedded_step(&trace.execution_id, step, self.clock.now());
        }
    }

    fn finalize(
        &self,
        trace: &ExecutionTrace,
        run: RunOutcome,
    ) -> Result<ExecutionProgress, EngineError> {
        let execution_id = trace.execution_id.as_str();

        let mut statistics = ExecutionStatistics::from_steps(run.planned_total, &run.steps);
        statistics.estimated_remaining_ms = None;
        self.state
            .update_progress(execution_id, statistics.clone(), None)?;

        if run.final_status == ExecutionStatus::Cancelled {
            // The user's cancellation already settled the trace; adding
            // a transition here would be illegal from a terminal state.
        } else if !self
            .state
            .transition(execution_id, run.final_status, None, None)?
        {
            tracing::warn!(
                execution_id,
                status = %run.final_status,
                "terminal transition lost a race"
            );
        }

        self.store.set_overall_result(
            execution_id,
            format!(
                "{}: {}/{} steps passed",
                run.final_status, statistics.passed_steps, statistics.total_steps
            ),
            self.clock.now(),
        );
        self.store.append_log(
            execution_id,
            format!(
                "run settled {} ({}/{} steps passed)",
                run.final_status, statistics.passed_steps, statistics.total_steps
            ),
        );

        let effective_status = self
            .store
            .trace_status(execution_id)
            .unwrap_or(run.final_status);
        self.results
            .process_execution(execution_id, run.planned_total, &run.steps, effective_status);
        if trace.execution_type == ExecutionType::TestSuite {
            self.results.aggregate_suite(execution_id, &run.case_outcomes);
        }

        tracing::info!(execution_id, status = %effective_status, "orchestration finished");
        self.progress(execution_id)
    }

    fn handle_fatal(&self, execution_id: &str, error: &EngineError) {
        let status = match error {
            EngineError::Timeout { .. } => ExecutionStatus::Timeout,
            _ => ExecutionStatus::Failed,
        };
        tracing::error!(execution_id, error = %error, "orchestration failed");

        let mut debug = HashMap::new();
        debug.insert(
            "error_type".to_string(),
            serde_json::json!(match error {
                EngineError::Validation(_) => "Validation",
                EngineError::NotFound(_) => "NotFound",
                EngineError::StateTransition { .. } => "StateTransition",
                EngineError::Conflict(_) => "Conflict",
                EngineError::Execution(_) => "Execution",
                EngineError::Timeout { .. } => "Timeout",
                EngineError::ResourceAllocation { .. } => "ResourceAllocation",
                EngineError::Store(_) => "Store",
            }),
        );
        debug.insert("error_message".to_string(), serde_json::json!(error.to_string()));
        debug.insert(
            "occurred_at".to_string(),
            serde_json::json!(self.clock.now()),
        );
        self.store.merge_debug_data(execution_id, debug);

        if let Err(transition_error) = self.state.transition(execution_id, status, None, None) {
            tracing::warn!(
                execution_id,
                error = %transition_error,
                "could not settle failed execution"
            );
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
