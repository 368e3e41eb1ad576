// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Manual test runner.
//!
//! Steps carry the tester's verdict in their input data
//! (`tester_result`: passed/failed/blocked/skipped, plus an optional
//! `tester_note`). Failures do not halt subsequent steps unless
//! fail-fast is explicitly configured.

use super::{base_validation, TestRunner, ValidationReport};
use async_trait::async_trait;
use rig_core::{
    Clock, ExecutionConfig, ExecutionContext, StepErrorDetails, StepResult, StepStatus, TestCase,
    TestStep,
};
use std::time::Duration;

pub struct ManualRunner<C: Clock> {
    clock: C,
}

impl<C: Clock> ManualRunner<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

fn verdict(step: &TestStep) -> StepStatus {
    match step
        .input_data
        .get("tester_result")
        .and_then(serde_json::Value::as_str)
    {
        Some("failed") => StepStatus::Failed,
        Some("blocked") => StepStatus::Blocked,
        Some("skipped") => StepStatus::Skipped,
        Some("warning") => StepStatus::Warning,
        // Unrecorded steps default to passed, matching tester workflows
        // where only deviations are written down.
        _ => StepStatus::Passed,
    }
}

#[async_trait]
impl<C: Clock> TestRunner for ManualRunner<C> {
    fn name(&self) -> &'static str {
        "manual"
    }

    async fn execute_test(
        &self,
        case: &TestCase,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> Vec<StepResult> {
        tracing::info!(test_case_id = %case.id, "executing manual test case");
        let mut results = Vec::with_capacity(case.steps.len());
        for (i, step) in case.steps.iter().enumerate() {
            let result = self.execute_step(step, i as u32, context, config).await;
            let failed = result.status == StepStatus::Failed;
            results.push(result);
            // Manual runs keep collecting verdicts past failures unless
            // the execution explicitly opted into fail-fast.
            if failed && config.fail_fast {
                break;
            }
        }
        results
    }

    async fn execute_step(
        &self,
        step: &TestStep,
        step_order: u32,
        context: &ExecutionContext,
        _config: &ExecutionConfig,
    ) -> StepResult {
        let mut result =
            StepResult::started(&step.step_id, &step.name, step_order, self.clock.now());
        result.input_data = step.input_data.clone();
        result.expected_result = step.expected_result.clone();
        result.step_type = Some("manual".to_string());
        result.execution_environment = Some(context.environment.clone());

        // Manual steps take as long as the tester took.
        if step.estimated_duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.estimated_duration_ms)).await;
        }

        let status = verdict(step);
        if let Some(note) = step
            .input_data
            .get("tester_note")
            .and_then(serde_json::Value::as_str)
        {
            result
                .metadata
                .insert("tester_note".to_string(), serde_json::json!(note));
        }
        match status {
            StepStatus::Failed => {
                let message = step
                    .input_data
                    .get("tester_note")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("tester recorded a failure");
                result.fail(
                    StepErrorDetails::new("ManualVerificationError", message),
                    self.clock.now(),
                );
            }
            StepStatus::Blocked => {
                result.error_details = Some(StepErrorDetails::new(
                    "BlockedError",
                    "step could not be executed",
                ));
                result.finish(StepStatus::Blocked, self.clock.now());
            }
            other => result.finish(other, self.clock.now()),
        }
        result
    }

    fn validate_test_case(&self, case: &TestCase) -> ValidationReport {
        let (errors, mut warnings) = base_validation(case);
        if case
            .steps
            .iter()
            .all(|s| !s.input_data.contains_key("tester_result"))
        {
            warnings.push("no tester verdicts recorded; all steps will pass".to_string());
        }
        ValidationReport::from_parts(errors, warnings)
    }
}
