// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! BDD test runner: Gherkin steps grouped into scenarios.
//!
//! A new scenario starts at each Given that follows a non-Given step.
//! Under `fail_fast` a failure aborts the rest of its scenario (the
//! remaining scenario steps are recorded as SKIPPED) while later
//! scenarios still run.

use super::{base_validation, verify_expectations, TestRunner, ValidationReport};
use async_trait::async_trait;
use rig_core::{
    Clock, ExecutionConfig, ExecutionContext, GherkinKeyword, StepErrorDetails, StepResult,
    StepStatus, TestCase, TestStep,
};
use std::time::Duration;

pub struct BddRunner<C: Clock> {
    clock: C,
}

impl<C: Clock> BddRunner<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn skipped_step(&self, step: &TestStep, step_order: u32, scenario: usize) -> StepResult {
        let mut result =
            StepResult::started(&step.step_id, &step.name, step_order, self.clock.now());
        result.input_data = step.input_data.clone();
        result.metadata.insert(
            "scenario_index".to_string(),
            serde_json::json!(scenario),
        );
        result.finish(StepStatus::Skipped, self.clock.now());
        result
    }
}

/// Split flat steps into scenarios at Given boundaries.
fn scenario_bounds(steps: &[TestStep]) -> Vec<(usize, usize)> {
    let mut bounds: Vec<(usize, usize)> = Vec::new();
    let mut start = 0;
    for (i, step) in steps.iter().enumerate() {
        let starts_scenario = i > 0
            && step.keyword == Some(GherkinKeyword::Given)
            && steps[i - 1].keyword != Some(GherkinKeyword::Given);
        if starts_scenario {
            bounds.push((start, i));
            start = i;
        }
    }
    if start < steps.len() {
        bounds.push((start, steps.len()));
    }
    bounds
}

#[async_trait]
impl<C: Clock> TestRunner for BddRunner<C> {
    fn name(&self) -> &'static str {
        "bdd"
    }

    async fn execute_test(
        &self,
        case: &TestCase,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> Vec<StepResult> {
        tracing::info!(test_case_id = %case.id, "executing bdd test case");
        let mut results = Vec::with_capacity(case.steps.len());

        for (scenario_index, &(start, end)) in scenario_bounds(&case.steps).iter().enumerate() {
            let mut scenario_failed = false;
            for (offset, step) in case.steps[start..end].iter().enumerate() {
                let step_order = (start + offset) as u32;
                if scenario_failed && config.fail_fast {
                    results.push(self.skipped_step(step, step_order, scenario_index));
                    continue;
                }
                let mut result = self.execute_step(step, step_order, context, config).await;
                result.metadata.insert(
                    "scenario_index".to_string(),
                    serde_json::json!(scenario_index),
                );
                if result.status == StepStatus::Failed {
                    scenario_failed = true;
                    tracing::warn!(
                        test_case_id = %case.id,
                        scenario = scenario_index,
                        step = step_order,
                        "scenario aborted after step failure"
                    );
                }
                results.push(result);
            }
        }
        results
    }

    async fn execute_step(
        &self,
        step: &TestStep,
        step_order: u32,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> StepResult {
        let mut result =
            StepResult::started(&step.step_id, &step.name, step_order, self.clock.now());
        result.input_data = step.input_data.clone();
        result.expected_result = step.expected_result.clone();
        result.step_type = step.keyword.map(|k| k.to_string());
        result.execution_environment = Some(context.environment.clone());

        let work = async {
            if step.estimated_duration_ms > 0 {
                tokio::time::sleep(Duration::from_millis(step.estimated_duration_ms)).await;
            }
            // The step body echoes its input as the observed outcome;
            // Then-steps verify against it.
            let mut actual = step.input_data.clone();
            actual.insert("status".to_string(), serde_json::json!("success"));
            actual
        };

        let deadline = Duration::from_millis(config.step_timeout_ms);
        match tokio::time::timeout(deadline, work).await {
            Ok(actual) => {
                let passed = verify_expectations(&step.expected_result, &actual);
                result.actual_result = Some(actual);
                if passed {
                    result.finish(StepStatus::Passed, self.clock.now());
                } else {
                    let error = StepErrorDetails::new(
                        "AssertionError",
                        format!(
                            "{} expectation not met",
                            step.keyword.map_or("step".to_string(), |k| k.to_string())
                        ),
                    )
                    .with_suggestion("review the scenario's Then expectations");
                    result.fail(error, self.clock.now());
                }
            }
            Err(_) => {
                let error = StepErrorDetails::new(
                    "TimeoutError",
                    format!("step exceeded {}ms deadline", config.step_timeout_ms),
                );
                result.fail(error, self.clock.now());
            }
        }
        result
    }

    fn validate_test_case(&self, case: &TestCase) -> ValidationReport {
        let (errors, mut warnings) = base_validation(case);
        let has_given = case
            .steps
            .iter()
            .any(|s| s.keyword == Some(GherkinKeyword::Given));
        let has_when = case
            .steps
            .iter()
            .any(|s| s.keyword == Some(GherkinKeyword::When));
        let has_then = case
            .steps
            .iter()
            .any(|s| s.keyword == Some(GherkinKeyword::Then));
        if !(has_given && has_when && has_then) {
            warnings.push("no Given/When/Then structure detected".to_string());
        }
        ValidationReport::from_parts(errors, warnings)
    }
}

#[cfg(test)]
#[path = "bdd_tests.rs"]
mod tests;
