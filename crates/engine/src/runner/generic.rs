// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic test runner: action/verify semantics.

use super::{base_validation, verify_expectations, TestRunner, ValidationReport};
use async_trait::async_trait;
use rig_core::{
    Clock, ExecutionConfig, ExecutionContext, StepErrorDetails, StepResult, StepStatus, TestCase,
    TestStep,
};
use std::collections::HashMap;
use std::time::Duration;

pub struct GenericRunner<C: Clock> {
    clock: C,
}

impl<C: Clock> GenericRunner<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Execute the step's action against the target environment and
    /// return the observed result.
    async fn perform_action(
        &self,
        step: &TestStep,
        context: &ExecutionContext,
    ) -> HashMap<String, serde_json::Value> {
        if step.estimated_duration_ms > 0 {
            tokio::time::sleep(Duration::from_millis(step.estimated_duration_ms)).await;
        }

        let action = step.action.as_deref().unwrap_or("verify");
        let mut actual: HashMap<String, serde_json::Value> = HashMap::new();
        actual.insert("status".to_string(), serde_json::json!("success"));
        match action {
            "navigate" => {
                if let Some(url) = step.input_data.get("url") {
                    actual.insert("url".to_string(), url.clone());
                }
                actual.insert(
                    "environment".to_string(),
                    serde_json::json!(context.environment),
                );
            }
            "click" => {
                if let Some(element) = step.input_data.get("element") {
                    actual.insert("element".to_string(), element.clone());
                }
                actual.insert("clicked".to_string(), serde_json::json!(true));
            }
            "input" => {
                if let Some(field) = step.input_data.get("field") {
                    actual.insert("field".to_string(), field.clone());
                }
                if let Some(value) = step.input_data.get("value") {
                    actual.insert("value".to_string(), value.clone());
                }
            }
            _ => {
                // verify and unknown actions echo their input
                for (key, value) in &step.input_data {
                    actual.insert(key.clone(), value.clone());
                }
            }
        }
        actual
    }
}

#[async_trait]
impl<C: Clock> TestRunner for GenericRunner<C> {
    fn name(&self) -> &'static str {
        "generic"
    }

    async fn execute_test(
        &self,
        case: &TestCase,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> Vec<StepResult> {
        tracing::info!(test_case_id = %case.id, "executing generic test case");
        let mut results = Vec::with_capacity(case.steps.len());
        for (i, step) in case.steps.iter().enumerate() {
            let result = self.execute_step(step, i as u32, context, config).await;
            let failed = result.status == StepStatus::Failed;
            results.push(result);
            if failed && config.fail_fast {
                tracing::warn!(
                    test_case_id = %case.id,
                    step = i,
                    "stopping execution after step failure (fail_fast)"
                );
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
        config: &ExecutionConfig,
    ) -> StepResult {
        let mut result =
            StepResult::started(&step.step_id, &step.name, step_order, self.clock.now());
        result.input_data = step.input_data.clone();
        result.expected_result = step.expected_result.clone();
        result.step_type = step.action.clone();
        result.execution_environment = Some(context.environment.clone());
        result.max_retries = config.max_retries;

        let deadline = Duration::from_millis(config.step_timeout_ms);
        match tokio::time::timeout(deadline, self.perform_action(step, context)).await {
            Ok(actual) => {
                let passed = verify_expectations(&step.expected_result, &actual);
                result.actual_result = Some(actual);
                if passed {
                    result.finish(StepStatus::Passed, self.clock.now());
                } else {
                    let mut error = StepErrorDetails::new(
                        "AssertionError",
                        "expected result did not match actual result",
                    )
                    .with_suggestion("review expected vs actual results");
                    error.context.insert(
                        "expected".to_string(),
                        serde_json::json!(step.expected_result),
                    );
                    result.fail(error, self.clock.now());
                }
            }
            Err(_) => {
                let error = StepErrorDetails::new(
                    "TimeoutError",
                    format!("step exceeded {}ms deadline", config.step_timeout_ms),
                )
                .with_suggestion("increase step_timeout_ms or split the step");
                result.fail(error, self.clock.now());
            }
        }
        result
    }

    fn validate_test_case(&self, case: &TestCase) -> ValidationReport {
        let (errors, mut warnings) = base_validation(case);
        for (i, step) in case.steps.iter().enumerate() {
            if step.action.is_none() {
                warnings.push(format!("step {i}: action is recommended"));
            }
        }
        ValidationReport::from_parts(errors, warnings)
    }
}
