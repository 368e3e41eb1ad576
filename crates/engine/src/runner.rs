// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable test runners.
//!
//! One runner per test kind, registered statically by `test_type`
//! name. Runners enforce the per-step deadline, capture timing, and
//! surface failures inside the step result, never as errors.

pub mod bdd;
pub mod generic;
pub mod manual;

use async_trait::async_trait;
use rig_core::{ExecutionConfig, ExecutionContext, StepResult, TestCase, TestStep};
use std::collections::HashMap;
use std::sync::Arc;

pub use bdd::BddRunner;
pub use generic::GenericRunner;
pub use manual::ManualRunner;

/// Outcome of validating a test case against a runner's expectations.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn from_parts(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
            warnings,
        }
    }
}

/// Common runner interface.
#[async_trait]
pub trait TestRunner: Send + Sync {
    fn name(&self) -> &'static str;

    /// Drive a whole test case, honoring `fail_fast`.
    async fn execute_test(
        &self,
        case: &TestCase,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> Vec<StepResult>;

    /// Drive one step under the step deadline.
    async fn execute_step(
        &self,
        step: &TestStep,
        step_order: u32,
        context: &ExecutionContext,
        config: &ExecutionConfig,
    ) -> StepResult;

    /// Structural validation before any step runs.
    fn validate_test_case(&self, case: &TestCase) -> ValidationReport;
}

/// Static runner registry, built once at engine construction.
pub struct RunnerRegistry {
    runners: HashMap<String, Arc<dyn TestRunner>>,
    fallback: Arc<dyn TestRunner>,
}

impl RunnerRegistry {
    /// Registry with the built-in generic, bdd, and manual runners.
    pub fn with_defaults(clock: impl rig_core::Clock) -> Self {
        let generic: Arc<dyn TestRunner> = Arc::new(GenericRunner::new(clock.clone()));
        let mut runners: HashMap<String, Arc<dyn TestRunner>> = HashMap::new();
        runners.insert("generic".to_string(), Arc::clone(&generic));
        runners.insert(
            "bdd".to_string(),
            Arc::new(BddRunner::new(clock.clone())),
        );
        runners.insert("manual".to_string(), Arc::new(ManualRunner::new(clock)));
        Self {
            runners,
            fallback: generic,
        }
    }

    pub fn register(&mut self, test_type: impl Into<String>, runner: Arc<dyn TestRunner>) {
        self.runners.insert(test_type.into(), runner);
    }

    /// Resolve a runner by test type. Unknown types fall back to the
    /// generic runner with a warning.
    pub fn resolve(&self, test_type: &str) -> Arc<dyn TestRunner> {
        match self.runners.get(test_type) {
            Some(runner) => Arc::clone(runner),
            None => {
                tracing::warn!(test_type, "unknown test type, falling back to generic runner");
                Arc::clone(&self.fallback)
            }
        }
    }

    pub fn registered_types(&self) -> Vec<&str> {
        self.runners.keys().map(String::as_str).collect()
    }
}

/// Shared verification: every expected key must be present in the
/// actual result with an equal value (`expected ⊆ actual`).
pub(crate) fn verify_expectations(
    expected: &HashMap<String, serde_json::Value>,
    actual: &HashMap<String, serde_json::Value>,
) -> bool {
    expected
        .iter()
        .all(|(key, value)| actual.get(key) == Some(value))
}

/// Structural checks shared by all runners.
pub(crate) fn base_validation(case: &TestCase) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    if case.id.is_empty() {
        errors.push("test case id is required".to_string());
    }
    if case.title.is_empty() {
        warnings.push("title is recommended".to_string());
    }
    if case.steps.is_empty() {
        errors.push("at least one step is required".to_string());
    }
    for (i, step) in case.steps.iter().enumerate() {
        if step.name.is_empty() {
            errors.push(format!("step {i}: name is required"));
        }
    }
    (errors, warnings)
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
