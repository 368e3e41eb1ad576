// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test artifacts and the loader interfaces.
//!
//! The test-case and test-suite catalogs are external collaborators;
//! the engine consumes them through [`TestCaseLoader`] and
//! [`TestSuiteLoader`]. [`StaticCatalog`] is the in-memory
//! implementation used by tests and standalone deployments.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Gherkin keyword for BDD steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GherkinKeyword {
    Given,
    When,
    Then,
}

impl fmt::Display for GherkinKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GherkinKeyword::Given => write!(f, "given"),
            GherkinKeyword::When => write!(f, "when"),
            GherkinKeyword::Then => write!(f, "then"),
        }
    }
}

/// One step definition inside a test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStep {
    pub step_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<GherkinKeyword>,
    #[serde(default)]
    pub estimated_duration_ms: u64,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub input_data: HashMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub expected_result: HashMap<String, serde_json::Value>,
}

impl TestStep {
    pub fn new(step_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            step_id: step_id.into(),
            name: name.into(),
            action: None,
            keyword: None,
            estimated_duration_ms: 0,
            input_data: HashMap::new(),
            expected_result: HashMap::new(),
        }
    }
}

/// A runnable test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub title: String,
    /// Selects the runner; unknown types fall back to the generic runner.
    #[serde(default = "default_test_type")]
    pub test_type: String,
    pub steps: Vec<TestStep>,
}

fn default_test_type() -> String {
    "generic".to_string()
}

/// Reference to a test case within a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteCaseRef {
    pub test_case_id: String,
}

/// An ordered collection of test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    pub id: String,
    pub title: String,
    pub test_cases: Vec<SuiteCaseRef>,
}

/// Errors surfaced by the artifact loaders.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("test case not found: {0}")]
    CaseNotFound(String),
    #[error("test suite not found: {0}")]
    SuiteNotFound(String),
    #[error("invalid artifact {id}: {reason}")]
    Invalid { id: String, reason: String },
}

#[async_trait]
pub trait TestCaseLoader: Send + Sync {
    async fn load(&self, test_case_id: &str) -> Result<TestCase, LoadError>;
}

#[async_trait]
pub trait TestSuiteLoader: Send + Sync {
    async fn load(&self, test_suite_id: &str) -> Result<TestSuite, LoadError>;
}

/// In-memory artifact catalog.
#[derive(Default)]
pub struct StaticCatalog {
    cases: RwLock<HashMap<String, Arc<TestCase>>>,
    suites: RwLock<HashMap<String, Arc<TestSuite>>>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_case(&self, case: TestCase) {
        self.cases.write().insert(case.id.clone(), Arc::new(case));
    }

    pub fn insert_suite(&self, suite: TestSuite) {
        self.suites
            .write()
            .insert(suite.id.clone(), Arc::new(suite));
    }
}

#[async_trait]
impl TestCaseLoader for StaticCatalog {
    async fn load(&self, test_case_id: &str) -> Result<TestCase, LoadError> {
        self.cases
            .read()
            .get(test_case_id)
            .map(|case| (**case).clone())
            .ok_or_else(|| LoadError::CaseNotFound(test_case_id.to_string()))
    }
}

#[async_trait]
impl TestSuiteLoader for StaticCatalog {
    async fn load(&self, test_suite_id: &str) -> Result<TestSuite, LoadError> {
        self.suites
            .read()
            .get(test_suite_id)
            .map(|suite| (**suite).clone())
            .ok_or_else(|| LoadError::SuiteNotFound(test_suite_id.to_string()))
    }
}
