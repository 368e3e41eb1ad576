// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution context and configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Environment description an execution runs against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    #[serde(default = "default_environment")]
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_tag: Option<String>,
    /// Free-form properties; only consumed at the boundary.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub custom: HashMap<String, serde_json::Value>,
}

fn default_environment() -> String {
    "local".to_string()
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            browser: None,
            build_tag: None,
            custom: HashMap::new(),
        }
    }
}

/// Per-execution runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Run-level deadline, enforced by the orchestrator.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Per-step deadline, enforced by the runner. Must be strictly less
    /// than `timeout_ms`.
    #[serde(default = "default_step_timeout_ms")]
    pub step_timeout_ms: u64,
    #[serde(default = "default_true")]
    pub fail_fast: bool,
    #[serde(default)]
    pub retry_enabled: bool,
    /// Per-step retry budget. Independent of queue-level retries.
    #[serde(default)]
    pub max_retries: u32,
    #[serde(default)]
    pub capture_screenshots: bool,
    #[serde(default = "default_true")]
    pub capture_logs: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_memory_mb: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cpu_percent: Option<u8>,
}

fn default_timeout_ms() -> u64 {
    300_000
}

fn default_step_timeout_ms() -> u64 {
    30_000
}

fn default_true() -> bool {
    true
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            step_timeout_ms: default_step_timeout_ms(),
            fail_fast: true,
            retry_enabled: false,
            max_retries: 0,
            capture_screenshots: false,
            capture_logs: true,
            max_memory_mb: None,
            max_cpu_percent: None,
        }
    }
}

impl ExecutionConfig {
    pub const MIN_TIMEOUT_MS: u64 = 1_000;
    pub const MAX_TIMEOUT_MS: u64 = 3_600_000;
    pub const MAX_STEP_RETRIES: u32 = 10;

    /// Validate value ranges and cross-field invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_ms < Self::MIN_TIMEOUT_MS || self.timeout_ms > Self::MAX_TIMEOUT_MS {
            return Err(format!(
                "timeout_ms must be within {}..={}, got {}",
                Self::MIN_TIMEOUT_MS,
                Self::MAX_TIMEOUT_MS,
                self.timeout_ms
            ));
        }
        if self.step_timeout_ms == 0 {
            return Err("step_timeout_ms must be positive".to_string());
        }
        if self.step_timeout_ms >= self.timeout_ms {
            return Err(format!(
                "step_timeout_ms ({}) must be strictly less than timeout_ms ({})",
                self.step_timeout_ms, self.timeout_ms
            ));
        }
        if self.max_retries > Self::MAX_STEP_RETRIES {
            return Err(format!(
                "max_retries must not exceed {}, got {}",
                Self::MAX_STEP_RETRIES,
                self.max_retries
            ));
        }
        if let Some(cpu) = self.max_cpu_percent {
            if cpu == 0 || cpu > 100 {
                return Err(format!("max_cpu_percent must be within 1..=100, got {cpu}"));
            }
        }
        Ok(())
    }
}

/// Suite-level execution options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuiteConfig {
    #[serde(default)]
    pub parallel_execution: bool,
    #[serde(default = "default_max_parallel_cases")]
    pub max_parallel_cases: u32,
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,
}

fn default_max_parallel_cases() -> u32 {
    3
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            parallel_execution: false,
            max_parallel_cases: default_max_parallel_cases(),
            continue_on_failure: true,
        }
    }
}

impl SuiteConfig {
    pub const MAX_PARALLEL_CASES: u32 = 16;

    pub fn validate(&self) -> Result<(), String> {
        if self.max_parallel_cases == 0 || self.max_parallel_cases > Self::MAX_PARALLEL_CASES {
            return Err(format!(
                "max_parallel_cases must be within 1..={}, got {}",
                Self::MAX_PARALLEL_CASES,
                self.max_parallel_cases
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
