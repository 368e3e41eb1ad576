// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Processed results, insights, and suite aggregation types.

use crate::stats::ExecutionStatistics;
use crate::status::ExecutionStatus;
use crate::step::StepResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Step-duration observations for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceInsights {
    pub fastest_step_ms: u64,
    pub slowest_step_ms: u64,
    pub median_step_ms: u64,
    /// Spread between slowest and fastest step.
    pub duration_variance_ms: u64,
}

/// Failure observations for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityInsights {
    pub failure_count: u32,
    pub failure_rate: f64,
    /// Histogram of error types across failed steps.
    pub common_errors: HashMap<String, u32>,
}

/// Derived observations computed by the result processor.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExecutionInsights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceInsights>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<ReliabilityInsights>,
    /// All steps settled with the same status.
    #[serde(default)]
    pub uniform_outcome: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<String>,
}

/// Authoritative per-execution result produced at terminal state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedResult {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub statistics: ExecutionStatistics,
    pub step_results: Vec<StepResult>,
    pub insights: ExecutionInsights,
    pub recommendations: Vec<String>,
    pub processed_at: DateTime<Utc>,
}

/// Outcome of one child case within a suite run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOutcome {
    pub test_case_id: String,
    pub status: ExecutionStatus,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Suite-level duration observations.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SuiteInsights {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fastest_case_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slowest_case_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_case_duration_ms: Option<f64>,
}

/// Aggregated outcome of a suite execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub suite_execution_id: String,
    pub total_test_cases: u32,
    pub passed_cases: u32,
    pub failed_cases: u32,
    pub cancelled_cases: u32,
    pub success_rate: f64,
    pub overall_status: ExecutionStatus,
    pub total_duration_ms: u64,
    pub average_case_duration_ms: f64,
    #[serde(default)]
    pub insights: SuiteInsights,
    pub aggregated_at: DateTime<Utc>,
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Json,
    Html,
    Csv,
}

impl ReportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Json => "application/json",
            ReportFormat::Html => "text/html; charset=utf-8",
            ReportFormat::Csv => "text/csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Json => write!(f, "json"),
            ReportFormat::Html => write!(f, "html"),
            ReportFormat::Csv => write!(f, "csv"),
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ReportFormat::Json),
            "html" => Ok(ReportFormat::Html),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!("unknown report format: {other}")),
        }
    }
}
