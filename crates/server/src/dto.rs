// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response DTOs and query-string parsing.

use crate::error::ApiError;
use crate::projection::{StepFields, TraceFields};
use chrono::{DateTime, Utc};
use rig_core::{
    ExecutionConfig, ExecutionContext, ExecutionStatus, ExecutionType, ReportFormat, SuiteConfig,
};
use rig_engine::{StartTestCase, StartTestSuite};
use rig_storage::{Page, SortDirection, SortField, TraceQuery};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

fn default_priority() -> u8 {
    5
}

fn default_true() -> bool {
    true
}

fn default_max_parallel_cases() -> u32 {
    3
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Body for `POST /executions/test-case`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartTestCaseRequest {
    pub test_case_id: String,
    #[serde(default)]
    pub execution_context: ExecutionContext,
    #[serde(default)]
    pub execution_config: ExecutionConfig,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

impl From<StartTestCaseRequest> for StartTestCase {
    fn from(req: StartTestCaseRequest) -> Self {
        StartTestCase {
            test_case_id: req.test_case_id,
            execution_context: req.execution_context,
            execution_config: req.execution_config,
            tags: req.tags,
            metadata: req.metadata,
            priority: req.priority,
        }
    }
}

/// Body for `POST /executions/test-suite`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartTestSuiteRequest {
    pub test_suite_id: String,
    #[serde(default)]
    pub execution_context: ExecutionContext,
    #[serde(default)]
    pub execution_config: ExecutionConfig,
    #[serde(default)]
    pub parallel_execution: bool,
    #[serde(default = "default_max_parallel_cases")]
    pub max_parallel_cases: u32,
    #[serde(default = "default_true")]
    pub continue_on_failure: bool,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

impl From<StartTestSuiteRequest> for StartTestSuite {
    fn from(req: StartTestSuiteRequest) -> Self {
        StartTestSuite {
            test_suite_id: req.test_suite_id,
            execution_context: req.execution_context,
            execution_config: req.execution_config,
            suite_config: SuiteConfig {
                parallel_execution: req.parallel_execution,
                max_parallel_cases: req.max_parallel_cases,
                continue_on_failure: req.continue_on_failure,
            },
            tags: req.tags,
            metadata: req.metadata,
            priority: req.priority,
        }
    }
}

/// Body for `PATCH /executions/{id}/status`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub new_status: ExecutionStatus,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

/// Query for `GET /executions/{id}`.
#[derive(Debug, Default, Deserialize)]
pub struct GetQuery {
    #[serde(default)]
    pub include_fields: Option<String>,
    #[serde(default)]
    pub include_steps: Option<String>,
}

impl GetQuery {
    pub fn levels(&self) -> Result<(TraceFields, StepFields), ApiError> {
        Ok((
            parse_optional(self.include_fields.as_deref())?,
            parse_optional(self.include_steps.as_deref())?,
        ))
    }
}

/// Query for `GET /executions`.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub execution_type: Option<String>,
    #[serde(default)]
    pub test_case_id: Option<String>,
    #[serde(default)]
    pub test_suite_id: Option<String>,
    /// Comma-separated; OR logic.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub triggered_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub triggered_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_after: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed_before: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_direction: Option<String>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default)]
    pub include_fields: Option<String>,
    #[serde(default)]
    pub include_steps: Option<String>,
}

impl ListQuery {
    pub fn trace_query(&self) -> Result<TraceQuery, ApiError> {
        Ok(TraceQuery {
            statuses: parse_list::<ExecutionStatus>(self.status.as_deref())?,
            execution_types: parse_list::<ExecutionType>(self.execution_type.as_deref())?,
            triggered_by: None,
            test_case_id: self.test_case_id.clone(),
            test_suite_id: self.test_suite_id.clone(),
            tags: self
                .tags
                .as_deref()
                .map(split_csv)
                .unwrap_or_default(),
            triggered_after: self.triggered_after,
            triggered_before: self.triggered_before,
            completed_after: self.completed_after,
            completed_before: self.completed_before,
        })
    }

    pub fn sort(&self) -> Result<(SortField, SortDirection), ApiError> {
        let field = match self.sort_field.as_deref() {
            None | Some("triggered_at") => SortField::TriggeredAt,
            Some("started_at") => SortField::StartedAt,
            Some("completed_at") => SortField::CompletedAt,
            Some("status") => SortField::Status,
            Some("execution_type") => SortField::ExecutionType,
            Some("duration") => SortField::Duration,
            Some(other) => {
                return Err(ApiError::Validation(format!(
                    "unknown sort_field: {other}"
                )))
            }
        };
        let direction = match self.sort_direction.as_deref() {
            None | Some("desc") => SortDirection::Desc,
            Some("asc") => SortDirection::Asc,
            Some(other) => {
                return Err(ApiError::Validation(format!(
                    "sort_direction must be asc or desc, got {other}"
                )))
            }
        };
        Ok((field, direction))
    }

    pub fn page(&self) -> Result<Page, ApiError> {
        if self.page < 1 {
            return Err(ApiError::Validation("page must be >= 1".to_string()));
        }
        if self.page_size < 1 || self.page_size > Page::MAX_PAGE_SIZE {
            return Err(ApiError::Validation(format!(
                "page_size must be within 1..={}",
                Page::MAX_PAGE_SIZE
            )));
        }
        Ok(Page {
            page: self.page,
            page_size: self.page_size,
        })
    }

    pub fn levels(&self) -> Result<(TraceFields, StepFields), ApiError> {
        Ok((
            parse_optional(self.include_fields.as_deref())?,
            parse_optional(self.include_steps.as_deref())?,
        ))
    }
}

/// Query for `GET /executions/{id}/report`.
#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub include_details: Option<bool>,
}

impl ReportQuery {
    pub fn report_format(&self) -> Result<ReportFormat, ApiError> {
        match self.format.as_deref() {
            None => Ok(ReportFormat::Json),
            Some(s) => ReportFormat::from_str(s).map_err(ApiError::Validation),
        }
    }
}

/// Query for `GET /executions/analytics`.
#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub time_range_hours: Option<u32>,
}

impl AnalyticsQuery {
    pub fn window_hours(&self) -> Result<u32, ApiError> {
        let hours = self.time_range_hours.unwrap_or(24);
        if !(1..=168).contains(&hours) {
            return Err(ApiError::Validation(format!(
                "time_range_hours must be within 1..=168, got {hours}"
            )));
        }
        Ok(hours)
    }
}

/// Query for `GET /executions/trends`.
#[derive(Debug, Deserialize)]
pub struct TrendsQuery {
    #[serde(default)]
    pub days: Option<u32>,
}

impl TrendsQuery {
    pub fn window_days(&self) -> Result<u32, ApiError> {
        let days = self.days.unwrap_or(7);
        if !(1..=30).contains(&days) {
            return Err(ApiError::Validation(format!(
                "days must be within 1..=30, got {days}"
            )));
        }
        Ok(days)
    }
}

/// Pagination block on list responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_count: usize,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_previous: bool,
}

/// Envelope for `GET /executions`.
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub executions: Vec<serde_json::Value>,
    pub pagination: PaginationMeta,
}

fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_list<T: FromStr<Err = String>>(raw: Option<&str>) -> Result<Vec<T>, ApiError> {
    raw.map(split_csv)
        .unwrap_or_default()
        .iter()
        .map(|part| T::from_str(part).map_err(ApiError::Validation))
        .collect()
}

fn parse_optional<T: FromStr<Err = String> + Default>(
    raw: Option<&str>,
) -> Result<T, ApiError> {
    match raw {
        None => Ok(T::default()),
        Some(s) => T::from_str(s).map_err(ApiError::Validation),
    }
}

#[cfg(test)]
#[path = "dto_tests.rs"]
mod tests;
