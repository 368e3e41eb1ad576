// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Trace list queries: filtering, sorting, pagination.

use chrono::{DateTime, Utc};
use rig_core::{ExecutionStatus, ExecutionTrace, ExecutionType};
use std::cmp::Ordering;

/// Filter over the trace collection. Empty vectors match everything;
/// tags use OR logic.
#[derive(Debug, Clone, Default)]
pub struct TraceQuery {
    pub statuses: Vec<ExecutionStatus>,
    pub execution_types: Vec<ExecutionType>,
    pub triggered_by: Option<String>,
    pub test_case_id: Option<String>,
    pub test_suite_id: Option<String>,
    pub tags: Vec<String>,
    pub triggered_after: Option<DateTime<Utc>>,
    pub triggered_before: Option<DateTime<Utc>>,
    pub completed_after: Option<DateTime<Utc>>,
    pub completed_before: Option<DateTime<Utc>>,
}

impl TraceQuery {
    pub fn matches(&self, trace: &ExecutionTrace) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&trace.status) {
            return false;
        }
        if !self.execution_types.is_empty()
            && !self.execution_types.contains(&trace.execution_type)
        {
            return false;
        }
        if let Some(user) = &self.triggered_by {
            if &trace.triggered_by != user {
                return false;
            }
        }
        if let Some(case_id) = &self.test_case_id {
            if trace.test_case_id.as_ref() != Some(case_id) {
                return false;
            }
        }
        if let Some(suite_id) = &self.test_suite_id {
            if trace.test_suite_id.as_ref() != Some(suite_id) {
                return false;
            }
        }
        if !self.tags.is_empty() && !self.tags.iter().any(|tag| trace.tags.contains(tag)) {
            return false;
        }
        if let Some(after) = self.triggered_after {
            if trace.triggered_at < after {
                return false;
            }
        }
        if let Some(before) = self.triggered_before {
            if trace.triggered_at > before {
                return false;
            }
        }
        if let Some(after) = self.completed_after {
            match trace.completed_at {
                Some(at) if at >= after => {}
                _ => return false,
            }
        }
        if let Some(before) = self.completed_before {
            match trace.completed_at {
                Some(at) if at <= before => {}
                _ => return false,
            }
        }
        true
    }
}

/// Sortable trace fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    TriggeredAt,
    StartedAt,
    CompletedAt,
    Status,
    ExecutionType,
    Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortField {
    pub fn compare(self, a: &ExecutionTrace, b: &ExecutionTrace) -> Ordering {
        match self {
            SortField::TriggeredAt => a.triggered_at.cmp(&b.triggered_at),
            SortField::StartedAt => a.started_at.cmp(&b.started_at),
            SortField::CompletedAt => a.completed_at.cmp(&b.completed_at),
            SortField::Status => a.status.to_string().cmp(&b.status.to_string()),
            SortField::ExecutionType => {
                a.execution_type.to_string().cmp(&b.execution_type.to_string())
            }
            SortField::Duration => a.total_duration_ms.cmp(&b.total_duration_ms),
        }
    }
}

/// 1-based pagination window.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u32,
    pub page_size: u32,
}

impl Page {
    pub const MAX_PAGE_SIZE: u32 = 100;

    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 20,
        }
    }
}

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
