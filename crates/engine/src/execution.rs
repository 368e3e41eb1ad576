// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution service: the start/get/list/update façade.
//!
//! Every read is scoped to the calling user: a trace triggered by
//! someone else is indistinguishable from a missing one.

use crate::error::EngineError;
use crate::orchestrator::ExecutionProgress;
use crate::queue::QueueService;
use crate::results::{Report, ResultProcessor};
use crate::state::StateService;
use rig_core::{
    is_valid_execution_id, Clock, ExecutionConfig, ExecutionContext, ExecutionStatus,
    ExecutionTrace, ExecutionType, IdGen, QueuePriority, ReportFormat, StepResult, SuiteConfig,
    TestCaseLoader, TestSuiteLoader, TraceConfig, WorkOrder,
};
use rig_storage::{Page, SortDirection, SortField, TraceQuery, TraceStore};
use std::collections::HashMap;
use std::sync::Arc;

/// Maximum tags per execution.
pub const MAX_TAGS: usize = 20;

/// Inputs for starting a test-case execution.
#[derive(Debug, Clone)]
pub struct StartTestCase {
    pub test_case_id: String,
    pub execution_context: ExecutionContext,
    pub execution_config: ExecutionConfig,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub priority: u8,
}

/// Inputs for starting a test-suite execution.
#[derive(Debug, Clone)]
pub struct StartTestSuite {
    pub test_suite_id: String,
    pub execution_context: ExecutionContext,
    pub execution_config: ExecutionConfig,
    pub suite_config: SuiteConfig,
    pub tags: Vec<String>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub priority: u8,
}

/// One page of list results.
#[derive(Debug, Clone)]
pub struct ExecutionPage {
    pub items: Vec<ExecutionTrace>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

pub struct ExecutionService<C: Clock, G: IdGen> {
    store: Arc<TraceStore>,
    state: StateService<C>,
    queue: Arc<QueueService<C>>,
    results: ResultProcessor<C>,
    case_loader: Arc<dyn TestCaseLoader>,
    suite_loader: Arc<dyn TestSuiteLoader>,
    id_gen: G,
    clock: C,
}

impl<C: Clock, G: IdGen> ExecutionService<C, G> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<TraceStore>,
        state: StateService<C>,
        queue: Arc<QueueService<C>>,
        results: ResultProcessor<C>,
        case_loader: Arc<dyn TestCaseLoader>,
        suite_loader: Arc<dyn TestSuiteLoader>,
        id_gen: G,
        clock: C,
    ) -> Self {
        Self {
            store,
            state,
            queue,
            results,
            case_loader,
            suite_loader,
            id_gen,
            clock,
        }
    }

    /// Start a test-case execution: insert the PENDING trace, enqueue
    /// it, and move it to QUEUED.
    pub async fn start_test_case(
        &self,
        user_id: &str,
        request: StartTestCase,
    ) -> Result<ExecutionTrace, EngineError> {
        validate_common(&request.execution_config, &request.tags, request.priority)?;

        let case = self.case_loader.load(&request.test_case_id).await?;
        let estimated_step_count = case.steps.len() as u32;

        let execution_id = self.id_gen.next();
        let trace = ExecutionTrace::new(
            TraceConfig {
                execution_id: execution_id.clone(),
                execution_type: ExecutionType::TestCase,
                test_case_id: Some(request.test_case_id),
                test_suite_id: None,
                parent_execution_id: None,
                triggered_by: user_id.to_string(),
                execution_context: request.execution_context.clone(),
                execution_config: request.execution_config.clone(),
                suite_config: None,
                tags: request.tags,
                metadata: request.metadata,
                priority: request.priority,
                estimated_step_count,
            },
            self.clock.now(),
        );
        self.store.insert_trace(trace)?;

        self.queue.enqueue(
            &execution_id,
            ExecutionType::TestCase,
            WorkOrder::new(request.execution_context, request.execution_config, None),
            QueuePriority::from_trace_priority(request.priority),
            None,
        )?;
        self.state
            .transition(&execution_id, ExecutionStatus::Queued, Some(user_id), None)?;

        self.store
            .get_trace(&execution_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))
    }

    /// Start a test-suite execution.
    pub async fn start_test_suite(
        &self,
        user_id: &str,
        request: StartTestSuite,
    ) -> Result<ExecutionTrace, EngineError> {
        validate_common(&request.execution_config, &request.tags, request.priority)?;
        request
            .suite_config
            .validate()
            .map_err(EngineError::Validation)?;

        let suite = self.suite_loader.load(&request.test_suite_id).await?;
        let estimated_step_count = suite.test_cases.len() as u32;

        let execution_id = self.id_gen.next();
        let trace = ExecutionTrace::new(
            TraceConfig {
                execution_id: execution_id.clone(),
                execution_type: ExecutionType::TestSuite,
                test_case_id: None,
                test_suite_id: Some(request.test_suite_id),
                parent_execution_id: None,
                triggered_by: user_id.to_string(),
                execution_context: request.execution_context.clone(),
                execution_config: request.execution_config.clone(),
                suite_config: Some(request.suite_config),
                tags: request.tags,
                metadata: request.metadata,
                priority: request.priority,
                estimated_step_count,
            },
            self.clock.now(),
        );
        self.store.insert_trace(trace)?;

        self.queue.enqueue(
            &execution_id,
            ExecutionType::TestSuite,
            WorkOrder::new(
                request.execution_context,
                request.execution_config,
                Some(request.suite_config),
            ),
            QueuePriority::from_trace_priority(request.priority),
            None,
        )?;
        self.state
            .transition(&execution_id, ExecutionStatus::Queued, Some(user_id), None)?;

        self.store
            .get_trace(&execution_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))
    }

    /// Fetch a trace with its steps, scoped to the calling user.
    pub fn get_execution(
        &self,
        user_id: &str,
        execution_id: &str,
    ) -> Result<(ExecutionTrace, Vec<StepResult>), EngineError> {
        let trace = self.owned_trace(user_id, execution_id)?;
        let steps = self.store.steps_for(execution_id);
        Ok((trace, steps))
    }

    /// List the calling user's executions. The user scope always
    /// overrides whatever the query carried.
    pub fn list_executions(
        &self,
        user_id: &str,
        mut query: TraceQuery,
        sort: SortField,
        direction: SortDirection,
        page: Page,
    ) -> Result<ExecutionPage, EngineError> {
        if page.page < 1 {
            return Err(EngineError::Validation("page must be >= 1".to_string()));
        }
        if page.page_size < 1 || page.page_size > Page::MAX_PAGE_SIZE {
            return Err(EngineError::Validation(format!(
                "page_size must be within 1..={}",
                Page::MAX_PAGE_SIZE
            )));
        }

        query.triggered_by = Some(user_id.to_string());
        let (items, total) = self.store.list_traces(&query, sort, direction, page);
        let total_pages = (total as u32).div_ceil(page.page_size).max(1);
        Ok(ExecutionPage {
            items,
            total,
            page: page.page,
            page_size: page.page_size,
            total_pages,
        })
    }

    /// Apply a user-requested status change. Illegal transitions are a
    /// distinct error from a missing execution.
    pub fn update_status(
        &self,
        user_id: &str,
        execution_id: &str,
        new_status: ExecutionStatus,
        reason: Option<String>,
        metadata: Option<HashMap<String, serde_json::Value>>,
    ) -> Result<ExecutionTrace, EngineError> {
        self.owned_trace(user_id, execution_id)?;

        let mut metadata = metadata.unwrap_or_default();
        if let Some(reason) = reason {
            metadata.insert("reason".to_string(), serde_json::json!(reason));
        }
        let applied =
            self.state
                .transition(execution_id, new_status, Some(user_id), Some(metadata))?;
        if !applied {
            return Err(EngineError::Conflict(format!(
                "execution {execution_id} changed concurrently; retry"
            )));
        }
        if new_status == ExecutionStatus::Cancelled {
            // Cancellation ends scheduling; a row for a not-yet-started
            // execution would otherwise be dispatched and rejected.
            self.queue.complete(execution_id, true, None);
        }
        self.store
            .get_trace(execution_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))
    }

    /// Real-time progress projection.
    pub fn progress(
        &self,
        user_id: &str,
        execution_id: &str,
    ) -> Result<ExecutionProgress, EngineError> {
        let trace = self.owned_trace(user_id, execution_id)?;
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

    /// Render a report for one of the caller's executions.
    pub fn report(
        &self,
        user_id: &str,
        execution_id: &str,
        format: ReportFormat,
        include_details: bool,
    ) -> Result<Report, EngineError> {
        let trace = self.owned_trace(user_id, execution_id)?;
        let steps = self.store.steps_for(execution_id);
        Ok(self
            .results
            .render_report(&trace, &steps, format, include_details))
    }

    fn owned_trace(
        &self,
        user_id: &str,
        execution_id: &str,
    ) -> Result<ExecutionTrace, EngineError> {
        if !is_valid_execution_id(execution_id) {
            return Err(EngineError::Validation(format!(
                "invalid execution id: {execution_id}"
            )));
        }
        self.store
            .get_trace(execution_id)
            .filter(|trace| trace.triggered_by == user_id)
            .ok_or_else(|| EngineError::NotFound(format!("execution {execution_id}")))
    }
}

fn validate_common(
    config: &ExecutionConfig,
    tags: &[String],
    priority: u8,
) -> Result<(), EngineError> {
    config.validate().map_err(EngineError::Validation)?;
    if tags.len() > MAX_TAGS {
        return Err(EngineError::Validation(format!(
            "at most {MAX_TAGS} tags allowed, got {}",
            tags.len()
        )));
    }
    if !(1..=10).contains(&priority) {
        return Err(EngineError::Validation(format!(
            "priority must be within 1..=10, got {priority}"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "execution_tests.rs"]
mod tests;
