// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field-inclusion projection.
//!
//! Clients hint how much of a trace and its steps to serialize; each
//! level is a superset of the previous one.

use rig_core::{ExecutionTrace, StepResult};
use serde_json::{json, Map, Value};
use std::str::FromStr;

/// Trace projection levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum TraceFields {
    Core,
    #[default]
    Summary,
    Detailed,
    Full,
}

impl FromStr for TraceFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "core" => Ok(TraceFields::Core),
            "summary" => Ok(TraceFields::Summary),
            "detailed" => Ok(TraceFields::Detailed),
            "full" => Ok(TraceFields::Full),
            other => Err(format!("unknown include_fields value: {other}")),
        }
    }
}

/// Step projection levels. FULL currently matches DETAILED; the level
/// is reserved for debug payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StepFields {
    #[default]
    Basic,
    Standard,
    Detailed,
    Full,
}

impl FromStr for StepFields {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basic" => Ok(StepFields::Basic),
            "standard" => Ok(StepFields::Standard),
            "detailed" => Ok(StepFields::Detailed),
            "full" => Ok(StepFields::Full),
            other => Err(format!("unknown include_steps value: {other}")),
        }
    }
}

/// Serialize a trace at the requested level. Steps appear from
/// DETAILED upward, projected at the step level.
pub fn project_trace(
    trace: &ExecutionTrace,
    steps: &[StepResult],
    fields: TraceFields,
    step_fields: StepFields,
) -> Value {
    let mut out = Map::new();
    out.insert("execution_id".into(), json!(trace.execution_id));
    out.insert("status".into(), json!(trace.status));
    out.insert("execution_type".into(), json!(trace.execution_type));
    out.insert("triggered_by".into(), json!(trace.triggered_by));
    out.insert("triggered_at".into(), json!(trace.triggered_at));

    if fields >= TraceFields::Summary {
        out.insert("test_case_id".into(), json!(trace.test_case_id));
        out.insert("test_suite_id".into(), json!(trace.test_suite_id));
        out.insert("started_at".into(), json!(trace.started_at));
        out.insert("completed_at".into(), json!(trace.completed_at));
        out.insert("last_state_change".into(), json!(trace.last_state_change));
        out.insert("total_duration_ms".into(), json!(trace.total_duration_ms));
        out.insert("statistics".into(), json!(trace.statistics));
        out.insert("priority".into(), json!(trace.priority));
    }

    if fields >= TraceFields::Detailed {
        out.insert("execution_context".into(), json!(trace.execution_context));
        out.insert("execution_config".into(), json!(trace.execution_config));
        out.insert("suite_config".into(), json!(trace.suite_config));
        out.insert("tags".into(), json!(trace.tags));
        out.insert("current_step".into(), json!(trace.current_step));
        out.insert("overall_result".into(), json!(trace.overall_result));
        out.insert("is_partitioned".into(), json!(trace.is_partitioned));
        out.insert(
            "steps".into(),
            Value::Array(
                steps
                    .iter()
                    .map(|step| project_step(step, step_fields))
                    .collect(),
            ),
        );
    }

    if fields >= TraceFields::Full {
        out.insert("schema_version".into(), json!(trace.schema_version));
        out.insert("parent_execution_id".into(), json!(trace.parent_execution_id));
        out.insert("state_history".into(), json!(trace.state_history));
        out.insert("execution_log".into(), json!(trace.execution_log));
        out.insert("debug_data".into(), json!(trace.debug_data));
        out.insert("metadata".into(), json!(trace.metadata));
        out.insert(
            "step_count_threshold".into(),
            json!(trace.step_count_threshold),
        );
        out.insert(
            "estimated_step_count".into(),
            json!(trace.estimated_step_count),
        );
        out.insert(
            "resource_usage".into(),
            json!(trace.statistics.resource_usage),
        );
    }

    Value::Object(out)
}

/// Serialize one step at the requested level.
pub fn project_step(step: &StepResult, fields: StepFields) -> Value {
    let mut out = Map::new();
    out.insert("step_id".into(), json!(step.step_id));
    out.insert("step_name".into(), json!(step.step_name));
    out.insert("step_order".into(), json!(step.step_order));
    out.insert("status".into(), json!(step.status));

    if fields >= StepFields::Standard {
        out.insert("started_at".into(), json!(step.started_at));
        out.insert("completed_at".into(), json!(step.completed_at));
        out.insert("duration_ms".into(), json!(step.duration_ms));
        out.insert("input_data".into(), json!(step.input_data));
        out.insert("output_data".into(), json!(step.output_data));
        out.insert("expected_result".into(), json!(step.expected_result));
        out.insert("actual_result".into(), json!(step.actual_result));
    }

    if fields >= StepFields::Detailed {
        out.insert("error_details".into(), json!(step.error_details));
        out.insert("warnings".into(), json!(step.warnings));
        out.insert("retry_count".into(), json!(step.retry_count));
        out.insert("max_retries".into(), json!(step.max_retries));
        out.insert("metadata".into(), json!(step.metadata));
        out.insert("step_type".into(), json!(step.step_type));
    }

    Value::Object(out)
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod tests;
