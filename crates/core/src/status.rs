// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution and step status enums with the transition table.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of an execution trace.
///
/// Wire format is SCREAMING_SNAKE_CASE (`"PENDING"`, `"CI_CD"` style tags
/// come from [`ExecutionType`] instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,
    Queued,
    Running,
    Passed,
    Failed,
    Cancelled,
    Timeout,
    Retrying,
    Aborted,
}

impl ExecutionStatus {
    /// Allowed target states from this state.
    ///
    /// TIMEOUT is transient: it must progress to RETRYING (or be treated
    /// as FAILED by queue policy). The terminal set for billing/retention
    /// is {PASSED, FAILED, CANCELLED, ABORTED}.
    pub fn valid_transitions(self) -> &'static [ExecutionStatus] {
        use ExecutionStatus::*;
        match self {
            Pending => &[Queued, Cancelled],
            Queued => &[Running, Cancelled],
            Running => &[Passed, Failed, Cancelled, Timeout],
            Failed => &[Retrying],
            Timeout => &[Retrying],
            Retrying => &[Queued, Aborted],
            Passed | Cancelled | Aborted => &[],
        }
    }

    pub fn can_transition_to(self, to: ExecutionStatus) -> bool {
        self.valid_transitions().contains(&to)
    }

    /// Terminal for billing/retention purposes.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Passed
                | ExecutionStatus::Failed
                | ExecutionStatus::Cancelled
                | ExecutionStatus::Aborted
        )
    }

    /// States considered live by the scheduler and monitoring.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Pending
                | ExecutionStatus::Queued
                | ExecutionStatus::Running
                | ExecutionStatus::Retrying
        )
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionStatus::Pending => write!(f, "PENDING"),
            ExecutionStatus::Queued => write!(f, "QUEUED"),
            ExecutionStatus::Running => write!(f, "RUNNING"),
            ExecutionStatus::Passed => write!(f, "PASSED"),
            ExecutionStatus::Failed => write!(f, "FAILED"),
            ExecutionStatus::Cancelled => write!(f, "CANCELLED"),
            ExecutionStatus::Timeout => write!(f, "TIMEOUT"),
            ExecutionStatus::Retrying => write!(f, "RETRYING"),
            ExecutionStatus::Aborted => write!(f, "ABORTED"),
        }
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ExecutionStatus::Pending),
            "QUEUED" => Ok(ExecutionStatus::Queued),
            "RUNNING" => Ok(ExecutionStatus::Running),
            "PASSED" => Ok(ExecutionStatus::Passed),
            "FAILED" => Ok(ExecutionStatus::Failed),
            "CANCELLED" => Ok(ExecutionStatus::Cancelled),
            "TIMEOUT" => Ok(ExecutionStatus::Timeout),
            "RETRYING" => Ok(ExecutionStatus::Retrying),
            "ABORTED" => Ok(ExecutionStatus::Aborted),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// Status of a single step within an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StepStatus {
    Pending,
    Running,
    Passed,
    Failed,
    Skipped,
    Blocked,
    Warning,
}

impl StepStatus {
    /// A step in a settled state must carry `completed_at`.
    pub fn is_settled(self) -> bool {
        !matches!(self, StepStatus::Pending | StepStatus::Running)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepStatus::Pending => write!(f, "PENDING"),
            StepStatus::Running => write!(f, "RUNNING"),
            StepStatus::Passed => write!(f, "PASSED"),
            StepStatus::Failed => write!(f, "FAILED"),
            StepStatus::Skipped => write!(f, "SKIPPED"),
            StepStatus::Blocked => write!(f, "BLOCKED"),
            StepStatus::Warning => write!(f, "WARNING"),
        }
    }
}

/// Kind of work an execution trace represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    TestCase,
    TestSuite,
    Manual,
    Batch,
    CiCd,
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionType::TestCase => write!(f, "test_case"),
            ExecutionType::TestSuite => write!(f, "test_suite"),
            ExecutionType::Manual => write!(f, "manual"),
            ExecutionType::Batch => write!(f, "batch"),
            ExecutionType::CiCd => write!(f, "ci_cd"),
        }
    }
}

impl std::str::FromStr for ExecutionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "test_case" => Ok(ExecutionType::TestCase),
            "test_suite" => Ok(ExecutionType::TestSuite),
            "manual" => Ok(ExecutionType::Manual),
            "batch" => Ok(ExecutionType::Batch),
            "ci_cd" => Ok(ExecutionType::CiCd),
            other => Err(format!("unknown execution type: {other}")),
        }
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
