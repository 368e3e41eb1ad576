// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::{Duration, TimeZone};
use rig_core::{ExecutionConfig, ExecutionContext, TraceConfig};
use std::collections::HashMap;

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

fn trace(n: u8, user: &str, tags: &[&str]) -> ExecutionTrace {
    let mut trace = ExecutionTrace::new(
        TraceConfig {
            execution_id: format!("{n:024x}"),
            execution_type: ExecutionType::TestCase,
            test_case_id: Some(format!("TC_{n}")),
            test_suite_id: None,
            parent_execution_id: None,
            triggered_by: user.to_string(),
            execution_context: ExecutionContext::default(),
            execution_config: ExecutionConfig::default(),
            suite_config: None,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            metadata: HashMap::new(),
            priority: 5,
            estimated_step_count: 3,
        },
        t0() + Duration::minutes(n as i64),
    );
    trace.total_duration_ms = Some(n as u64 * 100);
    trace
}

#[test]
fn empty_query_matches_everything() {
    let query = TraceQuery::default();
    assert!(query.matches(&trace(1, "user-1", &[])));
}

#[test]
fn user_scope_filters() {
    let query = TraceQuery {
        triggered_by: Some("user-1".to_string()),
        ..TraceQuery::default()
    };
    assert!(query.matches(&trace(1, "user-1", &[])));
    assert!(!query.matches(&trace(2, "user-2", &[])));
}

#[test]
fn tags_use_or_logic() {
    let query = TraceQuery {
        tags: vec!["smoke".to_string(), "nightly".to_string()],
        ..TraceQuery::default()
    };
    assert!(query.matches(&trace(1, "user-1", &["smoke"])));
    assert!(query.matches(&trace(2, "user-1", &["nightly", "slow"])));
    assert!(!query.matches(&trace(3, "user-1", &["slow"])));
}

#[test]
fn triggered_window_filters() {
    let query = TraceQuery {
        triggered_after: Some(t0() + Duration::minutes(2)),
        triggered_before: Some(t0() + Duration::minutes(4)),
        ..TraceQuery::default()
    };
    assert!(!query.matches(&trace(1, "user-1", &[])));
    assert!(query.matches(&trace(3, "user-1", &[])));
    assert!(!query.matches(&trace(5, "user-1", &[])));
}

#[test]
fn completed_window_excludes_unfinished() {
    let query = TraceQuery {
        completed_after: Some(t0()),
        ..TraceQuery::default()
    };
    // No completed_at set on a fresh trace.
    assert!(!query.matches(&trace(1, "user-1", &[])));
}

#[test]
fn sort_by_duration() {
    let a = trace(1, "user-1", &[]);
    let b = trace(3, "user-1", &[]);
    assert_eq!(
        SortField::Duration.compare(&a, &b),
        std::cmp::Ordering::Less
    );
}

#[test]
fn page_offset_is_one_based() {
    let page = Page {
        page: 1,
        page_size: 20,
    };
    assert_eq!(page.offset(), 0);
    let page = Page {
        page: 3,
        page_size: 20,
    };
    assert_eq!(page.offset(), 40);
}
