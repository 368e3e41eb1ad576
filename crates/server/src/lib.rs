// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rig-server: HTTP surface for the Rig test execution engine.
//!
//! Architecture mirrors the engine split: a listener (axum) translates
//! requests into service calls, while the queue worker and monitoring
//! loops run as background tasks on the same runtime.

pub mod auth;
pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod projection;
pub mod routes;

use rig_core::{HexIdGen, StaticCatalog, SystemClock, TestCaseLoader, TestSuiteLoader};
use rig_engine::{
    EngineConfig, EventBus, ExecutionService, MonitoringService, Orchestrator, QueueService,
    QueueWorker, ResultProcessor, RunnerRegistry, StateService,
};
use rig_storage::TraceStore;
use std::sync::Arc;

/// Shared handler state.
pub struct AppState {
    pub executions: ExecutionService<SystemClock, HexIdGen>,
    pub queue: Arc<QueueService<SystemClock>>,
    pub monitor: Arc<MonitoringService<SystemClock>>,
    pub store: Arc<TraceStore>,
}

/// The assembled process: handler state plus the background loops.
pub struct Services {
    pub state: Arc<AppState>,
    pub worker: QueueWorker<SystemClock>,
    pub monitor: Arc<MonitoringService<SystemClock>>,
}

/// Wire every component once, at process start. No globals: each
/// service receives its dependencies through its constructor.
pub fn bootstrap(
    store: Arc<TraceStore>,
    config: EngineConfig,
    catalog: Arc<StaticCatalog>,
) -> Services {
    let clock = SystemClock;
    let case_loader: Arc<dyn TestCaseLoader> = Arc::clone(&catalog) as Arc<dyn TestCaseLoader>;
    let suite_loader: Arc<dyn TestSuiteLoader> = catalog;

    let bus = Arc::new(EventBus::new());
    let state_service = StateService::new(Arc::clone(&store), bus, clock);
    let queue = Arc::new(QueueService::new(
        Arc::clone(&store),
        config.queue.clone(),
        clock,
    ));
    let results = ResultProcessor::new(Arc::clone(&store), config.insights.clone(), clock);
    let runners = Arc::new(RunnerRegistry::with_defaults(clock));

    let orchestrator = Orchestrator::new(
        Arc::clone(&store),
        state_service.clone(),
        runners,
        Arc::clone(&case_loader),
        Arc::clone(&suite_loader),
        results.clone(),
        clock,
    );
    let worker = QueueWorker::new(
        Arc::clone(&store),
        Arc::clone(&queue),
        orchestrator,
        state_service.clone(),
    );
    let monitor = Arc::new(MonitoringService::new(
        Arc::clone(&store),
        config.monitor.clone(),
        clock,
    ));

    let executions = ExecutionService::new(
        Arc::clone(&store),
        state_service,
        Arc::clone(&queue),
        results,
        case_loader,
        suite_loader,
        HexIdGen,
        clock,
    );

    Services {
        state: Arc::new(AppState {
            executions,
            queue,
            monitor: Arc::clone(&monitor),
            store,
        }),
        worker,
        monitor,
    }
}
