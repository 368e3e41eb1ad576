//! Shared harness for the behavioral specs.

use chrono::{TimeZone, Utc};
use rig_core::{
    ExecutionConfig, ExecutionContext, FakeClock, SequentialIdGen, StaticCatalog, TestCase,
    TestStep,
};
use rig_engine::{
    EventBus, ExecutionService, Orchestrator, QueueConfig, QueueService, QueueWorker,
    ResultProcessor, RunnerRegistry, StateService,
};
use rig_storage::TraceStore;
use std::collections::HashMap;
use std::sync::Arc;

pub fn t0() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).single().unwrap()
}

pub struct Rig {
    pub service: ExecutionService<FakeClock, SequentialIdGen>,
    pub worker: QueueWorker<FakeClock>,
    pub queue: Arc<QueueService<FakeClock>>,
    pub state: StateService<FakeClock>,
    pub store: Arc<TraceStore>,
    pub catalog: Arc<StaticCatalog>,
    pub clock: FakeClock,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_queue_config(QueueConfig::default())
    }

    pub fn with_queue_config(queue_config: QueueConfig) -> Self {
        let store = Arc::new(TraceStore::new());
        let clock = FakeClock::new(t0());
        let catalog = Arc::new(StaticCatalog::new());
        let state = StateService::new(Arc::clone(&store), Arc::new(EventBus::new()), clock.clone());
        let queue = Arc::new(QueueService::new(
            Arc::clone(&store),
            queue_config,
            clock.clone(),
        ));
        let results = ResultProcessor::new(
            Arc::clone(&store),
            rig_engine::InsightThresholds::default(),
            clock.clone(),
        );
        let orchestrator = Orchestrator::new(
            Arc::clone(&store),
            state.clone(),
            Arc::new(RunnerRegistry::with_defaults(clock.clone())),
            Arc::clone(&catalog) as Arc<dyn rig_core::TestCaseLoader>,
            Arc::clone(&catalog) as Arc<dyn rig_core::TestSuiteLoader>,
            results.clone(),
            clock.clone(),
        );
        let worker = QueueWorker::new(
            Arc::clone(&store),
            Arc::clone(&queue),
            orchestrator,
            state.clone(),
        );
        let service = ExecutionService::new(
            Arc::clone(&store),
            state.clone(),
            Arc::clone(&queue),
            results,
            Arc::clone(&catalog) as Arc<dyn rig_core::TestCaseLoader>,
            Arc::clone(&catalog) as Arc<dyn rig_core::TestSuiteLoader>,
            SequentialIdGen::new(),
            clock.clone(),
        );
        Self {
            service,
            worker,
            queue,
            state,
            store,
            catalog,
            clock,
        }
    }

    /// Dequeue and run everything currently ready, like one worker
    /// poll iteration that drains the queue.
    pub async fn drain_queue(&self) {
        while let Some(item) = self.queue.dequeue() {
            self.worker.run_item(item).await;
        }
    }
}

pub fn passing_step(id: &str) -> TestStep {
    let mut step = TestStep::new(id, format!("Step {id}"));
    step.action = Some("click".to_string());
    step
}

pub fn failing_step(id: &str) -> TestStep {
    let mut step = TestStep::new(id, format!("Step {id}"));
    step.action = Some("verify".to_string());
    step.expected_result
        .insert("status".to_string(), serde_json::json!("error"));
    step
}

pub fn case(id: &str, steps: Vec<TestStep>) -> TestCase {
    TestCase {
        id: id.to_string(),
        title: format!("Case {id}"),
        test_type: "generic".to_string(),
        steps,
    }
}

pub fn start_request(case_id: &str) -> rig_engine::StartTestCase {
    rig_engine::StartTestCase {
        test_case_id: case_id.to_string(),
        execution_context: ExecutionContext::default(),
        execution_config: ExecutionConfig {
            timeout_ms: 60_000,
            step_timeout_ms: 5_000,
            fail_fast: true,
            retry_enabled: false,
            max_retries: 0,
            ..ExecutionConfig::default()
        },
        tags: Vec::new(),
        metadata: HashMap::new(),
        priority: 5,
    }
}
