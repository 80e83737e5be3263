//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use task_manager_service::{DefaultTaskService, TaskService};
use task_manager_storage::{InMemoryTaskStorage, TaskRecord, TaskStatus};
use task_manager_worker::{
    CancellationHandle, ExecutorError, PoolConfig, SimulatedIoExecutor, TaskExecutor, TaskPool,
    WorkerPool,
};

/// Wraps another executor and counts how often it was invoked.
pub struct CountingExecutor {
    inner: Arc<dyn TaskExecutor>,
    calls: AtomicUsize,
}

impl CountingExecutor {
    pub fn sleeping(duration: Duration) -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(SimulatedIoExecutor::new(duration)),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskExecutor for CountingExecutor {
    async fn execute(
        &self,
        task: &TaskRecord,
        cancel: &CancellationHandle,
    ) -> Result<Value, ExecutorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.execute(task, cancel).await
    }
}

/// A started pool plus the service on top of it.
pub struct Harness {
    pub storage: Arc<InMemoryTaskStorage>,
    pub pool: WorkerPool,
    pub service: DefaultTaskService,
}

impl Harness {
    pub fn start(workers: usize, queue_capacity: usize, executor: Arc<dyn TaskExecutor>) -> Self {
        let storage = Arc::new(InMemoryTaskStorage::new());
        let pool = WorkerPool::new(
            PoolConfig::new(workers, queue_capacity),
            executor,
            storage.clone(),
        )
        .expect("valid pool config");
        pool.start().expect("pool starts once");
        let service = DefaultTaskService::new(storage.clone(), Arc::new(pool.clone()));
        Self {
            storage,
            pool,
            service,
        }
    }

    pub async fn create(&self) -> String {
        self.service
            .create_task(&CancellationHandle::new())
            .await
            .expect("task accepted")
    }

    pub async fn count(&self, status: TaskStatus) -> usize {
        self.service
            .get_all()
            .await
            .expect("list tasks")
            .iter()
            .filter(|task| task.status == status)
            .count()
    }

    pub async fn wait_terminal(&self, task_id: &str) -> TaskRecord {
        wait_until(&self.service, task_id, TaskRecord::is_terminal).await
    }
}

/// Poll the service until `done` holds for the task, failing after 5s.
pub async fn wait_until(
    service: &dyn TaskService,
    task_id: &str,
    done: impl Fn(&TaskRecord) -> bool,
) -> TaskRecord {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let task = service.get(task_id).await.expect("task exists");
            if done(&task) {
                return task;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("task {task_id} did not reach the expected state"))
}
