//! Application wiring: storage, worker pool, service and HTTP server.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use task_manager_http::TaskHttpServer;
use task_manager_service::DefaultTaskService;
use task_manager_storage::{InMemoryTaskStorage, TaskStorage};
use task_manager_worker::{PoolError, SimulatedIoExecutor, TaskExecutor, TaskPool, WorkerPool};

use crate::config::ServerConfig;
use crate::error::AppError;

/// The assembled application.
pub struct App {
    config: ServerConfig,
    storage: Arc<InMemoryTaskStorage>,
    pool: WorkerPool,
    server: TaskHttpServer,
}

impl App {
    /// Wire the application with the simulated I/O executor.
    pub fn new(config: ServerConfig) -> Result<Self, AppError> {
        let executor = Arc::new(SimulatedIoExecutor::new(config.io_duration()));
        Self::with_executor(config, executor)
    }

    /// Wire the application around a custom executor.
    pub fn with_executor(
        config: ServerConfig,
        executor: Arc<dyn TaskExecutor>,
    ) -> Result<Self, AppError> {
        config.validate()?;

        let storage = Arc::new(InMemoryTaskStorage::new());
        let pool = WorkerPool::new(config.pool_config(), executor, storage.clone())?;
        let service = Arc::new(DefaultTaskService::new(
            storage.clone(),
            Arc::new(pool.clone()),
        ));
        let server = TaskHttpServer::builder(service)
            .config(config.http_config()?)
            .build();

        Ok(Self {
            config,
            storage,
            pool,
            server,
        })
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    pub fn storage(&self) -> &dyn TaskStorage {
        self.storage.as_ref()
    }

    /// Bind the configured address and run until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = self.server.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Start the workers, serve HTTP until `shutdown` resolves, then stop the
    /// HTTP server before draining the pool.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()> + Send,
    {
        self.pool.start()?;
        info!(
            env = %self.config.app.env,
            workers = self.config.app.workers,
            task_queue_size = self.config.app.task_queue_size,
            storage = self.storage.backend_name(),
            "Task manager started"
        );

        let served = self.server.serve(listener, shutdown).await;

        let timeout = self.config.shutdown_timeout();
        match self.pool.stop(timeout).await {
            Ok(()) => {}
            Err(PoolError::Timeout(_)) => {
                let stats = self.pool.stats();
                warn!(
                    in_flight = stats.in_flight,
                    timeout_ms = timeout.as_millis() as u64,
                    "Worker pool did not drain before the shutdown timeout"
                );
            }
            Err(e) => return Err(e.into()),
        }

        served?;
        info!("Task manager stopped");
        Ok(())
    }
}
