//! HTTP server for the task API
//!
//! HTTP/1.1 over hyper. Every connection is tracked so a shutdown can stop
//! accepting, then wait for in-flight requests to finish.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use task_manager_service::TaskService;

use crate::error::{HttpError, Result};
use crate::router::TaskRouter;

/// Configuration for the HTTP server
#[derive(Debug, Clone)]
pub struct HttpServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Enable CORS
    pub enable_cors: bool,
    /// Time allowed for a client to send the request head
    pub read_timeout: Duration,
    /// Upper bound on producing a response
    pub request_timeout: Duration,
    /// Deadline of the context a create request submits under
    pub submit_timeout: Duration,
    /// How long shutdown waits for open connections
    pub shutdown_timeout: Duration,
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_cors: true,
            read_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(5),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

/// Builder for [`TaskHttpServer`]
pub struct TaskHttpServerBuilder {
    config: HttpServerConfig,
    service: Arc<dyn TaskService>,
}

impl TaskHttpServerBuilder {
    pub fn new(service: Arc<dyn TaskService>) -> Self {
        Self {
            config: HttpServerConfig::default(),
            service,
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn submit_timeout(mut self, timeout: Duration) -> Self {
        self.config.submit_timeout = timeout;
        self
    }

    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.config.shutdown_timeout = timeout;
        self
    }

    /// Replace the whole configuration
    pub fn config(mut self, config: HttpServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> TaskHttpServer {
        let config = Arc::new(self.config);
        TaskHttpServer {
            router: TaskRouter::new(self.service, Arc::clone(&config)),
            config,
        }
    }
}

/// HTTP server exposing the task service
#[derive(Clone)]
pub struct TaskHttpServer {
    config: Arc<HttpServerConfig>,
    router: TaskRouter,
}

impl TaskHttpServer {
    pub fn builder(service: Arc<dyn TaskService>) -> TaskHttpServerBuilder {
        TaskHttpServerBuilder::new(service)
    }

    pub fn config(&self) -> &HttpServerConfig {
        &self.config
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_address;
        TcpListener::bind(addr)
            .await
            .map_err(|source| HttpError::Bind { addr, source })
    }

    /// Bind and serve until `shutdown` resolves.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve connections from `listener` until `shutdown` resolves, then
    /// wait up to `shutdown_timeout` for open connections to finish.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "HTTP server listening");
        info!("Task API available at: /api/v1/tasks");

        let graceful = GracefulShutdown::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let (stream, peer_addr) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    debug!(peer = %peer_addr, "New connection");

                    let router = self.router.clone();
                    let service = service_fn(move |req| {
                        let router = router.clone();
                        async move { Ok::<_, Infallible>(router.handle(req).await) }
                    });

                    let conn = http1::Builder::new()
                        .timer(TokioTimer::new())
                        .header_read_timeout(self.config.read_timeout)
                        .serve_connection(TokioIo::new(stream), service);
                    let conn = graceful.watch(conn);

                    tokio::spawn(async move {
                        if let Err(err) = conn.await {
                            // Filter out common client disconnection errors that aren't actual problems
                            let err_str = err.to_string();
                            if err_str.contains("connection closed before message completed") {
                                debug!("Client disconnected (normal): {}", err);
                            } else {
                                error!("Error serving connection: {}", err);
                            }
                        }
                    });
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections");
                    break;
                }
            }
        }

        drop(listener);
        tokio::select! {
            _ = graceful.shutdown() => info!("HTTP server stopped"),
            _ = tokio::time::sleep(self.config.shutdown_timeout) => {
                warn!(
                    timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
                    "Timed out waiting for open connections to close"
                );
            }
        }
        Ok(())
    }
}
