//! Server configuration
//!
//! Loaded from a YAML file, then patched from environment variables and CLI
//! flags. Every field has a default, so an empty file is a valid config.
//!
//! ```yaml
//! app:
//!   env: dev
//!   workers: 3
//!   task_queue_size: 100
//! http:
//!   port: 8080
//! executor:
//!   io_duration_ms: 10000
//! ```

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use task_manager_http::HttpServerConfig;
use task_manager_worker::{DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS, PoolConfig};

use crate::error::ConfigError;

/// Deployment environment, selects the log format and default level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Dev,
    Prod,
    #[default]
    Local,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
            Environment::Local => "local",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dev" => Ok(Environment::Dev),
            "prod" => Ok(Environment::Prod),
            "local" => Ok(Environment::Local),
            other => Err(format!("unknown environment '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub env: Environment,
    pub workers: usize,
    pub task_queue_size: usize,
    /// Time the worker pool gets to drain on shutdown
    pub shutdown_timeout_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            env: Environment::default(),
            workers: DEFAULT_WORKERS,
            task_queue_size: DEFAULT_QUEUE_CAPACITY,
            shutdown_timeout_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    /// Deadline for queueing a new task while the queue is full
    pub submit_timeout_ms: u64,
    pub enable_cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            read_timeout_ms: 10_000,
            write_timeout_ms: 10_000,
            submit_timeout_ms: 5_000,
            enable_cors: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Duration of each simulated I/O task
    pub io_duration_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            io_duration_ms: 10_000,
        }
    }
}

/// Complete server configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub app: AppConfig,
    pub http: HttpConfig,
    pub executor: ExecutorConfig,
}

impl ServerConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Read and parse a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }

    /// Apply overrides from environment variables.
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ENV") {
            self.app.env = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "ENV", value })?;
        }
        override_from(&lookup, "WORKERS", &mut self.app.workers)?;
        override_from(&lookup, "TASK_QUEUE_SIZE", &mut self.app.task_queue_size)?;
        override_from(&lookup, "SHUTDOWN_TIMEOUT_MS", &mut self.app.shutdown_timeout_ms)?;
        override_from(&lookup, "PORT", &mut self.http.port)?;
        override_from(&lookup, "READ_TIMEOUT_MS", &mut self.http.read_timeout_ms)?;
        override_from(&lookup, "WRITE_TIMEOUT_MS", &mut self.http.write_timeout_ms)?;
        override_from(&lookup, "SUBMIT_TIMEOUT_MS", &mut self.http.submit_timeout_ms)?;
        override_from(&lookup, "TASK_DURATION_MS", &mut self.executor.io_duration_ms)?;
        Ok(())
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.app.workers == 0 {
            return Err(ConfigError::Invalid("app.workers must be at least 1".into()));
        }
        if self.app.task_queue_size == 0 {
            return Err(ConfigError::Invalid(
                "app.task_queue_size must be at least 1".into(),
            ));
        }
        if self.http.port == 0 {
            return Err(ConfigError::Invalid("http.port must not be 0".into()));
        }
        if self.http.submit_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "http.submit_timeout_ms must be positive".into(),
            ));
        }
        self.bind_address().map(|_| ())
    }

    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.http.host.parse().map_err(|_| {
            ConfigError::Invalid(format!("http.host '{}' is not an IP address", self.http.host))
        })?;
        Ok(SocketAddr::new(ip, self.http.port))
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new(self.app.workers, self.app.task_queue_size)
    }

    pub fn http_config(&self) -> Result<HttpServerConfig, ConfigError> {
        Ok(HttpServerConfig {
            bind_address: self.bind_address()?,
            enable_cors: self.http.enable_cors,
            read_timeout: Duration::from_millis(self.http.read_timeout_ms),
            request_timeout: Duration::from_millis(self.http.write_timeout_ms),
            submit_timeout: Duration::from_millis(self.http.submit_timeout_ms),
            shutdown_timeout: self.shutdown_timeout(),
        })
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.app.shutdown_timeout_ms)
    }

    pub fn io_duration(&self) -> Duration {
        Duration::from_millis(self.executor.io_duration_ms)
    }
}

fn override_from<F, T>(lookup: &F, key: &'static str, target: &mut T) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(value) = lookup(key) {
        *target = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key, value })?;
    }
    Ok(())
}
