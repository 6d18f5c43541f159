//! Configuration management for the model serving core
//!
//! This module handles all configuration settings, including server settings,
//! model sources, engine sizing, batching, and shutdown behavior.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for the serving core
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Model sources
    #[serde(default)]
    pub models: ModelsConfig,
    /// Engine sizing configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Batching configuration
    #[serde(default)]
    pub batch: BatchConfig,
    /// Shutdown configuration
    #[serde(default)]
    pub shutdown: ShutdownConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Server configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

/// Where model artifacts come from
///
/// A `[models]` section that lists sources without a `dir` disables the
/// directory scan; leaving the section out entirely keeps the default scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Directory scanned for `*.json` artifacts at startup
    #[serde(default)]
    pub dir: Option<PathBuf>,
    /// Explicitly listed artifacts, loaded in addition to the scan
    #[serde(default)]
    pub sources: Vec<ModelSource>,
}

/// A single artifact to load
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSource {
    /// Name to register the model under (defaults to the artifact's id)
    pub name: Option<String>,
    /// Path to the artifact file
    pub path: PathBuf,
}

/// Engine sizing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of worker tasks executing model calls
    pub workers: usize,
    /// Capacity of the submission queue
    pub queue_depth: usize,
    /// Per-request deadline in milliseconds
    pub request_timeout_ms: u64,
}

/// Batching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Group compatible requests into batches
    pub enabled: bool,
    /// Maximum number of requests per batch
    pub max_size: usize,
    /// How long a partial batch waits for more requests, in milliseconds
    pub window_ms: u64,
}

/// Shutdown configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long draining waits for in-flight requests, in seconds
    pub grace_period_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
    /// Enable request logging
    pub log_requests: bool,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable the metrics endpoint
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            enable_cors: true,
        }
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            dir: Some(PathBuf::from("models")),
            sources: Vec::new(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            queue_depth: 64,
            request_timeout_ms: 30_000,
        }
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: 32,
            window_ms: 10,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            grace_period_secs: 30,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            log_requests: true,
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        // Server configuration
        if let Ok(host) = std::env::var("RECRUITER_INFER_HOST") {
            config.server.host = host;
        }
        if let Ok(port) = std::env::var("RECRUITER_INFER_PORT") {
            config.server.port = port
                .parse()
                .map_err(|_| EngineError::config("Invalid port number"))?;
        }

        // Model sources
        if let Ok(dir) = std::env::var("RECRUITER_INFER_MODEL_DIR") {
            config.models.dir = Some(PathBuf::from(dir));
        }

        // Engine sizing
        if let Ok(workers) = std::env::var("RECRUITER_INFER_WORKERS") {
            config.engine.workers = workers
                .parse()
                .map_err(|_| EngineError::config("Invalid worker count"))?;
        }
        if let Ok(depth) = std::env::var("RECRUITER_INFER_QUEUE_DEPTH") {
            config.engine.queue_depth = depth
                .parse()
                .map_err(|_| EngineError::config("Invalid queue depth"))?;
        }
        if let Ok(timeout) = std::env::var("RECRUITER_INFER_REQUEST_TIMEOUT_MS") {
            config.engine.request_timeout_ms = timeout
                .parse()
                .map_err(|_| EngineError::config("Invalid request timeout"))?;
        }

        // Batching
        if let Ok(enabled) = std::env::var("RECRUITER_INFER_BATCH_ENABLED") {
            config.batch.enabled = enabled
                .parse()
                .map_err(|_| EngineError::config("Invalid batch enabled flag"))?;
        }
        if let Ok(max_size) = std::env::var("RECRUITER_INFER_BATCH_MAX_SIZE") {
            config.batch.max_size = max_size
                .parse()
                .map_err(|_| EngineError::config("Invalid batch max size"))?;
        }
        if let Ok(window) = std::env::var("RECRUITER_INFER_BATCH_WINDOW_MS") {
            config.batch.window_ms = window
                .parse()
                .map_err(|_| EngineError::config("Invalid batch window"))?;
        }

        // Shutdown
        if let Ok(grace) = std::env::var("RECRUITER_INFER_GRACE_PERIOD_SECS") {
            config.shutdown.grace_period_secs = grace
                .parse()
                .map_err(|_| EngineError::config("Invalid grace period"))?;
        }

        // Logging
        if let Ok(log_level) = std::env::var("RECRUITER_INFER_LOG_LEVEL") {
            config.logging.level = log_level;
        }
        if let Ok(log_format) = std::env::var("RECRUITER_INFER_LOG_FORMAT") {
            config.logging.format = log_format;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::config(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| EngineError::config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate server configuration
        if self.server.port == 0 {
            return Err(EngineError::config("Server port cannot be 0"));
        }

        // Validate model sources
        if self.models.dir.is_none() && self.models.sources.is_empty() {
            return Err(EngineError::config(
                "At least one model source or a model directory is required",
            ));
        }
        for source in &self.models.sources {
            if source.path.as_os_str().is_empty() {
                return Err(EngineError::config("Model source path cannot be empty"));
            }
        }

        // Validate engine sizing
        if self.engine.workers == 0 {
            return Err(EngineError::config("Worker count must be greater than 0"));
        }
        if self.engine.queue_depth == 0 {
            return Err(EngineError::config("Queue depth must be greater than 0"));
        }
        if self.engine.request_timeout_ms == 0 {
            return Err(EngineError::config(
                "Request timeout must be greater than 0",
            ));
        }

        // Validate batching
        if self.batch.max_size == 0 {
            return Err(EngineError::config("Batch max size must be greater than 0"));
        }

        // Validate logging configuration
        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(EngineError::config(
                "Log level must be one of: trace, debug, info, warn, error",
            ));
        }
        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err(EngineError::config("Log format must be one of: json, pretty"));
        }

        Ok(())
    }

    /// Get the full server address
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Per-request deadline
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.engine.request_timeout_ms)
    }

    /// Batch collection window
    pub fn batch_window(&self) -> Duration {
        Duration::from_millis(self.batch.window_ms)
    }

    /// Drain grace period
    pub fn grace_period(&self) -> Duration {
        Duration::from_secs(self.shutdown.grace_period_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.engine.workers, 4);
        assert_eq!(config.engine.queue_depth, 64);
        assert_eq!(config.engine.request_timeout_ms, 30_000);
        assert!(config.batch.enabled);
        assert_eq!(config.batch.max_size, 32);
        assert_eq!(config.shutdown.grace_period_secs, 30);
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.server.port = 0;
        assert!(config.validate().is_err());

        config.server.port = 8000;
        config.engine.workers = 0;
        assert!(config.validate().is_err());

        config.engine.workers = 4;
        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_requires_model_source() {
        let mut config = Config::default();
        config.models.dir = None;
        config.models.sources.clear();
        assert!(config.validate().is_err());

        config.models.sources.push(ModelSource {
            name: None,
            path: PathBuf::from("artifacts/linear.json"),
        });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_server_address() {
        let config = Config::default();
        assert_eq!(config.server_address(), "0.0.0.0:8000");
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.batch_window(), Duration::from_millis(10));
        assert_eq!(config.grace_period(), Duration::from_secs(30));
    }

    #[test]
    fn test_from_toml() {
        let toml_str = r#"
            [server]
            host = "127.0.0.1"
            port = 9000
            enable_cors = false

            [models]
            dir = "artifacts"

            [[models.sources]]
            name = "eligibility"
            path = "artifacts/eligibility_classifier.json"

            [engine]
            workers = 2
            queue_depth = 8
            request_timeout_ms = 500
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.models.sources.len(), 1);
        assert_eq!(
            config.models.sources[0].name.as_deref(),
            Some("eligibility")
        );
        assert_eq!(config.engine.queue_depth, 8);
        // Sections absent from the file fall back to defaults
        assert!(config.batch.enabled);
        assert_eq!(config.shutdown.grace_period_secs, 30);
    }

    #[test]
    fn test_partial_sections_fall_back_to_defaults() {
        let config: Config = toml::from_str("[batch]\nenabled = false\n").unwrap();
        assert!(!config.batch.enabled);
        assert_eq!(config.batch.max_size, 32);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.models.dir.as_deref(), Some(Path::new("models")));
    }

    #[test]
    fn test_sources_only_disables_dir_scan() {
        let toml_str = r#"
            [[models.sources]]
            path = "artifacts/eligibility_classifier.json"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.models.dir.is_none());
        assert_eq!(config.models.sources.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[server]\nhost = \"0.0.0.0\"\nport = 8123\nenable_cors = true\n\n[models]\ndir = \"models\"\n"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.server.port, 8123);

        assert!(Config::from_file("/nonexistent/recruiter.toml").is_err());
    }
}
