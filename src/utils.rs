//! Utility functions and helpers for the model serving core

use crate::error::{EngineError, Result};
use std::path::Path;
use tracing::info;

/// Initialize logging based on configuration
pub fn init_logging(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    let env_filter =
        tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

    match format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    info!("Logging initialized with level: {} and format: {}", level, format);
    Ok(())
}

/// Check if a file exists and is readable
pub fn check_file_exists<P: AsRef<Path>>(path: P) -> Result<()> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(EngineError::config(format!(
            "File does not exist: {}",
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(EngineError::config(format!(
            "Path is not a file: {}",
            path.display()
        )));
    }

    if let Err(e) = std::fs::File::open(path) {
        return Err(EngineError::config(format!(
            "Cannot read file {}: {}",
            path.display(),
            e
        )));
    }

    Ok(())
}

/// Validate a model name taken from the request path
pub fn validate_model_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(EngineError::validation("Model name cannot be empty"));
    }

    if name.contains(|c: char| c.is_control() || "\"'<>&".contains(c)) {
        return Err(EngineError::validation(
            "Model name contains invalid characters",
        ));
    }

    Ok(())
}

/// Format duration in human-readable format
pub fn format_duration(duration: std::time::Duration) -> String {
    let total_seconds = duration.as_secs();
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    let millis = duration.subsec_millis();

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else if seconds > 0 {
        format!("{}.{:03}s", seconds, millis)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        use std::time::Duration;

        assert_eq!(format_duration(Duration::from_millis(500)), "500ms");
        assert_eq!(format_duration(Duration::from_secs(1)), "1.000s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m 5s");
        assert_eq!(format_duration(Duration::from_secs(3665)), "1h 1m 5s");
    }

    #[test]
    fn test_validate_model_name() {
        assert!(validate_model_name("eligibility_classifier").is_ok());
        assert!(validate_model_name("job-recommender.v2").is_ok());
        assert!(validate_model_name("").is_err());
        assert!(validate_model_name("model\"with\"quotes").is_err());
        assert!(validate_model_name("model<with>brackets").is_err());
    }

    #[test]
    fn test_check_file_exists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(check_file_exists(file.path()).is_ok());
        assert!(check_file_exists("/nonexistent/config.toml").is_err());
        assert!(check_file_exists(std::env::temp_dir()).is_err());
    }
}
