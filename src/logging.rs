//! # Structured Logging Module
//!
//! Environment-aware structured logging to the console and to a JSON log
//! file, plus helpers that give chain and queue events a fixed field layout.

use chrono::Utc;
use std::fs;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::ConfigManager;
use crate::messaging::Parameter;

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging; later calls are no-ops.
///
/// `RUST_LOG` wins when set. Otherwise the level follows the environment,
/// raised to `debug` when `debug` is true.
pub fn init_structured_logging(debug: bool) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = ConfigManager::detect_environment();
        let log_level = if debug {
            "debug".to_string()
        } else {
            get_log_level(&environment)
        };
        let filter = || {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level.clone()))
        };

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_ansi(true)
            .with_filter(filter());

        let log_dir = PathBuf::from("log");
        let (file_layer, guard, log_path) = match fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let pid = process::id();
                let timestamp = Utc::now().format("%Y%m%d_%H%M%S").to_string();
                let log_filename = format!("{environment}.{pid}.{timestamp}.log");
                let file_appender = tracing_appender::rolling::never(&log_dir, &log_filename);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_level(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(filter());
                (Some(layer), Some(guard), Some(log_dir.join(log_filename)))
            }
            Err(_) => (None, None, None),
        };

        // A subscriber may already be installed by an embedding process
        if tracing_subscriber::registry()
            .with(console)
            .with(file_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            log_file = ?log_path.as_ref().map(|p| p.display().to_string()),
            "🔧 STRUCTURED LOGGING: Initialized"
        );

        // Keep the writer alive for the life of the process
        if let Some(guard) = guard {
            std::mem::forget(guard);
        }
    });
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for task chain lifecycle events
pub fn log_chain_operation(
    operation: &str,
    parameter: Parameter,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        parameter = parameter.value(),
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 CHAIN_OPERATION"
    );
}

/// Log structured data for queue traffic
pub fn log_queue_operation(operation: &str, queue: &str, status: &str, details: Option<&str>) {
    tracing::info!(
        operation = %operation,
        queue = %queue,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📨 QUEUE_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_matches_config_loader() {
        std::env::set_var("METHOD_SERVER_ENV", "Production");
        let environment = ConfigManager::detect_environment();
        std::env::remove_var("METHOD_SERVER_ENV");

        // Log file names and levels use the same normalized name as the
        // config override lookup
        assert_eq!(environment, "production");
        assert_eq!(get_log_level(&environment), "info");
    }

    #[test]
    fn test_log_level_mapping() {
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("unknown"), "debug");
    }
}
