//! The shipped configuration files load and layer as documented.

use std::path::PathBuf;

use method_server::config::{ConfigManager, ExecutionProfile, RetentionPolicy, RunnerKind};

fn shipped_config() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/method-server.yaml")
}

#[test]
fn test_shipped_config_matches_defaults() {
    let manager =
        ConfigManager::load_with(Some(shipped_config().as_path()), "development", "MS_SHIPPED_DEV").unwrap();
    let config = manager.config();

    assert_eq!(config.queues.input_queue_name(), "method_server_inputs");
    assert_eq!(config.queues.output_queue_name(), "method_server_results");
    assert_eq!(config.execution.profile, ExecutionProfile::Pool);
    assert_eq!(config.execution.external_workers(), 2);
    assert_eq!(config.execution.external_pool.label, "htex");
    assert_eq!(config.execution.local_pool.label, "local_threads");
    assert_eq!(config.jobs.runner, RunnerKind::Simulated);
    assert!(config.jobs.command_template.contains("{output}"));
}

#[test]
fn test_test_environment_override_is_layered() {
    let manager = ConfigManager::load_with(Some(shipped_config().as_path()), "test", "MS_SHIPPED_TEST").unwrap();
    let config = manager.config();

    assert_eq!(manager.environment(), "test");
    assert_eq!(config.jobs.time_unit_ms, 50);
    assert_eq!(config.artifacts.retention, RetentionPolicy::DeleteAfterPublish);
    // Keys absent from the override keep the base file's values
    assert_eq!(config.queues.port, 6379);
}
