//! Integration tests for the config crate

use negotiation_config::{validate_config, ConfigError, ConfigLoader, LogFormat};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_temp(suffix: &str, content: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_load_toml_file() {
    let file = write_temp(
        ".toml",
        r#"
participant_id = "provider-1"

[state_machine]
batch_size = 8

[retry]
max_retries = 4
"#,
    );

    let config = ConfigLoader::from_file(file.path()).unwrap();
    assert_eq!(config.participant_id, "provider-1");
    assert_eq!(config.state_machine.batch_size, 8);
    assert_eq!(config.retry.max_retries, 4);
    assert!(validate_config(&config).is_ok());
}

#[test]
fn test_load_yaml_file() {
    let file = write_temp(
        ".yml",
        "participant_id: consumer-1\nlogging:\n  format: pretty\n",
    );

    let config = ConfigLoader::from_file(file.path()).unwrap();
    assert_eq!(config.participant_id, "consumer-1");
    assert_eq!(config.logging.format, LogFormat::Pretty);
}

#[test]
fn test_load_json_file() {
    let file = write_temp(
        ".json",
        r#"{"participant_id": "provider-3", "provider": {"auto_agree_requested": true}}"#,
    );

    let config = ConfigLoader::from_file(file.path()).unwrap();
    assert!(config.provider.auto_agree_requested);
}

#[test]
fn test_unsupported_extension() {
    let file = write_temp(".ini", "participant_id = x");
    match ConfigLoader::from_file(file.path()) {
        Err(ConfigError::LoadError(msg)) => assert!(msg.contains("ini")),
        other => panic!("expected load error, got {other:?}"),
    }
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    assert!(matches!(
        ConfigLoader::from_file(&path),
        Err(ConfigError::IoError(_))
    ));
    assert!(matches!(
        ConfigLoader::from_file_with_env(&path, "NEGOTIATION_TEST_MISSING"),
        Err(ConfigError::LoadError(_))
    ));
}

#[test]
fn test_file_with_env_overrides() {
    let file = write_temp(
        ".toml",
        r#"
participant_id = "provider-1"

[retry]
max_retries = 4
base_delay_ms = 500
"#,
    );

    // Unique prefix so parallel tests never see these variables
    std::env::set_var("NEGOTIATION_ENVTEST_RETRY__MAX_RETRIES", "9");
    std::env::set_var("NEGOTIATION_ENVTEST_PROVIDER__AUTO_AGREE_REQUESTED", "true");

    let config = ConfigLoader::from_file_with_env(file.path(), "NEGOTIATION_ENVTEST").unwrap();

    std::env::remove_var("NEGOTIATION_ENVTEST_RETRY__MAX_RETRIES");
    std::env::remove_var("NEGOTIATION_ENVTEST_PROVIDER__AUTO_AGREE_REQUESTED");

    assert_eq!(config.participant_id, "provider-1");
    assert_eq!(config.retry.max_retries, 9);
    assert_eq!(config.retry.base_delay_ms, 500);
    assert!(config.provider.auto_agree_requested);
}

#[test]
fn test_env_only() {
    std::env::set_var("NEGOTIATION_ENVONLY_PARTICIPANT_ID", "from-env");
    std::env::set_var("NEGOTIATION_ENVONLY_STATE_MACHINE__BATCH_SIZE", "3");

    let config = ConfigLoader::from_env_with_prefix("NEGOTIATION_ENVONLY").unwrap();

    std::env::remove_var("NEGOTIATION_ENVONLY_PARTICIPANT_ID");
    std::env::remove_var("NEGOTIATION_ENVONLY_STATE_MACHINE__BATCH_SIZE");

    assert_eq!(config.participant_id, "from-env");
    assert_eq!(config.state_machine.batch_size, 3);
    assert_eq!(config.retry.max_retries, 7);
}

#[test]
fn test_invalid_file_fails_validation() {
    let file = write_temp(
        ".toml",
        r#"
[state_machine]
batch_size = 0
"#,
    );

    let config = ConfigLoader::from_file(file.path()).unwrap();
    let err = validate_config(&config).unwrap_err().to_string();
    assert!(err.contains("participant_id"));
    assert!(err.contains("state_machine.batch_size"));
}
