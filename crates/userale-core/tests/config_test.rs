use std::io::Write;
use tempfile::NamedTempFile;
use userale_core::config::{Config, ConfigError, ConfigLoader};

#[tokio::test]
async fn test_load_from_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
url: "https://collector.example/logs"
transmit_interval: 1000
log_count_threshold: 25
log_details: true
tool_name: "dashboard"
use_sockets: true
socket_channel: "telemetry"
    "#
    )
    .unwrap();

    let config = ConfigLoader::load_from(file.path())
        .await
        .expect("Failed to load config from file");

    assert_eq!(config.url, "https://collector.example/logs");
    assert_eq!(config.transmit_interval, 1000);
    assert_eq!(config.log_count_threshold, 25);
    assert!(config.log_details);
    assert_eq!(config.tool_name.as_deref(), Some("dashboard"));
    assert!(config.use_sockets);
    assert_eq!(config.socket_channel, "telemetry");
    // Unset keys keep their defaults.
    assert_eq!(config.resolution, 500);
    assert_eq!(config.transmit_retries, 3);
    assert_eq!(config.userale_version.as_deref(), Some(userale_core::VERSION));
}

#[tokio::test]
async fn test_empty_mapping_is_default() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{{}}").unwrap();

    let config = ConfigLoader::load_from(file.path()).await.unwrap();
    assert_eq!(config, Config::default());
}

#[tokio::test]
async fn test_zero_threshold_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "log_count_threshold: 0").unwrap();

    let result = ConfigLoader::load_from(file.path()).await;
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[tokio::test]
async fn test_load_from_nonexistent_file() {
    let result =
        ConfigLoader::load_from(std::path::Path::new("/nonexistent/path/userale.yaml")).await;
    assert!(matches!(result, Err(ConfigError::Io(_))));
}

#[tokio::test]
async fn test_malformed_yaml() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "transmit_interval: [not, a, number").unwrap();

    let result = ConfigLoader::load_from(file.path()).await;
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}
