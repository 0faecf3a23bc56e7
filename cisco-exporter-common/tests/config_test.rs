//! Integration tests for configuration loading from disk.

use std::io::Write;

use cisco_exporter_common::{Error, LogFormat, LoggingConfig, load_config};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct TestConfig {
    name: String,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    targets: Vec<String>,
}

#[test]
fn test_load_json5_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            // comments and trailing commas are allowed
            name: "lab",
            logging: {{ level: "trace", format: "json" }},
            targets: ["10.0.0.1", "core-sw:2222",],
        }}"#
    )
    .unwrap();

    let config: TestConfig = load_config(file.path()).unwrap();

    assert_eq!(config.name, "lab");
    assert_eq!(config.logging.level, "trace");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.targets, vec!["10.0.0.1", "core-sw:2222"]);
}

#[test]
fn test_load_defaults_logging() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ name: "bare" }}"#).unwrap();

    let config: TestConfig = load_config(file.path()).unwrap();

    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.format, LogFormat::Text);
    assert!(config.targets.is_empty());
}

#[test]
fn test_load_reports_path_on_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json5");
    std::fs::write(&path, "{ name: ").unwrap();

    let err = load_config::<TestConfig>(&path).unwrap_err();

    match err {
        Error::Config(message) => assert!(message.contains("broken.json5"), "{}", message),
        other => panic!("unexpected error: {}", other),
    }
}
