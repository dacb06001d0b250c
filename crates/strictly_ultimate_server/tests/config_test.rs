//! Loading server configuration from disk.

use std::io::Write;
use std::time::Duration;
use strictly_ultimate::Strategy;
use strictly_ultimate_server::ServerConfig;

#[test]
fn test_load_config_file() {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    writeln!(
        file,
        r#"
host = "0.0.0.0"
port = 8080
time_budget_secs = 90
default_strategy = "minimax:3"
ai_seed = 42
"#
    )
    .expect("write config");

    let config = ServerConfig::from_file(file.path()).expect("valid config");
    assert_eq!(config.host(), "0.0.0.0");
    assert_eq!(*config.port(), 8080);
    assert_eq!(config.time_budget(), Some(Duration::from_secs(90)));
    assert_eq!(config.tick_interval(), Duration::from_millis(1000));
    assert_eq!(
        config.strategy().expect("strategy"),
        Strategy::Minimax { depth: 3 }
    );
    assert_eq!(*config.ai_seed(), Some(42));

    let overridden = config.with_address(None, Some(9000)).with_ai_seed(None);
    assert_eq!(*overridden.port(), 9000);
    assert_eq!(*overridden.ai_seed(), Some(42));
}

#[test]
fn test_missing_file_is_an_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let err = ServerConfig::from_file(dir.path().join("absent.toml")).expect_err("no file");
    assert!(err.message.contains("Failed to read config file"));
}
