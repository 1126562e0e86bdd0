//! Integration tests for `load_settings` and `ConfigValidator`, covering
//! file loading, path safety, and the JSON shape end to end.

use loadgate_core::config::settings::load_settings;
use loadgate_core::config::validation::ConfigValidator;
use once_cell::sync::Lazy;
use std::env;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

static ENV_MUTEX: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

const SAMPLE_CONFIG: &str = r#"{
  "server": { "port": 8080 },
  "upstreams": [
    {
      "name": "api",
      "algorithm": "round_robin",
      "backends": [ { "url": "http://10.0.0.1:9000", "weight": 1 } ]
    }
  ],
  "health": { "enabled": true },
  "metrics": { "enabled": true, "port": 9090 },
  "circuit_breaker": { "enabled": true },
  "retry": { "enabled": true }
}"#;

fn write_config_in_cwd(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile_in(".")
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn loads_full_config_shape_from_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let file = write_config_in_cwd(SAMPLE_CONFIG);
    env::set_var("LOADGATE_CONFIG_PATH", file.path());

    let result = load_settings();
    env::remove_var("LOADGATE_CONFIG_PATH");

    let settings = result.expect("config should load");
    assert_eq!(settings.server.port, 8080);
    assert_eq!(settings.upstreams.len(), 1);
    assert_eq!(settings.upstreams[0].backends[0].url, "http://10.0.0.1:9000");
    assert_eq!(settings.metrics.port, 9090);
}

#[test]
fn rejects_missing_config_file() {
    let _lock = ENV_MUTEX.lock().unwrap();
    env::set_var("LOADGATE_CONFIG_PATH", "./loadgate-does-not-exist.json");

    let result = load_settings();
    env::remove_var("LOADGATE_CONFIG_PATH");

    assert!(result.is_err());
}

#[test]
fn rejects_invalid_json() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let file = write_config_in_cwd("{ not valid json");
    env::set_var("LOADGATE_CONFIG_PATH", file.path());

    let result = load_settings();
    env::remove_var("LOADGATE_CONFIG_PATH");

    assert!(result.is_err());
}

#[test]
fn loaded_config_passes_comprehensive_validation() {
    let _lock = ENV_MUTEX.lock().unwrap();
    let file = write_config_in_cwd(SAMPLE_CONFIG);
    env::set_var("LOADGATE_CONFIG_PATH", file.path());

    let settings = load_settings().expect("config should load");
    env::remove_var("LOADGATE_CONFIG_PATH");

    let result = ConfigValidator::validate_comprehensive(&settings);
    assert!(result.is_valid, "errors: {:?}", result.errors);
}
