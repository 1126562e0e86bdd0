//! Top-level configuration tree and the JSON serde facing types, plus
//! conversions into the `Duration`-based configs each service expects.

use crate::models::upstream::Upstream;
use crate::services::circuit_breaker::CircuitBreakerConfig;
use crate::services::health::HealthCheckConfig;
use crate::services::retry::RetryConfig;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

fn default_service_name() -> String {
    "loadgate".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    #[serde(default)]
    pub https_port: Option<u16>,
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,
    #[serde(default = "default_write_timeout")]
    pub write_timeout: u64,
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout: u64,
    #[serde(default = "default_max_header_bytes")]
    pub max_header_bytes: u32,
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_read_timeout() -> u64 {
    30
}
fn default_write_timeout() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    60
}
fn default_max_header_bytes() -> u32 {
    16384
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_health_interval")]
    pub interval: u64,
    #[serde(default = "default_health_timeout")]
    pub timeout: u64,
    #[serde(default = "default_health_path")]
    pub path: String,
    #[serde(default = "default_unhealthy_threshold")]
    pub unhealthy_threshold: u32,
    #[serde(default = "default_healthy_threshold")]
    pub healthy_threshold: u32,
}

fn default_true() -> bool {
    true
}
fn default_health_interval() -> u64 {
    10
}
fn default_health_timeout() -> u64 {
    2
}
fn default_health_path() -> String {
    "/health".to_string()
}
fn default_unhealthy_threshold() -> u32 {
    3
}
fn default_healthy_threshold() -> u32 {
    2
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: default_health_interval(),
            timeout: default_health_timeout(),
            path: default_health_path(),
            unhealthy_threshold: default_unhealthy_threshold(),
            healthy_threshold: default_healthy_threshold(),
        }
    }
}

impl From<&HealthConfig> for HealthCheckConfig {
    fn from(c: &HealthConfig) -> Self {
        Self {
            enabled: c.enabled,
            path: c.path.clone(),
            interval: Duration::from_secs(c.interval),
            timeout: Duration::from_secs(c.timeout),
            healthy_threshold: c.healthy_threshold,
            unhealthy_threshold: c.unhealthy_threshold,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

fn default_metrics_port() -> u16 {
    9090
}
fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CircuitBreakerSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_breaker_timeout")]
    pub timeout: u64,
}

fn default_failure_threshold() -> u32 {
    5
}
fn default_breaker_timeout() -> u64 {
    30
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            timeout: default_breaker_timeout(),
        }
    }
}

impl From<&CircuitBreakerSettings> for CircuitBreakerConfig {
    fn from(c: &CircuitBreakerSettings) -> Self {
        Self {
            enabled: c.enabled,
            failure_threshold: c.failure_threshold,
            timeout: Duration::from_secs(c.timeout),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RetrySettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff: f64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff: f64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_initial_backoff() -> f64 {
    0.1
}
fn default_max_backoff() -> f64 {
    2.0
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            initial_backoff: default_initial_backoff(),
            max_backoff: default_max_backoff(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(c: &RetrySettings) -> Self {
        Self {
            enabled: c.enabled,
            max_attempts: c.max_attempts,
            initial_backoff: Duration::from_secs_f64(c.initial_backoff),
            max_backoff: Duration::from_secs_f64(c.max_backoff),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct TlsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub cert_file: Option<String>,
    #[serde(default)]
    pub key_file: Option<String>,
    #[serde(default)]
    pub min_version: Option<String>,
    #[serde(default)]
    pub cipher_suites: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Settings {
    pub server: ServerConfig,
    #[serde(default)]
    pub upstreams: Vec<Upstream>,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSettings,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub tls: TlsConfig,
}

/// Loads and parses configuration from `LOADGATE_CONFIG_PATH` (default
/// `./config.json`), rejecting paths that resolve outside the working
/// directory and files over 10MB. Structural validation only — semantic
/// validation is `ConfigValidator`'s job.
pub fn load_settings() -> Result<Settings, Box<dyn std::error::Error>> {
    let config_path =
        std::env::var("LOADGATE_CONFIG_PATH").unwrap_or_else(|_| "./config.json".to_string());

    debug!("loading configuration from: {}", config_path);

    let path = Path::new(&config_path);
    if !path.exists() {
        return Err(format!("cannot resolve config path '{}'", config_path).into());
    }

    let canonical_path = path
        .canonicalize()
        .map_err(|e| format!("cannot resolve config path '{}': {}", config_path, e))?;
    let current_dir = std::env::current_dir()
        .map_err(|e| format!("cannot get current directory: {}", e))?;

    if !canonical_path.starts_with(&current_dir) {
        warn!("config path '{}' is outside working directory", config_path);
        return Err("config path outside working directory".into());
    }

    const MAX_CONFIG_SIZE: u64 = 10 * 1024 * 1024;
    let metadata = fs::metadata(&canonical_path)
        .map_err(|e| format!("cannot read config file metadata: {}", e))?;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(format!(
            "config file too large: {} bytes (max: {} bytes)",
            metadata.len(),
            MAX_CONFIG_SIZE
        )
        .into());
    }

    let config_data = fs::read_to_string(&canonical_path)
        .map_err(|e| format!("cannot read config file: {}", e))?;
    let settings: Settings =
        serde_json::from_str(&config_data).map_err(|e| format!("invalid JSON: {}", e))?;

    debug!("loaded configuration with {} upstreams", settings.upstreams.len());
    Ok(settings)
}
