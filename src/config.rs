use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub demo: DemoConfig,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub audit: AuditConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the site backend, e.g. "http://localhost:5000"
    pub base_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

fn default_request_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Device status cadence. The legacy dashboard used 6000.
    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

fn default_status_interval_ms() -> u64 {
    3000
}

fn default_log_interval_ms() -> u64 {
    3000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            status_interval_ms: default_status_interval_ms(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

impl PollingConfig {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }

    pub fn log_interval(&self) -> Duration {
        Duration::from_millis(self.log_interval_ms)
    }
}

/// Simulated telemetry while the backend is unreachable
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DemoConfig {
    #[serde(default)]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8080
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    /// "text" | "json"
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".into()
}

fn default_format() -> String {
    "text".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default = "default_audit_capacity")]
    pub capacity: usize,
}

fn default_audit_capacity() -> usize {
    500
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            capacity: default_audit_capacity(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file with environment variable substitution
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text, expanding $(VAR_NAME) placeholders first
    pub fn from_yaml(content: &str) -> Result<Self> {
        let expanded = substitute_env_vars(content)?;
        let config: Config = serde_yaml::from_str(&expanded)?;
        config.validate()?;
        Ok(config)
    }

    pub fn api_bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.request_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        let base_url = self.backend.base_url.trim();
        if base_url.is_empty() {
            return Err(AppError::Config(
                "backend.base_url cannot be empty".to_string(),
            ));
        }

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "backend.base_url must be an http(s) URL, got '{}'",
                base_url
            )));
        }

        if self.backend.request_timeout_ms == 0 {
            return Err(AppError::Config(
                "backend.request_timeout_ms cannot be 0".to_string(),
            ));
        }

        if self.polling.status_interval_ms == 0 || self.polling.log_interval_ms == 0 {
            return Err(AppError::Config(
                "polling intervals must be greater than 0".to_string(),
            ));
        }

        if self.api.port == 0 {
            return Err(AppError::Config("API port cannot be 0".to_string()));
        }

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(AppError::Config(format!(
                "logging.format must be 'text' or 'json', got '{}'",
                self.logging.format
            )));
        }

        if self.audit.capacity == 0 {
            return Err(AppError::Config("audit.capacity cannot be 0".to_string()));
        }

        Ok(())
    }
}

/// Substitute environment variables in format $(VAR_NAME)
fn substitute_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex::Regex::new(r"\$\(([A-Z_][A-Z0-9_]*)\)")
        .map_err(|e| AppError::Internal(e.to_string()))?;

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        let var_value = std::env::var(var_name).map_err(|_| {
            AppError::Config(format!("Environment variable {} not set", var_name))
        })?;
        result = result.replace(&cap[0], &var_value);
    }

    Ok(result)
}
