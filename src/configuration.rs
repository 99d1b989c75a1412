use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read proxy config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse proxy config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("invalid proxy config: {0}")]
    Invalid(&'static str),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub listen: String,
    pub upstream: UpstreamConfig,
    /// Headers set on every request forwarded to the upstream.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Path answered locally with the recorded status counts as JSON.
    #[serde(default)]
    pub status_path: Option<String>,
    #[serde(default)]
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    pub scheme: Scheme,
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    pub interval_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

impl ProxyConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let conf_str = std::fs::read_to_string(path)?;
        Self::from_yaml(&conf_str)
    }

    pub fn from_yaml(conf_str: &str) -> Result<Self, ConfigError> {
        let config: ProxyConfig = serde_yaml::from_str(conf_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.listen.trim().is_empty() {
            return Err(ConfigError::Invalid("listen address is empty"));
        }
        if self.upstream.host.trim().is_empty() {
            return Err(ConfigError::Invalid("upstream host is empty"));
        }
        if let Some(path) = &self.status_path {
            if !path.starts_with('/') {
                return Err(ConfigError::Invalid("status_path must start with '/'"));
            }
        }
        if let Some(report) = &self.report {
            if report.interval_secs == 0 {
                return Err(ConfigError::Invalid("report interval must be positive"));
            }
        }
        Ok(())
    }
}

impl UpstreamConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tls(&self) -> bool {
        self.scheme == Scheme::Https
    }
}

impl ReportConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}
