#[cfg(feature = "cli")]
pub mod cli;
pub mod toml_config;

use crate::domain::model::{ContainerPort, ContainerSpec};
use crate::utils::error::{HarnessError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_positive_number, validate_range, validate_url_path,
    Validate,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_IMAGE: &str = "public.ecr.aws/twisp/local:latest";
pub const DEFAULT_HEALTH_PATH: &str = "/healthcheck";
pub const DEFAULT_API_PATH: &str = "/financial/v1/graphql";

/// 整體設定：容器 + 重試
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub container: ContainerConfig,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub image: String,
    pub exposed_ports: Vec<u16>,
    pub health_port: u16,
    pub health_path: String,
    pub api_path: String,
    pub startup_timeout_secs: u64,
    pub poll_interval_ms: u64,
    pub log_tag: String,
    pub keep_alive: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_string(),
            exposed_ports: vec![3000, 8080, 8081],
            health_port: 8080,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            api_path: DEFAULT_API_PATH.to_string(),
            startup_timeout_secs: 120,
            poll_interval_ms: 100,
            log_tag: "twisp".to_string(),
            keep_alive: false,
        }
    }
}

impl ContainerConfig {
    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn health_port(&self) -> ContainerPort {
        ContainerPort(self.health_port)
    }

    pub fn container_spec(&self) -> ContainerSpec {
        ContainerSpec {
            image: self.image.clone(),
            exposed_ports: self.exposed_ports.iter().copied().map(ContainerPort).collect(),
        }
    }
}

impl Validate for ContainerConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("container.image", &self.image)?;
        if self.exposed_ports.is_empty() {
            return Err(HarnessError::MissingConfigError {
                field: "container.exposed_ports".to_string(),
            });
        }
        if !self.exposed_ports.contains(&self.health_port) {
            return Err(HarnessError::InvalidConfigValueError {
                field: "container.health_port".to_string(),
                value: self.health_port.to_string(),
                reason: "Health port must be one of the exposed ports".to_string(),
            });
        }
        validate_url_path("container.health_path", &self.health_path)?;
        validate_url_path("container.api_path", &self.api_path)?;
        validate_positive_number("container.startup_timeout_secs", self.startup_timeout_secs, 1)?;
        validate_positive_number("container.poll_interval_ms", self.poll_interval_ms, 1)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_ms: 200,
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }
}

impl Validate for RetryConfig {
    fn validate(&self) -> Result<()> {
        validate_range("retry.max_retries", self.max_retries, 1, 20)?;
        validate_range("retry.base_delay_ms", self.base_delay_ms, 1, 60_000)?;
        Ok(())
    }
}

impl Validate for HarnessConfig {
    fn validate(&self) -> Result<()> {
        self.container.validate()?;
        self.retry.validate()
    }
}

impl HarnessConfig {
    /// 套用環境變數覆寫（TWISP_IMAGE、TWISP_STARTUP_TIMEOUT_SECS、TWISP_KEEP_ALIVE）
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(image) = lookup("TWISP_IMAGE") {
            self.container.image = image;
        }
        if let Some(raw) = lookup("TWISP_STARTUP_TIMEOUT_SECS") {
            self.container.startup_timeout_secs =
                raw.trim()
                    .parse()
                    .map_err(|_| HarnessError::InvalidConfigValueError {
                        field: "TWISP_STARTUP_TIMEOUT_SECS".to_string(),
                        value: raw.clone(),
                        reason: "Expected a number of seconds".to_string(),
                    })?;
        }
        if let Some(raw) = lookup("TWISP_KEEP_ALIVE") {
            self.container.keep_alive = matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = HarnessConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.container.image, DEFAULT_IMAGE);
        assert_eq!(config.container.startup_timeout(), Duration::from_secs(120));
        assert_eq!(config.retry.base_delay(), Duration::from_millis(200));
        assert_eq!(
            config.container.container_spec().exposed_ports,
            vec![ContainerPort(3000), ContainerPort(8080), ContainerPort(8081)]
        );
    }

    #[test]
    fn test_health_port_must_be_exposed() {
        let mut config = ContainerConfig::default();
        config.health_port = 9999;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_exposed_ports_are_required() {
        let mut config = ContainerConfig::default();
        config.exposed_ports.clear();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, HarnessError::MissingConfigError { ref field } if field == "container.exposed_ports"));
        assert_eq!(err.category(), crate::utils::error::ErrorCategory::Configuration);
    }

    #[test]
    fn test_retry_budget_range() {
        let config = RetryConfig {
            max_retries: 0,
            base_delay_ms: 200,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("TWISP_IMAGE", "registry.local/twisp:dev"),
            ("TWISP_STARTUP_TIMEOUT_SECS", "30"),
            ("TWISP_KEEP_ALIVE", "true"),
        ]);
        let config = HarnessConfig::default()
            .with_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.container.image, "registry.local/twisp:dev");
        assert_eq!(config.container.startup_timeout_secs, 30);
        assert!(config.container.keep_alive);
    }

    #[test]
    fn test_env_override_rejects_bad_timeout() {
        let result = HarnessConfig::default().with_overrides_from(|key| {
            (key == "TWISP_STARTUP_TIMEOUT_SECS").then(|| "soon".to_string())
        });
        assert!(matches!(
            result,
            Err(HarnessError::InvalidConfigValueError { .. })
        ));
    }
}
