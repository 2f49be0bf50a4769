//! Configuration types for the streamprobe harness.

mod reporting;

use crate::broker::OffsetReset;
use crate::wait::DEFAULT_TIMEOUT;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub use reporting::{AzureConfig, HtmlConfig, HtmlTheme, ReportingConfig};

/// Overrides `wait.timeout_seconds`.
pub const TIMEOUT_ENV: &str = "STREAMPROBE_TIMEOUT_SECONDS";
/// Overrides `fixtures.payload_dir`.
pub const PAYLOAD_DIR_ENV: &str = "STREAMPROBE_PAYLOAD_DIR";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct HarnessConfig {
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub wait: WaitConfig,
    #[serde(default)]
    pub fixtures: FixtureConfig,
    #[serde(default)]
    pub reporting: ReportingConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default)]
    pub offset_reset: OffsetReset,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WaitConfig {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FixtureConfig {
    #[serde(default = "default_payload_dir")]
    pub payload_dir: PathBuf,
}

fn default_payload_dir() -> PathBuf {
    PathBuf::from("payload")
}

impl Default for FixtureConfig {
    fn default() -> Self {
        Self {
            payload_dir: default_payload_dir(),
        }
    }
}

impl HarnessConfig {
    /// Load, apply environment overrides, and validate.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            anyhow::anyhow!("Failed to read config file {}: {}", path.display(), e)
        })?;
        let config = Self::from_yaml_str(&contents)?;
        debug!("Loaded harness configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, anyhow::Error> {
        let mut config: HarnessConfig = serde_yaml::from_str(yaml)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), anyhow::Error> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            self.wait.timeout_seconds = raw.trim().parse().map_err(|e| {
                anyhow::anyhow!("{TIMEOUT_ENV} must be a whole number of seconds, got '{raw}': {e}")
            })?;
        }
        if let Some(dir) = lookup(PAYLOAD_DIR_ENV) {
            self.fixtures.payload_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.wait.timeout_seconds == 0 {
            anyhow::bail!("wait.timeout_seconds must be greater than zero");
        }
        if self.fixtures.payload_dir.as_os_str().is_empty() {
            anyhow::bail!("fixtures.payload_dir must not be empty");
        }
        self.reporting.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.wait.timeout_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parse(yaml: &str) -> HarnessConfig {
        let config: HarnessConfig = serde_yaml::from_str(yaml).unwrap();
        config.validate().unwrap();
        config
    }

    #[test]
    fn test_defaults() {
        let config = parse("{}");
        assert_eq!(config.broker.offset_reset, OffsetReset::Earliest);
        assert_eq!(config.wait.timeout_seconds, 90);
        assert_eq!(config.timeout(), Duration::from_secs(90));
        assert_eq!(config.fixtures.payload_dir, PathBuf::from("payload"));
        assert!(!config.reporting.azure.enabled);
        assert!(!config.reporting.html.enabled);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
broker:
  offset_reset: latest
wait:
  timeout_seconds: 5
fixtures:
  payload_dir: fixtures/json
reporting:
  azure:
    enabled: true
    organization: acme
    project: payments
    plan_id: 7
    run_name: nightly
  html:
    enabled: true
    out: target/report.html
    theme: standard
    document_title: Nightly
"#;
        let config = parse(yaml);
        assert_eq!(config.broker.offset_reset, OffsetReset::Latest);
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.fixtures.payload_dir, PathBuf::from("fixtures/json"));

        let azure = &config.reporting.azure;
        assert!(azure.enabled);
        assert_eq!(azure.base_url, "https://dev.azure.com");
        assert_eq!(azure.organization, "acme");
        assert_eq!(azure.plan_id, Some(7));
        assert_eq!(azure.run_id, None);
        assert_eq!(azure.api_version, "6.0");
        assert_eq!(azure.pat_env, "AZURE_DEVOPS_PAT");

        let html = &config.reporting.html;
        assert_eq!(html.theme, HtmlTheme::Standard);
        assert_eq!(html.document_title, "Nightly");
        assert_eq!(html.report_name, "Message Flow Verification");
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config: HarnessConfig = serde_yaml::from_str("wait:\n  timeout_seconds: 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timeout_seconds"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [(TIMEOUT_ENV, "12"), (PAYLOAD_DIR_ENV, "/tmp/payloads")]
            .into_iter()
            .collect();
        let mut config = HarnessConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.wait.timeout_seconds, 12);
        assert_eq!(config.fixtures.payload_dir, PathBuf::from("/tmp/payloads"));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = HarnessConfig::default();
        let err = config
            .apply_overrides(|key| (key == TIMEOUT_ENV).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_ENV));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "wait:\n  timeout_seconds: 3").unwrap();
        let config = HarnessConfig::from_file(file.path()).unwrap();
        assert!(config.wait.timeout_seconds > 0);
    }

    #[test]
    fn test_from_file_missing() {
        let err = HarnessConfig::from_file("/nonexistent/streamprobe.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
