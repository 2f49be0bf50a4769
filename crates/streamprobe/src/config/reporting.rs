//! Outcome reporting configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ReportingConfig {
    #[serde(default)]
    pub azure: AzureConfig,
    #[serde(default)]
    pub html: HtmlConfig,
}

impl ReportingConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.azure.validate()?;
        self.html.validate()
    }
}

/// Azure DevOps test-run reporting.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AzureConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub project: String,
    /// Name of the environment variable holding the personal access token
    #[serde(default = "default_pat_env")]
    pub pat_env: String,
    /// Existing run to report into. A run is created from `plan_id` otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_id: Option<u64>,
    #[serde(default = "default_run_name")]
    pub run_name: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_base_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_pat_env() -> String {
    "AZURE_DEVOPS_PAT".to_string()
}

fn default_run_name() -> String {
    "streamprobe".to_string()
}

fn default_api_version() -> String {
    "6.0".to_string()
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: default_base_url(),
            organization: String::new(),
            project: String::new(),
            pat_env: default_pat_env(),
            run_id: None,
            plan_id: None,
            run_name: default_run_name(),
            api_version: default_api_version(),
        }
    }
}

impl AzureConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.enabled {
            return Ok(());
        }
        if self.organization.trim().is_empty() || self.project.trim().is_empty() {
            anyhow::bail!(
                "Azure reporting requires 'reporting.azure.organization' and 'reporting.azure.project'"
            );
        }
        if self.run_id.is_none() && self.plan_id.is_none() {
            anyhow::bail!(
                "Azure reporting requires either 'reporting.azure.run_id' or 'reporting.azure.plan_id'"
            );
        }
        if self.pat_env.trim().is_empty() {
            anyhow::bail!("'reporting.azure.pat_env' must name an environment variable");
        }
        Ok(())
    }

    /// Read the personal access token from the configured variable.
    pub fn pat(&self) -> Result<String, anyhow::Error> {
        std::env::var(&self.pat_env)
            .map_err(|_| anyhow::anyhow!("Environment variable {} is not set", self.pat_env))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HtmlTheme {
    #[default]
    Dark,
    Standard,
}

/// Standalone HTML run report.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HtmlConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_out")]
    pub out: PathBuf,
    #[serde(default)]
    pub theme: HtmlTheme,
    #[serde(default = "default_document_title")]
    pub document_title: String,
    #[serde(default = "default_report_name")]
    pub report_name: String,
    /// chrono `strftime` pattern
    #[serde(default = "default_timestamp_format")]
    pub timestamp_format: String,
}

fn default_out() -> PathBuf {
    PathBuf::from("target/streamprobe/report.html")
}

fn default_document_title() -> String {
    "Streamprobe Report".to_string()
}

fn default_report_name() -> String {
    "Message Flow Verification".to_string()
}

fn default_timestamp_format() -> String {
    "%Y-%m-%d %H:%M:%S".to_string()
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            out: default_out(),
            theme: HtmlTheme::default(),
            document_title: default_document_title(),
            report_name: default_report_name(),
            timestamp_format: default_timestamp_format(),
        }
    }
}

impl HtmlConfig {
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.enabled && self.out.as_os_str().is_empty() {
            anyhow::bail!("'reporting.html.out' must not be empty when the HTML report is enabled");
        }
        if self.timestamp_format.trim().is_empty() {
            anyhow::bail!("'reporting.html.timestamp_format' must not be empty");
        }
        Ok(())
    }
}
