//! Azure DevOps test-run reporting.

use super::outcome::{ScenarioOutcome, ScenarioStatus};
use super::ReportError;
use crate::config::AzureConfig;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin client for the test-run endpoints of the Azure DevOps REST API.
#[derive(Debug, Clone)]
pub struct AzureDevOpsClient {
    http: reqwest::Client,
    base_url: String,
    organization: String,
    project: String,
    api_version: String,
}

impl AzureDevOpsClient {
    pub fn new(
        base_url: &str,
        organization: &str,
        project: &str,
        pat: &str,
        api_version: &str,
    ) -> Result<Self, ReportError> {
        let mut headers = HeaderMap::new();
        let credentials = BASE64.encode(format!(":{}", pat.trim()));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Basic {credentials}"))
                .map_err(|e| ReportError::Config(format!("invalid authorization header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            organization: organization.to_string(),
            project: project.to_string(),
            api_version: api_version.to_string(),
        })
    }

    /// Build a client from configuration, reading the token from the
    /// configured environment variable.
    pub fn from_config(config: &AzureConfig) -> Result<Self, ReportError> {
        let pat = config
            .pat()
            .map_err(|e| ReportError::Config(e.to_string()))?;
        Self::new(
            &config.base_url,
            &config.organization,
            &config.project,
            &pat,
            &config.api_version,
        )
    }

    fn runs_url(&self) -> String {
        format!(
            "{}/{}/{}/_apis/test/runs",
            self.base_url, self.organization, self.project
        )
    }

    /// Create an automated run in `plan_id` and return its id.
    pub async fn create_run(&self, name: &str, plan_id: u64) -> Result<u64, ReportError> {
        #[derive(Deserialize)]
        struct CreatedRun {
            id: Option<u64>,
        }

        let url = self.runs_url();
        let response = self
            .http
            .post(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .json(&json!({
                "name": name,
                "plan": { "id": plan_id },
                "automated": true,
            }))
            .send()
            .await?;
        let response = check_status(response, &url).await?;

        let created: CreatedRun = response.json().await?;
        let run_id = created.id.ok_or(ReportError::MissingRunId)?;
        info!("Created Azure DevOps test run {} ({})", run_id, name);
        Ok(run_id)
    }

    /// Record the outcome of one test case in `run_id`.
    pub async fn publish_outcome(
        &self,
        run_id: u64,
        test_case_id: u32,
        status: ScenarioStatus,
    ) -> Result<(), ReportError> {
        let url = format!("{}/{}/results", self.runs_url(), run_id);
        let response = self
            .http
            .patch(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .json(&json!({
                "testCaseId": test_case_id,
                "outcome": status.azure_outcome(),
            }))
            .send()
            .await?;
        check_status(response, &url).await?;

        debug!(
            "Reported test case {} as {} in run {}",
            test_case_id,
            status.azure_outcome(),
            run_id
        );
        Ok(())
    }
}

async fn check_status(
    response: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, ReportError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ReportError::Status {
        status: status.as_u16(),
        url: url.to_string(),
        body,
    })
}

/// What happened when a batch of outcomes was pushed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    pub reported: usize,
    /// Outcomes without a test case tag
    pub untagged: usize,
    pub failed: usize,
}

/// Pushes scenario outcomes into a single test run, creating the run on first
/// use when no run id was configured.
#[derive(Debug)]
pub struct AzureTestReporter {
    client: AzureDevOpsClient,
    run_id: OnceCell<u64>,
    plan_id: Option<u64>,
    run_name: String,
}

impl AzureTestReporter {
    pub fn new(
        client: AzureDevOpsClient,
        run_id: Option<u64>,
        plan_id: Option<u64>,
        run_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            run_id: OnceCell::new_with(run_id),
            plan_id,
            run_name: run_name.into(),
        }
    }

    pub fn from_config(config: &AzureConfig) -> Result<Self, ReportError> {
        let client = AzureDevOpsClient::from_config(config)?;
        Ok(Self::new(
            client,
            config.run_id,
            config.plan_id,
            config.run_name.clone(),
        ))
    }

    /// The run outcomes go to, created on demand.
    pub async fn run_id(&self) -> Result<u64, ReportError> {
        self.run_id
            .get_or_try_init(|| async {
                let plan_id = self.plan_id.ok_or_else(|| {
                    ReportError::Config("a plan id is required to create a test run".to_string())
                })?;
                self.client.create_run(&self.run_name, plan_id).await
            })
            .await
            .copied()
    }

    /// Report one outcome. Returns `false` when the scenario carries no test
    /// case tag and nothing was sent.
    pub async fn on_scenario_finished(&self, outcome: &ScenarioOutcome) -> Result<bool, ReportError> {
        let Some(test_case_id) = outcome.test_case_id() else {
            debug!("Scenario '{}' has no test case tag, not reporting", outcome.name);
            return Ok(false);
        };
        let run_id = self.run_id().await?;
        self.client
            .publish_outcome(run_id, test_case_id, outcome.status)
            .await?;
        Ok(true)
    }

    /// Report every outcome, continuing past individual failures.
    pub async fn report_all(&self, outcomes: &[ScenarioOutcome]) -> PublishSummary {
        let mut summary = PublishSummary::default();
        for outcome in outcomes {
            match self.on_scenario_finished(outcome).await {
                Ok(true) => summary.reported += 1,
                Ok(false) => summary.untagged += 1,
                Err(e) => {
                    warn!("Failed to report scenario '{}': {}", outcome.name, e);
                    summary.failed += 1;
                }
            }
        }
        info!(
            "Azure DevOps reporting finished: {} reported, {} untagged, {} failed",
            summary.reported, summary.untagged, summary.failed
        );
        summary
    }
}
