//! Scenario outcome reporting.
//!
//! The BDD runner records a [`ScenarioOutcome`] per finished scenario into an
//! [`OutcomeCollector`]. After the run the outcomes are rendered into an HTML
//! report and, when configured, pushed to an Azure DevOps test run.

mod azure;
mod html;
mod outcome;

use std::path::PathBuf;

pub use azure::{AzureDevOpsClient, AzureTestReporter, PublishSummary};
pub use html::HtmlReport;
pub use outcome::{test_case_id, OutcomeCollector, RunSummary, ScenarioOutcome, ScenarioStatus};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("Azure DevOps request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Azure DevOps returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },
    #[error("Azure DevOps response did not contain a run id")]
    MissingRunId,
    #[error("Invalid reporting configuration: {0}")]
    Config(String),
    #[error("Failed to write report {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
