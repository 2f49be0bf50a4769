//! Scenario bookkeeping for the `after` hook and end-of-run reporting.

use crate::world::ProbeWorld;
use cucumber::event::ScenarioFinished;
use cucumber::gherkin::{Feature, Scenario};
use std::time::Duration;
use streamprobe::config::HarnessConfig;
use streamprobe::reporting::{AzureTestReporter, HtmlReport, ScenarioOutcome, ScenarioStatus};
use tracing::{error, info, warn};

/// Build the outcome of a finished scenario. Feature tags are inherited.
pub fn scenario_outcome(
    feature: &Feature,
    scenario: &Scenario,
    finished: &ScenarioFinished,
    world: Option<&ProbeWorld>,
) -> ScenarioOutcome {
    let (status, error) = match finished {
        ScenarioFinished::StepPassed => (ScenarioStatus::Passed, None),
        ScenarioFinished::StepSkipped => (ScenarioStatus::Skipped, None),
        ScenarioFinished::StepFailed(_, _, err) => (ScenarioStatus::Failed, Some(err.to_string())),
        _ => (
            ScenarioStatus::Failed,
            Some("before hook failed".to_string()),
        ),
    };

    let tags = feature.tags.iter().chain(scenario.tags.iter()).cloned();
    let mut outcome = ScenarioOutcome::new(&feature.name, &scenario.name, status).with_tags(tags);
    if let Some(world) = world {
        outcome = outcome
            .with_started_at(world.started_at)
            .with_duration(world.started.elapsed());
    } else {
        outcome = outcome.with_duration(Duration::ZERO);
    }
    if let Some(error) = error {
        outcome = outcome.with_error(error);
    }
    outcome
}

/// Write the HTML report and push outcomes to Azure DevOps, as configured.
/// Reporting problems are logged and never fail the run.
pub async fn publish_reports(config: &HarnessConfig, outcomes: &[ScenarioOutcome]) {
    if config.reporting.html.enabled {
        let report = HtmlReport::new(config.reporting.html.clone());
        match report.write(outcomes) {
            Ok(path) => info!("HTML report available at {}", path.display()),
            Err(e) => error!("Failed to write HTML report: {}", e),
        }
    }

    if config.reporting.azure.enabled {
        match AzureTestReporter::from_config(&config.reporting.azure) {
            Ok(reporter) => {
                reporter.report_all(outcomes).await;
            }
            Err(e) => warn!("Azure DevOps reporting skipped: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use streamprobe::config::HtmlConfig;

    #[tokio::test]
    async fn test_publish_reports_writes_html() {
        let dir = std::env::temp_dir().join(format!("streamprobe-bdd-{}", std::process::id()));
        let out = dir.join("report.html");

        let mut config = HarnessConfig::default();
        config.reporting.html = HtmlConfig {
            enabled: true,
            out: out.clone(),
            ..HtmlConfig::default()
        };

        let outcomes = vec![ScenarioOutcome::new("Orders", "shipped", ScenarioStatus::Passed)];
        publish_reports(&config, &outcomes).await;

        let html = std::fs::read_to_string(&out).unwrap();
        assert!(html.contains("shipped"));
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[tokio::test]
    async fn test_publish_reports_disabled_is_noop() {
        let outcomes = vec![ScenarioOutcome::new("Orders", "shipped", ScenarioStatus::Passed)];
        publish_reports(&HarnessConfig::default(), &outcomes).await;
    }
}
