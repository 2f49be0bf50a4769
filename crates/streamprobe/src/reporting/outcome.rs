use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

static TEST_CASE_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^@?TC(\d+)$").expect("test case tag pattern is a valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioStatus {
    Passed,
    Failed,
    Skipped,
}

impl ScenarioStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ScenarioStatus::Passed => "passed",
            ScenarioStatus::Failed => "failed",
            ScenarioStatus::Skipped => "skipped",
        }
    }

    /// Azure DevOps only distinguishes passed from everything else.
    pub fn azure_outcome(self) -> &'static str {
        match self {
            ScenarioStatus::Passed => "Passed",
            ScenarioStatus::Failed | ScenarioStatus::Skipped => "Failed",
        }
    }
}

impl fmt::Display for ScenarioStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one finished scenario.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    pub feature: String,
    pub tags: Vec<String>,
    pub status: ScenarioStatus,
    pub duration: Duration,
    pub started_at: DateTime<Utc>,
    pub error: Option<String>,
}

impl ScenarioOutcome {
    pub fn new(
        feature: impl Into<String>,
        name: impl Into<String>,
        status: ScenarioStatus,
    ) -> Self {
        Self {
            name: name.into(),
            feature: feature.into(),
            tags: Vec::new(),
            status,
            duration: Duration::ZERO,
            started_at: Utc::now(),
            error: None,
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = started_at;
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn test_case_id(&self) -> Option<u32> {
        test_case_id(&self.tags)
    }
}

/// First tag of the form `@TC<digits>` (or `TC<digits>`, as cucumber strips
/// the `@`), as a test case id.
pub fn test_case_id<S: AsRef<str>>(tags: &[S]) -> Option<u32> {
    tags.iter().find_map(|tag| {
        TEST_CASE_TAG
            .captures(tag.as_ref().trim())
            .and_then(|caps| caps[1].parse().ok())
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[ScenarioOutcome]) -> Self {
        outcomes
            .iter()
            .fold(RunSummary::default(), |mut summary, outcome| {
                match outcome.status {
                    ScenarioStatus::Passed => summary.passed += 1,
                    ScenarioStatus::Failed => summary.failed += 1,
                    ScenarioStatus::Skipped => summary.skipped += 1,
                }
                summary
            })
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }
}

/// Thread-safe sink shared between scenario hooks.
#[derive(Debug, Clone, Default)]
pub struct OutcomeCollector {
    outcomes: Arc<Mutex<Vec<ScenarioOutcome>>>,
}

impl OutcomeCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, outcome: ScenarioOutcome) {
        self.outcomes.lock().push(outcome);
    }

    /// Outcomes in the order they were recorded.
    pub fn snapshot(&self) -> Vec<ScenarioOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary::from_outcomes(&self.outcomes.lock())
    }

    pub fn len(&self) -> usize {
        self.outcomes.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_case_id_from_tags() {
        assert_eq!(test_case_id(&["smoke", "@TC1234"]), Some(1234));
        assert_eq!(test_case_id(&["TC77", "TC88"]), Some(77));
        assert_eq!(test_case_id(&["@TCabc", "@TC5"]), Some(5));
        assert_eq!(test_case_id(&["smoke", "TC", "xTC12"]), None);
        assert_eq!(test_case_id::<&str>(&[]), None);
    }

    #[test]
    fn test_outcome_builder() {
        let outcome = ScenarioOutcome::new("Orders", "ship order", ScenarioStatus::Failed)
            .with_tags(["@TC9"])
            .with_duration(Duration::from_millis(250))
            .with_error("no matching message");
        assert_eq!(outcome.test_case_id(), Some(9));
        assert_eq!(outcome.duration, Duration::from_millis(250));
        assert_eq!(outcome.error.as_deref(), Some("no matching message"));
    }

    #[test]
    fn test_azure_outcome_mapping() {
        assert_eq!(ScenarioStatus::Passed.azure_outcome(), "Passed");
        assert_eq!(ScenarioStatus::Failed.azure_outcome(), "Failed");
        assert_eq!(ScenarioStatus::Skipped.azure_outcome(), "Failed");
    }

    #[test]
    fn test_collector_across_threads() {
        let collector = OutcomeCollector::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let collector = collector.clone();
                thread::spawn(move || {
                    let status = if i % 2 == 0 {
                        ScenarioStatus::Passed
                    } else {
                        ScenarioStatus::Failed
                    };
                    collector.record(ScenarioOutcome::new("F", format!("s{i}"), status));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(collector.len(), 4);
        let summary = collector.summary();
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.total(), 4);
    }
}
