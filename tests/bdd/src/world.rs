//! Test world containing shared state for cucumber tests

use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use cucumber::World;
use once_cell::sync::Lazy;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use streamprobe::config::HarnessConfig;
use streamprobe::fixture::FixtureLoader;
use streamprobe::{ExpectationSet, InMemoryBroker, MessageWaiter, Publisher};
use tracing::info;

/// Names the config file; defaults to `streamprobe.yaml` next to this crate.
pub const CONFIG_ENV: &str = "STREAMPROBE_CONFIG";

static CONFIG: Lazy<HarnessConfig> =
    Lazy::new(|| load_config().expect("Failed to load streamprobe configuration"));

/// Configuration shared by every scenario of the run.
pub fn harness_config() -> &'static HarnessConfig {
    &CONFIG
}

/// Load the suite configuration. A missing file means defaults; relative
/// payload directories are resolved against this crate's directory.
pub fn load_config() -> anyhow::Result<HarnessConfig> {
    let crate_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let path = std::env::var(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| crate_dir.join("streamprobe.yaml"));

    let mut config = if path.exists() {
        HarnessConfig::from_file(&path)
            .with_context(|| format!("invalid configuration in {}", path.display()))?
    } else {
        let mut config = HarnessConfig::default();
        config.apply_env_overrides()?;
        config
    };

    if config.fixtures.payload_dir.is_relative() {
        config.fixtures.payload_dir = crate_dir.join(&config.fixtures.payload_dir);
    }
    Ok(config)
}

/// The test world containing all shared state
#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct ProbeWorld {
    /// Fresh per scenario so retained messages never leak between scenarios
    pub broker: Arc<InMemoryBroker>,

    pub waiter: MessageWaiter,

    pub fixtures: FixtureLoader,

    /// Payloads published by this scenario, in order
    pub sent: Vec<String>,

    pub started: Instant,

    pub started_at: DateTime<Utc>,
}

impl ProbeWorld {
    /// Create a new test world
    pub async fn new() -> Self {
        Self::with_config(harness_config())
    }

    pub fn with_config(config: &HarnessConfig) -> Self {
        let broker = Arc::new(InMemoryBroker::with_offset_reset(
            config.broker.offset_reset,
        ));
        let waiter = MessageWaiter::new(broker.clone()).with_default_timeout(config.timeout());

        Self {
            broker,
            waiter,
            fixtures: FixtureLoader::new(&config.fixtures.payload_dir),
            sent: Vec::new(),
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Render a payload fixture with `modifications` and publish it.
    pub fn send_fixture(
        &mut self,
        fixture: &str,
        topic: &str,
        modifications: &[(String, String)],
    ) -> anyhow::Result<String> {
        let payload = self
            .fixtures
            .render(fixture, modifications.iter().map(|(k, v)| (k, v)))
            .with_context(|| format!("could not prepare payload {fixture}"))?;
        info!("Sending modified JSON: {}", payload);
        self.publish_raw(topic, payload.clone())?;
        Ok(payload)
    }

    pub fn publish_raw(&mut self, topic: &str, payload: String) -> anyhow::Result<()> {
        self.broker
            .publish(topic, Bytes::from(payload.clone()))
            .with_context(|| format!("could not publish to topic {topic}"))?;
        self.sent.push(payload);
        Ok(())
    }

    /// Timeout for `Then` steps; the configured one unless a step overrides it.
    pub fn timeout(&self) -> Duration {
        self.waiter.default_timeout()
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.waiter = self.waiter.clone().with_default_timeout(timeout);
    }

    /// Wait on `topic` for a message meeting `expectations`.
    pub async fn find_match(&self, topic: &str, expectations: ExpectationSet) -> bool {
        self.waiter
            .wait_for_match_async(topic, expectations, self.timeout())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_world_creation() {
        let config = HarnessConfig::default();
        let world = ProbeWorld::with_config(&config);
        assert_eq!(world.timeout(), Duration::from_secs(90));
        assert!(world.sent.is_empty());
        assert_eq!(world.broker.active_subscriptions(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_publish_then_find() {
        let mut world = ProbeWorld::with_config(&HarnessConfig::default());
        world.set_timeout(Duration::from_secs(1));
        assert_eq!(world.waiter.default_timeout(), Duration::from_secs(1));
        world
            .publish_raw("orders", r#"{"order":{"status":"SHIPPED"}}"#.to_string())
            .unwrap();

        let expected = ExpectationSet::new().with("order.status", "SHIPPED");
        assert!(world.find_match("orders", expected).await);
        assert_eq!(world.sent.len(), 1);
    }
}
