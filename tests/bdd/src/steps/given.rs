//! Given step definitions

use crate::steps::table_pairs;
use crate::world::ProbeWorld;
use bytes::Bytes;
use cucumber::{gherkin::Step, given};
use std::time::Duration;
use streamprobe::Publisher;
use tracing::{error, info};

#[given(regex = r#"^I send "([^"]*)" to "([^"]*)"(?: kafka)? topic$"#)]
async fn send_fixture(world: &mut ProbeWorld, fixture: String, topic: String, step: &Step) {
    let modifications = table_pairs(step);
    world
        .send_fixture(&fixture, &topic, &modifications)
        .expect("Failed to send fixture");
}

#[given(regex = r#"^I send "([^"]*)" to "([^"]*)"(?: kafka)? topic after (\d+) ms$"#)]
async fn send_fixture_later(
    world: &mut ProbeWorld,
    fixture: String,
    topic: String,
    delay_ms: u64,
    step: &Step,
) {
    let modifications = table_pairs(step);
    let payload = world
        .fixtures
        .render(&fixture, modifications.iter().map(|(k, v)| (k, v)))
        .expect("Failed to render fixture");

    // The following Then step is already waiting when the message lands
    let broker = world.broker.clone();
    let delay = Duration::from_millis(delay_ms);
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        info!("Sending delayed message to topic {}", topic);
        if let Err(e) = broker.publish(&topic, Bytes::from(payload)) {
            error!("Delayed publish to {} failed: {}", topic, e);
        }
    });
}

#[given(expr = "the wait timeout is {int} seconds")]
async fn wait_timeout(world: &mut ProbeWorld, seconds: u64) {
    world.set_timeout(Duration::from_secs(seconds));
}

#[given(expr = "a raw message {string} is sent to {string} topic")]
async fn send_raw(world: &mut ProbeWorld, payload: String, topic: String) {
    world
        .publish_raw(&topic, payload)
        .expect("Failed to publish raw message");
}

#[given("retained messages are cleared")]
async fn clear_retained(world: &mut ProbeWorld) {
    world.broker.clear();
}
