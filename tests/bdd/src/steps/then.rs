//! Then step definitions

use crate::steps::table_pairs;
use crate::world::ProbeWorld;
use cucumber::{gherkin::Step, then};
use streamprobe::ExpectationSet;
use tracing::{error, info};

fn expectations(step: &Step) -> ExpectationSet {
    table_pairs(step).into_iter().collect()
}

#[then(expr = "I should find matching message in {string} topic")]
async fn find_matching(world: &mut ProbeWorld, topic: String, step: &Step) {
    let expected = expectations(step);
    info!("Searching in topic: {} with expected values: {}", topic, expected);

    let found = world.find_match(&topic, expected.clone()).await;
    if !found {
        error!("Failed to find message matching expected values: {}", expected);
    }
    assert!(found, "Message with expected values not found within timeout");
}

#[then(expr = "I should not find matching message in {string} topic")]
async fn find_no_matching(world: &mut ProbeWorld, topic: String, step: &Step) {
    let expected = expectations(step);
    let found = world.find_match(&topic, expected.clone()).await;
    assert!(
        !found,
        "Unexpected message matching {expected} found in topic {topic}"
    );
}

#[then(regex = r#"^(\d+) messages? should be retained in "([^"]*)" topic$"#)]
async fn retained_count(world: &mut ProbeWorld, count: usize, topic: String) {
    assert_eq!(
        world.broker.retained(&topic),
        count,
        "Unexpected number of retained messages in topic {topic}"
    );
}
