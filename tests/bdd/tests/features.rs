//! Cucumber BDD suite for streamprobe
//!
//! Run with: cargo test -p streamprobe-bdd --test features

use cucumber::{writer, World, WriterExt};
use streamprobe::logging::init_tracing;
use streamprobe::reporting::OutcomeCollector;
use streamprobe_bdd::hooks::{publish_reports, scenario_outcome};
use streamprobe_bdd::world::{harness_config, ProbeWorld};

#[tokio::main]
async fn main() {
    init_tracing("info");

    let outcomes = OutcomeCollector::new();
    let recorder = outcomes.clone();

    ProbeWorld::cucumber()
        .max_concurrent_scenarios(1) // scenarios share the process-wide config
        .before(|_feature, _rule, scenario, _world| {
            Box::pin(async move {
                tracing::info!("Starting scenario: {}", scenario.name);
            })
        })
        .after(move |feature, _rule, scenario, ev, world| {
            let outcome = scenario_outcome(feature, scenario, ev, world.as_deref());
            tracing::info!("Finished scenario: {} ({})", scenario.name, outcome.status);
            recorder.record(outcome);
            Box::pin(async {})
        })
        .with_writer(
            writer::Basic::stdout()
                .summarized()
                .assert_normalized(),
        )
        .filter_run("features/", |_, _, sc| {
            // Skip scenarios tagged with @skip
            !sc.tags.iter().any(|t| t == "skip")
        })
        .await;

    let results = outcomes.snapshot();
    publish_reports(harness_config(), &results).await;

    let summary = outcomes.summary();
    tracing::info!(
        "{} scenarios: {} passed, {} failed, {} skipped",
        summary.total(),
        summary.passed,
        summary.failed,
        summary.skipped
    );
    if summary.failed > 0 {
        std::process::exit(1);
    }
}
