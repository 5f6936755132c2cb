//! Live runs against the remote application through Playwright
//!
//! These need node, Playwright and network access, so they are ignored by default.
//! Run with: cargo test --package barriga-e2e --test e2e -- --ignored

mod support;

use std::sync::Arc;

use barriga_e2e::commands;
use barriga_e2e::config::{FixtureStore, DEFAULT_BUNDLE};
use barriga_e2e::playwright::{PlaywrightConfig, PlaywrightFactory};
use barriga_e2e::{DriverFactory, RunnerConfig, ScenarioRunner, Session};
use tempfile::TempDir;

#[tokio::test]
#[ignore = "needs Playwright and network access"]
async fn live_smoke_scenarios() {
    let factory = PlaywrightFactory::new(PlaywrightConfig::default()).unwrap();
    let output = TempDir::new().unwrap();

    let runner = ScenarioRunner::new(
        factory,
        RunnerConfig {
            fixtures_dir: support::fixtures_dir(),
            scenarios_dir: support::scenarios_dir(),
            output_dir: output.path().to_path_buf(),
            ..Default::default()
        },
    );

    let suite = runner.run_tagged("smoke").await.unwrap();
    runner.write_results(&suite).unwrap();
    assert!(suite.success(), "{:?}", suite.results);
}

#[tokio::test]
#[ignore = "needs Playwright and network access"]
async fn live_register_and_login() {
    let factory = PlaywrightFactory::new(PlaywrightConfig::default()).unwrap();
    let config = FixtureStore::new(support::fixtures_dir()).load(DEFAULT_BUNDLE).unwrap();
    let mut session = Session::new(Arc::new(config), factory.create().await.unwrap());

    let user = commands::register_user(&mut session, "Maria Teste", None, Some("123456"))
        .await
        .unwrap();
    commands::login_as(&mut session, &user).await.unwrap();
    commands::logout(&mut session).await.unwrap();

    session.close().await.unwrap();
}
