//! Scenario runner entry point
//!
//! Run with: cargo run --package barriga-e2e -- --tag smoke

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use barriga_e2e::playwright::{Browser, PlaywrightConfig, PlaywrightFactory};
use barriga_e2e::{E2eResult, RunnerConfig, ScenarioRunner};

#[derive(Parser, Debug)]
#[command(name = "barriga-e2e")]
#[command(about = "Registration and login scenarios for Seu Barriga")]
struct Args {
    /// Directory holding the JSON fixture bundles
    #[arg(long, env = "BARRIGA_FIXTURES", default_value = "crates/e2e/fixtures")]
    fixtures: PathBuf,

    /// Configuration bundle to load for every scenario
    #[arg(long, env = "BARRIGA_BUNDLE", default_value = "configuracoes_teste")]
    bundle: String,

    /// Directory holding the YAML scenarios
    #[arg(short, long, env = "BARRIGA_SCENARIOS", default_value = "crates/e2e/scenarios")]
    scenarios: PathBuf,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name
    #[arg(short, long)]
    name: Option<String>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, env = "BARRIGA_BROWSER", default_value = "chromium")]
    browser: Browser,

    /// Run in headless mode
    #[arg(long, env = "BARRIGA_HEADLESS", default_value_t = true, action = clap::ArgAction::Set)]
    headless: bool,

    /// Browser locale (native validation messages follow it)
    #[arg(long, default_value = "pt-BR")]
    locale: String,

    /// Directory containing node_modules/playwright
    #[arg(long, env = "BARRIGA_NODE_PATH")]
    node_path: Option<PathBuf>,

    /// Upper bound for a single browser command, in seconds
    #[arg(long, default_value = "30")]
    command_timeout: u64,

    /// Skip screenshots of failed scenarios
    #[arg(long)]
    no_screenshots: bool,

    /// Output directory for results
    #[arg(short, long, env = "BARRIGA_OUTPUT", default_value = "test-results")]
    output: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let factory = PlaywrightFactory::new(PlaywrightConfig {
        browser: args.browser,
        headless: args.headless,
        locale: args.locale,
        node_path: args.node_path,
        command_timeout: Duration::from_secs(args.command_timeout),
        ..Default::default()
    })?;

    let runner = ScenarioRunner::new(
        factory,
        RunnerConfig {
            fixtures_dir: args.fixtures,
            bundle: args.bundle,
            scenarios_dir: args.scenarios,
            output_dir: args.output,
            screenshot_on_failure: !args.no_screenshots,
        },
    );

    let results = if let Some(name) = args.name {
        runner.run_named(&name).await?
    } else if let Some(tag) = args.tag {
        runner.run_tagged(&tag).await?
    } else {
        runner.run_all().await?
    };

    runner.write_results(&results)?;
    Ok(results.success())
}
