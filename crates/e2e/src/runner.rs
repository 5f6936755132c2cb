//! Scenario runner: one fresh session per scenario, pass/fail aggregation

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::commands::{self, RegisteredUser};
use crate::config::{FixtureStore, TestConfig, DEFAULT_BUNDLE};
use crate::driver::{BrowserDriver, DriverFactory};
use crate::error::{E2eError, E2eResult};
use crate::pages::{LoginPage, PageOutcome};
use crate::scenario::{ExpectedOutcome, Form, FormField, ScenarioSpec, ScenarioStep, ScenarioVars, StartPage};
use crate::session::Session;

/// Result of executing one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub success: bool,
    pub step_name: String,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub known_issue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<PathBuf>,
}

/// Result of running a set of scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// Configuration for the scenario runner
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub fixtures_dir: PathBuf,
    pub bundle: String,
    pub scenarios_dir: PathBuf,
    pub output_dir: PathBuf,
    pub screenshot_on_failure: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            fixtures_dir: PathBuf::from("fixtures"),
            bundle: DEFAULT_BUNDLE.to_string(),
            scenarios_dir: PathBuf::from("scenarios"),
            output_dir: PathBuf::from("test-results"),
            screenshot_on_failure: true,
        }
    }
}

/// Runs scenarios strictly one after another
pub struct ScenarioRunner<F: DriverFactory> {
    factory: F,
    fixtures: FixtureStore,
    config: RunnerConfig,
}

impl<F: DriverFactory> ScenarioRunner<F> {
    pub fn new(factory: F, config: RunnerConfig) -> Self {
        Self {
            factory,
            fixtures: FixtureStore::new(config.fixtures_dir.clone()),
            config,
        }
    }

    /// Run every scenario in the scenarios directory
    pub async fn run_all(&self) -> E2eResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.config.scenarios_dir)?;
        Ok(self.run_specs(&specs).await)
    }

    /// Run scenarios carrying a tag
    pub async fn run_tagged(&self, tag: &str) -> E2eResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.config.scenarios_dir)?;
        let filtered: Vec<ScenarioSpec> = ScenarioSpec::filter_by_tag(&specs, tag).into_iter().cloned().collect();
        Ok(self.run_specs(&filtered).await)
    }

    /// Run one scenario by name
    pub async fn run_named(&self, name: &str) -> E2eResult<SuiteResult> {
        let specs = ScenarioSpec::load_all(&self.config.scenarios_dir)?;
        let spec = specs
            .into_iter()
            .find(|s| s.name == name)
            .ok_or_else(|| E2eError::ScenarioParse(format!("Scenario not found: {}", name)))?;
        Ok(self.run_specs(std::slice::from_ref(&spec)).await)
    }

    /// Run a list of scenarios; a failing scenario never stops the next one
    pub async fn run_specs(&self, specs: &[ScenarioSpec]) -> SuiteResult {
        let start = Instant::now();
        let mut results = Vec::with_capacity(specs.len());
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", specs.len());

        for spec in specs {
            let result = self.run_spec(spec).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Scenario results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        SuiteResult {
            total: specs.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run a single scenario against a fresh bundle and a fresh browser
    pub async fn run_spec(&self, spec: &ScenarioSpec) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", spec.name);
        if let Some(issue) = &spec.known_issue {
            warn!("{} pins known remote behavior: {}", spec.name, issue);
        }

        let mut result = ScenarioResult {
            name: spec.name.clone(),
            success: false,
            duration_ms: 0,
            steps: Vec::new(),
            error: None,
            known_issue: spec.known_issue.clone(),
            screenshot: None,
        };

        // Reloaded per scenario so no scenario can observe another's bundle
        let setup = async {
            let config = Arc::new(self.fixtures.load(&self.config.bundle)?);
            let driver = self.factory.create().await?;
            Ok::<_, E2eError>((config, driver))
        };
        let (config, driver) = match setup.await {
            Ok(pair) => pair,
            Err(e) => {
                result.error = Some(e.to_string());
                result.duration_ms = start.elapsed().as_millis() as u64;
                return result;
            }
        };

        let mut session = Session::new(config, driver);
        let outcome = execute(&mut session, &self.fixtures, spec, &mut result.steps).await;

        if let Err(e) = &outcome {
            result.error = Some(e.to_string());
            if self.config.screenshot_on_failure {
                let path = self.screenshot_path(&spec.name);
                match session.screenshot(&path).await {
                    Ok(()) => result.screenshot = Some(path),
                    Err(shot_err) => warn!("Failure screenshot for {} not taken: {}", spec.name, shot_err),
                }
            }
        }
        result.success = outcome.is_ok();

        if let Err(e) = session.close().await {
            warn!("Closing browser after {} failed: {}", spec.name, e);
        }

        result.duration_ms = start.elapsed().as_millis() as u64;
        result
    }

    fn screenshot_path(&self, name: &str) -> PathBuf {
        let file: String = name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.config.output_dir.join("screenshots").join(format!("{}.png", file))
    }

    /// Write suite results to JSON
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        write_results(&self.config.output_dir, results)
    }
}

/// Write suite results to `<dir>/test-results.json`
pub fn write_results(dir: &Path, results: &SuiteResult) -> E2eResult<PathBuf> {
    std::fs::create_dir_all(dir)?;

    let path = dir.join("test-results.json");
    let json = serde_json::to_string_pretty(results)?;
    std::fs::write(&path, json)?;

    info!("Results written to: {}", path.display());
    Ok(path)
}

/// Run the steps of one scenario, stopping at the first failure
async fn execute<D: BrowserDriver>(
    session: &mut Session<D>,
    fixtures: &FixtureStore,
    spec: &ScenarioSpec,
    steps: &mut Vec<StepResult>,
) -> E2eResult<()> {
    let mut vars = ScenarioVars::default();
    let mut login_page = LoginPage::new(session.config())?;

    match spec.start {
        StartPage::None => {}
        StartPage::Registration => session.visit_registration().await?,
        StartPage::Login => login_page.visit(session).await?,
    }

    for step in &spec.steps {
        let started = Instant::now();
        let outcome = execute_step(session, fixtures, &mut login_page, &mut vars, step).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        steps.push(StepResult {
            success: outcome.is_ok(),
            step_name: step.label(),
            duration_ms,
            error: outcome.as_ref().err().map(|e| e.to_string()),
        });
        outcome?;
    }
    Ok(())
}

async fn execute_step<D: BrowserDriver>(
    session: &mut Session<D>,
    fixtures: &FixtureStore,
    login_page: &mut LoginPage,
    vars: &mut ScenarioVars,
    step: &ScenarioStep,
) -> E2eResult<()> {
    debug!("step {}", step.label());

    match step {
        ScenarioStep::Visit { page: Form::Registration } => session.visit_registration().await,
        ScenarioStep::Visit { page: Form::Login } => login_page.visit(session).await,

        ScenarioStep::Fill { form, field, value } => {
            let value = vars.expand(value)?;
            match (form, field) {
                (Form::Login, FormField::Email) => login_page.fill_email(session, &value).await,
                (Form::Login, FormField::Password) => login_page.fill_password(session, &value).await,
                (Form::Login, FormField::Name) => {
                    Err(E2eError::ScenarioParse("the login form has no name field".to_string()))
                }
                (Form::Registration, field) => {
                    let selectors = session.config().selectors.cadastro.clone();
                    let locator = match field {
                        FormField::Name => &selectors.nome,
                        FormField::Email => &selectors.email,
                        FormField::Password => &selectors.senha,
                    };
                    session.fill(locator, &value).await
                }
            }
        }

        ScenarioStep::Submit { form: Form::Login } => login_page.submit(session).await,
        ScenarioStep::Submit { form: Form::Registration } => {
            let button = session.config().selectors.cadastro.botao_cadastrar.clone();
            session.click(&button).await
        }

        ScenarioStep::Click { selector } => {
            let locator = crate::config::Locator::new([selector.as_str()]);
            session.click(&locator).await
        }

        ScenarioStep::Pause { ms } => {
            session.pause(Duration::from_millis(*ms)).await;
            Ok(())
        }

        ScenarioStep::Log { message } => {
            info!("[SCENARIO] {}", vars.expand(message)?);
            Ok(())
        }

        ScenarioStep::RegisterUser { name, email, password } => {
            let name = vars.expand(name)?;
            let email = email.as_deref().map(|e| vars.expand(e)).transpose()?;
            let password = password.as_deref().map(|p| vars.expand(p)).transpose()?;
            let user = commands::register_user(session, &name, email.as_deref(), password.as_deref()).await?;
            vars.set_user(user);
            Ok(())
        }

        ScenarioStep::RegisterInvalid { name, email, password } => {
            let (name, email, password) = (vars.expand(name)?, vars.expand(email)?, vars.expand(password)?);
            commands::register_invalid_user(session, &name, &email, &password).await
        }

        ScenarioStep::RequireField { field } => commands::require_field(session, *field).await,

        ScenarioStep::DuplicateEmail { name, email, password } => {
            let name = vars.expand(name)?;
            let email = match email {
                Some(e) => vars.expand(e)?,
                None => commands::generate_unique_email("duplicado"),
            };
            let password = password.as_deref().map(|p| vars.expand(p)).transpose()?;
            commands::duplicate_email_check(session, &name, &email, password.as_deref()).await
        }

        ScenarioStep::Login { email: Some(email), password: Some(password) } => {
            let (email, password) = (vars.expand(email)?, vars.expand(password)?);
            commands::login(session, &email, &password).await
        }
        ScenarioStep::Login { .. } => {
            let user: RegisteredUser = vars
                .last_user()
                .cloned()
                .ok_or_else(|| E2eError::ScenarioParse("login without credentials needs a registered user".to_string()))?;
            commands::login_as(session, &user).await
        }

        ScenarioStep::LoginInvalid { email, password } => {
            let (email, password) = (vars.expand(email)?, vars.expand(password)?);
            commands::login_invalid(session, &email, &password).await
        }

        ScenarioStep::RequireLoginField { field } => commands::require_field_login(session, *field).await,

        ScenarioStep::Logout => commands::logout(session).await,

        ScenarioStep::RegisterFixtureUsers { bundle, unique_prefix } => {
            let users = fixtures.load_users(bundle)?;
            let registered = commands::register_fixture_users(session, &users, unique_prefix.as_deref()).await?;
            if let Some(user) = registered.into_iter().last() {
                vars.set_user(user);
            }
            Ok(())
        }

        ScenarioStep::InvalidFixtureUsers { bundle } => {
            let users = fixtures.load_users(bundle)?;
            commands::register_invalid_fixture_users(session, &users).await
        }

        ScenarioStep::RequiredFixtureFields { bundle } => {
            let users = fixtures.load_users(bundle)?;
            let checked = commands::require_fixture_fields(session, &users).await?;
            info!("{} required-field checks from {}", checked, bundle);
            Ok(())
        }

        ScenarioStep::LoginFixtureUsers { bundle, unique_prefix } => {
            let sets = fixtures.load_credentials(bundle)?;
            let prefix = unique_prefix.as_deref().unwrap_or("login");
            let registered = commands::login_fixture_users(session, &sets.usuarios_validos, prefix).await?;
            if let Some(user) = registered.into_iter().last() {
                vars.set_user(user);
            }
            Ok(())
        }

        ScenarioStep::InvalidFixtureLogins { bundle } => {
            let sets = fixtures.load_credentials(bundle)?;
            commands::login_invalid_fixture_users(session, &sets.usuarios_invalidos).await
        }

        ScenarioStep::ExpectText { text } => {
            let text = vars.expand(text)?;
            session.expect_text(&text).await
        }

        ScenarioStep::ExpectMessage { keys } => {
            let config: Arc<TestConfig> = session.config_arc();
            let messages = keys
                .iter()
                .map(|k| config.message(k))
                .collect::<E2eResult<Vec<&str>>>()?;
            session.expect_texts(&messages).await
        }

        ScenarioStep::ExpectAlert { contains } => {
            let fragments = contains.iter().map(|c| vars.expand(c)).collect::<E2eResult<Vec<_>>>()?;
            let fragments: Vec<&str> = fragments.iter().map(String::as_str).collect();
            session.expect_alert(&fragments).await
        }

        ScenarioStep::ExpectValidation { form, field, contains, equals } => {
            let expected = ScenarioStep::expectation(contains, equals)?;
            match (form, field) {
                (Form::Login, FormField::Email) => login_page.expect_email_validation(session, &expected).await,
                (Form::Login, FormField::Password) => {
                    let locator = session.config().selectors.login.senha.clone();
                    session.expect_validation(&locator, &expected).await
                }
                (Form::Login, FormField::Name) => {
                    Err(E2eError::ScenarioParse("the login form has no name field".to_string()))
                }
                (Form::Registration, field) => {
                    let selectors = session.config().selectors.cadastro.clone();
                    let locator = match field {
                        FormField::Name => &selectors.nome,
                        FormField::Email => &selectors.email,
                        FormField::Password => &selectors.senha,
                    };
                    session.expect_validation(locator, &expected).await
                }
            }
        }

        ScenarioStep::ExpectOutcome { outcome } => {
            let observed = login_page.outcome(session).await?;
            let matches = matches!(
                (outcome, &observed),
                (ExpectedOutcome::Success, PageOutcome::Success(_))
                    | (ExpectedOutcome::FieldError, PageOutcome::FieldError(_))
                    | (ExpectedOutcome::GenericError, PageOutcome::GenericError(_))
            );
            if matches {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed {
                    expected: format!("{:?} outcome", outcome),
                    observed: format!("{:?}", observed),
                })
            }
        }

        ScenarioStep::ExpectUrl { contains } => session.expect_url_contains(contains).await,

        ScenarioStep::ExpectBody => session.expect_body_present().await,
    }
}
