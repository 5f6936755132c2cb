//! Login page object

use std::fmt;

use regex::Regex;
use tracing::debug;

use crate::config::{compile_pattern, Locator, TestConfig};
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::session::{Expectation, Session};

/// Where the page is in one scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    Unvisited,
    Visited,
    FieldsFilled,
    Submitted,
    Success,
    FieldError,
    GenericError,
}

impl fmt::Display for PageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PageState::Unvisited => "unvisited",
            PageState::Visited => "visited",
            PageState::FieldsFilled => "filled",
            PageState::Submitted => "submitted",
            PageState::Success => "logged in",
            PageState::FieldError => "showing a field error",
            PageState::GenericError => "showing a generic error",
        };
        f.write_str(s)
    }
}

/// Terminal result of a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Success(String),
    FieldError(String),
    GenericError(String),
}

/// A region of the page identified by a pattern over the alert text.
/// Handles are plain values; assert against them with a session.
#[derive(Debug, Clone)]
pub struct Region {
    name: &'static str,
    locator: Locator,
    pattern: Regex,
}

impl Region {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    /// Wait for the region to show up and return its text
    pub async fn should_be_visible<D: BrowserDriver>(&self, session: &mut Session<D>) -> E2eResult<String> {
        session.expect_pattern(&self.locator, &self.pattern).await
    }

    /// Text of the region right now, `None` if it is not shown
    pub async fn text<D: BrowserDriver>(&self, session: &mut Session<D>) -> E2eResult<Option<String>> {
        let text = session.text_of(&self.locator).await?;
        Ok(text.filter(|t| self.pattern.is_match(t)))
    }
}

/// Semantic operations on the login form
#[derive(Debug, Clone)]
pub struct LoginPage {
    url: String,
    email: Locator,
    password: Locator,
    submit: Locator,
    email_error: Region,
    password_error: Region,
    generic_error: Region,
    welcome: Region,
    state: PageState,
}

impl LoginPage {
    pub fn new(config: &TestConfig) -> E2eResult<Self> {
        let selectors = &config.selectors.login;
        let patterns = &config.messages.padroes;
        let region = |name, key: &str, pattern: &str| -> E2eResult<Region> {
            Ok(Region {
                name,
                locator: selectors.alerta.clone(),
                pattern: compile_pattern(key, pattern)?,
            })
        };

        Ok(Self {
            url: config.urls.login.clone(),
            email: selectors.email.clone(),
            password: selectors.senha.clone(),
            submit: selectors.botao_entrar.clone(),
            email_error: region("email error", "erro_email", &patterns.erro_email)?,
            password_error: region("password error", "erro_senha", &patterns.erro_senha)?,
            generic_error: region("generic error", "erro_generico", &patterns.erro_generico)?,
            welcome: region("welcome message", "boas_vindas", &patterns.boas_vindas)?,
            state: PageState::Unvisited,
        })
    }

    pub fn state(&self) -> PageState {
        self.state
    }

    fn require(&self, action: &str, allowed: &[PageState]) -> E2eResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(E2eError::InvalidState {
                action: action.to_string(),
                state: self.state.to_string(),
            })
        }
    }

    pub async fn visit<D: BrowserDriver>(&mut self, session: &mut Session<D>) -> E2eResult<()> {
        session.visit(&self.url).await?;
        self.state = PageState::Visited;
        Ok(())
    }

    pub async fn fill_email<D: BrowserDriver>(&mut self, session: &mut Session<D>, email: &str) -> E2eResult<()> {
        self.require("fill email", &[PageState::Visited, PageState::FieldsFilled])?;
        session.fill(&self.email, email).await?;
        self.state = PageState::FieldsFilled;
        Ok(())
    }

    pub async fn fill_password<D: BrowserDriver>(
        &mut self,
        session: &mut Session<D>,
        password: &str,
    ) -> E2eResult<()> {
        self.require("fill password", &[PageState::Visited, PageState::FieldsFilled])?;
        session.fill(&self.password, password).await?;
        self.state = PageState::FieldsFilled;
        Ok(())
    }

    /// Click the submit button; an empty form may be submitted straight after visiting
    pub async fn submit<D: BrowserDriver>(&mut self, session: &mut Session<D>) -> E2eResult<()> {
        self.require("submit", &[PageState::Visited, PageState::FieldsFilled])?;
        session.click(&self.submit).await?;
        self.state = PageState::Submitted;
        Ok(())
    }

    pub fn email_error(&self) -> &Region {
        &self.email_error
    }

    pub fn password_error(&self) -> &Region {
        &self.password_error
    }

    pub fn generic_error(&self) -> &Region {
        &self.generic_error
    }

    pub fn welcome_message(&self) -> &Region {
        &self.welcome
    }

    /// Wait for the alert after a submission and classify it
    pub async fn outcome<D: BrowserDriver>(&mut self, session: &mut Session<D>) -> E2eResult<PageOutcome> {
        self.require(
            "read outcome",
            &[
                PageState::Submitted,
                PageState::Success,
                PageState::FieldError,
                PageState::GenericError,
            ],
        )?;

        let any = compile_pattern(
            "any",
            &[&self.welcome, &self.email_error, &self.password_error, &self.generic_error]
                .iter()
                .map(|r| format!("(?:{})", r.pattern.as_str()))
                .collect::<Vec<_>>()
                .join("|"),
        )?;
        let text = session.expect_pattern(&self.email_error.locator, &any).await?;

        let outcome = if self.welcome.pattern.is_match(&text) {
            PageOutcome::Success(text)
        } else if self.email_error.pattern.is_match(&text) || self.password_error.pattern.is_match(&text) {
            PageOutcome::FieldError(text)
        } else {
            PageOutcome::GenericError(text)
        };
        self.state = match outcome {
            PageOutcome::Success(_) => PageState::Success,
            PageOutcome::FieldError(_) => PageState::FieldError,
            PageOutcome::GenericError(_) => PageState::GenericError,
        };
        debug!("login page outcome: {:?}", outcome);
        Ok(outcome)
    }

    /// Ask the browser to validate the email field natively and compare its message
    pub async fn expect_email_validation<D: BrowserDriver>(
        &mut self,
        session: &mut Session<D>,
        expected: &Expectation,
    ) -> E2eResult<()> {
        self.require(
            "validate email",
            &[PageState::Visited, PageState::FieldsFilled, PageState::Submitted],
        )?;
        session.expect_validation(&self.email, expected).await?;
        self.state = PageState::FieldError;
        Ok(())
    }
}
