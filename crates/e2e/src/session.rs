//! Scenario session: the context handle every command and page object takes
//!
//! A session owns the browser driver and shares the loaded bundle read-only.
//! All waiting happens here: a timed assertion re-reads the page until its
//! expectation holds or the bundle timeout elapses, then fails once.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::debug;

use crate::config::{Locator, TestConfig};
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const OBSERVED_PREVIEW_CHARS: usize = 200;

/// How an observed message is compared with the expected one
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Contains(String),
    Equals(String),
}

impl Expectation {
    /// Compare after stripping invisible bidi marks and unifying quote styles,
    /// which browsers sprinkle into native validation messages
    pub fn matches(&self, observed: &str) -> bool {
        let observed = normalize_message(observed);
        match self {
            Expectation::Contains(expected) => observed.contains(&normalize_message(expected)),
            Expectation::Equals(expected) => observed.trim() == normalize_message(expected).trim(),
        }
    }

    fn describe(&self) -> String {
        match self {
            Expectation::Contains(s) => format!("message containing \"{}\"", s),
            Expectation::Equals(s) => format!("message equal to \"{}\"", s),
        }
    }
}

pub(crate) fn normalize_message(s: &str) -> String {
    s.chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}'..='\u{200F}' | '\u{202A}'..='\u{202E}' | '\u{2066}'..='\u{2069}' | '\u{FEFF}'
            )
        })
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

fn describe_locator(locator: &Locator) -> String {
    locator.candidates().join(" | ")
}

fn preview(text: Option<&str>) -> String {
    match text {
        None => "nothing (element absent)".to_string(),
        Some(t) => {
            let flat = t.split_whitespace().collect::<Vec<_>>().join(" ");
            if flat.chars().count() > OBSERVED_PREVIEW_CHARS {
                let cut: String = flat.chars().take(OBSERVED_PREVIEW_CHARS).collect();
                format!("\"{}…\"", cut)
            } else {
                format!("\"{}\"", flat)
            }
        }
    }
}

pub struct Session<D: BrowserDriver> {
    config: Arc<TestConfig>,
    driver: D,
}

impl<D: BrowserDriver> Session<D> {
    pub fn new(config: Arc<TestConfig>, driver: D) -> Self {
        Self { config, driver }
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    /// Shared handle to the bundle, for callers that outlive a borrow
    pub fn config_arc(&self) -> Arc<TestConfig> {
        Arc::clone(&self.config)
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    pub async fn close(mut self) -> E2eResult<()> {
        self.driver.close().await
    }

    fn default_wait(&self) -> Duration {
        self.config.timeouts.default_wait()
    }

    pub async fn visit(&mut self, url: &str) -> E2eResult<()> {
        debug!("visit {}", url);
        self.driver.goto(url).await
    }

    pub async fn visit_registration(&mut self) -> E2eResult<()> {
        let url = self.config.urls.cadastro.clone();
        self.visit(&url).await
    }

    pub async fn visit_login(&mut self) -> E2eResult<()> {
        let url = self.config.urls.login.clone();
        self.visit(&url).await
    }

    /// First candidate selector present on the page, waiting up to the
    /// default timeout for any of them to appear
    pub async fn resolve(&mut self, locator: &Locator) -> E2eResult<String> {
        let deadline = Instant::now() + self.default_wait();
        loop {
            for candidate in locator.candidates() {
                if self.driver.count(candidate).await? > 0 {
                    return Ok(candidate.clone());
                }
            }
            if Instant::now() >= deadline {
                return Err(E2eError::ElementNotFound {
                    candidates: locator.candidates().to_vec(),
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    pub async fn fill(&mut self, locator: &Locator, value: &str) -> E2eResult<()> {
        let selector = self.resolve(locator).await?;
        debug!("fill {} = {:?}", selector, value);
        self.driver.fill(&selector, value).await
    }

    pub async fn click(&mut self, locator: &Locator) -> E2eResult<()> {
        let selector = self.resolve(locator).await?;
        debug!("click {}", selector);
        self.driver.click(&selector).await
    }

    pub async fn pause(&mut self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Joined text of every element matching the first candidate present,
    /// `None` if no candidate matches anything
    async fn read_text(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        for candidate in locator.candidates() {
            let texts = self.driver.inner_texts(candidate).await?;
            if !texts.is_empty() {
                return Ok(Some(texts.join("\n")));
            }
        }
        Ok(None)
    }

    /// Re-read the text of `locator` until `accept` holds or `timeout` elapses.
    /// Returns the matching text, or the last observation on timeout.
    async fn poll_text<F>(
        &mut self,
        locator: &Locator,
        timeout: Duration,
        accept: F,
    ) -> E2eResult<Result<String, Option<String>>>
    where
        F: Fn(&str) -> bool,
    {
        let deadline = Instant::now() + timeout;
        loop {
            let observed = self.read_text(locator).await?;
            if let Some(text) = &observed {
                if accept(text) {
                    return Ok(Ok(text.clone()));
                }
            }
            if Instant::now() >= deadline {
                return Ok(Err(observed));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Assert `text` becomes visible anywhere on the page
    pub async fn expect_text(&mut self, text: &str) -> E2eResult<()> {
        self.expect_texts(&[text]).await
    }

    /// Assert every text is visible at the same time
    pub async fn expect_texts(&mut self, texts: &[&str]) -> E2eResult<()> {
        self.expect_all_in(&Locator::new(["body"]), texts).await
    }

    /// Assert the alert region, across every alert shown, contains every fragment
    pub async fn expect_alert(&mut self, fragments: &[&str]) -> E2eResult<()> {
        let locator = self.config.selectors.login.alerta.clone();
        self.expect_all_in(&locator, fragments).await
    }

    async fn expect_all_in(&mut self, locator: &Locator, texts: &[&str]) -> E2eResult<()> {
        let timeout = self.default_wait();
        let outcome = self
            .poll_text(locator, timeout, |observed| texts.iter().all(|t| observed.contains(t)))
            .await?;

        match outcome {
            Ok(_) => Ok(()),
            Err(observed) => {
                let missing: Vec<&str> = texts
                    .iter()
                    .copied()
                    .filter(|t| !observed.as_deref().is_some_and(|o| o.contains(t)))
                    .collect();
                Err(E2eError::assertion(
                    format!(
                        "\"{}\" visible in {} within {:?}",
                        missing.join("\", \""),
                        describe_locator(locator),
                        timeout
                    ),
                    preview(observed.as_deref()),
                ))
            }
        }
    }

    /// Assert text matching `pattern` becomes visible inside `locator`
    pub async fn expect_pattern(&mut self, locator: &Locator, pattern: &Regex) -> E2eResult<String> {
        let timeout = self.default_wait();
        match self.poll_text(locator, timeout, |t| pattern.is_match(t)).await? {
            Ok(text) => Ok(text),
            Err(observed) => Err(E2eError::assertion(
                format!("text matching /{}/ in {} within {:?}", pattern, describe_locator(locator), timeout),
                preview(observed.as_deref()),
            )),
        }
    }

    /// Current text of `locator`, if it is present
    pub async fn text_of(&mut self, locator: &Locator) -> E2eResult<Option<String>> {
        self.read_text(locator).await
    }

    /// Trigger the browser's native validation on a field and compare its
    /// message once; native validation is synchronous so there is nothing to wait for
    pub async fn expect_validation(&mut self, locator: &Locator, expected: &Expectation) -> E2eResult<()> {
        let selector = self.resolve(locator).await?;
        let message = self.driver.validation_message(&selector).await?;
        debug!("validation message for {}: {:?}", selector, message);
        if expected.matches(&message) {
            Ok(())
        } else {
            Err(E2eError::assertion(
                format!("{} on {}", expected.describe(), selector),
                format!("\"{}\"", message),
            ))
        }
    }

    pub async fn expect_url_contains(&mut self, fragment: &str) -> E2eResult<()> {
        let deadline = Instant::now() + self.default_wait();
        loop {
            let url = self.driver.current_url().await?;
            if url.contains(fragment) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(E2eError::assertion(format!("URL containing \"{}\"", fragment), url));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    /// Liveness check used after submissions whose message is not asserted
    pub async fn expect_body_present(&mut self) -> E2eResult<()> {
        if self.driver.count("body").await? > 0 {
            Ok(())
        } else {
            Err(E2eError::assertion("page body present", "no body element"))
        }
    }

    pub async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        self.driver.screenshot(path).await
    }
}
