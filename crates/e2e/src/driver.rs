//! Browser driving primitives
//!
//! The harness never talks to a browser directly; everything above this
//! module goes through [`BrowserDriver`]. Each call completes (or fails)
//! before the next one is issued.

use std::path::Path;

use async_trait::async_trait;

use crate::error::E2eResult;

#[async_trait]
pub trait BrowserDriver: Send {
    /// Navigate to an absolute URL and wait for the load event
    async fn goto(&mut self, url: &str) -> E2eResult<()>;

    /// Replace the value of the first element matching `selector`
    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()>;

    /// Click the first element matching `selector`
    async fn click(&mut self, selector: &str) -> E2eResult<()>;

    /// Number of elements currently matching `selector`
    async fn count(&mut self, selector: &str) -> E2eResult<usize>;

    /// Rendered text of every element matching `selector`, empty if none is present
    async fn inner_texts(&mut self, selector: &str) -> E2eResult<Vec<String>>;

    /// Run `reportValidity()` on a form field and return its `validationMessage`
    async fn validation_message(&mut self, selector: &str) -> E2eResult<String>;

    /// URL of the current page
    async fn current_url(&mut self) -> E2eResult<String>;

    /// Save a full-page screenshot
    async fn screenshot(&mut self, path: &Path) -> E2eResult<()>;

    /// Tear the browser down
    async fn close(&mut self) -> E2eResult<()>;
}

/// Creates one fresh driver per scenario
#[async_trait]
pub trait DriverFactory: Send + Sync {
    type Driver: BrowserDriver;

    async fn create(&self) -> E2eResult<Self::Driver>;
}
