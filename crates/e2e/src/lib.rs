//! Seu Barriga E2E harness
//!
//! This crate drives the registration and login flows of the Seu Barriga
//! web application through a real browser and asserts on what it renders:
//! - Loads URLs, selectors, messages and timeouts from JSON fixture bundles
//! - Exposes a command library (register, login, required-field checks, ...)
//! - Wraps the login page behind a page object with selector fallbacks
//! - Runs declarative YAML scenarios and reports pass/fail as JSON
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ScenarioRunner (YAML scenarios)             │
//! │    ├── FixtureStore::load(bundle) -> TestConfig (per run)   │
//! │    ├── DriverFactory::create() -> BrowserDriver (per run)   │
//! │    └── run_spec(spec) -> ScenarioResult                     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  commands                     │  pages::LoginPage           │
//! │    register_user, login, ...  │    fill_email, submit, ...  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Session (bundle + driver, timed assertions)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserDriver ── PlaywrightDriver (node, JSON lines)       │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod driver;
pub mod error;
pub mod pages;
pub mod playwright;
pub mod runner;
pub mod scenario;
pub mod session;

pub use commands::{LoginField, RegisteredUser, RegistrationField};
pub use config::{FixtureStore, Locator, TestConfig};
pub use driver::{BrowserDriver, DriverFactory};
pub use error::{E2eError, E2eResult};
pub use pages::LoginPage;
pub use runner::{RunnerConfig, ScenarioRunner, SuiteResult};
pub use scenario::{ScenarioSpec, ScenarioStep};
pub use session::{Expectation, Session};
