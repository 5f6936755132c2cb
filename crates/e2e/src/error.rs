//! Error types for the E2E harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Unknown fixture bundle: {0}")]
    UnknownBundle(String),

    #[error("Invalid fixture bundle '{bundle}': {reason}")]
    Config { bundle: String, reason: String },

    #[error("Missing configuration key: {0}")]
    MissingKey(String),

    #[error("Expected {expected}, observed {observed}")]
    AssertionFailed { expected: String, observed: String },

    #[error("No element matched any of: {}", candidates.join(", "))]
    ElementNotFound { candidates: Vec<String> },

    #[error("Invalid page state: cannot {action} while {state}")]
    InvalidState { action: String, state: String },

    #[error("Playwright not found. Install with: npm install playwright && npx playwright install")]
    DriverNotFound,

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Scenario error: {0}")]
    ScenarioParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl E2eError {
    pub(crate) fn assertion(expected: impl Into<String>, observed: impl Into<String>) -> Self {
        E2eError::AssertionFailed {
            expected: expected.into(),
            observed: observed.into(),
        }
    }

    /// Whether this error is an expected test outcome rather than a harness fault
    pub fn is_assertion(&self) -> bool {
        matches!(self, E2eError::AssertionFailed { .. })
    }

    /// Whether this error comes from test authoring (bad bundle or key)
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            E2eError::UnknownBundle(_) | E2eError::Config { .. } | E2eError::MissingKey(_)
        )
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
