//! Declarative YAML scenarios
//!
//! A file holds either one scenario or a suite of them sharing a start page:
//!
//! ```yaml
//! suite: login
//! start: login
//! scenarios:
//!   - name: login-blank-email
//!     steps:
//!       - action: fill
//!         form: login
//!         field: password
//!         value: "123456"
//!       - action: submit
//!         form: login
//!       - action: expect_alert
//!         contains: ["Email é um campo obrigatório"]
//! ```

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::commands::{generate_unique_email, LoginField, RegisteredUser, RegistrationField};
use crate::error::{E2eError, E2eResult};
use crate::session::Expectation;

/// One independent scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSpec {
    /// Unique name for this scenario
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering
    #[serde(default)]
    pub tags: Vec<String>,

    /// Set when the scenario pins remote behavior that is known to be wrong
    #[serde(default)]
    pub known_issue: Option<String>,

    /// Page opened before the first step
    #[serde(default)]
    pub start: StartPage,

    /// Steps to execute in order
    pub steps: Vec<ScenarioStep>,
}

/// A group of scenarios sharing defaults, like a `describe` block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteSpec {
    pub suite: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub start: StartPage,
    pub scenarios: Vec<ScenarioSpec>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPage {
    #[default]
    None,
    Registration,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Form {
    Registration,
    Login,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Name,
    Email,
    Password,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedOutcome {
    Success,
    FieldError,
    GenericError,
}

/// A single step in a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScenarioStep {
    /// Open the registration or login page
    Visit { page: Form },

    /// Type into a form field resolved from the bundle's selectors
    Fill { form: Form, field: FormField, value: String },

    /// Click the form's submit button
    Submit { form: Form },

    /// Click a raw selector
    Click { selector: String },

    /// Wait for a fixed amount of time (use sparingly)
    Pause { ms: u64 },

    /// Log a message
    Log { message: String },

    RegisterUser {
        name: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    RegisterInvalid { name: String, email: String, password: String },

    RequireField { field: RegistrationField },

    DuplicateEmail {
        name: String,
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    /// Log in; without credentials, logs in as the last registered user
    Login {
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        password: Option<String>,
    },

    LoginInvalid { email: String, password: String },

    RequireLoginField { field: LoginField },

    Logout,

    /// Register every user of a fixture bundle (`usuarios_validos`)
    RegisterFixtureUsers {
        bundle: String,
        #[serde(default)]
        unique_prefix: Option<String>,
    },

    /// Submit every record of an invalid-user bundle, asserting `erro_esperado` when set
    InvalidFixtureUsers { bundle: String },

    /// Required-field checks for the blank-field records of an invalid-user bundle
    RequiredFixtureFields { bundle: String },

    /// Register, log in and log out every valid set of a credentials bundle
    LoginFixtureUsers {
        bundle: String,
        #[serde(default)]
        unique_prefix: Option<String>,
    },

    /// Attempt every invalid set of a credentials bundle
    InvalidFixtureLogins { bundle: String },

    /// Assert literal text is visible
    ExpectText { text: String },

    /// Assert catalog messages (`erro.senha_curta`, ...) are visible together
    ExpectMessage { keys: Vec<String> },

    /// Assert the alert region contains every fragment
    ExpectAlert { contains: Vec<String> },

    /// Assert the browser's native validation message on a field
    ExpectValidation {
        form: Form,
        field: FormField,
        #[serde(default)]
        contains: Option<String>,
        #[serde(default)]
        equals: Option<String>,
    },

    /// Classify the login page's alert after a submission
    ExpectOutcome { outcome: ExpectedOutcome },

    ExpectUrl { contains: String },

    /// The page is still alive
    ExpectBody,
}

impl ScenarioStep {
    /// Short label used in logs and reports
    pub fn label(&self) -> String {
        match self {
            ScenarioStep::Visit { page } => format!("visit:{:?}", page),
            ScenarioStep::Fill { form, field, .. } => format!("fill:{:?}.{:?}", form, field),
            ScenarioStep::Submit { form } => format!("submit:{:?}", form),
            ScenarioStep::Click { selector } => format!("click:{}", selector),
            ScenarioStep::Pause { ms } => format!("pause:{}ms", ms),
            ScenarioStep::Log { message } => format!("log:{}", message.chars().take(30).collect::<String>()),
            ScenarioStep::RegisterUser { name, .. } => format!("register_user:{}", name),
            ScenarioStep::RegisterInvalid { .. } => "register_invalid".to_string(),
            ScenarioStep::RequireField { field } => format!("require_field:{:?}", field),
            ScenarioStep::DuplicateEmail { .. } => "duplicate_email".to_string(),
            ScenarioStep::Login { .. } => "login".to_string(),
            ScenarioStep::LoginInvalid { .. } => "login_invalid".to_string(),
            ScenarioStep::RequireLoginField { field } => format!("require_login_field:{:?}", field),
            ScenarioStep::Logout => "logout".to_string(),
            ScenarioStep::RegisterFixtureUsers { bundle, .. } => format!("register_fixture_users:{}", bundle),
            ScenarioStep::InvalidFixtureUsers { bundle } => format!("invalid_fixture_users:{}", bundle),
            ScenarioStep::RequiredFixtureFields { bundle } => format!("required_fixture_fields:{}", bundle),
            ScenarioStep::LoginFixtureUsers { bundle, .. } => format!("login_fixture_users:{}", bundle),
            ScenarioStep::InvalidFixtureLogins { bundle } => format!("invalid_fixture_logins:{}", bundle),
            ScenarioStep::ExpectText { text } => format!("expect_text:{}", text),
            ScenarioStep::ExpectMessage { keys } => format!("expect_message:{}", keys.join(",")),
            ScenarioStep::ExpectAlert { contains } => format!("expect_alert:{}", contains.join(",")),
            ScenarioStep::ExpectValidation { form, field, .. } => format!("expect_validation:{:?}.{:?}", form, field),
            ScenarioStep::ExpectOutcome { outcome } => format!("expect_outcome:{:?}", outcome),
            ScenarioStep::ExpectUrl { contains } => format!("expect_url:{}", contains),
            ScenarioStep::ExpectBody => "expect_body".to_string(),
        }
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            ScenarioStep::Fill { form: Form::Login, field: FormField::Name, .. }
            | ScenarioStep::ExpectValidation { form: Form::Login, field: FormField::Name, .. } => {
                Err("the login form has no name field".to_string())
            }
            ScenarioStep::ExpectValidation { contains, equals, .. } => match (contains, equals) {
                (Some(_), None) | (None, Some(_)) => Ok(()),
                _ => Err("expect_validation needs exactly one of `contains` or `equals`".to_string()),
            },
            ScenarioStep::ExpectMessage { keys } if keys.is_empty() => {
                Err("expect_message needs at least one key".to_string())
            }
            ScenarioStep::ExpectAlert { contains } if contains.is_empty() => {
                Err("expect_alert needs at least one fragment".to_string())
            }
            ScenarioStep::RegisterFixtureUsers { bundle, .. }
            | ScenarioStep::InvalidFixtureUsers { bundle }
            | ScenarioStep::RequiredFixtureFields { bundle }
            | ScenarioStep::LoginFixtureUsers { bundle, .. }
            | ScenarioStep::InvalidFixtureLogins { bundle }
                if bundle.trim().is_empty() =>
            {
                Err("fixture steps need a bundle name".to_string())
            }
            ScenarioStep::Login { email, password } if email.is_some() != password.is_some() => {
                Err("login needs both email and password, or neither".to_string())
            }
            _ => Ok(()),
        }
    }

    /// The expectation of an `expect_validation` step
    pub fn expectation(contains: &Option<String>, equals: &Option<String>) -> E2eResult<Expectation> {
        match (contains, equals) {
            (Some(c), None) => Ok(Expectation::Contains(c.clone())),
            (None, Some(e)) => Ok(Expectation::Equals(e.clone())),
            _ => Err(E2eError::ScenarioParse(
                "expect_validation needs exactly one of `contains` or `equals`".to_string(),
            )),
        }
    }
}

impl ScenarioSpec {
    /// Parse a file's worth of YAML: one scenario or a suite
    pub fn from_yaml(yaml: &str) -> E2eResult<Vec<Self>> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
        let specs = if value.get("scenarios").is_some() {
            let suite: SuiteSpec = serde_yaml::from_value(value)?;
            suite
                .scenarios
                .into_iter()
                .map(|mut spec| {
                    spec.name = format!("{}/{}", suite.suite, spec.name);
                    for tag in &suite.tags {
                        if !spec.tags.contains(tag) {
                            spec.tags.push(tag.clone());
                        }
                    }
                    if spec.start == StartPage::None {
                        spec.start = suite.start;
                    }
                    spec
                })
                .collect()
        } else {
            vec![serde_yaml::from_value(value)?]
        };

        for spec in &specs {
            spec.validate()?;
        }
        Ok(specs)
    }

    /// Parse scenarios from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Vec<Self>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
            .map_err(|e| E2eError::ScenarioParse(format!("{}: {}", path.display(), e)))
    }

    /// Load all scenarios from a directory, in path order
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut paths: Vec<_> = walkdir::WalkDir::new(dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .map(|e| e.into_path())
            .collect();
        paths.sort();

        let mut specs = Vec::new();
        for path in paths {
            specs.extend(Self::from_file(&path)?);
        }

        let mut seen = std::collections::HashSet::new();
        for spec in &specs {
            if !seen.insert(spec.name.as_str()) {
                return Err(E2eError::ScenarioParse(format!("duplicate scenario name: {}", spec.name)));
            }
        }
        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    fn validate(&self) -> E2eResult<()> {
        if self.steps.is_empty() {
            return Err(E2eError::ScenarioParse(format!("{}: no steps", self.name)));
        }
        for (i, step) in self.steps.iter().enumerate() {
            step.validate()
                .map_err(|e| E2eError::ScenarioParse(format!("{} step {}: {}", self.name, i + 1, e)))?;
        }
        Ok(())
    }
}

/// `{{key}}` or `{{key:arg}}`
static PLACEHOLDER: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r"\{\{\s*([a-z_.]+)(?::([^}]*))?\s*\}\}"));

/// Per-scenario values available to `{{...}}` placeholders
#[derive(Debug, Default)]
pub struct ScenarioVars {
    last_user: Option<RegisteredUser>,
}

impl ScenarioVars {
    pub fn set_user(&mut self, user: RegisteredUser) {
        self.last_user = Some(user);
    }

    pub fn last_user(&self) -> Option<&RegisteredUser> {
        self.last_user.as_ref()
    }

    /// Expand `{{unique:<prefix>}}` and `{{user.name|email|password}}`
    pub fn expand(&self, input: &str) -> E2eResult<String> {
        if !input.contains("{{") {
            return Ok(input.to_string());
        }

        let re = PLACEHOLDER
            .as_ref()
            .map_err(|e| E2eError::ScenarioParse(e.to_string()))?;

        let mut out = String::with_capacity(input.len());
        let mut last = 0;
        for caps in re.captures_iter(input) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&input[last..whole.start()]);
            let key = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let arg = caps.get(2).map(|m| m.as_str().trim());

            let value = match key {
                "unique" => generate_unique_email(arg.filter(|a| !a.is_empty()).unwrap_or("usuario")),
                "user.name" | "user.email" | "user.password" => {
                    let user = self.last_user.as_ref().ok_or_else(|| {
                        E2eError::ScenarioParse(format!("{} used before any user was registered", key))
                    })?;
                    match key {
                        "user.name" => user.name.clone(),
                        "user.email" => user.email.clone(),
                        _ => user.password.clone(),
                    }
                }
                other => {
                    return Err(E2eError::ScenarioParse(format!("unknown placeholder: {}", other)));
                }
            };
            out.push_str(&value);
            last = whole.end();
        }
        out.push_str(&input[last..]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_scenario() {
        let yaml = r#"
name: seed-flow
description: Register, log in, log out
tags: [smoke]
steps:
  - action: register_user
    name: Maria Teste
    password: "123456"
  - action: login
  - action: logout
"#;
        let specs = ScenarioSpec::from_yaml(yaml).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "seed-flow");
        assert_eq!(specs[0].start, StartPage::None);
        assert!(matches!(specs[0].steps[1], ScenarioStep::Login { email: None, password: None }));
    }

    #[test]
    fn test_suite_prefixes_names_and_inherits_defaults() {
        let yaml = r#"
suite: login
tags: [login]
start: login
scenarios:
  - name: blank-email
    steps:
      - action: require_login_field
        field: email
  - name: from-registration
    start: registration
    tags: [extra]
    steps:
      - action: expect_body
"#;
        let specs = ScenarioSpec::from_yaml(yaml).unwrap();
        assert_eq!(specs[0].name, "login/blank-email");
        assert_eq!(specs[0].start, StartPage::Login);
        assert_eq!(specs[1].start, StartPage::Registration);
        assert_eq!(specs[1].tags, vec!["extra".to_string(), "login".to_string()]);
    }

    #[test]
    fn test_rejects_invalid_steps() {
        let yaml = r#"
name: bad
steps:
  - action: fill
    form: login
    field: name
    value: x
"#;
        assert!(matches!(ScenarioSpec::from_yaml(yaml), Err(E2eError::ScenarioParse(_))));

        let yaml = r#"
name: bad-validation
steps:
  - action: expect_validation
    form: login
    field: email
"#;
        assert!(ScenarioSpec::from_yaml(yaml).is_err());

        let yaml = "name: empty\nsteps: []\n";
        assert!(ScenarioSpec::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_placeholder_pattern_is_shared() {
        assert!(PLACEHOLDER.as_ref().is_ok());

        let vars = ScenarioVars::default();
        let first = vars.expand("{{unique:repetido}}").unwrap();
        let second = vars.expand("{{ unique:repetido }}").unwrap();
        assert_ne!(first, second);
        assert_eq!(vars.expand("sem marcadores").unwrap(), "sem marcadores");
    }

    #[test]
    fn test_expand_placeholders() {
        let mut vars = ScenarioVars::default();
        let email = vars.expand(" {{unique:espacos}} ").unwrap();
        assert!(email.starts_with(" espacos_"));
        assert!(email.ends_with("@teste.com "));

        assert!(vars.expand("{{user.email}}").is_err());
        vars.set_user(RegisteredUser {
            name: "Maria Teste".into(),
            email: "maria@teste.com".into(),
            password: "123456".into(),
        });
        assert_eq!(vars.expand("{{user.name}} <{{ user.email }}>").unwrap(), "Maria Teste <maria@teste.com>");
        assert!(vars.expand("{{nope}}").is_err());
        assert_eq!(vars.expand("plain").unwrap(), "plain");
    }
}
