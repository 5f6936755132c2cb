//! Fixture-backed configuration store
//!
//! Bundles live as `<fixtures>/<name>.json`. The main bundle
//! (`configuracoes_teste`) is deserialized into [`TestConfig`], whose schema
//! has no optional keys: a bundle that lacks any URL, selector, message,
//! timeout or filler value is rejected at load time instead of failing
//! halfway through a scenario.

use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::{Regex, RegexBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{E2eError, E2eResult};

/// Name of the bundle holding URLs, selectors, messages and timeouts
pub const DEFAULT_BUNDLE: &str = "configuracoes_teste";

/// Loads named fixture bundles from a directory
#[derive(Debug, Clone)]
pub struct FixtureStore {
    dir: PathBuf,
}

impl FixtureStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and validate a configuration bundle
    pub fn load(&self, bundle: &str) -> E2eResult<TestConfig> {
        let config: TestConfig = self.load_as(bundle)?;
        config.validate().map_err(|reason| E2eError::Config {
            bundle: bundle.to_string(),
            reason,
        })?;
        Ok(config)
    }

    /// Load any bundle into a typed value
    pub fn load_as<T: DeserializeOwned>(&self, bundle: &str) -> E2eResult<T> {
        let path = self.bundle_path(bundle)?;
        debug!("Loading fixture bundle {} from {}", bundle, path.display());

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(E2eError::UnknownBundle(bundle.to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        serde_json::from_str(&content).map_err(|e| E2eError::Config {
            bundle: bundle.to_string(),
            reason: e.to_string(),
        })
    }

    /// Load a list of user records (`usuarios_validos`, `usuarios_invalidos`)
    pub fn load_users(&self, bundle: &str) -> E2eResult<Vec<UserFixture>> {
        self.load_as(bundle)
    }

    /// Load the login credential sets (`credenciais_login`)
    pub fn load_credentials(&self, bundle: &str) -> E2eResult<LoginFixtures> {
        self.load_as(bundle)
    }

    fn bundle_path(&self, bundle: &str) -> E2eResult<PathBuf> {
        let valid = !bundle.is_empty()
            && bundle
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(E2eError::UnknownBundle(bundle.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", bundle)))
    }
}

/// The resolved configuration bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub urls: Urls,
    #[serde(rename = "seletores")]
    pub selectors: Selectors,
    #[serde(rename = "mensagens")]
    pub messages: Messages,
    pub timeouts: Timeouts,
    #[serde(rename = "dados")]
    pub data: FillerData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Urls {
    pub cadastro: String,
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Selectors {
    pub cadastro: RegistrationSelectors,
    pub login: LoginSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationSelectors {
    pub nome: Locator,
    pub email: Locator,
    pub senha: Locator,
    pub botao_cadastrar: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginSelectors {
    pub email: Locator,
    pub senha: Locator,
    pub botao_entrar: Locator,
    pub botao_sair: Locator,
    pub alerta: Locator,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Messages {
    pub sucesso: SuccessMessages,
    pub erro: ErrorMessages,
    /// Case-insensitive patterns used by the page objects to classify alerts
    pub padroes: RegionPatterns,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessMessages {
    pub cadastro: String,
    pub login: String,
    pub logout: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorMessages {
    pub nome_obrigatorio: String,
    pub email_obrigatorio: String,
    pub senha_obrigatoria: String,
    pub email_duplicado: String,
    pub senha_curta: String,
    pub nome_invalido: String,
    pub email_com_espacos: String,
    pub login_invalido: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionPatterns {
    pub erro_email: String,
    pub erro_senha: String,
    pub erro_generico: String,
    pub boas_vindas: String,
}

/// Timeouts in milliseconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timeouts {
    pub padrao: u64,
    pub curto: u64,
}

impl Timeouts {
    pub fn default_wait(&self) -> Duration {
        Duration::from_millis(self.padrao)
    }

    pub fn short_wait(&self) -> Duration {
        Duration::from_millis(self.curto)
    }
}

/// Values typed into the fields a command is not exercising
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillerData {
    pub nome: String,
    pub email: String,
    /// Default password policy value for registrations
    pub senha: String,
    /// Name used for the second registration of a duplicate-email check
    pub nome_duplicado: String,
}

/// An ordered list of candidate selectors; the first one present wins.
///
/// Accepts either a single selector string or a list in the fixture file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany", into = "Vec<String>")]
pub struct Locator {
    candidates: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Locator {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(s) => Locator { candidates: vec![s] },
            OneOrMany::Many(candidates) => Locator { candidates },
        }
    }
}

impl From<Locator> for Vec<String> {
    fn from(locator: Locator) -> Self {
        locator.candidates
    }
}

impl Locator {
    pub fn new<I, S>(candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            candidates: candidates.into_iter().map(Into::into).collect(),
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Highest-priority candidate
    pub fn primary(&self) -> &str {
        self.candidates.first().map(String::as_str).unwrap_or_default()
    }
}

impl TestConfig {
    /// Resolve a dotted message catalog key such as `erro.nome_obrigatorio`
    pub fn message(&self, key: &str) -> E2eResult<&str> {
        let m = &self.messages;
        let value = match key {
            "sucesso.cadastro" => &m.sucesso.cadastro,
            "sucesso.login" => &m.sucesso.login,
            "sucesso.logout" => &m.sucesso.logout,
            "erro.nome_obrigatorio" => &m.erro.nome_obrigatorio,
            "erro.email_obrigatorio" => &m.erro.email_obrigatorio,
            "erro.senha_obrigatoria" => &m.erro.senha_obrigatoria,
            "erro.email_duplicado" => &m.erro.email_duplicado,
            "erro.senha_curta" => &m.erro.senha_curta,
            "erro.nome_invalido" => &m.erro.nome_invalido,
            "erro.email_com_espacos" => &m.erro.email_com_espacos,
            "erro.login_invalido" => &m.erro.login_invalido,
            _ => return Err(E2eError::MissingKey(format!("mensagens.{}", key))),
        };
        Ok(value)
    }

    /// Check the invariants serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        let strings = [
            ("urls.cadastro", &self.urls.cadastro),
            ("urls.login", &self.urls.login),
            ("mensagens.sucesso.cadastro", &self.messages.sucesso.cadastro),
            ("mensagens.sucesso.login", &self.messages.sucesso.login),
            ("mensagens.sucesso.logout", &self.messages.sucesso.logout),
            ("mensagens.erro.nome_obrigatorio", &self.messages.erro.nome_obrigatorio),
            ("mensagens.erro.email_obrigatorio", &self.messages.erro.email_obrigatorio),
            ("mensagens.erro.senha_obrigatoria", &self.messages.erro.senha_obrigatoria),
            ("mensagens.erro.email_duplicado", &self.messages.erro.email_duplicado),
            ("mensagens.erro.senha_curta", &self.messages.erro.senha_curta),
            ("mensagens.erro.nome_invalido", &self.messages.erro.nome_invalido),
            ("mensagens.erro.email_com_espacos", &self.messages.erro.email_com_espacos),
            ("mensagens.erro.login_invalido", &self.messages.erro.login_invalido),
            ("dados.nome", &self.data.nome),
            ("dados.email", &self.data.email),
            ("dados.senha", &self.data.senha),
            ("dados.nome_duplicado", &self.data.nome_duplicado),
        ];
        for (key, value) in strings {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", key));
            }
        }

        let locators = [
            ("seletores.cadastro.nome", &self.selectors.cadastro.nome),
            ("seletores.cadastro.email", &self.selectors.cadastro.email),
            ("seletores.cadastro.senha", &self.selectors.cadastro.senha),
            ("seletores.cadastro.botao_cadastrar", &self.selectors.cadastro.botao_cadastrar),
            ("seletores.login.email", &self.selectors.login.email),
            ("seletores.login.senha", &self.selectors.login.senha),
            ("seletores.login.botao_entrar", &self.selectors.login.botao_entrar),
            ("seletores.login.botao_sair", &self.selectors.login.botao_sair),
            ("seletores.login.alerta", &self.selectors.login.alerta),
        ];
        for (key, locator) in locators {
            if locator.candidates.is_empty() || locator.candidates.iter().any(|c| c.trim().is_empty()) {
                return Err(format!("{} needs at least one non-empty selector", key));
            }
        }

        let patterns = [
            ("mensagens.padroes.erro_email", &self.messages.padroes.erro_email),
            ("mensagens.padroes.erro_senha", &self.messages.padroes.erro_senha),
            ("mensagens.padroes.erro_generico", &self.messages.padroes.erro_generico),
            ("mensagens.padroes.boas_vindas", &self.messages.padroes.boas_vindas),
        ];
        for (key, pattern) in patterns {
            build_pattern(pattern).map_err(|e| format!("{} is not a valid pattern: {}", key, e))?;
        }

        if self.timeouts.padrao == 0 || self.timeouts.curto == 0 {
            return Err("timeouts.padrao and timeouts.curto must be positive".to_string());
        }

        Ok(())
    }
}

fn build_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Compile a region pattern the way alerts are matched: case-insensitively.
/// `key` names the pattern under `mensagens.padroes` for error reports.
pub fn compile_pattern(key: &str, pattern: &str) -> E2eResult<Regex> {
    build_pattern(pattern).map_err(|e| E2eError::Config {
        bundle: format!("mensagens.padroes.{}", key),
        reason: e.to_string(),
    })
}

/// One user record from `usuarios_validos` / `usuarios_invalidos`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserFixture {
    pub nome: String,
    pub email: String,
    pub senha: String,
    #[serde(default)]
    pub descricao: String,
    /// Message the remote application is expected to show, for invalid records
    #[serde(default)]
    pub erro_esperado: Option<String>,
}

/// Credential sets used by the login scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginFixtures {
    pub usuarios_validos: Vec<UserFixture>,
    pub usuarios_invalidos: Vec<UserFixture>,
}
