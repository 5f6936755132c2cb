//! In-memory stand-in for the Seu Barriga application
//!
//! `FakeBarriga` holds the account registry shared by every browser it
//! creates, so accounts persist across scenarios like they do remotely.
//! `FakeBrowser` renders the two forms plus the home page and applies the
//! same validation the real site shows, including the browser's native
//! email checks (with the invisible marks Chrome adds to them).

#![allow(dead_code)]

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use barriga_e2e::config::{FixtureStore, TestConfig, Timeouts, DEFAULT_BUNDLE};
use barriga_e2e::{BrowserDriver, DriverFactory, E2eError, E2eResult};

pub const SITE: &str = "https://seubarriga.wcaquino.me";

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

pub fn scenarios_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("scenarios")
}

/// The shipped bundle with timeouts short enough for tests
pub fn test_config() -> TestConfig {
    let mut config = FixtureStore::new(fixtures_dir())
        .load(DEFAULT_BUNDLE)
        .expect("shipped bundle loads");
    config.timeouts = Timeouts { padrao: 500, curto: 50 };
    config
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default)]
struct Registry {
    accounts: Vec<Account>,
    hidden_selectors: HashSet<String>,
    split_alerts: bool,
    browsers_created: usize,
    browsers_closed: usize,
    screenshots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct FakeBarriga {
    registry: Arc<Mutex<Registry>>,
}

impl FakeBarriga {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account(self, name: &str, email: &str, password: &str) -> Self {
        self.registry.lock().unwrap().accounts.push(Account {
            name: name.into(),
            email: email.into(),
            password: password.into(),
        });
        self
    }

    /// Remove a selector from every page, to exercise locator fallbacks
    pub fn hide_selector(&self, selector: &str) {
        self.registry.lock().unwrap().hidden_selectors.insert(selector.to_string());
    }

    /// Render one `.alert` element per message instead of a single joined one
    pub fn split_alerts(&self) {
        self.registry.lock().unwrap().split_alerts = true;
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.registry.lock().unwrap().accounts.clone()
    }

    pub fn browsers_created(&self) -> usize {
        self.registry.lock().unwrap().browsers_created
    }

    pub fn browsers_closed(&self) -> usize {
        self.registry.lock().unwrap().browsers_closed
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.registry.lock().unwrap().screenshots.clone()
    }

    pub fn browser(&self) -> FakeBrowser {
        self.registry.lock().unwrap().browsers_created += 1;
        FakeBrowser {
            registry: Arc::clone(&self.registry),
            page: Page::Blank,
            name: String::new(),
            email: String::new(),
            password: String::new(),
            alert: None,
            actions: Vec::new(),
        }
    }
}

#[async_trait]
impl DriverFactory for FakeBarriga {
    type Driver = FakeBrowser;

    async fn create(&self) -> E2eResult<FakeBrowser> {
        Ok(self.browser())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Blank,
    Registration,
    Login,
    Home,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Email,
    Password,
}

pub struct FakeBrowser {
    registry: Arc<Mutex<Registry>>,
    page: Page,
    name: String,
    email: String,
    password: String,
    alert: Option<String>,
    /// Every primitive call, in order
    pub actions: Vec<String>,
}

const REGISTRATION_SUBMIT: &[&str] = &["input[value=\"Cadastrar\"]", "text=Cadastrar"];
const LOGIN_SUBMIT: &[&str] = &["button[type=submit]"];
const LOGOUT_LINK: &[&str] = &["a[href=\"/logout\"]", "text=Sair"];

impl FakeBrowser {
    pub fn page(&self) -> Page {
        self.page
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    fn split_alerts(&self) -> bool {
        self.registry.lock().unwrap().split_alerts
    }

    fn hidden(&self, selector: &str) -> bool {
        self.registry.lock().unwrap().hidden_selectors.contains(selector)
    }

    fn field(&self, selector: &str) -> Option<Field> {
        if self.hidden(selector) {
            return None;
        }
        match (self.page, selector) {
            (Page::Registration, "#nome" | "[name=nome]") => Some(Field::Name),
            (Page::Registration | Page::Login, "#email" | "[name=email]") => Some(Field::Email),
            (Page::Registration, "#senha" | "input[type=\"password\"]") => Some(Field::Password),
            (Page::Login, "#senha" | "[name=senha]") => Some(Field::Password),
            _ => None,
        }
    }

    fn is_present(&self, selector: &str) -> bool {
        if self.hidden(selector) {
            return false;
        }
        if selector == "body" {
            return self.page != Page::Blank;
        }
        if selector == ".alert" {
            return self.alert.is_some();
        }
        if self.field(selector).is_some() {
            return true;
        }
        match self.page {
            Page::Registration => REGISTRATION_SUBMIT.contains(&selector),
            Page::Login => LOGIN_SUBMIT.contains(&selector),
            Page::Home => LOGOUT_LINK.contains(&selector),
            Page::Blank => false,
        }
    }

    fn body_text(&self) -> String {
        let chrome = match self.page {
            Page::Blank => return String::new(),
            Page::Registration => "Seu Barriga\nNome\nEmail\nSenha\nCadastrar",
            Page::Login => "Seu Barriga\nLogin\nNovo usuário?\nEmail\nSenha\nEntrar",
            Page::Home => "Seu Barriga\nHome\nContas\nMovimentação\nResumo Mensal\nSair",
        };
        match &self.alert {
            Some(alert) => format!("{}\n{}", alert, chrome),
            None => chrome.to_string(),
        }
    }

    /// Browsers strip surrounding whitespace from email inputs
    fn sanitized_email(&self) -> String {
        self.email.trim().to_string()
    }

    /// What Chrome (pt-BR) reports for an `<input type=email>`
    fn native_email_message(&self) -> String {
        let value = self.sanitized_email();
        if value.is_empty() {
            return String::new();
        }
        let quoted = format!("\u{201C}\u{202A}{}\u{202C}\u{201D}", value);
        match value.find('@') {
            None => format!(
                "Inclua um \u{201C}@\u{201D} no endereço de e-mail. {} está com um \u{201C}@\u{201D} faltando.",
                quoted
            ),
            Some(0) => format!("Insira uma parte seguida por \u{201C}@\u{201D}. {} está incompleto.", quoted),
            Some(i) if i + 1 == value.len() => format!(
                "Insira um domínio de e-mail após \u{201C}@\u{201D}. {} está incompleto.",
                quoted
            ),
            Some(i) if value[i + 1..].contains('@') => {
                "A parte depois de \u{201C}@\u{201D} não deve conter o símbolo \u{201C}@\u{201D}.".to_string()
            }
            Some(_) => String::new(),
        }
    }

    fn submit_registration(&mut self) {
        let name = self.name.trim().to_string();
        let email = self.sanitized_email();
        let password = self.password.trim().to_string();

        let mut missing = Vec::new();
        if name.is_empty() {
            missing.push("Nome é um campo obrigatório");
        }
        if email.is_empty() {
            missing.push("Email é um campo obrigatório");
        }
        if password.is_empty() {
            missing.push("Senha é um campo obrigatório");
        }

        let mut registry = self.registry.lock().unwrap();
        let alert = if !missing.is_empty() {
            missing.join("\n")
        } else if !name.chars().all(|c| c.is_alphabetic() || c == ' ' || c == '-' || c == '\'') {
            "O nome deve conter apenas letras".to_string()
        } else if self.password.chars().count() < 6 {
            "A senha deve conter no mínimo 6 caracteres".to_string()
        } else if registry.accounts.iter().any(|a| a.email == email) {
            "Endereço de email já utilizado".to_string()
        } else {
            registry.accounts.push(Account {
                name,
                email,
                password: self.password.clone(),
            });
            "Usuário inserido com sucesso".to_string()
        };
        drop(registry);

        self.alert = Some(alert);
        self.name.clear();
        self.email.clear();
        self.password.clear();
    }

    fn submit_login(&mut self) {
        let email = self.sanitized_email();
        let password = self.password.clone();

        let mut missing = Vec::new();
        if email.is_empty() {
            missing.push("Email é um campo obrigatório");
        }
        if password.trim().is_empty() {
            missing.push("Senha é um campo obrigatório");
        }
        if !missing.is_empty() {
            self.alert = Some(missing.join("\n"));
            return;
        }

        let account = self
            .registry
            .lock()
            .unwrap()
            .accounts
            .iter()
            .find(|a| a.email == email && a.password == password)
            .cloned();

        match account {
            Some(account) => {
                self.page = Page::Home;
                self.alert = Some(format!("Bem vindo, {}!", account.name));
            }
            None => self.alert = Some("Problemas com o login do usuário".to_string()),
        }
        self.email.clear();
        self.password.clear();
    }
}

#[async_trait]
impl BrowserDriver for FakeBrowser {
    async fn goto(&mut self, url: &str) -> E2eResult<()> {
        self.actions.push(format!("goto {}", url));
        self.page = match url.strip_prefix(SITE) {
            Some("/cadastro") => Page::Registration,
            Some("/login") => Page::Login,
            _ => return Err(E2eError::Driver(format!("404 for {}", url))),
        };
        self.name.clear();
        self.email.clear();
        self.password.clear();
        self.alert = None;
        Ok(())
    }

    async fn fill(&mut self, selector: &str, value: &str) -> E2eResult<()> {
        self.actions.push(format!("fill {} {}", selector, value));
        match self.field(selector) {
            Some(Field::Name) => self.name = value.to_string(),
            Some(Field::Email) => self.email = value.to_string(),
            Some(Field::Password) => self.password = value.to_string(),
            None => return Err(E2eError::Driver(format!("no field {}", selector))),
        }
        Ok(())
    }

    async fn click(&mut self, selector: &str) -> E2eResult<()> {
        self.actions.push(format!("click {}", selector));
        if !self.is_present(selector) {
            return Err(E2eError::Driver(format!("nothing to click at {}", selector)));
        }
        match self.page {
            Page::Registration | Page::Login if !self.native_email_message().is_empty() => {
                // Native validation blocks the submission
            }
            Page::Registration => self.submit_registration(),
            Page::Login => self.submit_login(),
            Page::Home => {
                self.page = Page::Login;
                self.alert = None;
            }
            Page::Blank => {}
        }
        Ok(())
    }

    async fn count(&mut self, selector: &str) -> E2eResult<usize> {
        Ok(usize::from(self.is_present(selector)))
    }

    async fn inner_texts(&mut self, selector: &str) -> E2eResult<Vec<String>> {
        if !self.is_present(selector) {
            return Ok(Vec::new());
        }
        Ok(match (selector, &self.alert) {
            ("body", _) => vec![self.body_text()],
            (".alert", Some(alert)) if self.split_alerts() => alert.lines().map(String::from).collect(),
            (".alert", Some(alert)) => vec![alert.clone()],
            _ => vec![String::new()],
        })
    }

    async fn validation_message(&mut self, selector: &str) -> E2eResult<String> {
        self.actions.push(format!("validate {}", selector));
        match self.field(selector) {
            Some(Field::Email) => Ok(self.native_email_message()),
            Some(_) => Ok(String::new()),
            None => Err(E2eError::Driver(format!("no field {}", selector))),
        }
    }

    async fn current_url(&mut self) -> E2eResult<String> {
        Ok(match self.page {
            Page::Blank => "about:blank".to_string(),
            Page::Registration => format!("{}/cadastro", SITE),
            Page::Login => format!("{}/login", SITE),
            Page::Home => format!("{}/logar", SITE),
        })
    }

    async fn screenshot(&mut self, path: &Path) -> E2eResult<()> {
        self.registry.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn close(&mut self) -> E2eResult<()> {
        self.registry.lock().unwrap().browsers_closed += 1;
        Ok(())
    }
}
