//! Command library
//!
//! Reusable scenario steps for the registration and login flows. Each
//! command takes the session explicitly, reads URLs, selectors, messages and
//! filler values from the session's bundle, and ends in one asserted state.
//! No command carries a literal message string of its own.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::UserFixture;
use crate::driver::BrowserDriver;
use crate::error::E2eResult;
use crate::pages::LoginPage;
use crate::session::Session;

/// Prefix used when `register_user` has to invent an email
pub const DEFAULT_EMAIL_PREFIX: &str = "usuario";

const UNIQUE_EMAIL_DOMAIN: &str = "teste.com";

static UNIQUE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Credentials submitted by a successful registration, for chaining into login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Registration field left blank by [`require_field`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationField {
    Name,
    Email,
    Password,
    All,
}

/// Login field left blank by [`require_field_login`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginField {
    Email,
    Password,
    Both,
}

/// `<prefix>_<unix millis>_<sequence>@teste.com`, distinct for every call in a run
pub fn generate_unique_email(prefix: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = UNIQUE_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("{}_{}_{}@{}", prefix, millis, seq, UNIQUE_EMAIL_DOMAIN)
}

async fn submit_registration<D: BrowserDriver>(
    session: &mut Session<D>,
    name: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> E2eResult<()> {
    let selectors = session.config().selectors.cadastro.clone();
    session.visit_registration().await?;
    if let Some(name) = name {
        session.fill(&selectors.nome, name).await?;
    }
    if let Some(email) = email {
        session.fill(&selectors.email, email).await?;
    }
    if let Some(password) = password {
        session.fill(&selectors.senha, password).await?;
    }
    session.click(&selectors.botao_cadastrar).await
}

/// Register a user and assert the success banner.
///
/// Without an email a unique one is generated; without a password the
/// bundle's default password policy value is used.
pub async fn register_user<D: BrowserDriver>(
    session: &mut Session<D>,
    name: &str,
    email: Option<&str>,
    password: Option<&str>,
) -> E2eResult<RegisteredUser> {
    let email = email
        .map(String::from)
        .unwrap_or_else(|| generate_unique_email(DEFAULT_EMAIL_PREFIX));
    let password = password
        .map(String::from)
        .unwrap_or_else(|| session.config().data.senha.clone());

    submit_registration(session, Some(name), Some(&email), Some(&password)).await?;
    let success = session.config().messages.sucesso.cadastro.clone();
    session.expect_text(&success).await?;

    info!("Registered {} <{}>", name, email);
    Ok(RegisteredUser {
        name: name.to_string(),
        email,
        password,
    })
}

/// Submit the registration form with arbitrary values and only check the
/// page is still alive; the caller verifies any message
pub async fn register_invalid_user<D: BrowserDriver>(
    session: &mut Session<D>,
    name: &str,
    email: &str,
    password: &str,
) -> E2eResult<()> {
    submit_registration(session, Some(name), Some(email), Some(password)).await?;
    let settle = session.config().timeouts.short_wait();
    session.pause(settle).await;
    session.expect_body_present().await
}

/// Leave one registration field (or all of them) blank and assert the
/// matching required-field message(s)
pub async fn require_field<D: BrowserDriver>(
    session: &mut Session<D>,
    field: RegistrationField,
) -> E2eResult<()> {
    let data = session.config().data.clone();
    let errors = session.config().messages.erro.clone();
    debug!("require_field {:?}", field);

    let (name, email, password, expected): (_, _, _, Vec<&str>) = match field {
        RegistrationField::Name => (
            None,
            Some(data.email.as_str()),
            Some(data.senha.as_str()),
            vec![errors.nome_obrigatorio.as_str()],
        ),
        RegistrationField::Email => (
            Some(data.nome.as_str()),
            None,
            Some(data.senha.as_str()),
            vec![errors.email_obrigatorio.as_str()],
        ),
        RegistrationField::Password => (
            Some(data.nome.as_str()),
            Some(data.email.as_str()),
            None,
            vec![errors.senha_obrigatoria.as_str()],
        ),
        RegistrationField::All => (
            None,
            None,
            None,
            vec![
                errors.nome_obrigatorio.as_str(),
                errors.email_obrigatorio.as_str(),
                errors.senha_obrigatoria.as_str(),
            ],
        ),
    };

    submit_registration(session, name, email, password).await?;
    session.expect_texts(&expected).await
}

/// Register once (must succeed), then register again with the same email
/// under another name and assert the duplicate-email message
pub async fn duplicate_email_check<D: BrowserDriver>(
    session: &mut Session<D>,
    name: &str,
    email: &str,
    password: Option<&str>,
) -> E2eResult<()> {
    let first = register_user(session, name, Some(email), password).await?;

    let copy_name = session.config().data.nome_duplicado.clone();
    submit_registration(session, Some(&copy_name), Some(&first.email), Some(&first.password)).await?;

    let duplicated = session.config().messages.erro.email_duplicado.clone();
    session.expect_text(&duplicated).await
}

/// Log in and assert the welcome banner
pub async fn login<D: BrowserDriver>(session: &mut Session<D>, email: &str, password: &str) -> E2eResult<()> {
    let mut page = LoginPage::new(session.config())?;
    page.visit(session).await?;
    page.fill_email(session, email).await?;
    page.fill_password(session, password).await?;
    page.submit(session).await?;

    let welcome = session.config().messages.sucesso.login.clone();
    session.expect_text(&welcome).await?;
    info!("Logged in as {}", email);
    Ok(())
}

/// Log in as a freshly registered user and assert the personalised banner
pub async fn login_as<D: BrowserDriver>(session: &mut Session<D>, user: &RegisteredUser) -> E2eResult<()> {
    login(session, &user.email, &user.password).await?;
    let banner = format!("{}, {}!", session.config().messages.sucesso.login, user.name);
    session.expect_alert(&[&banner]).await
}

/// Submit the login form and only check the page is still alive
pub async fn login_invalid<D: BrowserDriver>(
    session: &mut Session<D>,
    email: &str,
    password: &str,
) -> E2eResult<()> {
    let mut page = LoginPage::new(session.config())?;
    page.visit(session).await?;
    page.fill_email(session, email).await?;
    page.fill_password(session, password).await?;
    page.submit(session).await?;

    let settle = session.config().timeouts.short_wait();
    session.pause(settle).await;
    session.expect_body_present().await
}

/// Leave one login field (or both) blank and assert the required-field message(s)
pub async fn require_field_login<D: BrowserDriver>(session: &mut Session<D>, field: LoginField) -> E2eResult<()> {
    let data = session.config().data.clone();
    let errors = session.config().messages.erro.clone();
    debug!("require_field_login {:?}", field);

    let mut page = LoginPage::new(session.config())?;
    page.visit(session).await?;
    let expected = match field {
        LoginField::Email => {
            page.fill_password(session, &data.senha).await?;
            vec![errors.email_obrigatorio.as_str()]
        }
        LoginField::Password => {
            page.fill_email(session, &data.email).await?;
            vec![errors.senha_obrigatoria.as_str()]
        }
        LoginField::Both => vec![
            errors.email_obrigatorio.as_str(),
            errors.senha_obrigatoria.as_str(),
        ],
    };
    page.submit(session).await?;

    session.expect_alert(&expected).await
}

/// Click the logout link and assert the login page is back
pub async fn logout<D: BrowserDriver>(session: &mut Session<D>) -> E2eResult<()> {
    let exit = session.config().selectors.login.botao_sair.clone();
    session.click(&exit).await?;

    let login_marker = session.config().messages.sucesso.logout.clone();
    session.expect_text(&login_marker).await?;
    let email_field = session.config().selectors.login.email.clone();
    session.resolve(&email_field).await.map(drop)
}

/// Register every fixture user and assert each success banner.
///
/// With `unique_prefix` each user gets a fresh `<prefix>_<index>` email instead
/// of the one stored in the fixture, so the run can be repeated.
pub async fn register_fixture_users<D: BrowserDriver>(
    session: &mut Session<D>,
    users: &[UserFixture],
    unique_prefix: Option<&str>,
) -> E2eResult<Vec<RegisteredUser>> {
    let mut registered = Vec::with_capacity(users.len());
    for (index, user) in users.iter().enumerate() {
        info!("Fixture user {}: {}", index + 1, user.descricao);
        let email = match unique_prefix {
            Some(prefix) => generate_unique_email(&format!("{}_{}", prefix, index)),
            None => user.email.clone(),
        };
        registered.push(register_user(session, &user.nome, Some(&email), Some(&user.senha)).await?);
    }
    Ok(registered)
}

/// Submit every invalid record; records carrying `erro_esperado` must show it
pub async fn register_invalid_fixture_users<D: BrowserDriver>(
    session: &mut Session<D>,
    users: &[UserFixture],
) -> E2eResult<()> {
    for (index, user) in users.iter().enumerate() {
        info!("Invalid fixture {}: {}", index + 1, user.descricao);
        register_invalid_user(session, &user.nome, &user.email, &user.senha).await?;
        if let Some(expected) = &user.erro_esperado {
            session.expect_text(expected).await?;
        }
    }
    Ok(())
}

/// Run [`require_field`] for every record whose expected message is one of the
/// bundle's required-field messages, on the field that record leaves blank.
/// Returns how many checks ran.
pub async fn require_fixture_fields<D: BrowserDriver>(
    session: &mut Session<D>,
    users: &[UserFixture],
) -> E2eResult<usize> {
    let errors = session.config().messages.erro.clone();
    let required = [errors.nome_obrigatorio, errors.email_obrigatorio, errors.senha_obrigatoria];

    let mut checked = 0;
    for user in users {
        let Some(expected) = &user.erro_esperado else { continue };
        if !required.contains(expected) {
            continue;
        }
        let field = if user.nome.is_empty() {
            RegistrationField::Name
        } else if user.email.is_empty() {
            RegistrationField::Email
        } else if user.senha.is_empty() {
            RegistrationField::Password
        } else {
            continue;
        };
        debug!("{} -> {:?}", user.descricao, field);
        require_field(session, field).await?;
        checked += 1;
    }
    Ok(checked)
}

/// Register every credential set under a fresh email, then log in and out with it
pub async fn login_fixture_users<D: BrowserDriver>(
    session: &mut Session<D>,
    users: &[UserFixture],
    unique_prefix: &str,
) -> E2eResult<Vec<RegisteredUser>> {
    let registered = register_fixture_users(session, users, Some(unique_prefix)).await?;
    for user in &registered {
        login(session, &user.email, &user.password).await?;
        logout(session).await?;
    }
    Ok(registered)
}

/// Attempt every invalid credential set; records carrying `erro_esperado` must
/// show it in the alert
pub async fn login_invalid_fixture_users<D: BrowserDriver>(
    session: &mut Session<D>,
    users: &[UserFixture],
) -> E2eResult<()> {
    for user in users {
        info!("Invalid login: {}", user.descricao);
        login_invalid(session, &user.email, &user.senha).await?;
        if let Some(expected) = &user.erro_esperado {
            session.expect_alert(&[expected.as_str()]).await?;
        }
    }
    Ok(())
}

/// The remote application exposes no cleanup endpoint; accounts created by a
/// run stay behind and unique emails keep reruns independent
pub fn clear_test_data() {
    info!("No remote cleanup available; test accounts are left in place");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn unique_emails_never_repeat_within_a_run() {
        let emails: HashSet<String> = (0..1000).map(|_| generate_unique_email("dup")).collect();
        assert_eq!(emails.len(), 1000);
    }

    #[test]
    fn unique_email_keeps_prefix_and_domain() {
        let email = generate_unique_email("sucesso");
        assert!(email.starts_with("sucesso_"));
        assert!(email.ends_with("@teste.com"));
    }

    #[test]
    fn fields_deserialize_from_snake_case() {
        let f: RegistrationField = serde_yaml::from_str("password").unwrap();
        assert_eq!(f, RegistrationField::Password);
        let f: LoginField = serde_yaml::from_str("both").unwrap();
        assert_eq!(f, LoginField::Both);
    }
}
