//! Fixture bundle loading and validation

mod support;

use barriga_e2e::config::{FixtureStore, DEFAULT_BUNDLE};
use barriga_e2e::E2eError;
use serde_json::Value;
use tempfile::TempDir;

fn shipped_bundle() -> Value {
    let raw = std::fs::read_to_string(support::fixtures_dir().join("configuracoes_teste.json")).unwrap();
    serde_json::from_str(&raw).unwrap()
}

/// Write a modified copy of the shipped bundle and try to load it
fn load_modified(edit: impl FnOnce(&mut Value)) -> Result<(), E2eError> {
    let dir = TempDir::new().unwrap();
    let mut bundle = shipped_bundle();
    edit(&mut bundle);
    std::fs::write(
        dir.path().join("configuracoes_teste.json"),
        serde_json::to_string(&bundle).unwrap(),
    )
    .unwrap();
    FixtureStore::new(dir.path()).load(DEFAULT_BUNDLE).map(drop)
}

fn reason(err: E2eError) -> String {
    match err {
        E2eError::Config { bundle, reason } => {
            assert_eq!(bundle, DEFAULT_BUNDLE);
            reason
        }
        other => panic!("expected a config error, got {:?}", other),
    }
}

#[test]
fn shipped_bundle_loads() {
    let config = FixtureStore::new(support::fixtures_dir()).load(DEFAULT_BUNDLE).unwrap();

    assert!(config.urls.cadastro.ends_with("/cadastro"));
    assert!(config.urls.login.ends_with("/login"));
    assert_eq!(config.selectors.login.alerta.candidates(), [".alert"]);
    assert_eq!(config.selectors.cadastro.nome.primary(), "[data-test=cadastro-nome]");
    assert_eq!(config.timeouts.padrao, 10_000);
    assert_eq!(config.data.nome_duplicado, "Usuário Cópia");
}

#[test]
fn messages_resolve_by_dotted_key() {
    let config = support::test_config();

    assert_eq!(config.message("sucesso.cadastro").unwrap(), "Usuário inserido com sucesso");
    assert_eq!(
        config.message("erro.senha_curta").unwrap(),
        "A senha deve conter no mínimo 6 caracteres"
    );

    let err = config.message("erro.inexistente").unwrap_err();
    assert!(matches!(err, E2eError::MissingKey(ref key) if key == "mensagens.erro.inexistente"));
    assert!(err.is_config());
}

#[test]
fn unknown_bundle_is_reported_by_name() {
    let err = FixtureStore::new(support::fixtures_dir()).load("nao_existe").unwrap_err();
    assert!(matches!(err, E2eError::UnknownBundle(ref name) if name == "nao_existe"));
}

#[test]
fn missing_message_key_is_rejected_at_load() {
    let err = load_modified(|b| {
        b["mensagens"]["erro"].as_object_mut().unwrap().remove("senha_curta");
    })
    .unwrap_err();
    assert!(reason(err).contains("senha_curta"));
}

#[test]
fn missing_url_is_rejected_at_load() {
    let err = load_modified(|b| {
        b["urls"].as_object_mut().unwrap().remove("login");
    })
    .unwrap_err();
    assert!(reason(err).contains("login"));
}

#[test]
fn empty_selector_list_is_rejected() {
    let err = load_modified(|b| b["seletores"]["login"]["email"] = Value::Array(vec![])).unwrap_err();
    assert_eq!(reason(err), "seletores.login.email needs at least one non-empty selector");
}

#[test]
fn blank_message_is_rejected() {
    let err = load_modified(|b| b["mensagens"]["sucesso"]["login"] = Value::from("  ")).unwrap_err();
    assert_eq!(reason(err), "mensagens.sucesso.login must not be empty");
}

#[test]
fn invalid_region_pattern_is_rejected() {
    let err = load_modified(|b| b["mensagens"]["padroes"]["boas_vindas"] = Value::from("bem (vindo")).unwrap_err();
    assert!(reason(err).starts_with("mensagens.padroes.boas_vindas is not a valid pattern"));
}

#[test]
fn zero_timeout_is_rejected() {
    let err = load_modified(|b| b["timeouts"]["curto"] = Value::from(0)).unwrap_err();
    assert!(reason(err).contains("must be positive"));
}

#[test]
fn user_fixtures_load() {
    let store = FixtureStore::new(support::fixtures_dir());

    let valid = store.load_users("usuarios_validos").unwrap();
    assert!(valid.iter().all(|u| u.erro_esperado.is_none() && u.senha.len() >= 6));

    let invalid = store.load_users("usuarios_invalidos").unwrap();
    assert!(invalid.iter().all(|u| u.erro_esperado.is_some()));

    let credentials = store.load_credentials("credenciais_login").unwrap();
    assert_eq!(credentials.usuarios_validos[0].nome, "Maria Teste");
    assert!(!credentials.usuarios_invalidos.is_empty());
}
