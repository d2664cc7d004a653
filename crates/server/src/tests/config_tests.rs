use super::*;
use std::collections::HashMap;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |name: &str| vars.get(name).cloned()
}

#[test]
fn defaults_apply_without_file_or_env() {
    let settings = resolve_settings(None, env(&[])).expect("settings");
    assert_eq!(settings, Settings::default());
    assert_eq!(settings.server_bind, "127.0.0.1:5000");
    assert_eq!(settings.default_model, "gpt-3.5-turbo");
    assert!(settings.openai_api_key.is_none());
}

#[test]
fn file_values_override_defaults() {
    let file = r#"
        bind_addr = "0.0.0.0:8080"
        default_model = "deepseek-chat"
        scopus_api_key = "file-scopus"
        llm_timeout_secs = 45
        static_dir = "./frontend/dist"
    "#;
    let settings = resolve_settings(Some(file), env(&[])).expect("settings");
    assert_eq!(settings.server_bind, "0.0.0.0:8080");
    assert_eq!(settings.default_model, "deepseek-chat");
    assert_eq!(settings.scopus_api_key.as_deref(), Some("file-scopus"));
    assert_eq!(settings.llm_config().timeout, Duration::from_secs(45));
    assert_eq!(settings.static_dir, Some(PathBuf::from("./frontend/dist")));
}

#[test]
fn env_overrides_file_and_app_prefix_wins() {
    let file = r#"
        bind_addr = "0.0.0.0:8080"
        openai_api_key = "file-key"
    "#;
    let settings = resolve_settings(
        Some(file),
        env(&[
            ("SERVER_BIND", "127.0.0.1:9000"),
            ("APP__BIND_ADDR", "127.0.0.1:9001"),
            ("OPENAI_API_KEY", "env-key"),
            ("SEMANTIC_SCHOLAR_API_KEY", "s2"),
            ("APP__BODY_LIMIT_BYTES", "1024"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.server_bind, "127.0.0.1:9001");
    assert_eq!(settings.openai_api_key.as_deref(), Some("env-key"));
    assert_eq!(
        settings.semantic_scholar_endpoint().api_key.as_deref(),
        Some("s2")
    );
    assert_eq!(settings.body_limit_bytes, 1024);
}

#[test]
fn blank_or_unparseable_env_values_are_ignored() {
    let settings = resolve_settings(
        Some("deepseek_api_key = \"file-key\""),
        env(&[
            ("DEEPSEEK_API_KEY", "  "),
            ("APP__LLM_TIMEOUT_SECS", "soon"),
        ]),
    )
    .expect("settings");
    assert_eq!(settings.deepseek_api_key.as_deref(), Some("file-key"));
    assert_eq!(settings.llm_timeout_secs, 120);
}

#[test]
fn unknown_file_keys_are_rejected() {
    let err = resolve_settings(Some("database_url = \"sqlite://x\""), env(&[]))
        .expect_err("should fail");
    assert!(err.to_string().contains("invalid server.toml"));
}

#[test]
fn endpoints_carry_urls_and_keys() {
    let settings = resolve_settings(
        None,
        env(&[
            ("APP__SCOPUS_BASE_URL", "http://127.0.0.1:9/proxy"),
            ("SCOPUS_API_KEY", "k"),
        ]),
    )
    .expect("settings");
    let scopus = settings.scopus_endpoint();
    assert_eq!(scopus.base_url, "http://127.0.0.1:9/proxy");
    assert_eq!(scopus.api_key.as_deref(), Some("k"));
    assert_eq!(
        settings.llm_config().openai.url,
        "https://api.openai.com/v1/chat/completions"
    );
}
