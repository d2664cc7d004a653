use std::{fs, path::PathBuf, time::Duration};

use anyhow::Context;
use serde::Deserialize;
use server_api::{
    llm::{LlmConfig, ProviderEndpoint, DEEPSEEK_COMPLETIONS_URL, OPENAI_COMPLETIONS_URL},
    sources::{SourceEndpoint, SCOPUS_BASE_URL, SEMANTIC_SCHOLAR_BASE_URL},
};
use shared::domain::DEFAULT_MODEL;

pub const SETTINGS_FILE: &str = "server.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub server_bind: String,
    pub default_model: String,
    pub openai_api_key: Option<String>,
    pub openai_url: String,
    pub deepseek_api_key: Option<String>,
    pub deepseek_url: String,
    pub scopus_api_key: Option<String>,
    pub scopus_base_url: String,
    pub semantic_scholar_api_key: Option<String>,
    pub semantic_scholar_base_url: String,
    pub llm_timeout_secs: u64,
    pub source_timeout_secs: u64,
    pub static_dir: Option<PathBuf>,
    pub body_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:5000".into(),
            default_model: DEFAULT_MODEL.into(),
            openai_api_key: None,
            openai_url: OPENAI_COMPLETIONS_URL.into(),
            deepseek_api_key: None,
            deepseek_url: DEEPSEEK_COMPLETIONS_URL.into(),
            scopus_api_key: None,
            scopus_base_url: SCOPUS_BASE_URL.into(),
            semantic_scholar_api_key: None,
            semantic_scholar_base_url: SEMANTIC_SCHOLAR_BASE_URL.into(),
            llm_timeout_secs: 120,
            source_timeout_secs: 30,
            static_dir: None,
            body_limit_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Every key `server.toml` may carry. Absent keys keep their defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    bind_addr: Option<String>,
    default_model: Option<String>,
    openai_api_key: Option<String>,
    openai_url: Option<String>,
    deepseek_api_key: Option<String>,
    deepseek_url: Option<String>,
    scopus_api_key: Option<String>,
    scopus_base_url: Option<String>,
    semantic_scholar_api_key: Option<String>,
    semantic_scholar_base_url: Option<String>,
    llm_timeout_secs: Option<u64>,
    source_timeout_secs: Option<u64>,
    static_dir: Option<PathBuf>,
    body_limit_bytes: Option<usize>,
}

impl Settings {
    pub fn llm_config(&self) -> LlmConfig {
        LlmConfig {
            openai: ProviderEndpoint {
                url: self.openai_url.clone(),
                api_key: self.openai_api_key.clone(),
            },
            deepseek: ProviderEndpoint {
                url: self.deepseek_url.clone(),
                api_key: self.deepseek_api_key.clone(),
            },
            timeout: Duration::from_secs(self.llm_timeout_secs),
        }
    }

    pub fn scopus_endpoint(&self) -> SourceEndpoint {
        SourceEndpoint {
            base_url: self.scopus_base_url.clone(),
            api_key: self.scopus_api_key.clone(),
        }
    }

    pub fn semantic_scholar_endpoint(&self) -> SourceEndpoint {
        SourceEndpoint {
            base_url: self.semantic_scholar_base_url.clone(),
            api_key: self.semantic_scholar_api_key.clone(),
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    fn apply_file(&mut self, file: FileSettings) {
        set(&mut self.server_bind, file.bind_addr);
        set(&mut self.default_model, file.default_model);
        set_opt(&mut self.openai_api_key, file.openai_api_key);
        set(&mut self.openai_url, file.openai_url);
        set_opt(&mut self.deepseek_api_key, file.deepseek_api_key);
        set(&mut self.deepseek_url, file.deepseek_url);
        set_opt(&mut self.scopus_api_key, file.scopus_api_key);
        set(&mut self.scopus_base_url, file.scopus_base_url);
        set_opt(&mut self.semantic_scholar_api_key, file.semantic_scholar_api_key);
        set(&mut self.semantic_scholar_base_url, file.semantic_scholar_base_url);
        set(&mut self.llm_timeout_secs, file.llm_timeout_secs);
        set(&mut self.source_timeout_secs, file.source_timeout_secs);
        set_opt(&mut self.static_dir, file.static_dir);
        set(&mut self.body_limit_bytes, file.body_limit_bytes);
    }

    /// Conventional names first, then the `APP__` form, so the latter wins.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let var = |name: &str| var(name).filter(|value| !value.trim().is_empty());
        let pick = |plain: &str, app: &str| var(app).or_else(|| var(plain));

        set(&mut self.server_bind, pick("SERVER_BIND", "APP__BIND_ADDR"));
        set(&mut self.default_model, pick("DEFAULT_MODEL", "APP__DEFAULT_MODEL"));
        set_opt(&mut self.openai_api_key, pick("OPENAI_API_KEY", "APP__OPENAI_API_KEY"));
        set(&mut self.openai_url, var("APP__OPENAI_URL"));
        set_opt(
            &mut self.deepseek_api_key,
            pick("DEEPSEEK_API_KEY", "APP__DEEPSEEK_API_KEY"),
        );
        set(&mut self.deepseek_url, var("APP__DEEPSEEK_URL"));
        set_opt(&mut self.scopus_api_key, pick("SCOPUS_API_KEY", "APP__SCOPUS_API_KEY"));
        set(&mut self.scopus_base_url, var("APP__SCOPUS_BASE_URL"));
        set_opt(
            &mut self.semantic_scholar_api_key,
            pick("SEMANTIC_SCHOLAR_API_KEY", "APP__SEMANTIC_SCHOLAR_API_KEY"),
        );
        set(
            &mut self.semantic_scholar_base_url,
            var("APP__SEMANTIC_SCHOLAR_BASE_URL"),
        );
        set(
            &mut self.llm_timeout_secs,
            var("APP__LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()),
        );
        set(
            &mut self.source_timeout_secs,
            var("APP__SOURCE_TIMEOUT_SECS").and_then(|v| v.parse().ok()),
        );
        set_opt(
            &mut self.static_dir,
            pick("STATIC_DIR", "APP__STATIC_DIR").map(PathBuf::from),
        );
        set(
            &mut self.body_limit_bytes,
            var("APP__BODY_LIMIT_BYTES").and_then(|v| v.parse().ok()),
        );
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

fn parse_file_settings(raw: &str) -> anyhow::Result<FileSettings> {
    toml::from_str(raw).context("invalid server.toml")
}

/// Defaults, then `server.toml` when present, then the environment.
pub fn load_settings() -> anyhow::Result<Settings> {
    let raw = match fs::read_to_string(SETTINGS_FILE) {
        Ok(raw) => Some(raw),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e).with_context(|| format!("failed to read {SETTINGS_FILE}")),
    };
    resolve_settings(raw.as_deref(), |name| std::env::var(name).ok())
}

/// Resolves settings from explicit file contents and an environment lookup.
pub fn resolve_settings(
    file: Option<&str>,
    var: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();
    if let Some(raw) = file {
        settings.apply_file(parse_file_settings(raw)?);
    }
    settings.apply_env(var);
    Ok(settings)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
