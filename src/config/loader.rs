// Configuration loader
//
// Layers, lowest precedence first: built-in defaults, ~/.wikiask/config.toml
// (or --config), .env, process environment. CLI flags are applied by the
// caller through `Config::apply_overrides`.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::{
    CONFIG_DIR, CONFIG_FILE, DEFAULT_BASE_URL, ENV_BASE_URL, ENV_GOOGLE_API_KEY, ENV_MODEL,
    ENV_OPENAI_API_KEY,
};
use super::provider::{ProviderConfig, ProviderKind};
use super::settings::{AgentConfig, Config};
use crate::tools::mcp::McpServerConfig;

/// On-disk layout of config.toml; every table is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct TomlConfig {
    #[serde(default)]
    provider: Option<ProviderConfig>,
    #[serde(default)]
    mcp_servers: Option<BTreeMap<String, McpServerConfig>>,
    #[serde(default)]
    agent: Option<AgentConfig>,
}

/// `~/.wikiask/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Load configuration from the config file, `.env` and the environment.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    // Never overrides variables that are already set
    match dotenvy::dotenv() {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Ignoring unreadable .env file: {}", e),
    }

    let file = match path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.exists()),
    };

    load_config_from(file.as_deref(), |key| std::env::var(key).ok())
}

/// Resolve configuration from an optional file and an environment lookup.
pub fn load_config_from<F>(file: Option<&Path>, env: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let toml_config = match file {
        Some(path) => read_config_file(path)?,
        None => TomlConfig::default(),
    };

    // Empty values count as unset
    let env = |key: &str| env(key).filter(|v| !v.trim().is_empty());

    let mut provider = match toml_config.provider {
        Some(mut provider) => {
            if provider.api_key.trim().is_empty() {
                provider.api_key = env(provider.kind.api_key_env()).unwrap_or_default();
            }
            provider
        }
        None => {
            if let Some(key) = env(ENV_OPENAI_API_KEY) {
                ProviderConfig::openai(key, DEFAULT_BASE_URL)
            } else if let Some(key) = env(ENV_GOOGLE_API_KEY) {
                ProviderConfig::gemini(key)
            } else {
                bail!(
                    "No model provider configured.\n\n\
                    Set one of these environment variables (or put them in .env):\n\
                    \x20 {}  key for an OpenAI-compatible server at {} (default {})\n\
                    \x20 {}  key for Google Gemini\n\n\
                    Or add a [provider] table to {}",
                    ENV_OPENAI_API_KEY,
                    ENV_BASE_URL,
                    DEFAULT_BASE_URL,
                    ENV_GOOGLE_API_KEY,
                    default_config_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| format!("~/{}/{}", CONFIG_DIR, CONFIG_FILE)),
                );
            }
        }
    };

    if provider.kind == ProviderKind::Openai {
        if let Some(base_url) = env(ENV_BASE_URL) {
            provider.base_url = Some(base_url);
        }
    }
    if let Some(model) = env(ENV_MODEL) {
        provider.model = Some(model);
    }

    let mut config = Config::new(provider);
    if let Some(servers) = toml_config.mcp_servers {
        config.mcp_servers = servers;
    }
    if let Some(agent) = toml_config.agent {
        config.agent = agent;
    }

    tracing::debug!("Resolved configuration: {:?}", config);

    Ok(config)
}

fn read_config_file(path: &Path) -> Result<TomlConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_openai_key_wins_over_google_key() {
        let config =
            load_config_from(None, env_of(&[("API_KEY", "a"), ("GOOGLE_API_KEY", "g")])).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Openai);
        assert_eq!(config.provider.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_google_key_selects_gemini() {
        let config = load_config_from(None, env_of(&[("GOOGLE_API_KEY", "g")])).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.model(), "gemini-2.0-flash");
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let config =
            load_config_from(None, env_of(&[("API_KEY", ""), ("GOOGLE_API_KEY", "g")])).unwrap();
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
    }

    #[test]
    fn test_no_keys_is_actionable_error() {
        let err = load_config_from(None, env_of(&[])).unwrap_err().to_string();
        assert!(err.contains("API_KEY"));
        assert!(err.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn test_env_base_url_and_model() {
        let config = load_config_from(
            None,
            env_of(&[
                ("API_KEY", "a"),
                ("BASE_URL", "http://vllm:8000"),
                ("WIKIASK_MODEL", "Qwen2.5-14B-Instruct"),
            ]),
        )
        .unwrap();
        assert_eq!(config.provider.base_url(), "http://vllm:8000");
        assert_eq!(config.provider.model(), "Qwen2.5-14B-Instruct");
    }
}
