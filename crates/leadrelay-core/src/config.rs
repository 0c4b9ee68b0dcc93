//! Relay configuration, built once at process start and passed into each component.
//!
//! Layers, lowest precedence first:
//!
//! | Layer | Example |
//! |-------|---------|
//! | built-in defaults | `backend.port = 5000` |
//! | legacy variables | `BACKEND_API`, `MCP_URL`, `GEMINI_API_KEY`, `OPENROUTER_API_KEY`, `GENERATION_URL`, `LEADS_DB_PATH` |
//! | TOML file | `$LEADRELAY_CONFIG`, default `config/leadrelay.toml` (optional) |
//! | environment | `LEADRELAY__MCP__BACKEND_URL`, `LEADRELAY__CORS__ALLOWED_ORIGINS=a,b` |

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/leadrelay";
const ENV_PREFIX: &str = "LEADRELAY";

/// Legacy variable names used by earlier deployments, mapped onto config keys.
const LEGACY_ENV: &[(&str, &str)] = &[
    ("mcp.backend_url", "BACKEND_API"),
    ("agent.mcp_url", "MCP_URL"),
    ("generation.api_key", "GEMINI_API_KEY"),
    ("generation.api_key", "OPENROUTER_API_KEY"),
    ("generation.url", "GENERATION_URL"),
    ("backend.storage_path", "LEADS_DB_PATH"),
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration: {0}")]
    Load(#[from] config::ConfigError),
    #[error("missing required setting `{key}` (env {env})")]
    Missing { key: &'static str, env: &'static str },
    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
    #[error("HTTP client setup: {0}")]
    HttpClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationProvider {
    Gemini,
    #[serde(alias = "open_router")]
    OpenRouter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub port: u16,
    pub storage_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct McpConfig {
    pub port: u16,
    #[serde(default)]
    pub backend_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub port: u16,
    #[serde(default)]
    pub mcp_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationConfig {
    pub provider: GenerationProvider,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the provider endpoint (Gemini API base or chat-completions URL).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub host: String,
    /// Timeout for every outbound HTTP call. 0 disables it.
    pub http_timeout_secs: u64,
    pub backend: BackendConfig,
    pub mcp: McpConfig,
    pub agent: AgentConfig,
    pub generation: GenerationConfig,
    #[serde(default)]
    pub cors: CorsConfig,
}

impl RelayConfig {
    /// Load from defaults, legacy variables, the config file, and `LEADRELAY__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("LEADRELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(&path, None, env_opt_string)
    }

    /// `env` replaces the process environment for the `LEADRELAY__*` layer when given;
    /// `legacy` resolves legacy variable names.
    pub fn load_from(
        path: &str,
        env: Option<HashMap<String, String>>,
        legacy: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder()
            .set_default("host", "127.0.0.1")?
            .set_default("http_timeout_secs", 30_i64)?
            .set_default("backend.port", 5000_i64)?
            .set_default("backend.storage_path", "./data/leads")?
            .set_default("mcp.port", 6000_i64)?
            .set_default("agent.port", 7000_i64)?
            .set_default("generation.provider", "gemini")?;

        let mut seen: Vec<&str> = Vec::new();
        for &(key, var) in LEGACY_ENV {
            if seen.contains(&key) {
                continue;
            }
            if let Some(value) = legacy(var) {
                builder = builder.set_default(key, value)?;
                seen.push(key);
            }
        }

        let built = builder
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("cors.allowed_origins")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?;

        Ok(built.try_deserialize()?)
    }

    pub fn http_timeout(&self) -> Option<Duration> {
        (self.http_timeout_secs > 0).then(|| Duration::from_secs(self.http_timeout_secs))
    }
}

impl McpConfig {
    /// Base URL of the backend CRUD service. Required to start MCP.
    pub fn backend_url(&self) -> Result<Url, ConfigError> {
        required_url(self.backend_url.as_deref(), "mcp.backend_url", "BACKEND_API")
    }
}

impl AgentConfig {
    /// Full URL of the MCP execute endpoint. Required to start the agent.
    pub fn mcp_url(&self) -> Result<Url, ConfigError> {
        required_url(self.mcp_url.as_deref(), "agent.mcp_url", "MCP_URL")
    }
}

impl GenerationConfig {
    pub fn api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(ConfigError::Missing {
                key: "generation.api_key",
                env: "GEMINI_API_KEY",
            })
    }
}

fn required_url(
    value: Option<&str>,
    key: &'static str,
    env: &'static str,
) -> Result<Url, ConfigError> {
    let raw = value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing { key, env })?;
    let url = Url::parse(raw).map_err(|e| ConfigError::Invalid {
        key,
        reason: format!("{} ({})", e, raw),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Invalid {
            key,
            reason: format!("unsupported scheme `{}`", url.scheme()),
        });
    }
    Ok(url)
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
