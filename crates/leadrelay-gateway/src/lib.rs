//! Lead relay HTTP services. Each tier is an axum [`Router`](axum::Router) built from its core
//! component; [`run`] starts one tier or all three from a loaded [`RelayConfig`].

pub mod agent;
pub mod backend;
pub mod http;
pub mod mcp;

use std::str::FromStr;
use std::sync::Arc;

use leadrelay_core::{
    client_from_config, Agent, CommandRouter, ConfigError, LeadService, LeadStore, McpClient,
    RelayConfig, StoreError,
};
use tokio::net::TcpListener;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("listener: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP client: {0}")]
    Client(#[from] reqwest::Error),
    #[error("unknown role `{0}` (expected backend, mcp, agent, or all)")]
    UnknownRole(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Backend,
    Mcp,
    Agent,
    All,
}

impl FromStr for Role {
    type Err = StartupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "backend" => Ok(Role::Backend),
            "mcp" => Ok(Role::Mcp),
            "agent" => Ok(Role::Agent),
            "all" => Ok(Role::All),
            _ => Err(StartupError::UnknownRole(s.to_string())),
        }
    }
}

/// In `all` mode the tiers find each other on the configured host unless URLs are set.
fn wire_local(config: &mut RelayConfig) {
    if config.mcp.backend_url.is_none() {
        config.mcp.backend_url = Some(format!("http://{}:{}", config.host, config.backend.port));
    }
    if config.agent.mcp_url.is_none() {
        config.agent.mcp_url = Some(format!("http://{}:{}/execute", config.host, config.mcp.port));
    }
}

async fn bind(config: &RelayConfig, port: u16) -> Result<TcpListener, StartupError> {
    Ok(TcpListener::bind((config.host.as_str(), port)).await?)
}

/// Build every requested tier (failing fast on bad configuration), then serve until one stops.
pub async fn run(role: Role, mut config: RelayConfig) -> Result<(), StartupError> {
    if role == Role::All {
        wire_local(&mut config);
    }
    let timeout = config.http_timeout();
    let mut servers = tokio::task::JoinSet::new();

    if matches!(role, Role::Backend | Role::All) {
        let store = LeadStore::open(Some(&config.backend.storage_path))?;
        tracing::info!(
            "[backend] lead store at {} ({} leads)",
            config.backend.storage_path,
            store.len()
        );
        let app = http::finish(backend::router(store), &config.cors);
        let listener = bind(&config, config.backend.port).await?;
        servers.spawn(http::serve("backend", listener, app));
    }

    if matches!(role, Role::Mcp | Role::All) {
        let service = LeadService::new(config.mcp.backend_url()?, timeout)?;
        tracing::info!("[mcp] backend at {}", service.base_url());
        let app = http::finish(mcp::router(CommandRouter::new(Arc::new(service))), &config.cors);
        let listener = bind(&config, config.mcp.port).await?;
        servers.spawn(http::serve("mcp", listener, app));
    }

    if matches!(role, Role::Agent | Role::All) {
        let generator = client_from_config(&config.generation, timeout)?;
        let mcp_url = config.agent.mcp_url()?;
        tracing::info!("[agent] MCP at {}", mcp_url);
        let agent = Agent::new(generator, McpClient::new(mcp_url, timeout)?);
        let app = http::finish(agent::router(agent), &config.cors);
        let listener = bind(&config, config.agent.port).await?;
        servers.spawn(http::serve("agent", listener, app));
    }

    while let Some(joined) = servers.join_next().await {
        match joined {
            Ok(result) => result?,
            Err(e) => tracing::error!("server task ended abnormally: {}", e),
        }
    }
    Ok(())
}
