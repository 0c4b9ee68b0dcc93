//! Lead relay launcher: `leadrelay-gateway <backend|mcp|agent|all>` (default `all`).

use leadrelay_core::RelayConfig;
use leadrelay_gateway::{http, run, Role};

#[tokio::main]
async fn main() {
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[leadrelay] no .env loaded ({})", e);
    }
    http::init_tracing();

    let role = match std::env::args()
        .nth(1)
        .unwrap_or_else(|| "all".to_string())
        .parse::<Role>()
    {
        Ok(role) => role,
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
    };

    let config = match RelayConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("leadrelay {} starting as {:?}", leadrelay_core::version(), role);
    if let Err(e) = run(role, config).await {
        tracing::error!("fatal: {}", e);
        std::process::exit(1);
    }
}
