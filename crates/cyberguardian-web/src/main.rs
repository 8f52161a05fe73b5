//! CyberGuardian Pro dashboard backend.
//!
//! # Usage
//!
//! ```bash
//! OPENROUTER_KEY=sk-... CYBERGUARDIAN_JWT_SECRET=... cargo run -p cyberguardian-web
//! OPENROUTER_KEY=sk-... cargo run -p cyberguardian-web -- --config cyberguardian.toml
//! OPENROUTER_KEY=sk-... cargo run -p cyberguardian-web -- --port 8080 --data-dir data
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use cyberguardian::config::{ENV_API_KEY, ENV_JWT_SECRET, GuardianConfig};
use cyberguardian::store::{DocumentStore, FileStore, MemoryStore};
use cyberguardian::{CompletionModel, OpenRouterClient};
use cyberguardian_web::{AppState, JwtValidator, WebConfig, spawn_web};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Serve the CyberGuardian Pro API.
#[derive(Parser)]
#[command(about = "HTTP backend for the CyberGuardian Pro dashboard")]
struct Args {
    /// Path to a TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port to listen on, keeping the configured host.
    #[arg(long)]
    port: Option<u16>,

    /// LLM model to use.
    #[arg(long)]
    model: Option<String>,

    /// Directory for user documents. Without it, data lives in memory.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Serve the dashboard's static build from this directory.
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), String> {
    let args = Args::parse();

    let mut config = GuardianConfig::load(args.config.as_deref())
        .map_err(|e| format!("failed to load config: {e}"))?;
    if let Some(port) = args.port {
        config.server.bind.set_port(port);
    }
    if let Some(model) = args.model {
        config.model.model = model;
    }
    if args.data_dir.is_some() {
        config.store.data_dir = args.data_dir;
    }
    if args.static_dir.is_some() {
        config.server.static_dir = args.static_dir;
    }
    config.validate().map_err(|e| format!("invalid config: {e}"))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .init();

    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| format!("Set {ENV_API_KEY} env var to your OpenRouter API key"))?;
    let jwt_secret = config
        .auth
        .jwt_secret
        .clone()
        .ok_or_else(|| format!("Set {ENV_JWT_SECRET} or auth.jwt_secret to verify sign-ins"))?;

    let client = OpenRouterClient::with_endpoint(api_key, &config.model.endpoint)
        .map_err(|e| format!("failed to create API client: {e}"))?;
    let model: Arc<dyn CompletionModel> = Arc::new(client);

    let store: Arc<dyn DocumentStore> = match &config.store.data_dir {
        Some(dir) => {
            info!("Storing user documents in {}", dir.display());
            Arc::new(FileStore::new(dir))
        }
        None => {
            warn!("No data directory configured; user documents are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    if config.auth.audience.is_none() {
        warn!("No auth.audience configured; the token 'aud' claim is not checked");
    }
    let auth = JwtValidator::with_hs256(jwt_secret.as_bytes(), config.auth.audience.as_deref());
    let state = AppState::new(model, config.model_settings(), store, auth);
    let web_config = WebConfig {
        bind_addr: config.server.bind,
        static_dir: config.server.static_dir.clone(),
    };
    let addr = spawn_web(state, web_config)
        .await
        .map_err(|e| format!("failed to bind {}: {e}", config.server.bind))?;
    info!("Model: {}", config.model.model);
    println!("API: http://{addr}/api");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| format!("failed to listen for shutdown: {e}"))?;
    info!("Shutting down");
    Ok(())
}
