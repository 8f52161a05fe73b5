//! HTTP backend for the CyberGuardian Pro dashboard.
//!
//! `cyberguardian-web` exposes every analysis flow as a REST endpoint and
//! stores each user's profile and settings. Requests carry a bearer JWT from
//! the dashboard's identity provider.
//!
//! # Quick start
//!
//! ```ignore
//! use std::sync::Arc;
//! use cyberguardian::OpenRouterClient;
//! use cyberguardian::flow::ModelSettings;
//! use cyberguardian::store::MemoryStore;
//! use cyberguardian_web::{AppState, JwtValidator, WebConfig, spawn_web};
//!
//! let model = Arc::new(OpenRouterClient::new(api_key)?);
//! let auth = JwtValidator::with_hs256(secret, Some("authenticated"));
//! let state = AppState::new(model, ModelSettings::default(), Arc::new(MemoryStore::new()), auth);
//! let addr = spawn_web(state, WebConfig::default()).await?;
//! println!("API: http://{addr}/api");
//! ```
//!
//! # Routes
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/api/health` | no |
//! | GET | `/api/flows` | no |
//! | GET | `/api/flows/{name}/schema` | yes |
//! | POST | `/api/flows/{name}` | yes |
//! | POST | `/api/session` | yes |
//! | GET, PUT | `/api/settings` | yes |
//! | GET | `/api/profile` | yes |

mod api;
pub mod auth;
pub mod error;
mod server;

pub use api::AppState;
pub use auth::{AuthUser, Claims, JwtValidator};
pub use error::ApiError;
pub use server::build_router;

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Configuration for the web server.
pub struct WebConfig {
    /// Address to bind to. Default: `127.0.0.1:3001`.
    pub bind_addr: SocketAddr,
    /// Path to the dashboard's static export directory.
    ///
    /// If `None`, only API endpoints are served.
    pub static_dir: Option<PathBuf>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3001)),
            static_dir: None,
        }
    }
}

/// Spawn the web server on a Tokio task and return the bound address.
///
/// The server runs until the Tokio runtime shuts down.
pub async fn spawn_web(state: AppState, config: WebConfig) -> io::Result<SocketAddr> {
    let router = server::build_router(state, config.static_dir);
    server::start_server(router, config.bind_addr).await
}
