//! Axum server setup and router construction.

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::error;

use crate::api::{self, AppState};

/// Build the full axum router.
///
/// The router serves:
/// - REST API at `/api/*`
/// - Optional static files for the dashboard's production build
pub fn build_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    // The dashboard dev server runs on a different port.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        .route("/api/health", get(api::health))
        .route("/api/flows", get(api::list_flows))
        .route("/api/flows/{name}", post(api::run_flow))
        .route("/api/flows/{name}/schema", get(api::flow_schema))
        .route("/api/session", post(api::post_session))
        .route("/api/profile", get(api::get_profile))
        .route(
            "/api/settings",
            get(api::get_settings).put(api::put_settings),
        )
        .with_state(state);

    let mut router = Router::new().merge(api_routes).layer(cors);

    if let Some(dir) = static_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
}

/// Bind the listener, spawn the server and return the bound address.
pub async fn start_server(router: Router, bind_addr: SocketAddr) -> io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("Server stopped: {e}");
        }
    });

    Ok(addr)
}
