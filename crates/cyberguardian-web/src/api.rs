//! REST API endpoint handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use cyberguardian::CompletionModel;
use cyberguardian::flow::{FlowInfo, FlowKind, FlowOutcome, FlowRunner, ModelSettings};
use cyberguardian::store::DocumentStore;
use cyberguardian::store::account::{
    AccountService, Session, SessionKind, SettingsUpdate, UserProfile, UserSettings,
};
use serde_json::{Value, json};
use tracing::info;

use crate::auth::{AuthUser, JwtValidator};
use crate::error::ApiError;

/// Shared application state passed to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub model: Arc<dyn CompletionModel>,
    pub settings: Arc<ModelSettings>,
    pub accounts: AccountService,
    pub auth: Arc<JwtValidator>,
}

impl AppState {
    pub fn new(
        model: Arc<dyn CompletionModel>,
        settings: ModelSettings,
        store: Arc<dyn DocumentStore>,
        auth: JwtValidator,
    ) -> Self {
        Self {
            model,
            settings: Arc::new(settings),
            accounts: AccountService::new(store),
            auth: Arc::new(auth),
        }
    }
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/flows: Every flow the dashboard can run.
pub async fn list_flows() -> Json<Vec<FlowInfo>> {
    Json(FlowKind::ALL.iter().map(|k| k.info()).collect())
}

fn flow_kind(name: &str) -> Result<FlowKind, ApiError> {
    Ok(name.parse::<FlowKind>()?)
}

/// GET /api/flows/{name}/schema: The output contract for one flow.
pub async fn flow_schema(
    _user: AuthUser,
    Path(name): Path<String>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(flow_kind(&name)?.output_schema()))
}

/// POST /api/flows/{name}: Run a flow on the request body.
///
/// Returns the validated model output wrapped with the flow name, trace id
/// and model used.
pub async fn run_flow(
    State(app): State<AppState>,
    AuthUser(user): AuthUser,
    Path(name): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<FlowOutcome<Value>>, ApiError> {
    let kind = flow_kind(&name)?;
    let Json(input) = payload?;

    info!("{} requested by {}", kind, user.user_id);
    let runner = FlowRunner::new(app.model.as_ref(), &app.settings);
    let outcome = kind.run_json(&runner, input).await?;
    Ok(Json(outcome))
}

/// POST /api/session: Record a sign in.
///
/// Returns 201 when this created the account, 200 otherwise.
pub async fn post_session(
    State(app): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = app.accounts.sign_in(&user).await?;
    let status = match session.kind {
        SessionKind::SignedUp => StatusCode::CREATED,
        SessionKind::SignedIn => StatusCode::OK,
    };
    Ok((status, Json(session)))
}

/// GET /api/profile
pub async fn get_profile(
    State(app): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(app.accounts.profile(&user.user_id).await?))
}

/// GET /api/settings
pub async fn get_settings(
    State(app): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<UserSettings>, ApiError> {
    Ok(Json(app.accounts.settings(&user.user_id).await?))
}

/// PUT /api/settings: Replace the user's settings.
pub async fn put_settings(
    State(app): State<AppState>,
    AuthUser(user): AuthUser,
    payload: Result<Json<SettingsUpdate>, JsonRejection>,
) -> Result<Json<UserSettings>, ApiError> {
    let Json(update) = payload?;
    let saved = app.accounts.save_settings(&user.user_id, update).await?;
    Ok(Json(saved))
}
