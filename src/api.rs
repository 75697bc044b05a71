//! HTTP API for the build engine.
//!
//! This module exposes the engine over a small JSON API using the
//! [`axum`](https://crates.io/crates/axum) framework.  Every request
//! carries its own product list, so the server holds no catalog state;
//! the only shared state is the profile table, which can be inspected
//! and replaced at runtime.

use crate::config::Settings;
use crate::engine::{configure, configure_batch, configure_presets};
use crate::error::ConfigError;
use crate::models::{BudgetRangeKey, Configuration, ConfigureRequest, PcType, Product};
use crate::profile::{Profile, ProfileTable};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shown to the user when a required category could not be filled.
pub const INCOMPLETE_BUILD_MESSAGE: &str = "Could not fully configure a build";

/// Application state shared across requests.
pub struct AppState {
    pub profiles: RwLock<ProfileTable>,
}

impl AppState {
    pub fn new(profiles: ProfileTable) -> Arc<Self> {
        Arc::new(Self {
            profiles: RwLock::new(profiles),
        })
    }
}

/// Errors returned by handlers, rendered as `{"error", "code"}` JSON.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("bad request: {0}")]
    BadRequest(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::Config(ConfigError::MissingProfile(_)) => {
                (StatusCode::NOT_FOUND, "NOT_FOUND", self.to_string())
            }
            ApiError::Config(err) if err.is_invalid_input() => {
                (StatusCode::BAD_REQUEST, "INVALID_INPUT", err.to_string())
            }
            ApiError::Config(err) => {
                tracing::error!(error = %err, "configuration failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
        };
        (status, Json(json!({ "error": message, "code": code }))).into_response()
    }
}

/// A configuration plus what the storefront should tell the user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationResponse {
    #[serde(flatten)]
    pub configuration: Configuration,
    pub complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl From<Configuration> for ConfigurationResponse {
    fn from(configuration: Configuration) -> Self {
        let complete = configuration.is_complete();
        Self {
            configuration,
            complete,
            message: (!complete).then_some(INCOMPLETE_BUILD_MESSAGE),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfigureBody {
    pub products: Vec<Product>,
    #[serde(flatten)]
    pub request: ConfigureRequest,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetsBody {
    pub products: Vec<Product>,
    pub pc_type: String,
}

#[derive(Debug, Deserialize)]
pub struct BatchBody {
    pub products: Vec<Product>,
    pub requests: Vec<ConfigureRequest>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchEntry {
    Ok(ConfigurationResponse),
    Error(String),
}

/// Build the API router around the given state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/configurations", post(configure_handler))
        .route("/api/configurations/presets", post(presets_handler))
        .route("/api/configurations/batch", post(batch_handler))
        .route("/api/profiles", get(list_profiles_handler))
        .route("/api/profiles/:pc_type", put(put_profile_handler))
        .with_state(state)
}

/// Load profiles from `settings.profile_dir` and build the router.
/// Returns the router and a handle to the state.
pub fn build_router(settings: &Settings) -> anyhow::Result<(Router, Arc<AppState>)> {
    let profiles = ProfileTable::load_from_dir(&settings.profile_dir)?;
    let state = AppState::new(profiles);
    Ok((router(state.clone()), state))
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}

/// Handler for POST /api/configurations
async fn configure_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ConfigureBody>, JsonRejection>,
) -> ApiResult<Json<ConfigurationResponse>> {
    let Json(body) = payload?;
    let profiles = state.profiles.read().await;
    let configuration = configure(&body.products, &body.request, &profiles)?;
    Ok(Json(configuration.into()))
}

/// Handler for POST /api/configurations/presets
async fn presets_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<PresetsBody>, JsonRejection>,
) -> ApiResult<Json<BTreeMap<BudgetRangeKey, ConfigurationResponse>>> {
    let Json(body) = payload?;
    let pc_type: PcType = body.pc_type.parse()?;
    let profiles = state.profiles.read().await;
    let presets = configure_presets(&body.products, pc_type, &profiles)?;
    Ok(Json(
        presets
            .into_iter()
            .map(|(key, config)| (key, config.into()))
            .collect(),
    ))
}

/// Handler for POST /api/configurations/batch
async fn batch_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BatchBody>, JsonRejection>,
) -> ApiResult<Json<Vec<BatchEntry>>> {
    let Json(body) = payload?;
    let profiles = state.profiles.read().await;
    let entries = configure_batch(&body.products, &body.requests, &profiles)
        .into_iter()
        .map(|result| match result {
            Ok(config) => BatchEntry::Ok(config.into()),
            Err(err) => BatchEntry::Error(err.to_string()),
        })
        .collect();
    Ok(Json(entries))
}

/// Handler for GET /api/profiles
async fn list_profiles_handler(State(state): State<Arc<AppState>>) -> Json<ProfileTable> {
    Json(state.profiles.read().await.clone())
}

/// Handler for PUT /api/profiles/:pc_type
async fn put_profile_handler(
    State(state): State<Arc<AppState>>,
    Path(pc_type): Path<String>,
    payload: Result<Json<Profile>, JsonRejection>,
) -> ApiResult<Json<Profile>> {
    let pc_type: PcType = pc_type.parse()?;
    let Json(profile) = payload?;
    if profile.pc_type != pc_type {
        return Err(ApiError::BadRequest(format!(
            "profile is for {}, not {pc_type}",
            profile.pc_type
        )));
    }
    state.profiles.write().await.insert(profile.clone())?;
    tracing::info!(%pc_type, "replaced profile");
    Ok(Json(profile))
}

/// Launch the API server.  Builds the router from `settings` and serves
/// until the process is interrupted.
pub async fn serve(settings: &Settings) -> anyhow::Result<()> {
    let (router, _state) = build_router(settings)?;
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!(addr = %settings.bind_addr, "server listening");
    axum::serve(listener, router).await?;
    Ok(())
}
