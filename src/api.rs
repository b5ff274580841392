use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::analyze::chat::ChatTurn;
use crate::analyze::report::AnalysisReport;
use crate::config::ServerConfig;
use crate::error::EngineError;
use crate::ingest::ledger::StatusLedger;
use crate::service::AnalysisService;
use crate::users::{UserDirectory, UserProfile};

const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AnalysisService>,
    pub users: Arc<UserDirectory>,
}

pub fn router(state: AppState, cfg: &ServerConfig) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/api/analyze", post(analyze))
        .route("/api/chat", post(chat))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .layer(cors_layer(cfg))
        .with_state(state)
}

fn cors_layer(cfg: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);
    if cfg.allowed_origins.is_empty() {
        return base.allow_origin(Any);
    }
    let origins: Vec<HeaderValue> = cfg
        .allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(target: "api", origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(origins))
}

// ------------------------------------------------------------
// Errors
// ------------------------------------------------------------

#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Unauthorized(&'static str),
    /// Aggregation exhausted: every source failed.
    NoData(StatusLedger),
    Chat(EngineError),
    Internal(&'static str),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, Json(json!({ "error": msg }))).into_response(),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response(),
            ApiError::NoData(status) => (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "No data could be collected from any platform",
                    "platform_status": status,
                })),
            )
                .into_response(),
            ApiError::Chat(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "An error occurred during chat",
                    "details": e.to_string(),
                })),
            )
                .into_response(),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": msg }))).into_response()
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rej: JsonRejection) -> Self {
        tracing::debug!(target: "api", error = %rej, "rejected request body");
        ApiError::BadRequest("Request must be JSON")
    }
}

// ------------------------------------------------------------
// Analysis
// ------------------------------------------------------------

#[derive(Deserialize)]
struct AnalyzeReq {
    query: Option<String>,
}

async fn analyze(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeReq>, JsonRejection>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let Json(req) = body?;
    let query = req
        .query
        .ok_or(ApiError::BadRequest("Query parameter is required"))?;
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::BadRequest("Query cannot be empty"));
    }

    let report = state
        .service
        .analyze(query)
        .await
        .map_err(|e| ApiError::NoData(e.status))?;
    Ok(Json(report))
}

#[derive(Deserialize, Default)]
struct AnalysisData {
    #[serde(default)]
    platform_status: serde_json::Value,
}

#[derive(Deserialize)]
struct ChatReq {
    query: Option<String>,
    chat_history: Option<Vec<ChatTurn>>,
    #[serde(default)]
    analysis_data: Option<AnalysisData>,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Serialize)]
struct ChatResp {
    response: String,
    context: String,
}

async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatReq>, JsonRejection>,
) -> Result<Json<ChatResp>, ApiError> {
    let Json(req) = body?;
    let (Some(query), Some(history)) = (req.query, req.chat_history) else {
        return Err(ApiError::BadRequest("Query and chat history are required"));
    };
    let status = StatusLedger::from_loose_json(&req.analysis_data.unwrap_or_default().platform_status);

    let response = state
        .service
        .chat(&query, &history, &status, req.context.as_deref())
        .await
        .map_err(|e| {
            tracing::warn!(target: "api", error = %e, "chat failed");
            ApiError::Chat(e)
        })?;

    Ok(Json(ChatResp {
        response,
        context: req.context.unwrap_or_default(),
    }))
}

// ------------------------------------------------------------
// Auth
// ------------------------------------------------------------

#[derive(Deserialize)]
struct RegisterReq {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct LoginReq {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
struct AuthResp {
    success: bool,
    user: UserProfile,
}

async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterReq>, JsonRejection>,
) -> Result<Json<AuthResp>, ApiError> {
    let Json(req) = body?;
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_string();
    let password = req.password.trim().to_string();

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("All fields are required"));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(ApiError::BadRequest("Password must be at least 6 characters"));
    }

    let users = state.users.clone();
    let created = tokio::task::spawn_blocking(move || users.create(&name, &email, &password))
        .await
        .map_err(|_| ApiError::Internal("Registration failed"))?
        .map_err(|e| {
            tracing::error!(target: "users", error = %e, "user store write failed");
            ApiError::Internal("Registration failed")
        })?;

    match created {
        Some(user) => Ok(Json(AuthResp { success: true, user })),
        None => Err(ApiError::BadRequest("Email already registered")),
    }
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginReq>, JsonRejection>,
) -> Result<Json<AuthResp>, ApiError> {
    let Json(req) = body?;
    let email = req.email.trim().to_string();
    let password = req.password.trim().to_string();
    if email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required"));
    }

    let users = state.users.clone();
    let found = tokio::task::spawn_blocking(move || users.authenticate(&email, &password))
        .await
        .map_err(|_| ApiError::Internal("Login failed"))?
        .map_err(|e| {
            tracing::error!(target: "users", error = %e, "user store read failed");
            ApiError::Internal("Login failed")
        })?;

    match found {
        Some(user) => Ok(Json(AuthResp { success: true, user })),
        None => Err(ApiError::Unauthorized("Invalid credentials")),
    }
}
