//! OpenAI-compatible HTTP API.
//!
//! Routes:
//! - POST /v1/chat/completions
//! - GET /v1/models, GET /v1/models/{id} (and the /v1/engines aliases)
//! - POST /v1/completions, POST /v1/embeddings (always rejected)
//! - GET /health

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use crate::completion::emitter::{CompletionUnit, EmissionPlan, Emitter};
use crate::completion::framer::ChunkFramer;
use crate::completion::request::ChatRequest;
use crate::config::Config;
use crate::error::{panic_response, ApiError};
use crate::registry::{self, ModelInfo, ModelList};
use crate::server::streaming::sse_response;

/// Application state shared across handlers.
pub struct AppState {
    pub emitter: Emitter,
    pub config: Arc<Config>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            emitter: Emitter::new(config.streaming.clone()),
            config,
            start_time: Instant::now(),
        }
    }
}

/// Build the axum router with all API routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let routes = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/completions", post(completions))
        .route("/v1/embeddings", post(embeddings))
        .route("/v1/models", get(list_models))
        .route("/v1/models/{id}", get(get_model))
        .route("/v1/engines", get(list_models))
        .route("/v1/engines/{id}", get(get_model))
        .route("/health", get(health))
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found);

    with_service_layers(routes).with_state(state)
}

/// Cross-cutting layers: panic recovery, CORS and request tracing.
fn with_service_layers<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub models: usize,
}

async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let request_id = Uuid::new_v4().to_string();

    info!(
        request_id = request_id,
        model = req.model,
        stream = req.stream.as_str(),
        messages = req.messages().len(),
        max_tokens = req.max_tokens(),
        temperature = req.temperature(),
        "Chat completion request"
    );

    req.validate()?;
    if !registry::validate_model(&req.model) {
        return Err(ApiError::UnsupportedModel(req.model));
    }

    match state.emitter.emit(&req) {
        EmissionPlan::Stream(session) => {
            info!(request_id = request_id, id = session.id(), "Streaming response");
            Ok(sse_response(session, state.emitter.char_delay()))
        }
        EmissionPlan::Single(response) => {
            info!(
                request_id = request_id,
                id = response.id,
                prompt_tokens = response.usage.prompt_tokens,
                total_tokens = response.usage.total_tokens,
                "Chat completion complete"
            );
            let framer = ChunkFramer::for_response(&response);
            let body = framer.frame(&CompletionUnit::Complete(response))?;
            Ok(([(CONTENT_TYPE, "application/json")], body).into_response())
        }
    }
}

async fn not_found(method: Method, uri: Uri) -> ApiError {
    ApiError::UnknownUrl {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::MethodNotAllowed {
        method: method.to_string(),
        path: uri.path().to_string(),
    }
}

async fn completions() -> ApiError {
    ApiError::EndpointNotSupported(
        "Legacy completions endpoint is not supported. Please use chat/completions instead.",
    )
}

async fn embeddings() -> ApiError {
    ApiError::EndpointNotSupported("Embeddings endpoint is not supported.")
}

async fn list_models() -> Json<ModelList> {
    Json(registry::list_models())
}

async fn get_model(Path(id): Path<String>) -> Result<Json<ModelInfo>, ApiError> {
    registry::find_model(&id)
        .map(Json)
        .ok_or(ApiError::UnknownModel(id))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        models: registry::SUPPORTED_MODELS.len(),
    })
}
