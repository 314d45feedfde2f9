use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    routing::{get, post},
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    chat::{ChatHandler, ChatReply},
    error::ServiceError,
    model::{GenerationSettings, ModelMetadata},
    quantization::QuantizationSummary,
};

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatHandler,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ModelStatusResponse {
    ready: bool,
    model: Option<ModelMetadata>,
    quantization: Option<QuantizationSummary>,
    /// Always present; token ids stay null until a model is loaded.
    generation: GenerationSettings,
}

pub fn build_router(chat: ChatHandler) -> Router {
    let state = AppState { chat };

    Router::new()
        .route("/", get(health))
        .route("/api/chat", post(chat_completion))
        .route("/api/model", get(model_status))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

// Liveness only; says nothing about the model.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "API is running",
    })
}

async fn chat_completion(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<ChatReply>, ServiceError> {
    let reply = state.chat.handle_body(&body).await?;
    Ok(Json(reply))
}

async fn model_status(State(state): State<AppState>) -> Json<ModelStatusResponse> {
    let capability = state.chat.capability();
    let model = capability.map(|c| c.metadata());
    let quantization = model.as_ref().map(QuantizationSummary::from_metadata);

    Json(ModelStatusResponse {
        ready: state.chat.is_ready(),
        model,
        quantization,
        generation: capability
            .map(|c| c.parameters().settings())
            .unwrap_or_else(GenerationSettings::fixed),
    })
}
