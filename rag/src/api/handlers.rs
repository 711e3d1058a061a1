use std::sync::Arc;

use axum::{extract::rejection::JsonRejection, extract::State, Json};

use super::dto::{AskRequest, AskResponse, HealthResponse};
use super::error::ApiError;
use super::state::AppState;
use crate::chain::answer_question;
use crate::error::RagError;

/// POST /ask - answer a question within a session
pub async fn ask(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AskRequest>, JsonRejection>,
) -> Result<Json<AskResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| RagError::Validation(e.body_text()))?;

    // Hosted-model and store calls are blocking; keep them off the async workers.
    let result = tokio::task::spawn_blocking(move || {
        answer_question(
            &state.config,
            state.providers.as_ref(),
            &state.locks,
            &req.session_id,
            &req.question,
        )
    })
    .await
    .map_err(|e| ApiError::Internal(e.to_string()))??;

    Ok(Json(AskResponse::from(result)))
}

/// GET /health - Health check
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
