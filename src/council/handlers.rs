//! REST API handlers for council operations
//!
//! This module implements the HTTP endpoint used by the widget frontend to
//! request a consultation outside of the MCP tool surface.

use super::{models::ConsultInput, orchestrator::consult, state::SharedState};
use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde_json::json;

/// Creates routes for council-related operations
pub fn routes() -> Router<SharedState> {
    Router::new().route("/consult", post(consult_handler))
}

/// Endpoint: POST /consult
/// Runs one consultation and returns the full result envelope.
async fn consult_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ConsultInput>,
) -> impl IntoResponse {
    let question = payload.question.trim();
    if question.is_empty() {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "question must not be empty" })),
        )
            .into_response();
    }

    let result = consult(&state.http, &state.config, question).await;
    Json(result).into_response()
}
