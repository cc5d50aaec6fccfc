//! MCP (Model Context Protocol) route handlers
//!
//! This module implements the Model Context Protocol handlers for the AI
//! council application. It exports `handle_tool_call` publicly to make it
//! accessible for tests.

use super::{helpers::*, models::*};
use crate::council::{
    models::ConsultInput, orchestrator::consult, state::*, ResultSource,
};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use uuid::Uuid;

/// Creates routes for MCP-related operations
pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/", post(handle_mcp).get(handle_mcp_sse))
        .route("/mcp", post(handle_mcp).get(handle_mcp_sse)) // Standard endpoint
        .route("/mcp/", post(handle_mcp).get(handle_mcp_sse)) // Trailing slash safety
}

/// Handle SSE (Server-Sent Events) handshake for GET requests
async fn handle_mcp_sse() -> impl IntoResponse {
    (
        [("content-type", "text/event-stream")],
        "event: endpoint\ndata: /mcp\n\n",
    )
}

/// Endpoint: POST /mcp
/// Handles the Model Context Protocol communication for POST requests.
async fn handle_mcp(
    State(state): State<SharedState>,
    body: Result<Json<JsonRpcRequest>, axum::extract::rejection::JsonRejection>,
) -> impl IntoResponse {
    // Parse JSON-RPC Request (POST)
    let req = match body {
        Ok(Json(r)) => r,
        Err(e) => {
            tracing::warn!(error = %e.body_text(), "JSON parse error");
            return (
                StatusCode::BAD_REQUEST,
                Json(rpc_error(Value::Null, -32700, "Parse error")),
            )
                .into_response();
        }
    };

    let id = req.id.unwrap_or(Value::Null);
    let method_name = req.method.as_str();
    let params = req.params.unwrap_or(Value::Null);

    tracing::debug!(method = method_name, id = ?id, "MCP call");

    // Dispatch Method
    let response_body = match method_name {
        "initialize" => rpc_success(id, handle_initialize()),
        "notifications/initialized" => rpc_success(id, json!({})),
        "tools/list" => rpc_success(id, handle_tools_list()),
        "resources/list" => rpc_success(id, handle_resources_list()),
        "resources/read" => rpc_success(id, handle_resources_read(&state).await),
        "tools/call" => {
            let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
            let args = params.get("arguments").cloned().unwrap_or(Value::Null);

            match handle_tool_call(&state, tool_name, args).await {
                Ok(result) => rpc_success(id, result),
                Err(msg) => rpc_error(id, -32602, msg), // Invalid params or internal error
            }
        }
        "ping" => rpc_success(id, json!({})), // Optional but good for health checks
        _ => {
            tracing::warn!(method = method_name, "unknown MCP method");
            rpc_error(id, -32601, "Method not found")
        }
    };

    Json(response_body).into_response()
}

// =============================================================================
// MCP Method Handlers
// =============================================================================

/// Handles `initialize` request (Handshake).
fn handle_initialize() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {
            "tools": { "listChanged": true },
            "resources": { "listChanged": true, "subscribe": true }
        },
        "serverInfo": {
            "name": SERVER_NAME,
            "version": "0.1.0"
        }
    })
}

/// Handles `tools/list` request.
fn handle_tools_list() -> Value {
    json!({
        "tools": [
            {
                "name": TOOL_NAME,
                "title": "Consult your AI council",
                "description": "Puts a question before a council of three advisors and returns their advice.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "question": {
                            "type": "string",
                            "description": "The question to put before the council"
                        }
                    },
                    "required": ["question"],
                    "additionalProperties": false
                },
                "_meta": widget_meta(None)
            }
        ],
        "_meta": widget_meta(None)
    })
}

/// Handles `resources/list` request.
fn handle_resources_list() -> Value {
    json!({
        "resources": [{
            "name": "Ask your AI council",
            "uri": WIDGET_TEMPLATE_URI,
            "mimeType": WIDGET_MIME_TYPE,
            "_meta": widget_meta(None)
        }],
        "_meta": widget_meta(None)
    })
}

/// Handles `resources/read` request.
async fn handle_resources_read(state: &AppState) -> Value {
    let html = state.load_widget_html().await.unwrap_or_default();
    json!({
        "contents": [{
            "uri": WIDGET_TEMPLATE_URI,
            "mimeType": WIDGET_MIME_TYPE,
            "text": html,
            "_meta": widget_meta(None)
        }],
        "_meta": widget_meta(None)
    })
}

/// Handles `tools/call` request (Business Logic).
pub async fn handle_tool_call(state: &AppState, name: &str, args: Value) -> Result<Value, String> {
    match name {
        TOOL_NAME => handle_consult_tool(state, args).await,
        _ => Err(format!("Unknown tool: {}", name)),
    }
}

/// Handles the consult_council tool functionality
async fn handle_consult_tool(state: &AppState, args: Value) -> Result<Value, String> {
    let input: ConsultInput =
        serde_json::from_value(args).map_err(|e| format!("Invalid arguments: {}", e))?;

    // Empty questions never reach the pipeline.
    let question = input.question.trim().to_string();
    if question.is_empty() {
        return Err("Invalid arguments: question must not be empty".to_string());
    }

    let result = consult(&state.http, &state.config, &question).await;
    let consultation_id = Uuid::new_v4().simple().to_string();

    let message = match result.source {
        ResultSource::Live => {
            format!("Your council weighed in on: {}", result.response.question)
        }
        ResultSource::Fallback => format!(
            "The live council was unavailable; canned advice follows for: {}",
            result.response.question
        ),
    };

    Ok(json!({
        "content": [{ "type": "text", "text": message }],
        "structuredContent": {
            "consultationId": consultation_id,
            "result": result
        },
        "_meta": widget_meta(Some(&consultation_id))
    }))
}
