//! Council Request Orchestrator
//!
//! Owns the single outbound call to the completion endpoint and the
//! conversion of every failure into a usable fallback result. [`consult`]
//! never fails: callers always receive a three-member council, with
//! `source`/`reason` recording whether the live path succeeded.

use super::config::CouncilConfig;
use super::models::{CouncilResponse, CouncilResult, ResultSource};
use super::normalize::{council_schema, normalize, NormalizeError};
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use serde_json::{json, Value};
use thiserror::Error;

/// Path of the chat-completion endpoint, joined onto the configured host
pub const COMPLETIONS_PATH: &str = "/api/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are the coordinator of a council of three advisors with \
    distinct personas and areas of expertise. Answer the user's question as the council. \
    Respond with a single JSON object matching the provided schema: a restated `question` \
    string and a `members` array of exactly three advisors, each with `name`, `role`, \
    `advice`, and `emoji` fields. Do not wrap the JSON in markdown fences or add any \
    other text.";

/// Failure of the live consultation path. Absorbed inside [`consult`];
/// never escalated to its caller.
#[derive(Debug, Error)]
pub enum CouncilError {
    #[error("request to completion endpoint failed: {0}")]
    Transport(String),

    #[error("completion endpoint returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("no textual content in completion response")]
    NoContent,

    #[error(transparent)]
    Normalize(#[from] NormalizeError),
}

/// Consults the council about `question`.
///
/// With no credential configured this returns the canned council
/// immediately, without touching the network. Otherwise it makes exactly
/// one request to the completion endpoint, normalizes the payload, and
/// maps any failure along the way to a fallback result carrying the
/// failure description in `reason`. Nothing is retried.
pub async fn consult(
    client: &reqwest::Client,
    config: &CouncilConfig,
    question: &str,
) -> CouncilResult {
    let Some(api_key) = config.api_key.as_deref() else {
        tracing::warn!("no completion credential configured, serving canned council");
        return fallback_result(
            config,
            question,
            "API credential not configured; serving canned council advice.",
        );
    };

    match consult_live(client, config, api_key, question).await {
        Ok(response) => CouncilResult {
            response,
            source: ResultSource::Live,
            reason: None,
        },
        Err(err) => {
            tracing::warn!(error = %err, "live consultation failed, serving canned council");
            fallback_result(config, question, &format!("Live council unavailable: {err}"))
        }
    }
}

/// The happy path: one POST, content extraction, normalization.
async fn consult_live(
    client: &reqwest::Client,
    config: &CouncilConfig,
    api_key: &str,
    question: &str,
) -> Result<CouncilResponse, CouncilError> {
    let url = format!("{}{}", config.host.trim_end_matches('/'), COMPLETIONS_PATH);

    let mut request = client
        .post(&url)
        .header(CONTENT_TYPE, "application/json")
        .header(AUTHORIZATION, format!("Bearer {api_key}"))
        .header(CACHE_CONTROL, "no-store")
        .json(&build_request_body(config, question));

    // Identity headers are best-effort.
    if let Some(referrer) = &config.referrer {
        request = request.header("HTTP-Referer", referrer);
    }
    if let Some(title) = &config.title {
        request = request.header("X-Title", title);
    }

    let response = request
        .send()
        .await
        .map_err(|err| CouncilError::Transport(err.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(CouncilError::Status(status));
    }

    let envelope: Value = response
        .json()
        .await
        .map_err(|err| CouncilError::Transport(err.to_string()))?;

    let content = extract_message_content(&envelope).ok_or(CouncilError::NoContent)?;

    // The normalizer's resolved question wins over the caller's input.
    Ok(normalize(&content, question)?)
}

/// Builds the completion request: a system/user message pair plus a
/// JSON-schema response-format constraint mirroring the council shape.
pub fn build_request_body(config: &CouncilConfig, question: &str) -> Value {
    json!({
        "model": config.model,
        "messages": [
            { "role": "system", "content": SYSTEM_PROMPT },
            {
                "role": "user",
                "content": format!(
                    "Question: {question}\n\nRestate the question in the `question` field \
                     and have each of the three advisors answer it."
                )
            }
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": "council_response",
                "schema": council_schema()
            }
        }
    })
}

/// Pulls the assistant text out of a loosely-structured completion
/// envelope: the first choice whose `message.content` is either a plain
/// string or a list of text-bearing fragments.
fn extract_message_content(envelope: &Value) -> Option<String> {
    for choice in envelope.get("choices")?.as_array()? {
        let Some(content) = choice.get("message").and_then(|message| message.get("content"))
        else {
            continue;
        };

        match content {
            Value::String(text) if !text.trim().is_empty() => return Some(text.clone()),
            Value::Array(fragments) => {
                let text: String = fragments
                    .iter()
                    .filter_map(|fragment| fragment.get("text").and_then(Value::as_str))
                    .collect();
                if !text.trim().is_empty() {
                    return Some(text);
                }
            }
            _ => {}
        }
    }

    None
}

/// Builds a fallback result from the canned council, echoing the caller's
/// original question.
pub fn fallback_result(config: &CouncilConfig, question: &str, reason: &str) -> CouncilResult {
    CouncilResult {
        response: CouncilResponse {
            question: question.to_string(),
            members: config.fallback_members.clone(),
        },
        source: ResultSource::Fallback,
        reason: Some(reason.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::models::COUNCIL_SIZE;

    #[tokio::test]
    async fn missing_credential_short_circuits_to_fallback() {
        let config = CouncilConfig {
            // An unroutable host proves no request is attempted.
            host: "http://127.0.0.1:1".to_string(),
            ..CouncilConfig::default()
        };
        let client = reqwest::Client::new();

        let result = consult(&client, &config, "Should we rewrite it in Rust?").await;

        assert_eq!(result.source, ResultSource::Fallback);
        assert_eq!(result.response.question, "Should we rewrite it in Rust?");
        assert_eq!(result.response.members.len(), COUNCIL_SIZE);
        assert!(result
            .reason
            .as_deref()
            .unwrap()
            .contains("credential not configured"));
    }

    #[tokio::test]
    async fn transport_failure_becomes_fallback_with_reason() {
        let config = CouncilConfig {
            api_key: Some("test-key".to_string()),
            host: "http://127.0.0.1:1".to_string(),
            ..CouncilConfig::default()
        };
        let client = reqwest::Client::new();

        let result = consult(&client, &config, "Q").await;

        assert_eq!(result.source, ResultSource::Fallback);
        assert_eq!(result.response.members.len(), COUNCIL_SIZE);
        assert!(result.reason.as_deref().unwrap().contains("unavailable"));
    }

    #[test]
    fn request_body_carries_model_messages_and_schema_constraint() {
        let config = CouncilConfig::default();
        let body = build_request_body(&config, "Should we expand?");

        assert_eq!(body["model"], config.model.as_str());

        let messages = body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "system");
        assert!(messages[1]["content"]
            .as_str()
            .unwrap()
            .contains("Should we expand?"));

        let schema = &body["response_format"]["json_schema"]["schema"];
        assert_eq!(schema["properties"]["members"]["minItems"], 3);
        assert_eq!(schema["properties"]["members"]["maxItems"], 3);
    }

    #[test]
    fn extracts_plain_string_content() {
        let envelope = json!({
            "choices": [{ "message": { "content": "hello" } }]
        });
        assert_eq!(extract_message_content(&envelope).as_deref(), Some("hello"));
    }

    #[test]
    fn extracts_and_concatenates_fragment_content() {
        let envelope = json!({
            "choices": [{
                "message": {
                    "content": [
                        { "type": "text", "text": "{\"a\":" },
                        { "type": "text", "text": "1}" }
                    ]
                }
            }]
        });
        assert_eq!(
            extract_message_content(&envelope).as_deref(),
            Some("{\"a\":1}")
        );
    }

    #[test]
    fn skips_choices_without_usable_content() {
        let envelope = json!({
            "choices": [
                { "message": { "content": "" } },
                { "message": {} },
                { "message": { "content": "second" } }
            ]
        });
        assert_eq!(
            extract_message_content(&envelope).as_deref(),
            Some("second")
        );
    }

    #[test]
    fn missing_choices_yield_no_content() {
        assert_eq!(extract_message_content(&json!({})), None);
        assert_eq!(extract_message_content(&json!({ "choices": [] })), None);
    }

    #[test]
    fn fallback_pairs_reason_with_source() {
        let config = CouncilConfig::default();
        let result = fallback_result(&config, "Q", "because");

        assert_eq!(result.source, ResultSource::Fallback);
        assert_eq!(result.reason.as_deref(), Some("because"));
        assert_eq!(result.response.members.len(), COUNCIL_SIZE);
    }
}
