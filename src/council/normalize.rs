//! Payload Normalizer
//!
//! Turns the raw textual content of a model response into a canonical
//! [`CouncilResponse`]. Models reliably deviate from the requested schema
//! shape even when a schema is supplied with the request (extra wrapper
//! keys, members under a named property, members as a keyed object instead
//! of an array), so this module searches the parsed JSON tree for the
//! council rather than reading a fixed path, then validates the candidate
//! strictly before handing it back.
//!
//! Pure and deterministic: no I/O, same output for the same input string.

use super::models::{CouncilResponse, COUNCIL_SIZE};
use jsonschema::Validator;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::collections::VecDeque;
use thiserror::Error;

/// Longest slice of an offending payload reproduced in diagnostics
const PREVIEW_LIMIT: usize = 200;

/// Why a model payload could not be normalized into a council response
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("model payload is not valid JSON: {0}")]
    Parse(String),

    #[error("no three-member council found in model payload")]
    NoCouncilFound,

    #[error("council payload failed schema validation: {0}")]
    Schema(String),
}

/// JSON schema for a canonical council response. Shared between strict
/// validation here and the `response_format` constraint sent to the
/// completion endpoint.
pub fn council_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "question": { "type": "string", "minLength": 1 },
            "members": {
                "type": "array",
                "minItems": COUNCIL_SIZE,
                "maxItems": COUNCIL_SIZE,
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string", "minLength": 1 },
                        "role": { "type": "string", "minLength": 1 },
                        "advice": { "type": "string", "minLength": 1 },
                        "emoji": { "type": "string", "minLength": 1 },
                        "expertise": { "type": "number", "minimum": 0, "maximum": 100 },
                        "ctaLabel": { "type": "string" },
                        "ctaUrl": { "type": "string" }
                    },
                    "required": ["name", "role", "advice", "emoji"],
                    "additionalProperties": true
                }
            }
        },
        "required": ["question", "members"],
        "additionalProperties": true
    })
}

static COUNCIL_VALIDATOR: Lazy<Validator> = Lazy::new(|| {
    jsonschema::validator_for(&council_schema()).expect("council schema must compile")
});

/// Normalizes raw model output into a canonical council response.
///
/// `fallback_question` is used when no non-empty `question` string is found
/// anywhere in the payload. The returned response owns its data; it never
/// aliases the parsed input tree.
pub fn normalize(
    raw_text: &str,
    fallback_question: &str,
) -> Result<CouncilResponse, NormalizeError> {
    let parsed: Value = serde_json::from_str(raw_text).map_err(|err| {
        tracing::debug!(preview = %preview(raw_text), "model payload failed to parse as JSON");
        NormalizeError::Parse(err.to_string())
    })?;

    let members = find_members(&parsed).ok_or_else(|| {
        tracing::debug!(
            preview = %preview(&parsed.to_string()),
            "no council-shaped node found in model payload"
        );
        NormalizeError::NoCouncilFound
    })?;

    let question =
        find_question(&parsed).unwrap_or_else(|| fallback_question.trim().to_string());

    let candidate = json!({ "question": question, "members": members });

    let errors: Vec<String> = COUNCIL_VALIDATOR
        .iter_errors(&candidate)
        .map(|error| format!("{}: {}", error.instance_path, error))
        .collect();
    if !errors.is_empty() {
        let detail = errors.join("; ");
        tracing::debug!(detail = %detail, "council candidate failed schema validation");
        return Err(NormalizeError::Schema(detail));
    }

    serde_json::from_value(candidate).map_err(|err| NormalizeError::Schema(err.to_string()))
}

/// Breadth-first search for the first node holding exactly three
/// member-shaped values.
///
/// The root is examined first, then its children level by level; object
/// values are enumerated in key order and array elements in index order,
/// so the shallowest match wins and same-depth ties resolve in
/// encounter order. Two node shapes match:
///
/// - an array of exactly three member-shaped elements, or
/// - a plain object with exactly three entries whose values are all
///   member-shaped (some models emit `{"member1": {...}, ...}` instead
///   of an array); its values are taken in key order.
fn find_members(root: &Value) -> Option<Vec<Value>> {
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Array(items) => {
                if items.len() == COUNCIL_SIZE && items.iter().all(looks_like_member) {
                    return Some(items.clone());
                }
                queue.extend(items.iter());
            }
            Value::Object(map) => {
                if map.len() == COUNCIL_SIZE && map.values().all(looks_like_member) {
                    return Some(map.values().cloned().collect());
                }
                queue.extend(map.values());
            }
            _ => {}
        }
    }

    None
}

/// Breadth-first search (same traversal order as [`find_members`]) for the
/// first object carrying a non-empty string `question` field.
fn find_question(root: &Value) -> Option<String> {
    let mut queue: VecDeque<&Value> = VecDeque::new();
    queue.push_back(root);

    while let Some(node) = queue.pop_front() {
        match node {
            Value::Object(map) => {
                if let Some(question) = map.get("question").and_then(Value::as_str) {
                    let question = question.trim();
                    if !question.is_empty() {
                        return Some(question.to_string());
                    }
                }
                queue.extend(map.values());
            }
            Value::Array(items) => queue.extend(items.iter()),
            _ => {}
        }
    }

    None
}

/// Whether a JSON value structurally resembles one council member:
/// an object with non-empty string `name`, `role`, `advice`, and `emoji`.
fn looks_like_member(value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };

    ["name", "role", "advice", "emoji"].iter().all(|field| {
        map.get(*field)
            .and_then(Value::as_str)
            .map_or(false, |text| !text.trim().is_empty())
    })
}

/// Bounded excerpt of a payload for diagnostics; never logs the full text.
fn preview(text: &str) -> String {
    if text.len() <= PREVIEW_LIMIT {
        return text.to_string();
    }
    let mut end = PREVIEW_LIMIT;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member_json(name: &str) -> Value {
        json!({
            "name": name,
            "role": "Advisor",
            "advice": format!("{name} says: proceed carefully."),
            "emoji": "🧭"
        })
    }

    #[test]
    fn rejects_non_json_text() {
        let err = normalize("not json", "Q").unwrap_err();
        assert!(matches!(err, NormalizeError::Parse(_)));
    }

    #[test]
    fn accepts_canonical_top_level_payload() {
        let raw = json!({
            "question": "Should we expand into the EU market?",
            "members": [member_json("A"), member_json("B"), member_json("C")]
        })
        .to_string();

        let response = normalize(&raw, "original question").unwrap();
        assert_eq!(response.question, "Should we expand into the EU market?");
        assert_eq!(response.members.len(), 3);
        assert_eq!(response.members[0].name, "A");
    }

    #[test]
    fn discovers_members_and_question_under_wrapper_keys() {
        let raw = json!({
            "result": { "members": [member_json("A"), member_json("B"), member_json("C")] },
            "meta": { "question": "Q?" }
        })
        .to_string();

        let response = normalize(&raw, "fallback").unwrap();
        assert_eq!(response.question, "Q?");
        assert_eq!(response.members.len(), 3);
    }

    #[test]
    fn treats_three_member_shaped_object_values_as_the_council() {
        let raw = json!({
            "first": member_json("Alpha"),
            "second": member_json("Beta"),
            "third": member_json("Gamma")
        })
        .to_string();

        let response = normalize(&raw, "Q").unwrap();
        let names: Vec<&str> = response.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["Alpha", "Beta", "Gamma"]);
    }

    #[test]
    fn rejects_wrong_cardinality_arrays() {
        for count in [2usize, 4] {
            let members: Vec<Value> = (0..count).map(|i| member_json(&format!("M{i}"))).collect();
            let raw = json!({ "members": members }).to_string();
            let err = normalize(&raw, "Q").unwrap_err();
            assert!(
                matches!(err, NormalizeError::NoCouncilFound),
                "array of {count} members must not be accepted"
            );
        }
    }

    #[test]
    fn shallowest_three_member_array_wins() {
        let raw = json!({
            "outer": [member_json("Shallow1"), member_json("Shallow2"), member_json("Shallow3")],
            "wrapper": {
                "deep": [member_json("Deep1"), member_json("Deep2"), member_json("Deep3")]
            }
        })
        .to_string();

        let response = normalize(&raw, "Q").unwrap();
        assert_eq!(response.members[0].name, "Shallow1");
    }

    #[test]
    fn same_depth_ties_resolve_in_key_order() {
        let raw = json!({
            "b_second": { "members": [member_json("B1"), member_json("B2"), member_json("B3")] },
            "a_first": { "members": [member_json("A1"), member_json("A2"), member_json("A3")] }
        })
        .to_string();

        // Key order is parse order, not alphabetical: "b_second" was seen first.
        let response = normalize(&raw, "Q").unwrap();
        assert_eq!(response.members[0].name, "B1");
    }

    #[test]
    fn falls_back_to_caller_question_when_payload_has_none() {
        let raw = json!({
            "members": [member_json("A"), member_json("B"), member_json("C")]
        })
        .to_string();

        let response = normalize(&raw, "  the original question  ").unwrap();
        assert_eq!(response.question, "the original question");
    }

    #[test]
    fn expertise_bounds_are_enforced() {
        let with_expertise = |value: f64| {
            let mut member = member_json("A");
            member["expertise"] = json!(value);
            json!({
                "question": "Q",
                "members": [member, member_json("B"), member_json("C")]
            })
            .to_string()
        };

        assert!(normalize(&with_expertise(0.0), "Q").is_ok());
        assert!(normalize(&with_expertise(100.0), "Q").is_ok());

        for out_of_range in [101.0, -1.0] {
            let err = normalize(&with_expertise(out_of_range), "Q").unwrap_err();
            assert!(
                matches!(err, NormalizeError::Schema(_)),
                "expertise {out_of_range} must fail validation"
            );
        }
    }

    #[test]
    fn members_missing_a_required_field_are_not_member_shaped() {
        let mut incomplete = member_json("A");
        incomplete.as_object_mut().unwrap().remove("emoji");

        let raw = json!({
            "members": [incomplete, member_json("B"), member_json("C")]
        })
        .to_string();

        let err = normalize(&raw, "Q").unwrap_err();
        assert!(matches!(err, NormalizeError::NoCouncilFound));
    }

    #[test]
    fn normalization_is_round_trip_stable() {
        let raw = json!({
            "question": "Q?",
            "members": [member_json("A"), member_json("B"), member_json("C")]
        })
        .to_string();

        let first = normalize(&raw, "fallback").unwrap();
        let reserialized = serde_json::to_string(&first).unwrap();
        let second = normalize(&reserialized, "fallback").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn returned_members_do_not_alias_the_parsed_input() {
        let raw = json!({
            "question": "Q?",
            "members": [member_json("A"), member_json("B"), member_json("C")]
        })
        .to_string();

        let mut mutated = normalize(&raw, "fallback").unwrap();
        mutated.members[0].name = "Tampered".to_string();
        mutated.question = "Tampered question".to_string();

        // Re-normalizing the same input is unaffected by the mutation above.
        let fresh = normalize(&raw, "fallback").unwrap();
        assert_eq!(fresh.members[0].name, "A");
        assert_eq!(fresh.question, "Q?");
    }

    #[test]
    fn unknown_member_fields_are_preserved() {
        let mut member = member_json("A");
        member["confidence"] = json!(0.75);

        let raw = json!({
            "question": "Q",
            "members": [member, member_json("B"), member_json("C")]
        })
        .to_string();

        let response = normalize(&raw, "Q").unwrap();
        assert_eq!(response.members[0].extra["confidence"], json!(0.75));
    }

    #[test]
    fn preview_is_bounded_and_respects_char_boundaries() {
        let long = "🧠".repeat(200);
        let excerpt = preview(&long);
        assert!(excerpt.len() <= PREVIEW_LIMIT + 3);
        assert!(excerpt.ends_with("..."));

        assert_eq!(preview("short"), "short");
    }
}
