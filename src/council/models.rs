//! Council Domain Models
//!
//! This module contains all data structures related to the AI council
//! business domain.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

// =============================================================================
// Council Domain Models
// =============================================================================

/// Number of advisors in every council, live or canned.
pub const COUNCIL_SIZE: usize = 3;

/// One advisor's contribution to a consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouncilMember {
    /// Display identity of the advisor
    pub name: String,

    /// Persona / expertise label
    pub role: String,

    /// The substantive content of the advisor's answer
    pub advice: String,

    /// Short badge shown next to the advisor's name
    pub emoji: String,

    /// Confidence/credibility score in [0, 100]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expertise: Option<f64>,

    /// Label for an optional call-to-action button
    #[serde(rename = "ctaLabel", skip_serializing_if = "Option::is_none")]
    pub cta_label: Option<String>,

    /// Target URL for an optional call-to-action button.
    /// The widget only renders a CTA when both label and URL are present.
    #[serde(rename = "ctaUrl", skip_serializing_if = "Option::is_none")]
    pub cta_url: Option<String>,

    /// Captures any extra model-introduced fields dynamically
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

/// One completed consultation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouncilResponse {
    /// The (possibly model-restated) question that was answered
    pub question: String,

    /// Exactly three advisors
    pub members: Vec<CouncilMember>,
}

/// Where a consultation's content came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResultSource {
    /// Returned by the completion endpoint and fully validated
    Live,
    /// Canned content substituted after a failure
    Fallback,
}

/// The orchestrator's output envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouncilResult {
    /// The consultation content
    pub response: CouncilResponse,

    /// Live or fallback
    pub source: ResultSource,

    /// Why fallback content was substituted; set exactly when
    /// `source` is `Fallback`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Input for the consult_council tool and the REST /consult endpoint
#[derive(Debug, Deserialize)]
pub struct ConsultInput {
    /// The question to put before the council
    pub question: String,
}
