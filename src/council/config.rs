//! Council Configuration
//!
//! Static configuration for the consultation pipeline: completion endpoint
//! credential and identity headers, model selection, and the canned council
//! served when the live path is unavailable. Built once at startup and
//! passed by reference; nothing here is mutated after construction.

use super::models::CouncilMember;
use std::collections::HashMap;

/// Default OpenAI-compatible completion host
pub const DEFAULT_COMPLETIONS_HOST: &str = "https://openrouter.ai";
/// Default model identifier requested from the endpoint
pub const DEFAULT_MODEL: &str = "openai/gpt-4o-mini";

/// Process-wide configuration for the council pipeline
#[derive(Debug, Clone)]
pub struct CouncilConfig {
    /// Bearer credential for the completion endpoint; `None` short-circuits
    /// every consultation to the canned council
    pub api_key: Option<String>,

    /// Base URL of the completion host
    pub host: String,

    /// Model identifier sent with each request
    pub model: String,

    /// Optional HTTP-Referer identity header
    pub referrer: Option<String>,

    /// Optional X-Title identity header
    pub title: Option<String>,

    /// Canned advisors substituted on any live-path failure
    pub fallback_members: Vec<CouncilMember>,
}

impl Default for CouncilConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            host: DEFAULT_COMPLETIONS_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            referrer: None,
            title: None,
            fallback_members: default_fallback_members(),
        }
    }
}

impl CouncilConfig {
    /// Builds the configuration from environment variables, falling back to
    /// defaults for anything unset or blank.
    pub fn from_env() -> Self {
        Self {
            api_key: env_nonempty("OPENROUTER_API_KEY"),
            host: env_nonempty("OPENROUTER_HOST")
                .unwrap_or_else(|| DEFAULT_COMPLETIONS_HOST.to_string()),
            model: env_nonempty("COUNCIL_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            referrer: env_nonempty("COUNCIL_REFERRER"),
            title: env_nonempty("COUNCIL_TITLE"),
            fallback_members: default_fallback_members(),
        }
    }
}

/// Reads an environment variable, treating blank values as unset.
fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// The canned three-member council.
pub fn default_fallback_members() -> Vec<CouncilMember> {
    let member = |name: &str, role: &str, advice: &str, emoji: &str| CouncilMember {
        name: name.to_string(),
        role: role.to_string(),
        advice: advice.to_string(),
        emoji: emoji.to_string(),
        expertise: None,
        cta_label: None,
        cta_url: None,
        extra: HashMap::new(),
    };

    vec![
        member(
            "Sage",
            "Strategist",
            "The live council could not be reached. Step back and restate the decision \
             in one sentence, then list what would have to be true for each option to win.",
            "🧠",
        ),
        member(
            "Forge",
            "Engineer",
            "Without live advice, prefer the smallest reversible step. Try the cheapest \
             experiment that produces real evidence before committing.",
            "🛠️",
        ),
        member(
            "Muse",
            "Designer",
            "Consider who is affected by this choice and how it will feel to them. \
             Sketch the ideal outcome first and work backwards from it.",
            "🎨",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::council::models::COUNCIL_SIZE;

    #[test]
    fn default_config_has_no_credential_and_three_canned_members() {
        let config = CouncilConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.host, DEFAULT_COMPLETIONS_HOST);
        assert_eq!(config.fallback_members.len(), COUNCIL_SIZE);
        for member in &config.fallback_members {
            assert!(!member.name.is_empty());
            assert!(!member.role.is_empty());
            assert!(!member.advice.is_empty());
            assert!(!member.emoji.is_empty());
        }
    }
}
