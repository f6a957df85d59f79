// ABOUTME: Provider compatibility table: which historical messages must carry reasoning text.
// ABOUTME: Profiles are matched by base-URL/model substrings; error bodies can correct a wrong guess.

/// Which historical assistant messages carry a `reasoning_content` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReasoningPolicy {
    /// Never send reasoning fields.
    Omit,
    /// Send reasoning only on assistant messages that carry tool calls.
    ToolCallsOnly,
    /// Send reasoning on every assistant message.
    AllAssistant,
}

/// A provider's request-shape quirks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderProfile {
    pub name: &'static str,
    pub reasoning: ReasoningPolicy,
}

/// Substring-keyed profiles, checked in order against the lowercased base URL and model.
pub const PROVIDER_PROFILES: &[(&str, ProviderProfile)] = &[
    (
        "deepseek",
        ProviderProfile {
            name: "deepseek",
            reasoning: ReasoningPolicy::ToolCallsOnly,
        },
    ),
    (
        "moonshot",
        ProviderProfile {
            name: "moonshot",
            reasoning: ReasoningPolicy::ToolCallsOnly,
        },
    ),
    (
        "kimi",
        ProviderProfile {
            name: "moonshot",
            reasoning: ReasoningPolicy::ToolCallsOnly,
        },
    ),
    (
        "api.openai.com",
        ProviderProfile {
            name: "openai",
            reasoning: ReasoningPolicy::Omit,
        },
    ),
    (
        "dashscope",
        ProviderProfile {
            name: "dashscope",
            reasoning: ReasoningPolicy::Omit,
        },
    ),
    (
        "openrouter",
        ProviderProfile {
            name: "openrouter",
            reasoning: ReasoningPolicy::Omit,
        },
    ),
];

const DEFAULT_PROFILE: ProviderProfile = ProviderProfile {
    name: "generic",
    reasoning: ReasoningPolicy::Omit,
};

/// Pick the profile for a backend by matching its base URL, then its model name.
pub fn profile_for(base_url: &str, model: &str) -> ProviderProfile {
    let base_url = base_url.to_lowercase();
    let model = model.to_lowercase();
    PROVIDER_PROFILES
        .iter()
        .find(|(needle, _)| base_url.contains(needle))
        .or_else(|| {
            PROVIDER_PROFILES
                .iter()
                .find(|(needle, _)| model.contains(needle))
        })
        .map(|(_, profile)| *profile)
        .unwrap_or(DEFAULT_PROFILE)
}

/// Infer a corrected reasoning policy from a 400 error body.
///
/// Returns None when the body does not complain about reasoning fields.
pub fn corrected_policy(error_body: &str) -> Option<ReasoningPolicy> {
    let body = error_body.to_lowercase();
    if !body.contains("reasoning_content") {
        return None;
    }
    if body.contains("missing") {
        return Some(ReasoningPolicy::AllAssistant);
    }
    if ["not allowed", "invalid", "unexpected"]
        .iter()
        .any(|needle| body.contains(needle))
    {
        return Some(ReasoningPolicy::Omit);
    }
    None
}
