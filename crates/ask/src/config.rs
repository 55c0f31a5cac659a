// Explicit adapter configuration, threaded in at construction time

use datapacket_config::ai::{AIConfigStatus, ResolvedAIConfig};
use datapacket_config::settings::{DEFAULT_MAX_OUTPUT_TOKENS, DEFAULT_MAX_SAMPLE_CHARS, DEFAULT_TIMEOUT_SECS};

use crate::error::AskError;

/// Completions are requested deterministically
pub const TEMPERATURE: f32 = 0.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AskConfig {
    pub model: String,
    /// Chat-completions URL
    pub endpoint: String,
    pub api_key: Option<String>,
    /// Ceiling on the serialized data sample, in characters
    pub max_sample_chars: usize,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
}

impl AskConfig {
    pub fn new(model: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            endpoint: endpoint.into(),
            api_key: None,
            max_sample_chars: DEFAULT_MAX_SAMPLE_CHARS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Derive from a resolved configuration; fails unless it is ready.
    pub fn from_resolved(resolved: &ResolvedAIConfig) -> Result<Self, AskError> {
        match resolved.status {
            AIConfigStatus::Disabled => Err(AskError::NotConfigured(
                resolved
                    .blocking_reason
                    .clone()
                    .unwrap_or_else(|| "AI is disabled".to_string()),
            )),
            AIConfigStatus::MissingKey => Err(AskError::MissingKey),
            AIConfigStatus::Ready => Ok(Self {
                model: resolved.model.clone(),
                endpoint: resolved.endpoint.clone(),
                api_key: resolved.api_key.clone(),
                max_sample_chars: resolved.max_sample_chars,
                max_output_tokens: resolved.max_output_tokens,
                timeout_secs: resolved.timeout_secs,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use datapacket_config::settings::{AIProvider, AISettings};

    #[test]
    fn test_from_resolved_statuses() {
        let no_env = |_: &str| None;
        let missing = ResolvedAIConfig::from_settings_with(&AISettings::default(), no_env);
        assert_eq!(AskConfig::from_resolved(&missing), Err(AskError::MissingKey));

        let disabled = ResolvedAIConfig::from_settings_with(
            &AISettings { provider: AIProvider::None, ..AISettings::default() },
            no_env,
        );
        assert!(matches!(AskConfig::from_resolved(&disabled), Err(AskError::NotConfigured(_))));

        let settings = AISettings { max_sample_chars: 500, ..AISettings::default() };
        let ready = ResolvedAIConfig::from_settings_with(&settings, |name: &str| {
            (name == "GROQ_API_KEY").then(|| "k".to_string())
        });
        let config = AskConfig::from_resolved(&ready).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("k"));
        assert_eq!(config.max_sample_chars, 500);
        assert_eq!(config.model, "openai/gpt-oss-120b");
    }
}
