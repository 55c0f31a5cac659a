// AI configuration and secrets management
//
// API keys are looked up in:
// 1. System keychain (when built with the `keychain` feature)
// 2. DATAPACKET_<PROVIDER>_KEY
// 3. The provider's conventional variable (GROQ_API_KEY, OPENAI_API_KEY)
//
// Keys are NEVER stored in settings.json

use std::env;

use serde::Serialize;

use crate::settings::{AIProvider, AISettings, Settings};

/// Service name for keychain storage
#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
const KEYCHAIN_SERVICE: &str = "datapacket";

/// Source of an API key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeySource {
    /// Key retrieved from system keychain
    Keychain,
    /// Key retrieved from environment variable
    Environment,
    /// No key found
    None,
}

impl KeySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySource::Keychain => "keychain",
            KeySource::Environment => "environment",
            KeySource::None => "none",
        }
    }
}

/// Result of key lookup
#[derive(Debug, Clone)]
pub struct KeyLookup {
    pub key: Option<String>,
    pub source: KeySource,
}

/// Get the environment variable name for a provider
pub fn env_var_name(provider: &str) -> String {
    format!("DATAPACKET_{}_KEY", provider.to_uppercase())
}

#[cfg_attr(not(feature = "keychain"), allow(dead_code))]
fn keychain_account(provider: &str) -> String {
    format!("ai/{}", provider.to_lowercase())
}

/// Get an API key for the provider from the keychain or process environment.
pub fn get_api_key(provider: AIProvider) -> KeyLookup {
    #[cfg(feature = "keychain")]
    {
        if let Ok(entry) = keyring::Entry::new(KEYCHAIN_SERVICE, &keychain_account(provider.name())) {
            if let Ok(key) = entry.get_password() {
                return KeyLookup {
                    key: Some(key),
                    source: KeySource::Keychain,
                };
            }
        }
    }

    lookup_env_key(provider, |name| env::var(name).ok())
}

/// Environment part of the key lookup, reading variables through `var`.
pub fn lookup_env_key<F>(provider: AIProvider, var: F) -> KeyLookup
where
    F: Fn(&str) -> Option<String>,
{
    let names = std::iter::once(env_var_name(provider.name()))
        .chain(provider.conventional_env_var().map(str::to_string));

    for name in names {
        if let Some(key) = var(&name).filter(|k| !k.trim().is_empty()) {
            log::debug!("API key for {} found in {}", provider.name(), name);
            return KeyLookup {
                key: Some(key),
                source: KeySource::Environment,
            };
        }
    }

    KeyLookup {
        key: None,
        source: KeySource::None,
    }
}

/// Check if keychain support is available
pub fn keychain_available() -> bool {
    #[cfg(feature = "keychain")]
    {
        keyring::Entry::new(KEYCHAIN_SERVICE, "test").is_ok()
    }
    #[cfg(not(feature = "keychain"))]
    {
        false
    }
}

// ============================================================================
// Resolved AI Configuration (single source of truth)
// ============================================================================

/// The effective AI configuration, fully resolved from all sources.
#[derive(Debug, Clone)]
pub struct ResolvedAIConfig {
    pub provider: AIProvider,
    /// Effective model (resolved from settings or provider default)
    pub model: String,
    /// Chat-completions URL
    pub endpoint: String,
    /// API key (if available and provider needs one)
    pub api_key: Option<String>,
    pub key_source: KeySource,
    pub max_sample_chars: usize,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    /// Overall status
    pub status: AIConfigStatus,
    /// Human-readable reason if not ready
    pub blocking_reason: Option<String>,
}

/// Status of the AI configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AIConfigStatus {
    /// AI is disabled (provider = None)
    Disabled,
    Ready,
    /// Provider is configured but API key is missing
    MissingKey,
}

impl AIConfigStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ready => "ready",
            Self::MissingKey => "missing_key",
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl ResolvedAIConfig {
    /// Resolve the effective AI configuration from settings and the
    /// keychain/process environment.
    pub fn from_settings(settings: &AISettings) -> Self {
        let lookup = if settings.provider.needs_api_key() {
            get_api_key(settings.provider)
        } else {
            KeyLookup {
                key: None,
                source: KeySource::None,
            }
        };
        Self::resolve(settings, lookup)
    }

    /// Resolve with an explicit variable source instead of the process environment.
    pub fn from_settings_with<F>(settings: &AISettings, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = if settings.provider.needs_api_key() {
            lookup_env_key(settings.provider, var)
        } else {
            KeyLookup {
                key: None,
                source: KeySource::None,
            }
        };
        Self::resolve(settings, lookup)
    }

    fn resolve(settings: &AISettings, lookup: KeyLookup) -> Self {
        let provider = settings.provider;

        if !provider.is_enabled() {
            return Self {
                provider,
                model: String::new(),
                endpoint: String::new(),
                api_key: None,
                key_source: KeySource::None,
                max_sample_chars: settings.max_sample_chars,
                max_output_tokens: settings.max_output_tokens,
                timeout_secs: settings.timeout_secs,
                status: AIConfigStatus::Disabled,
                blocking_reason: Some("AI is disabled (provider = none)".to_string()),
            };
        }

        let (status, blocking_reason) = if provider.needs_api_key() && lookup.key.is_none() {
            let mut reason = format!("No API key found. Set {}", env_var_name(provider.name()));
            if let Some(conventional) = provider.conventional_env_var() {
                reason.push_str(&format!(" or {}", conventional));
            }
            (AIConfigStatus::MissingKey, Some(reason))
        } else {
            (AIConfigStatus::Ready, None)
        };

        Self {
            provider,
            model: settings.effective_model().to_string(),
            endpoint: settings.effective_endpoint().to_string(),
            api_key: lookup.key,
            key_source: lookup.source,
            max_sample_chars: settings.max_sample_chars,
            max_output_tokens: settings.max_output_tokens,
            timeout_secs: settings.timeout_secs,
            status,
            blocking_reason,
        }
    }

    /// Load settings and resolve in one call (convenience method)
    pub fn load() -> Self {
        let settings = Settings::load();
        Self::from_settings(&settings.ai)
    }

    /// Provider display name
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }
}

// ============================================================================
// Diagnostics (for CLI doctor and debugging)
// ============================================================================

/// Diagnostic information about AI configuration. Never carries the key itself.
#[derive(Debug, Serialize)]
pub struct AIDiagnostics {
    pub provider: String,
    pub model: String,
    pub endpoint: String,
    pub status: AIConfigStatus,
    pub key_present: bool,
    pub key_source: KeySource,
    pub keychain_available: bool,
    pub max_sample_chars: usize,
    pub max_output_tokens: u32,
    pub timeout_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocking_reason: Option<String>,
    pub config_path: String,
}

impl AIDiagnostics {
    pub fn from_resolved(config: &ResolvedAIConfig) -> Self {
        Self {
            provider: config.provider.name().to_string(),
            model: config.model.clone(),
            endpoint: config.endpoint.clone(),
            status: config.status,
            key_present: config.api_key.is_some(),
            key_source: config.key_source,
            keychain_available: keychain_available(),
            max_sample_chars: config.max_sample_chars,
            max_output_tokens: config.max_output_tokens,
            timeout_secs: config.timeout_secs,
            blocking_reason: config.blocking_reason.clone(),
            config_path: Settings::config_path_display(),
        }
    }
}

impl std::fmt::Display for AIDiagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "AI Configuration")?;
        writeln!(f, "──────────────────────────────")?;
        writeln!(f, "Provider:          {}", self.provider)?;
        writeln!(f, "Status:            {}", self.status.as_str())?;
        writeln!(f, "Model:             {}", self.model)?;
        writeln!(f, "Endpoint:          {}", self.endpoint)?;
        writeln!(f, "Key present:       {}", if self.key_present { "yes" } else { "no" })?;
        writeln!(f, "Key source:        {}", self.key_source.as_str())?;
        writeln!(f, "Keychain available:{}", if self.keychain_available { "yes" } else { "no" })?;
        writeln!(f, "Sample limit:      {} chars", self.max_sample_chars)?;
        writeln!(f, "Output tokens:     {}", self.max_output_tokens)?;
        writeln!(f, "Timeout:           {}s", self.timeout_secs)?;
        writeln!(f, "Settings file:     {}", self.config_path)?;
        if let Some(reason) = &self.blocking_reason {
            writeln!(f)?;
            writeln!(f, "{}", reason)?;
        }
        Ok(())
    }
}
