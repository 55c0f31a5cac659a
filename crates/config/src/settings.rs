// User settings
// Loaded from ~/.config/datapacket/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Upper bound on serialized sample rows sent with a question
pub const DEFAULT_MAX_SAMPLE_CHARS: usize = 30_000;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1024;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// AI provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIProvider {
    /// Question answering disabled
    None,
    /// Groq's OpenAI-compatible endpoint
    #[default]
    Groq,
    /// OpenAI API
    #[serde(rename = "openai")]
    OpenAI,
    /// Local OpenAI-compatible server (e.g. Ollama)
    Local,
}

impl AIProvider {
    /// Returns true if AI features are enabled
    pub fn is_enabled(&self) -> bool {
        !matches!(self, AIProvider::None)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AIProvider::None => "none",
            AIProvider::Groq => "groq",
            AIProvider::OpenAI => "openai",
            AIProvider::Local => "local",
        }
    }

    /// Returns the default model for this provider
    pub fn default_model(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::Groq => "openai/gpt-oss-120b",
            AIProvider::OpenAI => "gpt-4o-mini",
            AIProvider::Local => "llama3:8b",
        }
    }

    /// Chat-completions URL used when settings don't override it
    pub fn default_endpoint(&self) -> &'static str {
        match self {
            AIProvider::None => "",
            AIProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
            AIProvider::OpenAI => "https://api.openai.com/v1/chat/completions",
            AIProvider::Local => "http://localhost:11434/v1/chat/completions",
        }
    }

    pub fn needs_api_key(&self) -> bool {
        matches!(self, AIProvider::Groq | AIProvider::OpenAI)
    }

    /// The provider's own key variable, checked after ours
    pub fn conventional_env_var(&self) -> Option<&'static str> {
        match self {
            AIProvider::Groq => Some("GROQ_API_KEY"),
            AIProvider::OpenAI => Some("OPENAI_API_KEY"),
            AIProvider::None | AIProvider::Local => None,
        }
    }
}

impl std::str::FromStr for AIProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "off" => Ok(AIProvider::None),
            "groq" => Ok(AIProvider::Groq),
            "openai" => Ok(AIProvider::OpenAI),
            "local" | "ollama" => Ok(AIProvider::Local),
            other => Err(format!("unknown AI provider '{other}' (expected none, groq, openai or local)")),
        }
    }
}

/// AI-specific settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AISettings {
    /// Selected AI provider
    pub provider: AIProvider,

    /// Model identifier (provider-specific). Empty = provider default
    pub model: String,

    /// Chat-completions URL override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Ceiling on the serialized data sample, in characters
    pub max_sample_chars: usize,

    pub max_output_tokens: u32,

    pub timeout_secs: u64,
}

impl Default for AISettings {
    fn default() -> Self {
        Self {
            provider: AIProvider::default(),
            model: String::new(),
            endpoint: None,
            max_sample_chars: DEFAULT_MAX_SAMPLE_CHARS,
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl AISettings {
    /// Get the effective model (user-specified or provider default)
    pub fn effective_model(&self) -> &str {
        if self.model.is_empty() {
            self.provider.default_model()
        } else {
            &self.model
        }
    }

    pub fn effective_endpoint(&self) -> &str {
        match self.endpoint.as_deref() {
            Some(url) if !url.trim().is_empty() => url,
            _ => self.provider.default_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "ai", default)]
    pub ai: AISettings,
}

const DEFAULT_CONFIG: &str = r#"{
    // Natural-language questions about a dataset
    // Provider options: "none", "groq", "openai", "local"
    // API keys come from the environment (DATAPACKET_GROQ_KEY, GROQ_API_KEY, ...)
    // or the system keychain, never from this file
    "ai": {
        "provider": "groq",
        "model": "",
        // Serialized rows beyond this many characters are not sent
        "max_sample_chars": 30000,
        "max_output_tokens": 1024,
        "timeout_secs": 60
    }
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("datapacket");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from an explicit path. A missing file is created with commented
    /// defaults; an unreadable or invalid file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            create_default_file(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings text. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

fn create_default_file(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("Error creating config directory: {}", e);
            return;
        }
    }

    if let Err(e) = fs::write(path, DEFAULT_CONFIG) {
        log::warn!("Error writing default settings.json: {}", e);
    }
}
