use std::fmt;

/// Failure of a question round-trip.
///
/// Only transport and configuration problems are errors: a completion whose
/// text is not well-formed JSON still yields an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskError {
    /// Provider disabled or unusable
    NotConfigured(String),
    /// API key missing
    MissingKey,
    /// Network error
    Network(String),
    /// API error response
    Api { status: u16, message: String },
    /// Response body was not a chat completion
    InvalidResponse(String),
}

impl fmt::Display for AskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AskError::NotConfigured(msg) => write!(f, "AI not configured: {}", msg),
            AskError::MissingKey => write!(f, "API key not configured"),
            AskError::Network(msg) => write!(f, "Network error: {}", msg),
            AskError::Api { status, message } => write!(f, "API error ({}): {}", status, message),
            AskError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for AskError {}
