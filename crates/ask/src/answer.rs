// Tolerant parsing of completion text
//
// A completion is never rejected for its shape: when the text does not hold a
// JSON object, the whole text becomes the answer.

use serde::Serialize;
use serde_json::{Map, Value};

pub const NO_ANSWER: &str = "No answer generated.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AskAnswer {
    pub answer: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
}

impl AskAnswer {
    /// Raw text as the answer; only an empty completion has no answer.
    fn raw(content: &str) -> Self {
        let answer = if content.is_empty() { NO_ANSWER.to_string() } else { content.to_string() };
        Self { answer, logic: None }
    }
}

/// Extract `answer` and `logic` from completion text.
///
/// The object is taken from the first `{` to the last `}`, so surrounding
/// prose or markdown fences are ignored. A parsed object missing a usable
/// `answer` yields [`NO_ANSWER`] and keeps its `logic`.
pub fn parse_answer(content: &str) -> AskAnswer {
    let Some(object) = extract_object(content) else {
        return AskAnswer::raw(content);
    };

    let logic = object.get("logic").and_then(text_of);
    let answer = object.get("answer").and_then(text_of).unwrap_or_else(|| {
        log::debug!("completion JSON has no usable answer");
        NO_ANSWER.to_string()
    });
    AskAnswer { answer, logic }
}

fn extract_object(content: &str) -> Option<Map<String, Value>> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&content[start..=end]) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Strings are used as-is; other scalars and nested values are rendered as JSON.
fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
