// Prompt construction for dataset questions
//
// The data sample is a JSON array of row objects, cut at a row boundary so
// that its serialized length never exceeds the configured ceiling.

use datapacket_engine::schema::Schema;
use serde_json::Value;

pub const SYSTEM_PROMPT: &str = r#"You are a data analyst assistant. Use only the provided data and schema.
Return a strict JSON object with keys:
- "answer": the direct response (string, can include a markdown table)
- "logic": a concise explanation of the steps used to compute the answer
If the data is truncated or insufficient, say so in the answer.
Do not include any extra keys or commentary outside the JSON object."#;

/// Serialized rows sent with a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSample {
    pub json: String,
    /// Rows included in `json`
    pub included: usize,
    pub total: usize,
}

impl DataSample {
    pub fn is_truncated(&self) -> bool {
        self.included < self.total
    }
}

/// Serialize rows as a JSON array no longer than `max_chars` characters.
/// Rows that do not fit are dropped whole, from the end.
pub fn bound_sample(rows: &[Value], max_chars: usize) -> DataSample {
    let mut json = String::from("[");
    let mut used = 2; // brackets
    let mut included = 0;

    for row in rows {
        let text = row.to_string();
        let len = text.chars().count() + usize::from(included > 0);
        if used + len > max_chars {
            break;
        }
        if included > 0 {
            json.push(',');
        }
        json.push_str(&text);
        used += len;
        included += 1;
    }
    json.push(']');

    if included < rows.len() {
        log::debug!("data sample truncated to {} of {} rows ({} chars)", included, rows.len(), used);
    }

    DataSample { json, included, total: rows.len() }
}

/// System and user messages for one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

pub fn build_prompt(question: &str, context: &str, schema: &Schema, sample: &DataSample) -> Prompt {
    let schema_json = serde_json::to_string(schema.columns()).unwrap_or_else(|_| "[]".to_string());

    let data_label = if sample.is_truncated() {
        format!("Data (JSON format, truncated to {} of {} rows):", sample.included, sample.total)
    } else {
        "Data (JSON format):".to_string()
    };

    let user = format!(
        "Context: {}\nSchema: {}\n\n{}\n{}\n\nUser Question: {}",
        context, schema_json, data_label, sample.json, question
    );

    Prompt { system: SYSTEM_PROMPT.to_string(), user }
}
