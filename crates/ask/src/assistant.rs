use datapacket_engine::row::Dataset;

use crate::answer::{parse_answer, AskAnswer};
use crate::backend::{CompletionBackend, CompletionRequest, OpenAiCompatibleBackend};
use crate::config::AskConfig;
use crate::error::AskError;
use crate::prompt::{bound_sample, build_prompt};

/// Answers questions about a dataset through a completion backend.
pub struct DataAssistant<B> {
    backend: B,
    config: AskConfig,
}

impl DataAssistant<OpenAiCompatibleBackend> {
    /// Assistant backed by the configured HTTP endpoint.
    pub fn connect(config: AskConfig) -> Result<Self, AskError> {
        let backend = OpenAiCompatibleBackend::new(&config)?;
        Ok(Self { backend, config })
    }
}

impl<B: CompletionBackend> DataAssistant<B> {
    pub fn new(backend: B, config: AskConfig) -> Self {
        Self { backend, config }
    }

    pub fn config(&self) -> &AskConfig {
        &self.config
    }

    /// Ask one question. Rows are sent in schema order without identities,
    /// bounded by `max_sample_chars`.
    ///
    /// Only a failed call is an error; any completion text yields an answer.
    pub fn ask(&self, question: &str, context: &str, dataset: &Dataset) -> Result<AskAnswer, AskError> {
        let rows = dataset.rows_json();
        let sample = bound_sample(&rows, self.config.max_sample_chars);
        let prompt = build_prompt(question, context, dataset.schema(), &sample);
        let request = CompletionRequest::new(&self.config, prompt);

        let content = self.backend.complete(&request).map_err(|e| {
            log::warn!("completion failed: {}", e);
            e
        })?;

        Ok(parse_answer(&content))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;

    use super::*;

    /// Backend returning canned replies and recording requests
    pub struct FakeBackend {
        pub replies: RefCell<Vec<Result<String, AskError>>>,
        pub requests: RefCell<Vec<CompletionRequest>>,
    }

    impl FakeBackend {
        pub fn new(replies: Vec<Result<String, AskError>>) -> Self {
            Self { replies: RefCell::new(replies), requests: RefCell::new(Vec::new()) }
        }
    }

    impl CompletionBackend for FakeBackend {
        fn complete(&self, request: &CompletionRequest) -> Result<String, AskError> {
            self.requests.borrow_mut().push(request.clone());
            let mut replies = self.replies.borrow_mut();
            if replies.is_empty() {
                return Err(AskError::InvalidResponse("no reply queued".into()));
            }
            replies.remove(0)
        }
    }

    pub fn dataset() -> Dataset {
        use datapacket_engine::row::RawRow;
        use datapacket_engine::schema::ColumnDefinition;
        use datapacket_engine::value::RawValue;

        let columns = vec![ColumnDefinition::text("Region"), ColumnDefinition::number("Revenue")];
        let raw: Vec<RawRow> = [("North", "100"), ("South", "bad"), ("North", "20")]
            .iter()
            .map(|(region, revenue)| {
                [("Region".to_string(), RawValue::from(*region)), ("Revenue".to_string(), RawValue::from(*revenue))]
                    .into_iter()
                    .collect()
            })
            .collect();
        Dataset::from_raw(&columns, &raw).unwrap()
    }

    pub fn config() -> AskConfig {
        AskConfig::new("test-model", "http://localhost/v1/chat/completions")
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{config, dataset, FakeBackend};
    use super::*;

    #[test]
    fn test_request_is_deterministic_and_bounded() {
        let backend = FakeBackend::new(vec![Ok(r#"{"answer":"120","logic":"sum"}"#.into())]);
        let assistant = DataAssistant::new(&backend, config());

        let answer = assistant.ask("Total North revenue?", "sales", &dataset()).unwrap();
        assert_eq!(answer, AskAnswer { answer: "120".into(), logic: Some("sum".into()) });

        let requests = backend.requests.borrow();
        let request = &requests[0];
        assert_eq!(request.model, "test-model");
        assert_eq!(request.temperature, 0.0);
        assert_eq!(request.max_tokens, 1024);
        assert!(request.user.contains(r#"{"Region":"South","Revenue":null}"#));
        assert!(!request.user.contains("__row_id"));
    }

    #[test]
    fn test_small_ceiling_truncates_sample() {
        let backend = FakeBackend::new(vec![Ok("plain text".into())]);
        let mut cfg = config();
        cfg.max_sample_chars = 40;
        let assistant = DataAssistant::new(&backend, cfg);

        let answer = assistant.ask("q", "", &dataset()).unwrap();
        assert_eq!(answer.answer, "plain text");
        assert!(backend.requests.borrow()[0].user.contains("truncated to 1 of 3 rows"));
    }

    #[test]
    fn test_call_failure_is_distinct_from_parse_fallback() {
        let backend = FakeBackend::new(vec![Err(AskError::Api { status: 401, message: "bad key".into() })]);
        let assistant = DataAssistant::new(&backend, config());
        assert_eq!(
            assistant.ask("q", "", &dataset()).unwrap_err(),
            AskError::Api { status: 401, message: "bad key".into() }
        );
    }
}
