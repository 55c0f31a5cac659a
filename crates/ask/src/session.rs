// Chat history over one dataset

use serde::{Deserialize, Serialize};

use datapacket_engine::row::Dataset;

use crate::assistant::DataAssistant;
use crate::backend::CompletionBackend;

/// Assistant turn shown when a completion call fails
pub const ERROR_REPLY: &str = "Sorry, I encountered an error analyzing the data.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logic: Option<String>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into(), logic: None }
    }

    pub fn assistant(content: impl Into<String>, logic: Option<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into(), logic }
    }
}

/// Ordered question/answer history.
///
/// `ask` takes `&mut self`, so one session has at most one question in flight
/// and answers land in submission order.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    context: String,
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new(context: impl Into<String>) -> Self {
        Self { context: context.into(), messages: Vec::new() }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Ask a question and append both turns. Blank questions are ignored and
    /// return `None`; otherwise returns the assistant turn.
    pub fn ask<B: CompletionBackend>(
        &mut self,
        assistant: &DataAssistant<B>,
        question: &str,
        dataset: &Dataset,
    ) -> Option<&ChatMessage> {
        let question = question.trim();
        if question.is_empty() {
            return None;
        }

        self.messages.push(ChatMessage::user(question));
        let reply = match assistant.ask(question, &self.context, dataset) {
            Ok(answer) => ChatMessage::assistant(answer.answer, answer.logic),
            Err(_) => ChatMessage::assistant(ERROR_REPLY, None),
        };
        self.messages.push(reply);
        self.messages.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::testing::{config, dataset, FakeBackend};
    use crate::error::AskError;

    #[test]
    fn test_blank_question_is_ignored() {
        let backend = FakeBackend::new(vec![]);
        let assistant = DataAssistant::new(&backend, config());
        let mut session = ChatSession::new("sales");

        assert!(session.ask(&assistant, "   \t", &dataset()).is_none());
        assert!(session.messages().is_empty());
        assert!(backend.requests.borrow().is_empty());
    }

    #[test]
    fn test_turns_are_ordered() {
        let backend = FakeBackend::new(vec![
            Ok(r#"{"answer":"Two regions.","logic":"Distinct Region values."}"#.into()),
            Ok("not json".into()),
        ]);
        let assistant = DataAssistant::new(&backend, config());
        let mut session = ChatSession::new("sales");
        let ds = dataset();

        session.ask(&assistant, "How many regions?", &ds);
        session.ask(&assistant, " Anything else? ", &ds);

        let contents: Vec<(ChatRole, &str)> =
            session.messages().iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            contents,
            vec![
                (ChatRole::User, "How many regions?"),
                (ChatRole::Assistant, "Two regions."),
                (ChatRole::User, "Anything else?"),
                (ChatRole::Assistant, "not json"),
            ]
        );
        assert_eq!(session.messages()[1].logic.as_deref(), Some("Distinct Region values."));
        assert!(backend.requests.borrow()[0].user.starts_with("Context: sales\n"));
    }

    #[test]
    fn test_failure_becomes_error_turn() {
        let backend = FakeBackend::new(vec![Err(AskError::Network("timed out".into()))]);
        let assistant = DataAssistant::new(&backend, config());
        let mut session = ChatSession::default();

        let reply = session.ask(&assistant, "q", &dataset()).cloned();
        assert_eq!(reply, Some(ChatMessage::assistant(ERROR_REPLY, None)));
        assert_eq!(session.messages().len(), 2);
    }

    #[test]
    fn test_message_json() {
        let value = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert_eq!(value, serde_json::json!({"role": "user", "content": "hi"}));
    }
}
