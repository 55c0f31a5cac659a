// Natural-language questions over a dataset
//
// A question, a short context string and the dataset are turned into a
// bounded prompt, sent to a completion backend, and the reply is parsed
// tolerantly into an answer plus optional reasoning.

pub mod answer;
pub mod assistant;
pub mod backend;
pub mod config;
pub mod error;
pub mod prompt;
pub mod session;

pub use answer::{parse_answer, AskAnswer, NO_ANSWER};
pub use assistant::DataAssistant;
pub use backend::{CompletionBackend, CompletionRequest, OpenAiCompatibleBackend};
pub use config::AskConfig;
pub use error::AskError;
pub use prompt::{bound_sample, build_prompt, DataSample, Prompt, SYSTEM_PROMPT};
pub use session::{ChatMessage, ChatRole, ChatSession, ERROR_REPLY};
