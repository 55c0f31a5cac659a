// ask, chat and ai doctor

use std::io::{self, BufRead};
use std::path::Path;

use datapacket_ask::{AskConfig, AskError, ChatRole, ChatSession, DataAssistant, OpenAiCompatibleBackend};
use datapacket_config::ai::{AIConfigStatus, AIDiagnostics, ResolvedAIConfig};
use datapacket_config::settings::Settings;

use crate::exit_codes::{ask_exit_code, EXIT_AI_DISABLED, EXIT_AI_MISSING_KEY};
use crate::{load_dataset, print_json, CliError};

fn load_settings(config: Option<&Path>) -> (Settings, String) {
    match config {
        Some(path) => (Settings::load_from(path), path.display().to_string()),
        None => (Settings::load(), Settings::config_path_display()),
    }
}

fn resolve(config: Option<&Path>) -> (ResolvedAIConfig, String) {
    let (settings, path) = load_settings(config);
    (ResolvedAIConfig::from_settings(&settings.ai), path)
}

fn connect(config: Option<&Path>) -> Result<DataAssistant<OpenAiCompatibleBackend>, AskError> {
    let (resolved, _) = resolve(config);
    let ask_config = AskConfig::from_resolved(&resolved)?;
    log::debug!("asking {} via {}", ask_config.model, ask_config.endpoint);
    DataAssistant::connect(ask_config)
}

fn default_context(file: &Path) -> String {
    let name = file.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    format!("Dataset imported from {}", name)
}

fn ask_failure(err: &AskError) -> CliError {
    let hint = match err {
        AskError::NotConfigured(_) | AskError::MissingKey => Some("run `dpk ai doctor` for details".to_string()),
        _ => None,
    };
    CliError { code: ask_exit_code(err), message: String::new(), hint }
}

// ============================================================================
// ask
// ============================================================================

pub(crate) fn cmd_ask(
    config: Option<&Path>,
    file: &Path,
    question: &str,
    context: Option<String>,
    overrides: &[String],
) -> Result<(), CliError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(CliError::args("question is empty"));
    }

    let dataset = load_dataset(file, overrides)?;
    let context = context.unwrap_or_else(|| default_context(file));

    let result = connect(config).and_then(|assistant| assistant.ask(question, &context, &dataset));
    match result {
        Ok(answer) => print_json(&serde_json::json!({
            "success": true,
            "answer": answer.answer,
            "logic": answer.logic,
        })),
        Err(err) => {
            print_json(&serde_json::json!({
                "success": false,
                "error": err.to_string(),
            }))?;
            Err(ask_failure(&err))
        }
    }
}

// ============================================================================
// chat
// ============================================================================

pub(crate) fn cmd_chat(
    config: Option<&Path>,
    file: &Path,
    context: Option<String>,
    json: bool,
    overrides: &[String],
) -> Result<(), CliError> {
    let dataset = load_dataset(file, overrides)?;
    let assistant = connect(config).map_err(|err| {
        let mut failure = ask_failure(&err);
        failure.message = err.to_string();
        failure
    })?;
    let mut session = ChatSession::new(context.unwrap_or_else(|| default_context(file)));

    for line in io::stdin().lock().lines() {
        let line = line.map_err(|e| CliError::io(format!("stdin: {}", e)))?;
        let Some(reply) = session.ask(&assistant, &line, &dataset) else {
            continue;
        };
        if !json {
            println!("{}", reply.content);
            if let Some(logic) = &reply.logic {
                println!("  logic: {}", logic);
            }
            println!();
        }
    }

    if json {
        return print_json(&serde_json::json!({ "messages": session.messages() }));
    }

    let asked = session.messages().iter().filter(|m| m.role == ChatRole::User).count();
    log::debug!("chat finished after {} questions", asked);
    Ok(())
}

// ============================================================================
// ai doctor
// ============================================================================

pub(crate) fn cmd_ai_doctor(config: Option<&Path>, json: bool) -> Result<(), CliError> {
    let (resolved, path) = resolve(config);
    let mut diag = AIDiagnostics::from_resolved(&resolved);
    diag.config_path = path;

    if json {
        let value = serde_json::to_value(&diag).map_err(|e| CliError::general(e.to_string()))?;
        print_json(&value)?;
    } else {
        print!("{}", diag);
    }

    match resolved.status {
        AIConfigStatus::Ready => Ok(()),
        AIConfigStatus::Disabled => Err(CliError {
            code: EXIT_AI_DISABLED,
            message: "AI is disabled".to_string(),
            hint: Some("set ai.provider in the settings file".to_string()),
        }),
        AIConfigStatus::MissingKey => Err(CliError {
            code: EXIT_AI_MISSING_KEY,
            message: resolved.blocking_reason.clone().unwrap_or_else(|| "API key missing".to_string()),
            hint: None,
        }),
    }
}
