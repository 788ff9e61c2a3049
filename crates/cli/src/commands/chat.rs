use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use docent_agent::{client_from_config, LlmGenerationService};
use docent_core::config::{AppConfig, LoadOptions};
use docent_core::conversation::{ConversationController, LeadPrompt, Reply};
use docent_core::domain::document::SourceDocument;
use docent_core::domain::lead::{LeadField, LeadForm};
use docent_core::domain::session::Session;
use docent_core::errors::ConversationError;
use docent_core::generation::ExtractiveGenerationService;
use docent_core::retrieval::KeywordRetrievalService;
use docent_core::services::GenerationService;
use tracing::info;

use crate::commands::{
    CommandResult, EXIT_CONFIG_INVALID, EXIT_INPUT_UNUSABLE, EXIT_RUNTIME_FAILURE,
};
use crate::logging::init_logging;

const COMMAND: &str = "chat";

type Controller = ConversationController<KeywordRetrievalService, Box<dyn GenerationService>>;

pub fn run(docs: &[PathBuf]) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                error.to_string(),
                EXIT_CONFIG_INVALID,
            )
        }
    };
    init_logging(&config);

    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with_io(&config, docs, &mut stdin.lock(), &mut stdout.lock())
}

/// Runs one chat session over arbitrary line-based IO.
///
/// Input ends at EOF or on a line reading `exit` or `quit`.
pub fn run_with_io<R, W>(
    config: &AppConfig,
    docs: &[PathBuf],
    input: &mut R,
    output: &mut W,
) -> CommandResult
where
    R: BufRead,
    W: Write,
{
    let documents = match read_documents(docs) {
        Ok(documents) => documents,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "document_read",
                error.to_string(),
                EXIT_INPUT_UNUSABLE,
            )
        }
    };

    let controller = match build_controller(config) {
        Ok(controller) => controller,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "llm_setup",
                format!("{error:#}"),
                EXIT_RUNTIME_FAILURE,
            )
        }
    };

    let mut session = Session::new();
    if let Err(error) = controller.ingest(&mut session, documents) {
        let interface = error.into_interface(session.id().to_string());
        return CommandResult::failure(
            COMMAND,
            "ingest",
            interface.user_message(),
            EXIT_INPUT_UNUSABLE,
        );
    }

    match converse(&controller, &mut session, input, output) {
        Ok(()) => {
            info!(
                event_name = "chat.session_ended",
                session_id = %session.id(),
                turns = session.history().len(),
                lead_captured = session.lead().is_some(),
                "chat session ended"
            );
            let exchanges = session.history().len() / 2;
            let lead = if session.lead().is_some() { "captured" } else { "not captured" };
            CommandResult::success(
                COMMAND,
                format!("session ended after {exchanges} answered question(s); lead {lead}"),
            )
        }
        Err(error) => CommandResult::failure(
            COMMAND,
            "io",
            format!("{error:#}"),
            EXIT_RUNTIME_FAILURE,
        ),
    }
}

fn read_documents(paths: &[PathBuf]) -> Result<Vec<SourceDocument>> {
    paths
        .iter()
        .map(|path| -> Result<SourceDocument> {
            let text = fs::read_to_string(path)
                .map_err(|error| anyhow!("could not read `{}`: {error}", path.display()))?;
            Ok(SourceDocument::new(document_name(path), text))
        })
        .collect()
}

fn document_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn build_controller(config: &AppConfig) -> Result<Controller> {
    let retrieval = KeywordRetrievalService::default();
    let Some(client) = client_from_config(&config.llm)? else {
        let generation: Box<dyn GenerationService> =
            Box::new(ExtractiveGenerationService::default());
        return Ok(ConversationController::from_config(config, retrieval, generation));
    };

    let service = LlmGenerationService::new(client)?;
    let generation: Box<dyn GenerationService> = Box::new(service.clone());
    let controller = ConversationController::from_config(config, retrieval, generation);
    if config.retrieval.condense_question {
        return Ok(controller.with_rewriter(Box::new(service)));
    }
    Ok(controller)
}

fn converse<R, W>(
    controller: &Controller,
    session: &mut Session,
    input: &mut R,
    output: &mut W,
) -> Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "Ask a question about your documents (type `exit` to quit).")?;
    loop {
        write!(output, "> ")?;
        output.flush()?;
        let Some(line) = read_line(input)? else {
            return Ok(());
        };
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if utterance.eq_ignore_ascii_case("exit") || utterance.eq_ignore_ascii_case("quit") {
            return Ok(());
        }

        match controller.handle(session, utterance) {
            Ok(Reply::Answer(answer)) => writeln!(output, "Assistant: {answer}")?,
            Ok(Reply::LeadPrompt(prompt)) => {
                if !collect_lead(controller, session, prompt, input, output)? {
                    return Ok(());
                }
            }
            Ok(Reply::LeadCaptured { message, .. }) => writeln!(output, "{message}")?,
            Err(error) => {
                let interface = error.into_interface(session.id().to_string());
                writeln!(output, "Error: {}", interface.user_message())?;
            }
        }
    }
}

/// Prompts for every field until the lead validates. Returns false on EOF.
fn collect_lead<R, W>(
    controller: &Controller,
    session: &mut Session,
    mut prompt: LeadPrompt,
    input: &mut R,
    output: &mut W,
) -> Result<bool>
where
    R: BufRead,
    W: Write,
{
    loop {
        writeln!(output, "{}", prompt.message)?;
        let mut form = LeadForm::default();
        for field in &prompt.fields {
            match &field.prefill {
                Some(prefill) => write!(output, "{} [{prefill}]: ", field.label)?,
                None => write!(output, "{}: ", field.label)?,
            }
            output.flush()?;
            let Some(line) = read_line(input)? else {
                return Ok(false);
            };
            let value = match (line.trim(), &field.prefill) {
                ("", Some(prefill)) => prefill.clone(),
                (typed, _) => typed.to_string(),
            };
            match field.field {
                LeadField::Name => form.name = value,
                LeadField::Phone => form.phone = value,
                LeadField::Email => form.email = value,
                LeadField::Date => form.date = value,
            }
        }

        match controller.submit_lead(session, &form) {
            Ok(reply) => {
                writeln!(output, "{}", reply.text())?;
                return Ok(true);
            }
            Err(ConversationError::Validation(error)) => {
                writeln!(output, "{}", error.user_message())?;
                prompt = match session.partial_lead() {
                    Some(partial) => LeadPrompt::new(partial),
                    None => return Ok(true),
                };
            }
            Err(error) => {
                let interface = error.into_interface(session.id().to_string());
                writeln!(output, "Error: {}", interface.user_message())?;
                return Ok(true);
            }
        }
    }
}

fn read_line<R: BufRead>(input: &mut R) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line))
}
