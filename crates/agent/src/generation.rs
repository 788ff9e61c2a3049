use std::sync::Arc;

use anyhow::{Context, Result};
use docent_core::domain::document::Passage;
use docent_core::domain::session::Turn;
use docent_core::errors::GenerationError;
use docent_core::services::{GenerationService, QueryRewriter};
use tokio::runtime::{Builder, Runtime};
use tracing::{debug, warn};

use crate::llm::LlmClient;
use crate::prompt::{answer_prompt, condense_prompt};

/// Adapts an async [`LlmClient`] to the synchronous generation contracts.
///
/// Calls block on a private current-thread runtime, so they must not be made
/// from inside another tokio runtime.
pub struct LlmGenerationService<C: ?Sized> {
    client: Arc<C>,
    runtime: Arc<Runtime>,
}

impl<C: ?Sized> Clone for LlmGenerationService<C> {
    fn clone(&self) -> Self {
        Self { client: Arc::clone(&self.client), runtime: Arc::clone(&self.runtime) }
    }
}

impl<C> LlmGenerationService<C>
where
    C: LlmClient + ?Sized,
{
    pub fn new(client: Arc<C>) -> Result<Self> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .context("failed to initialize llm runtime")?;
        Ok(Self { client, runtime: Arc::new(runtime) })
    }

    fn complete(&self, purpose: &'static str, prompt: &str) -> Result<String, GenerationError> {
        debug!(event_name = "llm.completion_started", purpose, prompt_chars = prompt.len());
        let completion = self.runtime.block_on(self.client.complete(prompt)).map_err(|error| {
            warn!(event_name = "llm.completion_failed", purpose, error = %error);
            GenerationError(format!("{error:#}"))
        })?;

        let trimmed = completion.trim();
        if trimmed.is_empty() {
            return Err(GenerationError(format!("model returned an empty {purpose}")));
        }
        Ok(trimmed.to_string())
    }
}

impl<C> GenerationService for LlmGenerationService<C>
where
    C: LlmClient + ?Sized,
{
    fn answer(
        &self,
        question: &str,
        context: &[Passage],
        history: &[Turn],
    ) -> Result<String, GenerationError> {
        self.complete("answer", &answer_prompt(question, context, history))
    }
}

impl<C> QueryRewriter for LlmGenerationService<C>
where
    C: LlmClient + ?Sized,
{
    fn standalone_question(
        &self,
        question: &str,
        history: &[Turn],
    ) -> Result<String, GenerationError> {
        self.complete("standalone question", &condense_prompt(question, history))
    }
}
