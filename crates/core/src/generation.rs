use crate::domain::document::Passage;
use crate::domain::session::Turn;
use crate::errors::GenerationError;
use crate::services::GenerationService;

pub const NO_CONTEXT_ANSWER: &str = "I don't know based on the uploaded documents.";

/// Offline answerer that quotes the best-ranked passage.
#[derive(Clone, Debug)]
pub struct ExtractiveGenerationService {
    max_answer_chars: usize,
}

impl Default for ExtractiveGenerationService {
    fn default() -> Self {
        Self { max_answer_chars: 500 }
    }
}

impl ExtractiveGenerationService {
    pub fn new(max_answer_chars: usize) -> Self {
        Self { max_answer_chars: max_answer_chars.max(1) }
    }
}

impl GenerationService for ExtractiveGenerationService {
    fn answer(
        &self,
        _question: &str,
        context: &[Passage],
        _history: &[Turn],
    ) -> Result<String, GenerationError> {
        let Some(best) = context.iter().find(|passage| !passage.text.trim().is_empty()) else {
            return Ok(NO_CONTEXT_ANSWER.to_string());
        };

        let text = best.text.trim();
        if text.chars().count() <= self.max_answer_chars {
            return Ok(text.to_string());
        }
        let mut truncated = text.chars().take(self.max_answer_chars).collect::<String>();
        truncated.push('…');
        Ok(truncated)
    }
}
