use docent_core::domain::document::Passage;
use docent_core::domain::session::Turn;

const ANSWER_INSTRUCTIONS: &str = "Use the following pieces of context to answer the question \
at the end. If you don't know the answer, just say that you don't know, don't try to make up \
an answer.";

const CONDENSE_INSTRUCTIONS: &str = "Given the following conversation and a follow up \
question, rephrase the follow up question to be a standalone question, in its original \
language.";

fn render_history(history: &[Turn]) -> String {
    history
        .iter()
        .map(|turn| format!("{}: {}", turn.speaker(), turn.text()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Grounded answer prompt: instructions, retrieved context, prior turns, then
/// the question.
pub fn answer_prompt(question: &str, context: &[Passage], history: &[Turn]) -> String {
    let context_block = context
        .iter()
        .map(|passage| passage.text.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    let mut prompt = String::new();
    prompt.push_str(ANSWER_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&context_block);
    prompt.push_str("\n\n");
    if !history.is_empty() {
        prompt.push_str("Chat History:\n");
        prompt.push_str(&render_history(history));
        prompt.push_str("\n\n");
    }
    prompt.push_str("Question: ");
    prompt.push_str(question.trim());
    prompt.push_str("\nHelpful Answer:");
    prompt
}

pub fn condense_prompt(question: &str, history: &[Turn]) -> String {
    format!(
        "{CONDENSE_INSTRUCTIONS}\n\nChat History:\n{}\nFollow Up Input: {}\nStandalone question:",
        render_history(history),
        question.trim()
    )
}
