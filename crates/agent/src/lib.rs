//! LLM-backed answer generation for docent.
//!
//! The core crate only knows the synchronous `GenerationService` and
//! `QueryRewriter` contracts. This crate fulfils them with a model:
//! 1. **Prompting** (`prompt`) - grounded answer and standalone-question prompts
//! 2. **Providers** (`llm`) - `LlmClient` implementations for Ollama and
//!    OpenAI-compatible endpoints, with timeouts and bounded retries
//! 3. **Adapter** (`generation`) - `LlmGenerationService`, which drives a client
//!    from synchronous code
//!
//! The model only phrases answers from retrieved passages. Routing, lead capture
//! and validation stay deterministic in `docent-core`.

pub mod generation;
pub mod llm;
pub mod prompt;

pub use generation::LlmGenerationService;
pub use llm::{client_from_config, CompletionSettings, LlmClient, OllamaClient, OpenAiClient};
