//! Collaborator contracts the conversation core depends on.
//!
//! Implementations live outside the core: `retrieval` and `generation` hold
//! deterministic in-process versions, and `docent-agent` adapts LLM providers.

use crate::domain::document::{Chunk, IndexHandle, Passage};
use crate::domain::session::Turn;
use crate::errors::{GenerationError, IndexBuildError, RetrievalError};

pub trait RetrievalService: Send + Sync {
    /// Builds a queryable index from `chunks`, kept in the given order.
    fn build(&self, chunks: Vec<Chunk>) -> Result<IndexHandle, IndexBuildError>;

    /// Returns up to `k` passages, most relevant first.
    fn query(
        &self,
        index: &IndexHandle,
        question: &str,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError>;
}

pub trait GenerationService: Send + Sync {
    fn answer(
        &self,
        question: &str,
        context: &[Passage],
        history: &[Turn],
    ) -> Result<String, GenerationError>;
}

/// Turns a follow-up question into one that stands on its own, so retrieval
/// does not depend on earlier turns.
pub trait QueryRewriter: Send + Sync {
    fn standalone_question(
        &self,
        question: &str,
        history: &[Turn],
    ) -> Result<String, GenerationError>;
}

impl<T> RetrievalService for Box<T>
where
    T: RetrievalService + ?Sized,
{
    fn build(&self, chunks: Vec<Chunk>) -> Result<IndexHandle, IndexBuildError> {
        (**self).build(chunks)
    }

    fn query(
        &self,
        index: &IndexHandle,
        question: &str,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError> {
        (**self).query(index, question, k)
    }
}

impl<T> GenerationService for Box<T>
where
    T: GenerationService + ?Sized,
{
    fn answer(
        &self,
        question: &str,
        context: &[Passage],
        history: &[Turn],
    ) -> Result<String, GenerationError> {
        (**self).answer(question, context, history)
    }
}
