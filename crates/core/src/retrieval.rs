use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::domain::document::{Chunk, IndexHandle, Passage};
use crate::errors::{IndexBuildError, RetrievalError};
use crate::services::RetrievalService;

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "can", "do", "does", "for", "from", "how",
    "i", "in", "is", "it", "of", "on", "or", "the", "this", "to", "was", "what", "when", "where",
    "which", "who", "why", "with", "you",
];

#[derive(Clone, Debug)]
struct IndexedChunk {
    chunk: Chunk,
    term_counts: HashMap<String, u32>,
    token_count: usize,
}

/// Term-overlap retrieval held in process memory.
///
/// Scores are deterministic: equal scores keep chunk insertion order.
#[derive(Clone, Default)]
pub struct KeywordRetrievalService {
    indexes: Arc<Mutex<HashMap<IndexHandle, Vec<IndexedChunk>>>>,
}

impl KeywordRetrievalService {
    pub fn index_count(&self) -> usize {
        match self.indexes.lock() {
            Ok(indexes) => indexes.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }
}

impl RetrievalService for KeywordRetrievalService {
    fn build(&self, chunks: Vec<Chunk>) -> Result<IndexHandle, IndexBuildError> {
        if chunks.is_empty() {
            return Err(IndexBuildError("cannot build an index from zero chunks".to_string()));
        }

        let indexed = chunks
            .into_iter()
            .map(|chunk| {
                let tokens = tokenize(&chunk.text);
                let token_count = tokens.len();
                let mut term_counts = HashMap::new();
                for token in tokens {
                    *term_counts.entry(token).or_insert(0) += 1;
                }
                IndexedChunk { chunk, term_counts, token_count }
            })
            .collect::<Vec<_>>();

        let handle = IndexHandle::new(Uuid::new_v4().to_string());
        match self.indexes.lock() {
            Ok(mut indexes) => indexes.insert(handle.clone(), indexed),
            Err(poisoned) => poisoned.into_inner().insert(handle.clone(), indexed),
        };
        Ok(handle)
    }

    fn query(
        &self,
        index: &IndexHandle,
        question: &str,
        k: usize,
    ) -> Result<Vec<Passage>, RetrievalError> {
        let indexes = match self.indexes.lock() {
            Ok(indexes) => indexes,
            Err(poisoned) => poisoned.into_inner(),
        };
        let chunks = indexes
            .get(index)
            .ok_or_else(|| RetrievalError(format!("unknown index `{index}`")))?;

        let terms = tokenize(question).into_iter().collect::<BTreeSet<_>>();
        let mut scored = chunks
            .iter()
            .enumerate()
            .map(|(position, indexed)| (position, score(indexed, &terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect::<Vec<_>>();
        // Stable sort keeps insertion order for ties.
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));

        let passages = if scored.is_empty() {
            chunks.iter().take(k).map(|indexed| passage(indexed, 0.0)).collect()
        } else {
            scored
                .into_iter()
                .take(k)
                .map(|(position, score)| passage(&chunks[position], score))
                .collect()
        };
        Ok(passages)
    }
}

/// Matched query-term occurrences over the square root of the chunk's token count.
fn score(indexed: &IndexedChunk, terms: &BTreeSet<String>) -> f32 {
    if indexed.token_count == 0 {
        return 0.0;
    }
    let matches: u32 =
        terms.iter().filter_map(|term| indexed.term_counts.get(term)).copied().sum();
    matches as f32 / (indexed.token_count as f32).sqrt()
}

fn passage(indexed: &IndexedChunk, score: f32) -> Passage {
    Passage {
        document_name: indexed.chunk.document_name.clone(),
        chunk_index: indexed.chunk.index,
        text: indexed.chunk.text.clone(),
        score,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|character: char| !character.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .filter(|token| !STOPWORDS.contains(&token.as_str()))
        .collect()
}
