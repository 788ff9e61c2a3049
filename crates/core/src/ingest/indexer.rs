use tracing::{info, warn};

use crate::domain::document::{IndexHandle, SourceDocument};
use crate::errors::IngestError;
use crate::ingest::chunker::{split_text, ChunkerConfig};
use crate::services::RetrievalService;

#[derive(Clone, Debug, Default)]
pub struct DocumentIndexer {
    config: ChunkerConfig,
}

impl DocumentIndexer {
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Chunks every non-blank document in order and hands the chunks to
    /// `retrieval`. Document text is dropped once chunked.
    pub fn ingest<R, I>(&self, retrieval: &R, documents: I) -> Result<IndexHandle, IngestError>
    where
        R: RetrievalService + ?Sized,
        I: IntoIterator<Item = SourceDocument>,
    {
        let mut chunks = Vec::new();
        let mut document_count = 0_usize;

        for document in documents {
            if document.is_blank() {
                warn!(
                    event_name = "ingest.document_skipped",
                    document = %document.name,
                    "skipping document without extractable text"
                );
                continue;
            }
            document_count += 1;
            chunks.extend(split_text(&document.name, &document.text, &self.config));
        }

        if chunks.is_empty() {
            return Err(IngestError::EmptyInput);
        }

        let chunk_count = chunks.len();
        let handle = retrieval.build(chunks)?;
        info!(
            event_name = "ingest.index_built",
            index = %handle,
            document_count,
            chunk_count,
            "document index built"
        );
        Ok(handle)
    }
}
