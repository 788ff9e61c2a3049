pub mod chunker;
pub mod indexer;

pub use chunker::{split_text, ChunkerConfig, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use indexer::DocumentIndexer;
