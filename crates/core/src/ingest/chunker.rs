use serde::{Deserialize, Serialize};

use crate::domain::document::Chunk;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;

/// Fixed-size character windows. Chunk `i + 1` starts `chunk_size - chunk_overlap`
/// characters after chunk `i`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, chunk_overlap: DEFAULT_CHUNK_OVERLAP }
    }
}

impl ChunkerConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self { chunk_size, chunk_overlap }
    }

    pub fn is_valid(&self) -> bool {
        self.chunk_size > 0 && self.chunk_overlap < self.chunk_size
    }

    fn stride(&self) -> usize {
        self.chunk_size.saturating_sub(self.chunk_overlap).max(1)
    }
}

pub fn split_text(document_name: &str, text: &str, config: &ChunkerConfig) -> Vec<Chunk> {
    // Byte offset of every char boundary, including the end of the text.
    let boundaries = text
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(text.len()))
        .collect::<Vec<_>>();
    let char_count = boundaries.len() - 1;
    if char_count == 0 {
        return Vec::new();
    }

    let size = config.chunk_size.max(1);
    let stride = config.stride();
    let mut chunks = Vec::new();
    let mut start = 0;

    loop {
        let end = (start + size).min(char_count);
        chunks.push(Chunk {
            document_name: document_name.to_string(),
            index: chunks.len(),
            char_offset: start,
            text: text[boundaries[start]..boundaries[end]].to_string(),
        });
        if end == char_count {
            break;
        }
        start += stride;
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::{split_text, ChunkerConfig};

    #[test]
    fn twenty_five_hundred_chars_yield_three_overlapping_chunks() {
        let text: String =
            (0..2500_u32).map(|position| char::from(b'a' + (position % 26) as u8)).collect();
        let chunks = split_text("doc.txt", &text, &ChunkerConfig::default());

        let offsets = chunks.iter().map(|chunk| chunk.char_offset).collect::<Vec<_>>();
        assert_eq!(offsets, vec![0, 800, 1600]);
        assert_eq!(chunks[0].text.chars().count(), 1000);
        assert_eq!(chunks[1].text.chars().count(), 1000);
        assert_eq!(chunks[2].text.chars().count(), 900);
        assert_eq!(&chunks[1].text[..200], &chunks[0].text[800..]);
        assert_eq!(chunks[2].index, 2);
    }

    #[test]
    fn short_text_is_one_chunk() {
        let chunks = split_text("doc.txt", "hello", &ChunkerConfig::default());
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello");
    }

    #[test]
    fn exact_size_text_does_not_emit_trailing_overlap_chunk() {
        let text = "x".repeat(1000);
        assert_eq!(split_text("doc.txt", &text, &ChunkerConfig::default()).len(), 1);
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_text("doc.txt", "", &ChunkerConfig::default()).is_empty());
    }

    #[test]
    fn offsets_count_chars_not_bytes() {
        let text = "é".repeat(25);
        let chunks = split_text("doc.txt", &text, &ChunkerConfig::new(10, 2));

        let offsets = chunks.iter().map(|chunk| chunk.char_offset).collect::<Vec<_>>();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert_eq!(chunks[2].text, "é".repeat(9));
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        assert!(ChunkerConfig::default().is_valid());
        assert!(!ChunkerConfig::new(100, 100).is_valid());
        assert!(!ChunkerConfig::new(0, 0).is_valid());
    }
}
