use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy)]
pub struct ChunkOptions {
    pub chunk_words: usize,
    pub overlap_words: usize,
}

impl Default for ChunkOptions {
    fn default() -> Self {
        Self {
            chunk_words: 350,
            overlap_words: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub page_number: usize,
    pub chunk_index: usize,
}

/// Word-window chunking with overlap. Chunks never span page boundaries so
/// retrieval hits can cite a page.
pub fn chunk_pages(pages: &[String], opts: ChunkOptions) -> Vec<DocumentChunk> {
    // a zero-word window would never advance
    let chunk_words = opts.chunk_words.max(1);
    let overlap = opts.overlap_words.min(chunk_words - 1);
    let mut chunks = Vec::new();
    let mut chunk_index = 0;

    for (page_idx, page) in pages.iter().enumerate() {
        let words: Vec<&str> = page.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }

        let mut start = 0;
        loop {
            let end = (start + chunk_words).min(words.len());
            chunks.push(DocumentChunk {
                text: words[start..end].join(" "),
                page_number: page_idx + 1,
                chunk_index,
            });
            chunk_index += 1;

            if end == words.len() {
                break;
            }
            start = end - overlap;
        }
    }

    chunks
}
