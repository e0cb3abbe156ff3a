use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::RagError;

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    pub id: String,
    pub document: String,
    pub source: String,
    pub page: usize,
    pub chunk_index: usize,
    pub text: String,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct SearchHit {
    pub text: String,
    pub source: String,
    pub page: usize,
    pub score: f32,
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    dim: usize,
    records: Vec<IndexedChunk>,
}

/// Flat cosine-similarity index persisted as JSON inside the working
/// directory. Every vector is dimension-checked on the way in and out.
pub struct VectorStore {
    dim: usize,
    records: Vec<IndexedChunk>,
    path: PathBuf,
}

impl VectorStore {
    /// Loads the index from `working_dir` or starts empty, creating the
    /// directory if needed.
    pub fn open(working_dir: &Path, dim: usize) -> Result<Self, RagError> {
        fs::create_dir_all(working_dir)?;
        let path = working_dir.join(INDEX_FILE);

        let records = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            let file: IndexFile = serde_json::from_str(&contents)?;
            if file.dim != dim {
                return Err(RagError::DimensionMismatch {
                    expected: file.dim,
                    actual: dim,
                });
            }
            file.records
        } else {
            Vec::new()
        };

        debug!("Opened index at {} ({} records)", path.display(), records.len());
        Ok(Self { dim, records, path })
    }

    /// Like `open`, but requires an existing, non-empty index. Used by the
    /// query tool, which never creates data.
    pub fn open_existing(working_dir: &Path, dim: usize) -> Result<Self, RagError> {
        if !working_dir.exists() {
            return Err(RagError::WorkingDirNotFound(working_dir.to_path_buf()));
        }
        let store = Self::open(working_dir, dim)?;
        if store.is_empty() {
            return Err(RagError::EmptyIndex(working_dir.to_path_buf()));
        }
        Ok(store)
    }

    pub fn insert(
        &mut self,
        document: &str,
        source: &str,
        page: usize,
        chunk_index: usize,
        text: String,
        vector: Vec<f32>,
    ) -> Result<String, RagError> {
        if vector.len() != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual: vector.len(),
            });
        }

        let id = Uuid::new_v4().to_string();
        self.records.push(IndexedChunk {
            id: id.clone(),
            document: document.to_string(),
            source: source.to_string(),
            page,
            chunk_index,
            text,
            vector,
        });
        Ok(id)
    }

    /// Drops every record belonging to `document` (its content hash).
    /// Returns how many records were removed.
    pub fn remove_document(&mut self, document: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|r| r.document != document);
        before - self.records.len()
    }

    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<SearchHit>, RagError> {
        if query.len() != self.dim {
            return Err(RagError::DimensionMismatch {
                expected: self.dim,
                actual: query.len(),
            });
        }

        let mut scored: Vec<SearchHit> = self
            .records
            .iter()
            .map(|r| SearchHit {
                text: r.text.clone(),
                source: r.source.clone(),
                page: r.page,
                score: cosine_similarity(query, &r.vector),
            })
            .filter(|hit| hit.score >= min_score)
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Writes the index atomically (temp file, then rename).
    pub fn save(&self) -> Result<(), RagError> {
        let file = IndexFile {
            dim: self.dim,
            records: self.records.clone(),
        };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&file)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Saved index: {} records", self.records.len());
        Ok(())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}
