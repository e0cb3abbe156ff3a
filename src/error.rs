use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RagError {
    #[error("OpenAI API key not provided. Set OPENAI_API_KEY or use --api-key")]
    MissingApiKey,

    #[error("File does not exist: {0}")]
    FileNotFound(PathBuf),

    #[error("Working directory does not exist: {0}")]
    WorkingDirNotFound(PathBuf),

    #[error("No processed data found in {0}. Run the processor first")]
    EmptyIndex(PathBuf),

    #[error("Unsupported document type: {0}")]
    UnsupportedDocument(PathBuf),

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
