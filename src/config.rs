use std::env;
use std::path::PathBuf;

use crate::error::RagError;

pub const DEFAULT_WORKING_DIR: &str = "./rag_storage";
pub const DEFAULT_BATCH_WORKING_DIR: &str = "./batch_rag_storage";
pub const DEFAULT_MAX_WORKERS: usize = 2;

/// API configuration shared by all three tools. CLI flags take precedence
/// over environment variables; model names are env-overridable.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_key: String,
    pub base_url: Option<String>,
    pub chat_model: String,
    pub vision_model: String,
    pub embedding_model: String,
}

impl ApiConfig {
    pub fn resolve(api_key: Option<String>, base_url: Option<String>) -> Result<Self, RagError> {
        let api_key = api_key
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("OPENAI_API_KEY").ok().filter(|k| !k.trim().is_empty()))
            .ok_or(RagError::MissingApiKey)?;

        let base_url = base_url.or_else(|| env::var("OPENAI_BASE_URL").ok());

        let chat_model =
            env::var("OPENAI_CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let vision_model =
            env::var("OPENAI_VISION_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let embedding_model = env::var("OPENAI_EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());

        Ok(Self {
            api_key,
            base_url,
            chat_model,
            vision_model,
            embedding_model,
        })
    }

    /// Vector width produced by the configured embedding model. The index
    /// validates every insert and query against this.
    pub fn embedding_dim(&self) -> usize {
        embedding_dim_for(&self.embedding_model)
    }
}

pub fn embedding_dim_for(model: &str) -> usize {
    match model {
        "text-embedding-3-large" => 3072,
        "text-embedding-3-small" | "text-embedding-ada-002" => 1536,
        _ => 1536,
    }
}

/// Log file placement and rotation knobs, mirroring the LOG_* env vars.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub dir: PathBuf,
    pub max_bytes: u64,
    pub backup_count: usize,
}

impl LogConfig {
    pub fn from_env() -> Self {
        let dir = env::var("LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./logs"));

        let max_bytes = env::var("LOG_MAX_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10 * 1024 * 1024);

        let backup_count = env::var("LOG_BACKUP_COUNT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(5);

        Self {
            dir,
            max_bytes,
            backup_count,
        }
    }
}

pub fn default_working_dir() -> PathBuf {
    env::var("RAG_WORKING_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_WORKING_DIR))
}

pub fn default_max_workers() -> usize {
    env::var("MAX_WORKERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_dims_match_models() {
        assert_eq!(embedding_dim_for("text-embedding-3-small"), 1536);
        assert_eq!(embedding_dim_for("text-embedding-3-large"), 3072);
        assert_eq!(embedding_dim_for("unknown-model"), 1536);
    }

    #[test]
    fn flag_takes_precedence() {
        let config = ApiConfig::resolve(Some("from-flag".to_string()), None).unwrap();
        assert_eq!(config.api_key, "from-flag");
    }

    #[test]
    fn whitespace_key_falls_through_to_env() {
        // A blank flag is treated as absent; with the env var also unset the
        // resolver reports a missing key.
        if std::env::var("OPENAI_API_KEY").is_err() {
            let result = ApiConfig::resolve(Some("   ".to_string()), None);
            assert!(matches!(result, Err(RagError::MissingApiKey)));
        }
    }
}
