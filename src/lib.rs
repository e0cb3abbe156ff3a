pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod index;
pub mod interactive;
pub mod logging;
pub mod providers;
pub mod rag;

#[cfg(test)]
pub(crate) mod test_util;

// Re-export commonly used items
pub use config::ApiConfig;
pub use document::DocumentProcessor;
pub use error::RagError;
pub use providers::{CompletionProvider, OpenAiProvider};
pub use rag::{QueryOptions, RagEngine};
