use anyhow::Result;
use async_trait::async_trait;

/// Seam between the RAG engine and the hosted models. Chat completions,
/// multimodal completions and embeddings all go through here so the engine
/// can be exercised without the network.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Text completion with a system prompt.
    async fn complete(&self, system: &str, prompt: &str) -> Result<String>;

    /// Completion routed to the vision-capable model. Used for queries that
    /// carry table or figure context inline.
    async fn complete_multimodal(&self, system: &str, prompt: &str) -> Result<String>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Width of the vectors produced by `embed`.
    fn embedding_dim(&self) -> usize;

    fn model_info(&self) -> String;

    fn clone_box(&self) -> Box<dyn CompletionProvider>;
}

impl Clone for Box<dyn CompletionProvider> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}
