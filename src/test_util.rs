use anyhow::Result;
use async_trait::async_trait;

use crate::providers::CompletionProvider;

/// Deterministic, network-free provider for tests. Embeddings hash the text
/// into a fixed-width vector; completions echo the prompt so assertions can
/// check what the engine actually sent.
#[derive(Clone)]
pub struct StubProvider {
    dim: usize,
}

impl StubProvider {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_deterministic(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dim];
        for (i, byte) in text.bytes().enumerate() {
            vector[(i + byte as usize) % self.dim] += 1.0;
        }
        // bias so no text ever maps to the zero vector
        vector[0] += 1.0;
        vector
    }
}

#[async_trait]
impl CompletionProvider for StubProvider {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String> {
        Ok(prompt.to_string())
    }

    async fn complete_multimodal(&self, _system: &str, prompt: &str) -> Result<String> {
        Ok(format!("[vision] {prompt}"))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_deterministic(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_deterministic(t)).collect())
    }

    fn embedding_dim(&self) -> usize {
        self.dim
    }

    fn model_info(&self) -> String {
        format!("stub dim={}", self.dim)
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider> {
        Box::new(self.clone())
    }
}
