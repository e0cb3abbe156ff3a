use anyhow::{anyhow, Result};
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequestArgs, CreateEmbeddingRequestArgs, EmbeddingInput, Role,
    },
    Client,
};
use async_trait::async_trait;

use crate::config::ApiConfig;
use crate::providers::traits::CompletionProvider;

/// Provider backed by an OpenAI-compatible API. `OPENAI_BASE_URL` points it
/// at a gateway when the hosted models sit behind one.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    chat_model: String,
    vision_model: String,
    embedding_model: String,
    embedding_dim: usize,
}

impl OpenAiProvider {
    pub fn new(config: &ApiConfig) -> Self {
        let mut openai_config = OpenAIConfig::new().with_api_key(config.api_key.clone());
        if let Some(base_url) = &config.base_url {
            openai_config = openai_config.with_api_base(base_url.clone());
        }

        Self {
            client: Client::with_config(openai_config),
            chat_model: config.chat_model.clone(),
            vision_model: config.vision_model.clone(),
            embedding_model: config.embedding_model.clone(),
            embedding_dim: config.embedding_dim(),
        }
    }

    async fn chat(&self, model: &str, system: &str, prompt: &str) -> Result<String> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    role: Role::System,
                    content: system.to_string(),
                    name: None,
                }),
                ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                    role: Role::User,
                    content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                    name: None,
                }),
            ])
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No response content from {}", model))
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(&self.chat_model, system, prompt).await
    }

    async fn complete_multimodal(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(&self.vision_model, system, prompt).await
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(EmbeddingInput::String(text.to_string()))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|e| e.embedding)
            .ok_or_else(|| anyhow!("No embedding returned from {}", self.embedding_model))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.embedding_model)
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        // The API documents response order as matching input order; sort by
        // index anyway so a permuted response cannot mispair text and vector.
        let mut data = response.data;
        data.sort_by_key(|e| e.index);

        if data.len() != texts.len() {
            return Err(anyhow!(
                "Embedding count mismatch: sent {} texts, got {} vectors",
                texts.len(),
                data.len()
            ));
        }

        Ok(data.into_iter().map(|e| e.embedding).collect())
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn model_info(&self) -> String {
        format!(
            "chat={} vision={} embedding={}",
            self.chat_model, self.vision_model, self.embedding_model
        )
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider> {
        Box::new(self.clone())
    }
}
