use std::sync::Arc;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
        CreateChatCompletionRequest, CreateChatCompletionRequestArgs, CreateChatCompletionResponse,
    },
    Client,
};
use async_trait::async_trait;
use common::{
    error::AppError,
    storage::types::vector_index::VectorIndex,
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use tracing::{debug, instrument};

use crate::{scoring::search_index, RetrievedChunk};

pub const QUERY_SYSTEM_PROMPT: &str = "You are a helpful assistant.
Answer ONLY from the provided transcript context.
Keep your answers brief and to the point.
If the context is insufficient, say you don't know.
If the question is not about the video or its content, say \"Please ask questions about the video only.\"";

/// Answers a question from a ready index.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    async fn answer(&self, index: &VectorIndex, question: &str) -> Result<String, AppError>;
}

/// Join retrieved chunk texts into the context block handed to the model.
pub fn chunks_to_context(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|retrieved| retrieved.chunk.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn create_user_message(context: &str, question: &str) -> String {
    format!("{context}\nQuestion: {question}")
}

pub fn create_chat_request(
    user_message: String,
    model: &str,
    temperature: f32,
) -> Result<CreateChatCompletionRequest, OpenAIError> {
    CreateChatCompletionRequestArgs::default()
        .model(model)
        .temperature(temperature)
        .messages([
            ChatCompletionRequestSystemMessage::from(QUERY_SYSTEM_PROMPT).into(),
            ChatCompletionRequestUserMessage::from(user_message).into(),
        ])
        .build()
}

pub fn process_llm_response(response: CreateChatCompletionResponse) -> Result<String, AppError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(AppError::LLMParsing(
            "No content found in LLM response".into(),
        ))
}

/// Retrieval-augmented answering backed by OpenAI chat completions.
pub struct OpenAiQueryEngine {
    openai_client: Arc<Client<OpenAIConfig>>,
    embedding_provider: Arc<EmbeddingProvider>,
    model: String,
    temperature: f32,
    top_k: usize,
}

impl OpenAiQueryEngine {
    pub fn new(
        openai_client: Arc<Client<OpenAIConfig>>,
        embedding_provider: Arc<EmbeddingProvider>,
        model: impl Into<String>,
        temperature: f32,
        top_k: usize,
    ) -> Self {
        Self {
            openai_client,
            embedding_provider,
            model: model.into(),
            temperature,
            top_k,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        openai_client: Arc<Client<OpenAIConfig>>,
        embedding_provider: Arc<EmbeddingProvider>,
    ) -> Self {
        Self::new(
            openai_client,
            embedding_provider,
            config.query_model.clone(),
            config.query_temperature,
            config.retrieval_top_k,
        )
    }

    /// Embed the question and pick the most similar transcript chunks.
    pub async fn retrieve(
        &self,
        index: &VectorIndex,
        question: &str,
    ) -> Result<Vec<RetrievedChunk>, AppError> {
        let query_embedding = self.embedding_provider.embed(question).await?;
        Ok(search_index(index, &query_embedding, self.top_k))
    }
}

#[async_trait]
impl QueryEngine for OpenAiQueryEngine {
    #[instrument(skip_all, fields(video_id = %index.video_id))]
    async fn answer(&self, index: &VectorIndex, question: &str) -> Result<String, AppError> {
        let chunks = self.retrieve(index, question).await?;
        debug!(
            retrieved = chunks.len(),
            top_score = chunks.first().map_or(0.0, |c| c.score),
            "retrieved transcript context"
        );

        let user_message = create_user_message(&chunks_to_context(&chunks), question);
        let request = create_chat_request(user_message, &self.model, self.temperature)?;
        let response = self.openai_client.chat().create(request).await?;

        process_llm_response(response)
    }
}
