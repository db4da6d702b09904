use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
    ChatCompletionResponseFormat, ChatCompletionResponseFormatType,
    CreateChatCompletionRequestArgs, Role,
};
use async_openai::{config::OpenAIConfig, Client};
use async_trait::async_trait;
use thiserror::Error;

const SYSTEM_PROMPT: &str = "You are an experienced career counsellor who specialises in \
entrepreneurship education. Be specific, encouraging and practical. Never invent scores.";

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u16,
    pub json_mode: bool,
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("generation request rejected: {0}")]
    Upstream(String),
}

/// External text-generation service.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}

#[derive(Clone)]
pub struct OpenAiGenerator {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerator {
    pub fn new(api_key: String, model: String) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model,
        }
    }
}

#[async_trait]
impl TextGenerator for OpenAiGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                role: Role::System,
                content: SYSTEM_PROMPT.to_string(),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                role: Role::User,
                content: ChatCompletionRequestUserMessageContent::Text(request.prompt.clone()),
                name: None,
            }),
        ];

        let mut builder = CreateChatCompletionRequestArgs::default();
        builder
            .model(self.model.as_str())
            .messages(messages)
            .temperature(request.temperature)
            .max_tokens(request.max_output_tokens);
        if request.json_mode {
            builder.response_format(ChatCompletionResponseFormat {
                r#type: ChatCompletionResponseFormatType::JsonObject,
            });
        }
        let chat = builder
            .build()
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        tracing::debug!(
            "Requesting completion from {} (json_mode={}, max_tokens={})",
            self.model,
            request.json_mode,
            request.max_output_tokens
        );

        let resp = self
            .client
            .chat()
            .create(chat)
            .await
            .map_err(|e| GenerationError::Upstream(e.to_string()))?;

        Ok(resp
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default())
    }
}
