//! Idea structuring through an OpenAI-compatible chat completions API.
//!
//! [`CompletionGateway::summarize`] never fails: when the service is
//! unavailable it returns [`fallback_text`], which embeds the original text,
//! so the user's idea is always delivered.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::config::CompletionConfig;
use crate::error::{CompletionError, ConfigError};

/// System instruction for structuring ideas.
pub const SYSTEM_PROMPT: &str = r#"Ты эксперт-помощник по обработке рабочих идей и мыслей.

Твоя задача:
1. Структурировать и улучшить мысль пользователя
2. Сделать её более понятной и конкретной
3. Добавить практические шаги для реализации
4. Определить приоритет (высокий/средний/низкий)
5. Предложить следующие действия

Отвечай на русском языке структурированно. Будь конкретным и практичным.
Формат ответа:
🎯 Суть идеи: [краткое описание]
📋 План действий: [конкретные шаги]
⚡ Приоритет: [высокий/средний/низкий]
📊 Метрики успеха: [как измерить результат]"#;

/// Text returned when the completion service cannot be used.
pub fn fallback_text(original: &str) -> String {
    format!("Не удалось обработать через ChatGPT. Исходный текст: {}", original)
}

/// One completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system_instruction: String,
    pub user_text: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

/// A remote text completion service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Generate text for the request.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError>;
}

/// Chat completions request body.
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Create a client with its own HTTP client bounded by the configured timeout.
    pub fn new(config: &CompletionConfig, api_key: impl Into<String>) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self::with_client(client, config, api_key))
    }

    /// Create a client sharing an existing HTTP client.
    pub fn with_client(
        client: reqwest::Client,
        config: &CompletionConfig,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl CompletionService for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_text,
                },
            ],
            max_tokens: request.max_output_tokens,
            temperature: request.temperature,
        };

        trace!(model = %self.model, "Sending completion request");

        let response = self
            .client
            .post(self.endpoint())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| CompletionError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::ParseError(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CompletionError::EmptyContent);
        }

        debug!(chars = text.chars().count(), "Completion received");
        Ok(text)
    }
}

/// Fail-open summarization in front of a [`CompletionService`].
#[derive(Clone)]
pub struct CompletionGateway {
    service: Option<Arc<dyn CompletionService>>,
    max_tokens: u32,
    temperature: f32,
}

impl CompletionGateway {
    /// Build the gateway from configuration. Without an API key it is degraded.
    pub fn from_config(config: &CompletionConfig) -> Result<Self, ConfigError> {
        let service: Option<Arc<dyn CompletionService>> = match &config.api_key {
            Some(key) => Some(Arc::new(OpenAiClient::new(config, key.clone())?)),
            None => None,
        };
        Ok(Self {
            service,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build the gateway around any completion service.
    pub fn with_service(service: Arc<dyn CompletionService>, config: &CompletionConfig) -> Self {
        Self {
            service: Some(service),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// A gateway that always returns the fallback text.
    pub fn degraded() -> Self {
        let defaults = CompletionConfig::default();
        Self {
            service: None,
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    /// Whether a completion service is configured.
    pub fn is_available(&self) -> bool {
        self.service.is_some()
    }

    /// The request sent for a given text.
    pub fn request_for(&self, text: &str) -> CompletionRequest {
        CompletionRequest {
            system_instruction: SYSTEM_PROMPT.to_string(),
            user_text: text.to_string(),
            max_output_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Summarize, reporting failures.
    pub async fn try_summarize(&self, text: &str) -> Result<String, CompletionError> {
        let service = self.service.as_ref().ok_or(CompletionError::NoApiKey)?;
        service.complete(&self.request_for(text)).await
    }

    /// Summarize, falling back to [`fallback_text`] on any failure.
    pub async fn summarize(&self, text: &str) -> String {
        match self.try_summarize(text).await {
            Ok(summary) => summary,
            Err(CompletionError::NoApiKey) => {
                debug!("Completion unavailable, using original text");
                fallback_text(text)
            }
            Err(e) => {
                warn!(step = "summarize", error = %e, "Completion failed, using original text");
                fallback_text(text)
            }
        }
    }
}
