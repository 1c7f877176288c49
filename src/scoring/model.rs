//! Scoring-model collaborator and the OpenAI-compatible HTTP implementation.

use std::time::Duration;

use async_openai::types::chat::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode, header};
use serde::Deserialize;
use tracing::debug;

use super::error::ModelError;
use super::prompt::ModelPrompt;
use crate::config::PipelineConfig;

/// Sends one prompt to a language model and returns its raw text reply.
#[async_trait]
pub trait ScoringModel: Send + Sync {
    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ModelError>;
}

/// Chat-completions client for OpenAI-compatible endpoints (OpenAI, Ollama's `/v1`, vLLM).
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleModel {
    http: HttpClient,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatibleModel {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        let mut model = Self::new(&config.model_base_url, &config.model_name);
        model.api_key = config.model_api_key.clone();
        model
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    fn build_request(
        &self,
        prompt: &ModelPrompt,
    ) -> Result<CreateChatCompletionRequest, ModelError> {
        let system = ChatCompletionRequestSystemMessageArgs::default()
            .content(prompt.system.as_str())
            .build()
            .map_err(request_error)?;
        let user = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.user.as_str())
            .build()
            .map_err(request_error)?;

        CreateChatCompletionRequestArgs::default()
            .model(self.model.as_str())
            .temperature(0.0)
            .messages([
                ChatCompletionRequestMessage::System(system),
                ChatCompletionRequestMessage::User(user),
            ])
            .build()
            .map_err(request_error)
    }
}

fn request_error(e: impl std::fmt::Display) -> ModelError {
    ModelError::Transport {
        reason: format!("failed to build request: {e}"),
    }
}

fn retry_after(headers: &header::HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

fn classify_transport(e: reqwest::Error) -> ModelError {
    if e.is_connect() {
        ModelError::Unavailable {
            reason: e.to_string(),
        }
    } else {
        ModelError::Transport {
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl ScoringModel for OpenAiCompatibleModel {
    async fn complete(&self, prompt: &ModelPrompt) -> Result<String, ModelError> {
        let request = self.build_request(prompt)?;

        let mut builder = self.http.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await.map_err(classify_transport)?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(ModelError::RateLimited {
                retry_after: retry_after(response.headers()),
            });
        }
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Unavailable {
                reason: format!("{status}: {}", body.trim()),
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Rejected {
                status: status.as_u16(),
                body: body.trim().to_string(),
            });
        }

        let body: ChatResponse = response.json().await.map_err(classify_transport)?;
        let content = body
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        debug!(model = %self.model, chars = content.len(), "model replied");
        Ok(content)
    }
}
