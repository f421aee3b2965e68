use std::time::Duration;

use async_trait::async_trait;
use bridge_core::mode::StageProfiles;
use bridge_core::ports::{Gateway, GatewayError, StageRequest};
use serde::{Deserialize, Serialize};

use crate::config::OpenAiConfig;

const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Chat Completions client. Picks model and temperature from the stage tag
/// and retries rate limits and server errors; the pipeline itself never retries.
#[derive(Clone)]
pub struct OpenAiGateway {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    profiles: StageProfiles,
    max_retries: u32,
    retry_backoff: Duration,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage; 2],
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiGateway {
    pub fn new(config: &OpenAiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            profiles: config.profiles.clone(),
            max_retries: config.max_retries,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
        }
    }

    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    fn is_retryable(status: reqwest::StatusCode) -> bool {
        status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }
}

#[async_trait]
impl Gateway for OpenAiGateway {
    async fn invoke(&self, request: StageRequest) -> Result<String, GatewayError> {
        let profile = self.profiles.get(request.stage);
        let body = ChatCompletionRequest {
            model: &profile.model,
            temperature: profile.temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: request.prompt.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: request.input.to_string(),
                },
            ],
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };
        let url = format!("{}/chat/completions", self.base_url);

        let mut attempt = 0;
        let response = loop {
            let result = self
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match result {
                Ok(response)
                    if Self::is_retryable(response.status()) && attempt < self.max_retries =>
                {
                    tracing::warn!(
                        stage = %request.stage,
                        status = %response.status(),
                        attempt,
                        "Model request rejected, retrying"
                    );
                }
                Ok(response) => break response,
                Err(err) if err.is_timeout() => return Err(GatewayError::Timeout),
                Err(err) if attempt < self.max_retries => {
                    tracing::warn!(
                        stage = %request.stage,
                        error = %err,
                        attempt,
                        "Model request failed, retrying"
                    );
                }
                Err(err) => return Err(GatewayError::Transport(err.to_string())),
            }
            attempt += 1;
            tokio::time::sleep(self.retry_backoff * attempt).await;
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let completion = response
            .json::<ChatCompletionResponse>()
            .await
            .map_err(|e| GatewayError::Transport(format!("invalid completion body: {e}")))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GatewayError::EmptyResponse)?;

        tracing::debug!(
            stage = %request.stage,
            model = %profile.model,
            raw = %content,
            "Model response"
        );
        Ok(content)
    }
}
