//! Remote extraction oracle using OpenAI-compatible APIs
//!
//! Implements the ExtractionOracle trait for remote LLM APIs via HTTP.
//! Supports any OpenAI-compatible endpoint with configurable URL, model,
//! and API key via environment variable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::OracleConfig;
use crate::memory::types::{OperationSet, Snapshot};
use crate::oracle::ExtractionOracle;
use crate::oracle::prompts::{EXTRACTION_SYSTEM_PROMPT, EXTRACTION_USER_PROMPT};
use crate::oracle::types::OracleError;

/// Remote oracle using OpenAI-compatible HTTP APIs
#[derive(Debug)]
pub struct RemoteOracle {
    client: Client,
    config: OracleConfig,
    api_key: String,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    response_format: ResponseFormat,
}

/// Message in the chat completion request
#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: String,
}

/// Constrains the model to emit a JSON object
#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

/// Choice in the chat completion response
#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

/// Message in the response choice
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

impl RemoteOracle {
    /// Create a new remote oracle with the given configuration
    ///
    /// Reads the API key from the environment variable specified in
    /// config.api_key_env. Returns an error if the variable is not set.
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = env::var(&config.api_key_env).map_err(|_| {
            OracleError::Config(format!("API key env var '{}' not set", config.api_key_env))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| OracleError::Api(e.to_string()))?;

        info!(
            "RemoteOracle initialized with model: {}, api_url: {}",
            config.model, config.api_url
        );

        Ok(Self {
            client,
            config: config.clone(),
            api_key,
        })
    }

    /// Call the remote API with exponential backoff for rate limiting
    ///
    /// Makes up to 3 retries with backoff delays of 1s, 2s, 4s on 429
    /// and transport errors.
    async fn call_api(&self, user_prompt: &str) -> Result<String, OracleError> {
        let request = ChatCompletionRequest {
            model: self.config.model.clone(),
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: EXTRACTION_SYSTEM_PROMPT.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: user_prompt.to_string(),
                },
            ],
            temperature: 0.1,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
        };

        let url = format!(
            "{}/chat/completions",
            self.config.api_url.trim_end_matches('/')
        );
        debug!("Calling extraction API at: {}", url);

        let mut last_error = None;
        let mut delay = Duration::from_secs(1);
        const MAX_RETRIES: u32 = 3;

        for attempt in 0..MAX_RETRIES {
            match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(&request)
                .send()
                .await
            {
                Ok(response) => {
                    let status = response.status();

                    if status == 429 {
                        warn!(
                            "Rate limited on attempt {}/{}, waiting {:?}",
                            attempt + 1,
                            MAX_RETRIES,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = response
                            .text()
                            .await
                            .unwrap_or_else(|_| "Unknown error".to_string());
                        return Err(OracleError::Api(format!(
                            "API returned {status}: {error_text}"
                        )));
                    }

                    let completion: ChatCompletionResponse = response
                        .json()
                        .await
                        .map_err(|e| OracleError::Parse(e.to_string()))?;

                    return completion
                        .choices
                        .into_iter()
                        .next()
                        .map(|c| c.message.content)
                        .ok_or_else(|| OracleError::Api("Empty response".to_string()));
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    last_error = Some(err_msg.clone());
                    if attempt < MAX_RETRIES - 1 {
                        warn!(
                            "Request failed on attempt {}/{}, retrying: {}",
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(OracleError::Api(format!(
            "Failed after {} retries: {}",
            MAX_RETRIES,
            last_error.unwrap_or_else(|| "Unknown error".to_string())
        )))
    }

    fn build_user_prompt(message: &str, current: &Snapshot) -> String {
        let memories_json = if current.is_empty() {
            "{}".to_string()
        } else {
            serde_json::to_string(current).unwrap_or_else(|_| "{}".to_string())
        };

        EXTRACTION_USER_PROMPT
            .replace("{memories}", &memories_json)
            .replace("{message}", message)
    }

    /// Strip markdown code fences some models wrap JSON output in.
    fn strip_fences(response: &str) -> &str {
        let trimmed = response.trim();
        let trimmed = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
    }
}

#[async_trait]
impl ExtractionOracle for RemoteOracle {
    async fn propose(
        &self,
        message: &str,
        current: &Snapshot,
    ) -> Result<OperationSet, OracleError> {
        let prompt = Self::build_user_prompt(message, current);
        let response = self.call_api(&prompt).await?;
        debug!("Extraction response: {}", response);

        let raw: serde_json::Value = serde_json::from_str(Self::strip_fences(&response))
            .map_err(|e| OracleError::Parse(format!("Failed to parse extraction JSON: {e}")))?;

        let ops = OperationSet::from_json(&raw);
        info!("Extracted {} operation(s) from message", ops.len());
        Ok(ops)
    }

    async fn is_available(&self) -> bool {
        !self.api_key.is_empty() && !self.config.api_url.is_empty()
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
