//! Anthropic Messages API client.
//!
//! Builds the request payload, sends it with the configured model and token
//! budget, and extracts the completion text plus token usage. Any transport
//! failure, non-success status, or malformed body surfaces as
//! [`Error::UpstreamUnavailable`]; callers see a single "service
//! unavailable" condition. No retry, no backoff.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::{AnthropicConfig, CacheConfig};
use crate::errors::{Error, Result};
use crate::llm::cache::ResponseCache;

/// Token counts reported by the provider for one call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema)]
pub struct TokenUsage {
    pub input_tokens: i64,
    pub output_tokens: i64,
}

impl TokenUsage {
    pub fn total(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}

/// A prompt ready to be sent: optional system boilerplate plus the user
/// prompt assembled by [`crate::llm::prompts`].
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

/// A completed generation.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub model: String,
    pub usage: TokenUsage,
    /// True when served from the in-memory response cache
    pub cached: bool,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: [Message<'a>; 1],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    model: String,
    usage: UsageBlock,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct UsageBlock {
    input_tokens: i64,
    output_tokens: i64,
}

/// The generation client. Cheap to clone; holds a connection pool and the
/// response cache.
#[derive(Debug, Clone)]
pub struct AnthropicClient {
    http: Client,
    config: AnthropicConfig,
    cache: ResponseCache,
}

impl AnthropicClient {
    pub fn new(config: AnthropicConfig, cache_config: &CacheConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Internal {
                operation: format!("build HTTP client: {e}"),
            })?;

        Ok(Self {
            http,
            config,
            cache: ResponseCache::new(cache_config),
        })
    }

    /// The fixed model identifier used for all generations.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Run a completion, consulting the response cache first.
    #[tracing::instrument(skip_all, fields(max_tokens = request.max_tokens))]
    pub async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let key = ResponseCache::key(&self.config.model, request.system.as_deref(), &request.prompt);

        if let Some(hit) = self.cache.get(&key).await {
            tracing::debug!("generation served from response cache");
            return Ok(hit.to_completion());
        }

        let completion = self.call_api(request).await?;
        self.cache.insert(key, &completion).await;

        Ok(completion)
    }

    async fn call_api(&self, request: &CompletionRequest) -> Result<Completion> {
        let url = self
            .config
            .base_url
            .join("v1/messages")
            .map_err(|e| Error::Internal {
                operation: format!("build messages URL: {e}"),
            })?;

        let body = MessagesRequest {
            model: &self.config.model,
            max_tokens: request.max_tokens,
            system: request.system.as_deref(),
            messages: [Message {
                role: "user",
                content: &request.prompt,
            }],
        };

        let mut req = self
            .http
            .post(url)
            .header("anthropic-version", &self.config.version)
            .json(&body);

        if let Some(api_key) = &self.config.api_key {
            req = req.header("x-api-key", api_key);
        }

        let response = req.send().await.map_err(|e| Error::UpstreamUnavailable {
            message: format!("request failed: {e}"),
        })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(Error::UpstreamUnavailable {
                message: format!("provider returned {status}: {detail}"),
            });
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| Error::UpstreamUnavailable {
            message: format!("malformed provider response: {e}"),
        })?;

        let text: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();

        if text.is_empty() {
            return Err(Error::UpstreamUnavailable {
                message: "provider response contained no text content".to_string(),
            });
        }

        Ok(Completion {
            text,
            model: parsed.model,
            usage: TokenUsage {
                input_tokens: parsed.usage.input_tokens,
                output_tokens: parsed.usage.output_tokens,
            },
            cached: false,
        })
    }
}
