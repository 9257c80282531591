//! Azure OpenAI client implementation

use super::error::{UpstreamError, UpstreamResult};
use super::streaming::{parse_stream, DeltaStream};
use super::types::{ApiErrorBody, CompletionRequest, CompletionResponse};
use crate::config::UpstreamConfig;
use crate::protocol::Message;
use reqwest::{Client, ClientBuilder, Response};
use std::time::Duration;
use tracing::debug;

/// Client for the upstream chat-completions endpoint
///
/// One instance makes at most one upstream call per relay request. No
/// overall request timeout is set: streamed completions can legitimately
/// stay open for a long time, so only the connect phase is bounded.
pub struct AzureClient {
    config: UpstreamConfig,
    client: Client,
}

impl AzureClient {
    /// Create a new upstream client for the given configuration
    pub fn new(config: UpstreamConfig) -> UpstreamResult<Self> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| {
                UpstreamError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    /// Build the deployment-scoped completions URL
    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    async fn send(&self, request: &CompletionRequest<'_>) -> UpstreamResult<Response> {
        let url = self.completions_url();
        debug!("Upstream request URL: {}", url);

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(request)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(Self::error_from_response(response).await)
        }
    }

    /// Map a non-success upstream response to an error, preferring the
    /// structured message when the body parses.
    async fn error_from_response(response: Response) -> UpstreamError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|parsed| parsed.error.message)
            .unwrap_or(body);

        UpstreamError::Api {
            status: status.as_u16(),
            message,
        }
    }

    /// Request a single completion and return the first choice's text,
    /// or an empty string when the upstream returned none.
    pub async fn complete(&self, messages: &[Message]) -> UpstreamResult<String> {
        let request = CompletionRequest {
            messages,
            stream: None,
        };

        let response = self.send(&request).await?;
        let completion: CompletionResponse = response.json().await?;
        Ok(completion.first_choice_text().unwrap_or_default())
    }

    /// Request a streamed completion and return the lazy delta sequence.
    pub async fn complete_stream(&self, messages: &[Message]) -> UpstreamResult<DeltaStream> {
        let request = CompletionRequest {
            messages,
            stream: Some(true),
        };

        let response = self.send(&request).await?;
        Ok(parse_stream(response.bytes_stream()))
    }
}
