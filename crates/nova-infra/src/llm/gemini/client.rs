//! GeminiProvider -- concrete [`LlmProvider`] implementation for Google
//! Gemini.
//!
//! Sends requests to the generateContent endpoint (non-streaming) and the
//! streamGenerateContent endpoint with `alt=sse` (streaming).
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::pin::Pin;
use std::time::Duration;

use futures_util::Stream;
use secrecy::{ExposeSecret, SecretString};

use nova_core::llm::provider::LlmProvider;
use nova_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};

use super::streaming::{check_status, create_gemini_stream};
use super::types::{map_finish_reason, GeminiRequest, GeminiResponse};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini LLM provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
}

impl GeminiProvider {
    /// Create a new Gemini provider.
    ///
    /// # Arguments
    ///
    /// * `api_key` - Gemini API key wrapped in SecretString
    /// * `model` - Model identifier (e.g., "gemini-2.0-flash")
    pub fn new(api_key: SecretString, model: String) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model,
        })
    }

    /// The default model for this provider.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Override the base URL (useful for testing or proxies).
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Model from the request when set, else the provider default.
    fn resolve_model<'a>(&'a self, request: &'a CompletionRequest) -> &'a str {
        if request.model.is_empty() {
            &self.model
        } else {
            &request.model
        }
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, model, method)
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = self.resolve_model(request);
        let url = self.endpoint(model, "generateContent");
        let body = GeminiRequest::from_completion(request);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: e.to_string(),
            })?;

        check_status(&response)?;

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Deserialization(e.to_string()))?;

        let candidate = parsed
            .candidates
            .first()
            .ok_or_else(|| LlmError::Provider {
                message: "gemini returned no candidates".to_string(),
            })?;

        let usage = parsed
            .usage_metadata
            .as_ref()
            .map(|u| Usage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            content: candidate.text(),
            model: model.to_string(),
            stop_reason: candidate
                .finish_reason
                .as_deref()
                .map(map_finish_reason)
                .unwrap_or(StopReason::EndTurn),
            usage,
        })
    }

    fn stream(
        &self,
        request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        let model = self.resolve_model(&request);
        let url = format!("{}?alt=sse", self.endpoint(model, "streamGenerateContent"));
        let body = GeminiRequest::from_completion(&request);

        create_gemini_stream(self.client.clone(), url, body, self.api_key.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GeminiProvider {
        GeminiProvider::new(
            SecretString::from("test-key"),
            "gemini-2.0-flash".to_string(),
        )
        .unwrap()
    }

    #[test]
    fn test_endpoint_layout() {
        let provider = provider();
        assert_eq!(
            provider.endpoint("gemini-2.0-flash", "generateContent"),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_base_url_override() {
        let provider = provider().with_base_url("http://localhost:9090".to_string());
        assert!(provider
            .endpoint("gemini-2.0-flash", "streamGenerateContent")
            .starts_with("http://localhost:9090/"));
    }

    #[test]
    fn test_resolve_model_prefers_request() {
        let provider = provider();
        let mut request = CompletionRequest {
            model: "gemini-2.5-pro".to_string(),
            messages: Vec::new(),
            system: None,
            max_tokens: 16,
            temperature: None,
            stream: false,
        };
        assert_eq!(provider.resolve_model(&request), "gemini-2.5-pro");

        request.model = String::new();
        assert_eq!(provider.resolve_model(&request), "gemini-2.0-flash");
    }

    #[test]
    fn test_api_key_not_in_debug_output() {
        // SecretString redacts itself; the provider has no Debug impl at
        // all, so the key can only leave through expose_secret().
        let key = SecretString::from("super-secret");
        assert!(!format!("{key:?}").contains("super-secret"));
    }
}
