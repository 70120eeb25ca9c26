//! SSE stream creation for the Gemini streamGenerateContent API.
//!
//! With `alt=sse` the API emits one SSE `data:` frame per response chunk;
//! each frame is a complete JSON `GeminiResponse`. The stream simply ends
//! when generation is done (there is no sentinel frame).
//!
//! Event order produced here:
//! 1. `Connected` -- after the HTTP response status has been checked
//! 2. `TextDelta` -- per candidate text fragment
//! 3. `Usage` / `MessageDelta` -- as metadata appears on chunks
//! 4. `Done` -- when the SSE stream ends

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use nova_types::llm::{LlmError, StreamEvent, Usage};

use super::types::{map_finish_reason, GeminiRequest, GeminiResponse};

/// Create a streaming SSE connection to the Gemini API.
///
/// The request is sent on first poll; the first item is
/// [`StreamEvent::Connected`] once a successful status has been seen, or
/// an error if the call was refused.
pub fn create_gemini_stream(
    client: reqwest::Client,
    url: String,
    body: GeminiRequest,
    api_key: SecretString,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    Box::pin(async_stream::try_stream! {
        let response = client
            .post(&url)
            .header("x-goog-api-key", api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: e.to_string(),
            })?;

        check_status(&response)?;

        yield StreamEvent::Connected;

        let events = response.bytes_stream().eventsource();
        let mut events = std::pin::pin!(events);
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;
            let chunk: GeminiResponse = serde_json::from_str(&event.data)
                .map_err(|e| LlmError::Deserialization(format!("stream chunk: {e}")))?;

            for candidate in &chunk.candidates {
                let text = candidate.text();
                if !text.is_empty() {
                    yield StreamEvent::TextDelta { text };
                }
                if let Some(reason) = candidate.finish_reason.as_deref() {
                    yield StreamEvent::MessageDelta {
                        stop_reason: map_finish_reason(reason),
                    };
                }
            }

            if let Some(usage) = &chunk.usage_metadata {
                yield StreamEvent::Usage(Usage {
                    input_tokens: usage.prompt_token_count,
                    output_tokens: usage.candidates_token_count,
                });
            }
        }

        yield StreamEvent::Done;
    })
}

/// Map an unsuccessful HTTP status to the matching [`LlmError`].
pub(super) fn check_status(response: &reqwest::Response) -> Result<(), LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    Err(match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(|secs| secs * 1000),
        },
        400 => LlmError::InvalidRequest(format!("gemini rejected the request ({status})")),
        _ => LlmError::Provider {
            message: format!("gemini returned {status}"),
        },
    })
}
