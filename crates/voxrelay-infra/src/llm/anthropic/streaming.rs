//! Anthropic SSE stream to [`StreamEvent`] adapter.
//!
//! Consumes the Messages API event stream and maps it to the
//! provider-agnostic [`StreamEvent`] enum. Only text deltas matter for
//! plain conversational requests; other event types are skipped. An
//! `error` event or a transport failure terminates the stream with an
//! [`LlmError`].

use std::pin::Pin;

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};
use secrecy::{ExposeSecret, SecretString};

use voxrelay_types::llm::{LlmError, StreamEvent};

use super::client::API_VERSION;
use super::types::{AnthropicDelta, AnthropicRequest, ContentBlockDeltaPayload, ErrorPayload};

/// Open a streaming Messages API request and adapt its SSE events.
///
/// The returned stream is finite: it ends with [`StreamEvent::Done`] on
/// `message_stop` (or when the server closes the connection), or with a
/// single terminal error.
pub(super) fn create_anthropic_stream(
    client: &reqwest::Client,
    url: &str,
    body: AnthropicRequest,
    api_key: &SecretString,
) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
    let client = client.clone();
    let url = url.to_string();
    let api_key = api_key.clone();

    Box::pin(async_stream::try_stream! {
        let response = open_stream(&client, &url, &body, &api_key).await?;

        let mut events = response.bytes_stream().eventsource();
        let mut stopped = false;

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| LlmError::Stream(e.to_string()))?;

            match event.event.as_str() {
                "content_block_delta" => {
                    let payload: ContentBlockDeltaPayload = serde_json::from_str(&event.data)
                        .map_err(|e| {
                            LlmError::Deserialization(format!("content_block_delta: {e}"))
                        })?;
                    if let AnthropicDelta::TextDelta { text } = payload.delta {
                        yield StreamEvent::TextDelta { text };
                    }
                }
                "error" => {
                    api_error(&event.data)?;
                }
                "message_stop" => {
                    stopped = true;
                    yield StreamEvent::Done;
                    break;
                }
                // message_start, content_block_start/stop, message_delta, ping
                _ => {}
            }
        }

        if !stopped {
            yield StreamEvent::Done;
        }
    })
}

/// Send the streaming request and map a non-success status to an
/// [`LlmError`] before any SSE parsing starts.
async fn open_stream(
    client: &reqwest::Client,
    url: &str,
    body: &AnthropicRequest,
    api_key: &SecretString,
) -> Result<reqwest::Response, LlmError> {
    let response = client
        .post(url)
        .header("x-api-key", api_key.expose_secret())
        .header("anthropic-version", API_VERSION)
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::Provider {
            message: format!("HTTP request failed: {e}"),
        })?;

    let status = response.status();
    if !status.is_success() {
        let error_body = response.text().await.unwrap_or_default();
        return Err(match status.as_u16() {
            401 => LlmError::AuthenticationFailed,
            429 => LlmError::RateLimited,
            _ => LlmError::Provider {
                message: format!("HTTP {status}: {error_body}"),
            },
        });
    }

    Ok(response)
}

/// Turn an SSE `error` event payload into a terminal [`LlmError`].
fn api_error(data: &str) -> Result<(), LlmError> {
    let message = match serde_json::from_str::<ErrorPayload>(data) {
        Ok(payload) => format!("{}: {}", payload.error.error_type, payload.error.message),
        Err(_) => data.to_string(),
    };
    Err(LlmError::Stream(message))
}
