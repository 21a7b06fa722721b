use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::{future, StreamExt};
use reqwest::{Client, Response};
use serde::Deserialize;

use canvas_core::CanvasConfig;

use crate::provider::{ChatTurn, InferenceError, InferenceProvider, InferenceStream, Result};

const DONE_MARKER: &str = "[DONE]";

/// Any endpoint speaking the OpenAI chat-completions streaming protocol
/// (Groq, OpenAI, local gateways).
pub struct OpenAiCompatProvider {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: None,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn from_config(config: &CanvasConfig) -> Self {
        let provider = Self::new(&config.api_base);
        match &config.api_key {
            Some(key) => provider.with_api_key(key),
            None => provider,
        }
    }

    fn build_request_body(history: &[ChatTurn], model: &str) -> serde_json::Value {
        serde_json::json!({
            "model": model,
            "messages": history,
            "stream": true,
        })
    }
}

#[async_trait]
impl InferenceProvider for OpenAiCompatProvider {
    async fn chat_stream(&self, history: &[ChatTurn], model: &str) -> Result<InferenceStream> {
        let body = Self::build_request_body(history, model);
        tracing::debug!(
            model,
            message_count = history.len(),
            "OpenAiCompatProvider: starting stream"
        );

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await?;
            return Err(InferenceError::Api(format!("HTTP {}: {}", status, text)));
        }

        Ok(delta_stream(response))
    }
}

/// Text deltas of one completion. The stream ends at the `[DONE]` event;
/// a transport failure or an unreadable chunk ends it with a stream error.
fn delta_stream(response: Response) -> InferenceStream {
    let deltas = response
        .bytes_stream()
        .eventsource()
        .take_while(|event| {
            let done = matches!(event, Ok(event) if event.data.trim() == DONE_MARKER);
            future::ready(!done)
        })
        .filter_map(|event| async move {
            let delta = match event {
                Ok(event) => parse_sse_data(&event.data)
                    .map_err(|err| InferenceError::Stream(err.to_string())),
                Err(err) => Err(InferenceError::Stream(err.to_string())),
            };
            delta.transpose()
        });

    Box::pin(deltas)
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Deserialize, Default)]
struct StreamDelta {
    content: Option<String>,
}

/// Pull the text delta out of one `data:` payload.
fn parse_sse_data(data: &str) -> Result<Option<String>> {
    let data = data.trim();
    if data.is_empty() || data == DONE_MARKER {
        return Ok(None);
    }

    let chunk: StreamChunk = serde_json::from_str(data)?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}
