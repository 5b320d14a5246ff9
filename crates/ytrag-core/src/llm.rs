//! Chat-completion LLM client boundary, shared by `ytrag-worker` (chunk
//! summarization) and `ytrag-rag` (intent classification, answer
//! generation, the SQL-agent path) so neither crate has to depend on
//! the other just to talk to the model.

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One turn in a conversation passed to the model.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Black-box chat-completion collaborator. The only model the pipeline
/// and the RAG orchestrator need: one-shot completion and a streamed
/// text-delta variant for `ask_stream`'s CONTENT/CONTENT_GLOBAL paths.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatTurn],
        temperature: f64,
    ) -> Result<String, LlmError>;

    /// Streams text deltas through `tx`; the default implementation
    /// falls back to a single non-streaming call followed by one delta.
    async fn stream(
        &self,
        system: &str,
        messages: &[ChatTurn],
        temperature: f64,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError> {
        let text = self.complete(system, messages, temperature).await?;
        let _ = tx.send(text).await;
        Ok(())
    }
}

/// OpenAI-compatible HTTP implementation, configured from
/// `ProvidersConfig::openai`.
pub struct OpenAiLlmClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiLlmClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    fn build_body(&self, system: &str, messages: &[ChatTurn], temperature: f64, stream: bool) -> serde_json::Value {
        let mut body_messages = vec![serde_json::json!({"role": "system", "content": system})];
        for turn in messages {
            body_messages.push(serde_json::json!({"role": turn.role.as_str(), "content": turn.content}));
        }
        serde_json::json!({
            "model": self.model,
            "messages": body_messages,
            "temperature": temperature,
            "stream": stream,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiLlmClient {
    async fn complete(
        &self,
        system: &str,
        messages: &[ChatTurn],
        temperature: f64,
    ) -> Result<String, LlmError> {
        let body = self.build_body(system, messages, temperature, false);
        let url = format!("{}/v1/chat/completions", self.base_url);

        debug!(model = %self.model, "sending chat completion request");

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "chat completion API error");
            return Err(LlmError::Api {
                status,
                message: text,
            });
        }

        let parsed: ChatCompletionResponse = resp
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_default())
    }

    async fn stream(
        &self,
        system: &str,
        messages: &[ChatTurn],
        temperature: f64,
        tx: mpsc::Sender<String>,
    ) -> Result<(), LlmError> {
        use futures_util::StreamExt;

        let body = self.build_body(system, messages, temperature, true);
        let url = format!("{}/v1/chat/completions", self.base_url);

        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status,
                message: text,
            });
        }

        let mut line_buf = String::new();
        let mut byte_stream = resp.bytes_stream();

        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            let Ok(text) = std::str::from_utf8(&chunk) else {
                continue;
            };
            line_buf.push_str(text);

            let lines: Vec<&str> = line_buf.split('\n').collect();
            let (complete, remainder) = lines.split_at(lines.len() - 1);
            let remainder = remainder.first().unwrap_or(&"").to_string();

            for line in complete {
                let line = line.trim();
                let Some(data) = line.strip_prefix("data: ") else {
                    continue;
                };
                if data == "[DONE]" {
                    continue;
                }
                if let Ok(chunk_resp) = serde_json::from_str::<StreamChunk>(data) {
                    for choice in &chunk_resp.choices {
                        if let Some(content) = &choice.delta.content {
                            if !content.is_empty() && tx.send(content.clone()).await.is_err() {
                                return Ok(());
                            }
                        }
                    }
                }
            }

            line_buf = remainder;
        }

        Ok(())
    }
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

#[derive(Deserialize)]
struct StreamChunk {
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
