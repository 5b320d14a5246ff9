use async_trait::async_trait;
use serde::Deserialize;
use ytrag_db::models::RawSegment;

use crate::error::{Result, StageError};

/// The speech-to-text model, called as an HTTP collaborator. Out of
/// scope per the Non-goals — this trait is the seam a worker depends on.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_path: &str, language: &str) -> Result<Vec<RawSegment>>;
}

pub struct HttpSpeechToText {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSpeechToText {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[derive(Deserialize)]
struct TranscribeResponse {
    segments: Vec<TranscribedSegment>,
}

#[derive(Deserialize)]
struct TranscribedSegment {
    start_time: f64,
    end_time: f64,
    text: String,
}

#[async_trait]
impl SpeechToText for HttpSpeechToText {
    async fn transcribe(&self, audio_path: &str, language: &str) -> Result<Vec<RawSegment>> {
        if tokio::fs::metadata(audio_path).await.is_err() {
            return Err(StageError::NotFound(format!("audio file not found: {audio_path}")));
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({
                "audio_path": audio_path,
                "language": language,
                "vad_filter": true,
            }))
            .send()
            .await
            .map_err(|e| StageError::ExternalService {
                service: "stt",
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(StageError::ExternalService {
                service: "stt",
                message: format!("{status}: {message}"),
            });
        }

        let parsed: TranscribeResponse = resp.json().await.map_err(|e| StageError::ExternalService {
            service: "stt",
            message: e.to_string(),
        })?;

        Ok(parsed
            .segments
            .into_iter()
            .map(|s| RawSegment {
                start_time: s.start_time,
                end_time: s.end_time,
                text: s.text.trim().to_string(),
            })
            .collect())
    }
}
