use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Result, StageError};

/// The sentence-encoder embedding model, called as an HTTP collaborator.
/// L2-normalization is the embed stage's responsibility, not this trait's.
#[async_trait]
pub trait SentenceEncoder: Send + Sync {
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    fn dim(&self) -> usize;
}

pub struct HttpSentenceEncoder {
    client: reqwest::Client,
    endpoint: String,
    dim: usize,
}

impl HttpSentenceEncoder {
    pub fn new(endpoint: String, dim: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            dim,
        }
    }
}

#[derive(Deserialize)]
struct EncodeResponse {
    embeddings: Vec<Vec<f32>>,
}

#[async_trait]
impl SentenceEncoder for HttpSentenceEncoder {
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&serde_json::json!({ "texts": texts }))
            .send()
            .await
            .map_err(|e| StageError::ExternalService {
                service: "encoder",
                message: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let message = resp.text().await.unwrap_or_default();
            return Err(StageError::ExternalService {
                service: "encoder",
                message: format!("{status}: {message}"),
            });
        }

        let parsed: EncodeResponse = resp.json().await.map_err(|e| StageError::ExternalService {
            service: "encoder",
            message: e.to_string(),
        })?;

        Ok(parsed.embeddings)
    }

    fn dim(&self) -> usize {
        self.dim
    }
}

/// L2-normalizes a vector in place; a zero vector is left unchanged since
/// there's no unit direction to normalize to.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_to_unit_length() {
        let mut v = vec![3.0_f32, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn leaves_zero_vector_unchanged() {
        let mut v = vec![0.0_f32, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
