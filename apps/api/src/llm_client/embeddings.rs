//! Embeddings client for OpenAI-compatible `/embeddings` endpoints
//! (Hugging Face TEI, Ollama, OpenAI).

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{build_http_client, send_with_retry, ProviderError, RetryPolicy};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Clone)]
pub struct EmbeddingClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    retry: RetryPolicy,
}

impl EmbeddingClient {
    pub fn new(
        api_base: &str,
        api_key: Option<String>,
        model: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            endpoint: format!("{}/embeddings", api_base.trim_end_matches('/')),
            api_key,
            model,
            retry,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Embeds a single text. Normalization is left to the caller.
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: text,
        };

        let response = send_with_retry(&self.retry, "Embedding call", || {
            let request = self.client.post(&self.endpoint).json(&request_body);
            match &self.api_key {
                Some(key) => request.bearer_auth(key),
                None => request,
            }
        })
        .await?;

        let body = response.text().await?;
        let parsed: EmbeddingResponse = serde_json::from_str(&body)?;

        let embedding = parsed
            .data
            .into_iter()
            .find(|d| d.index == 0)
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or(ProviderError::EmptyContent)?;

        debug!("Embedding call succeeded: dimensions={}", embedding.len());
        Ok(embedding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::mock;
    use axum::http::StatusCode;
    use serde_json::json;
    use std::sync::atomic::Ordering;

    fn client(base: &str) -> EmbeddingClient {
        EmbeddingClient::new(
            base,
            None,
            "BAAI/bge-small-en-v1.5".to_string(),
            Duration::from_secs(5),
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_returns_first_vector() {
        let (base, hits) = mock::serve(
            "/v1/embeddings",
            vec![(
                StatusCode::OK,
                json!({
                    "object": "list",
                    "data": [{"object": "embedding", "embedding": [0.6, 0.8, 0.0], "index": 0}],
                    "model": "BAAI/bge-small-en-v1.5"
                }),
            )],
        )
        .await;

        let vector = client(&base).embed_text("Python backend engineer").await.unwrap();
        assert_eq!(vector, vec![0.6, 0.8, 0.0]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_data_is_an_error() {
        let (base, _) =
            mock::serve("/v1/embeddings", vec![(StatusCode::OK, json!({"data": []}))]).await;

        let err = client(&base).embed_text("text").await.unwrap_err();
        assert!(matches!(err, ProviderError::EmptyContent));
    }

    #[tokio::test]
    async fn test_model_loading_is_retried() {
        let (base, hits) = mock::serve(
            "/v1/embeddings",
            vec![
                (StatusCode::SERVICE_UNAVAILABLE, json!({"error": "Model is loading"})),
                (StatusCode::OK, json!({"data": [{"embedding": [1.0], "index": 0}]})),
            ],
        )
        .await;

        let vector = client(&base).embed_text("text").await.unwrap();
        assert_eq!(vector, vec![1.0]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        // Reserve a free port, then close it so the connection is refused.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client(&format!("http://{addr}/v1"))
            .embed_text("text")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Http(_)));
    }
}
