//! Provider seams for the ranking pipeline.
//!
//! `RankingPipeline` holds `Arc<dyn EmbeddingProvider>` and `Arc<dyn SummaryProvider>`,
//! so the hosted backends can be swapped (or faked in tests) without touching
//! the pipeline or the handlers.

use std::time::Duration;

use async_trait::async_trait;

use crate::llm_client::embeddings::EmbeddingClient;
use crate::llm_client::prompts::build_summary_prompt;
use crate::llm_client::{LlmClient, ProviderError};
use crate::ranking::similarity::normalize;

/// Produces a unit-normalized embedding for a text.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}

/// Produces a short natural-language assessment of a resume against a job description.
#[async_trait]
pub trait SummaryProvider: Send + Sync {
    async fn summarize(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<String, ProviderError>;
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        let mut vector = self.embed_text(text).await?;
        normalize(&mut vector);
        Ok(vector)
    }
}

/// Summaries via the chat-completions client, bounded by an overall timeout
/// that covers every retry attempt.
pub struct LlmSummaryProvider {
    llm: LlmClient,
    timeout: Duration,
}

impl LlmSummaryProvider {
    pub fn new(llm: LlmClient, timeout: Duration) -> Self {
        Self { llm, timeout }
    }
}

#[async_trait]
impl SummaryProvider for LlmSummaryProvider {
    async fn summarize(
        &self,
        resume_text: &str,
        job_description: &str,
    ) -> Result<String, ProviderError> {
        let prompt = build_summary_prompt(resume_text, job_description);
        tokio::time::timeout(self.timeout, self.llm.complete(&prompt))
            .await
            .map_err(|_| ProviderError::Timeout(self.timeout))?
    }
}
