//! Ranking pipeline: scores candidates against a job description and attaches summaries.
//!
//! Algorithm:
//! 1. Embed the job description, then every candidate (blank text is not sent
//!    to the provider and scores 0).
//! 2. Score each candidate by cosine similarity to the job embedding.
//! 3. Stable sort descending, keep the top `RANKING_LIMIT`.
//! 4. Summarize each kept candidate; a failed summary becomes `FALLBACK_SUMMARY`.
//!
//! Summaries do not affect ordering, so only kept candidates are summarized.

use std::sync::Arc;

use futures::{stream, FutureExt, StreamExt, TryStreamExt};
use thiserror::Error;
use tracing::{info, warn};

use crate::llm_client::ProviderError;
use crate::ranking::models::{Candidate, RankingResult, ScoredCandidate};
use crate::ranking::providers::{EmbeddingProvider, SummaryProvider};
use crate::ranking::similarity::cosine_similarity;

/// Maximum number of candidates returned by a ranking.
pub const RANKING_LIMIT: usize = 5;

pub const FALLBACK_SUMMARY: &str = "Summary could not be generated due to an internal error.";

#[derive(Debug, Error)]
pub enum RankError {
    #[error("job description cannot be empty")]
    EmptyJobDescription,

    #[error("at least one candidate is required")]
    NoCandidates,

    #[error("embedding failed for {}: {source}", .identifier.as_deref().unwrap_or("job description"))]
    Embedding {
        /// `None` when the job description itself failed.
        identifier: Option<String>,
        #[source]
        source: ProviderError,
    },
}

pub struct RankingPipeline {
    embedder: Arc<dyn EmbeddingProvider>,
    summarizer: Arc<dyn SummaryProvider>,
    concurrency: usize,
}

impl RankingPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        summarizer: Arc<dyn SummaryProvider>,
        concurrency: usize,
    ) -> Self {
        Self {
            embedder,
            summarizer,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn rank(
        &self,
        job_description: &str,
        candidates: &[Candidate],
    ) -> Result<RankingResult, RankError> {
        if job_description.trim().is_empty() {
            return Err(RankError::EmptyJobDescription);
        }
        if candidates.is_empty() {
            return Err(RankError::NoCandidates);
        }

        let job_vec = self
            .embedder
            .embed(job_description)
            .await
            .map_err(|source| RankError::Embedding {
                identifier: None,
                source,
            })?;

        // Built eagerly so the future returned by `rank` stays `Send`.
        let embeddings: Vec<_> = candidates
            .iter()
            .map(|candidate| self.embed_candidate(candidate).boxed())
            .collect();
        let candidate_vecs: Vec<Vec<f32>> = stream::iter(embeddings)
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let mut scored: Vec<(&Candidate, f32)> = candidates
            .iter()
            .zip(&candidate_vecs)
            .map(|(candidate, vec)| (candidate, cosine_similarity(&job_vec, vec)))
            .collect();

        // sort_by is stable: equal scores keep upload order.
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(RANKING_LIMIT);

        let summaries: Vec<_> = scored
            .iter()
            .map(|&(candidate, _)| self.summary_or_fallback(candidate, job_description).boxed())
            .collect();
        let summaries: Vec<String> = stream::iter(summaries)
            .buffered(self.concurrency)
            .collect()
            .await;

        let ranked: Vec<ScoredCandidate> = scored
            .into_iter()
            .zip(summaries)
            .map(|((candidate, similarity), summary)| ScoredCandidate {
                identifier: candidate.identifier.clone(),
                similarity,
                summary,
            })
            .collect();

        info!(
            candidates = candidates.len(),
            returned = ranked.len(),
            top_score = ranked.first().map(|c| c.similarity),
            "Ranking complete"
        );

        Ok(RankingResult { candidates: ranked })
    }

    async fn embed_candidate(&self, candidate: &Candidate) -> Result<Vec<f32>, RankError> {
        if candidate.raw_text.trim().is_empty() {
            warn!(candidate = %candidate.identifier, "Candidate has no text; scoring as 0");
            return Ok(Vec::new());
        }
        self.embedder
            .embed(&candidate.raw_text)
            .await
            .map_err(|source| RankError::Embedding {
                identifier: Some(candidate.identifier.clone()),
                source,
            })
    }

    async fn summary_or_fallback(&self, candidate: &Candidate, job_description: &str) -> String {
        match self
            .summarizer
            .summarize(&candidate.raw_text, job_description)
            .await
        {
            Ok(summary) => summary,
            Err(e) => {
                warn!(candidate = %candidate.identifier, error = %e, "Summary generation failed");
                FALLBACK_SUMMARY.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::ranking::similarity::normalize;

    /// Bag-of-words embedder over a fixed vocabulary. Deterministic.
    struct VocabEmbedder {
        vocab: Vec<&'static str>,
        fail_on: HashSet<String>,
        calls: AtomicUsize,
    }

    impl VocabEmbedder {
        fn new(vocab: Vec<&'static str>) -> Self {
            Self {
                vocab,
                fail_on: HashSet::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, text: &str) -> Self {
            self.fail_on.insert(text.to_string());
            self
        }
    }

    #[async_trait]
    impl EmbeddingProvider for VocabEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(text) {
                return Err(ProviderError::Api {
                    status: 503,
                    message: "model unavailable".to_string(),
                });
            }
            let lower = text.to_lowercase();
            let mut v: Vec<f32> = self
                .vocab
                .iter()
                .map(|w| lower.matches(w).count() as f32)
                .collect();
            normalize(&mut v);
            Ok(v)
        }
    }

    /// Returns preset vectors keyed by text.
    struct FixedEmbedder(HashMap<String, Vec<f32>>);

    #[async_trait]
    impl EmbeddingProvider for FixedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
            self.0.get(text).cloned().ok_or(ProviderError::EmptyContent)
        }
    }

    struct EchoSummarizer {
        fail_on: HashSet<String>,
        calls: AtomicUsize,
    }

    impl EchoSummarizer {
        fn new() -> Self {
            Self {
                fail_on: HashSet::new(),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, resume_text: &str) -> Self {
            self.fail_on.insert(resume_text.to_string());
            self
        }
    }

    #[async_trait]
    impl SummaryProvider for EchoSummarizer {
        async fn summarize(
            &self,
            resume_text: &str,
            _job_description: &str,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.contains(resume_text) {
                return Err(ProviderError::Api {
                    status: 429,
                    message: "quota exceeded".to_string(),
                });
            }
            Ok(format!("summary of {resume_text}"))
        }
    }

    fn pipeline(
        embedder: impl EmbeddingProvider + 'static,
        summarizer: impl SummaryProvider + 'static,
    ) -> RankingPipeline {
        RankingPipeline::new(Arc::new(embedder), Arc::new(summarizer), 4)
    }

    fn tech_vocab() -> Vec<&'static str> {
        vec![
            "python", "backend", "engineer", "developer", "years", "rest", "api", "graphic",
            "designer", "photoshop",
        ]
    }

    fn fixed(pairs: &[(&str, Vec<f32>)]) -> FixedEmbedder {
        FixedEmbedder(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    #[tokio::test]
    async fn test_python_resume_ranks_above_designer() {
        let p = pipeline(VocabEmbedder::new(tech_vocab()), EchoSummarizer::new());
        let candidates = vec![
            Candidate::new("b.pdf", "Graphic designer, Photoshop expert"),
            Candidate::new("a.pdf", "Senior Python developer, 6 years, REST APIs"),
        ];

        let result = p
            .rank("Python backend engineer with 5 years experience", &candidates)
            .await
            .unwrap();

        assert_eq!(result.candidates.len(), 2);
        assert_eq!(result.candidates[0].identifier, "a.pdf");
        assert_eq!(result.candidates[1].identifier, "b.pdf");
        assert!(result.candidates[0].similarity > result.candidates[1].similarity);
    }

    #[tokio::test]
    async fn test_truncates_to_ranking_limit() {
        let summarizer = EchoSummarizer::new();
        let p = RankingPipeline::new(
            Arc::new(VocabEmbedder::new(tech_vocab())),
            Arc::new(summarizer),
            2,
        );
        let candidates: Vec<Candidate> = (0..7)
            .map(|i| Candidate::new(format!("{i}.pdf"), "python ".repeat(i + 1)))
            .collect();

        let result = p.rank("python backend", &candidates).await.unwrap();
        assert_eq!(result.candidates.len(), RANKING_LIMIT);
    }

    #[tokio::test]
    async fn test_summaries_only_for_kept_candidates() {
        let summarizer = Arc::new(EchoSummarizer::new());
        let p = RankingPipeline::new(
            Arc::new(VocabEmbedder::new(tech_vocab())),
            summarizer.clone(),
            4,
        );
        let candidates: Vec<Candidate> = (0..7)
            .map(|i| Candidate::new(format!("{i}.pdf"), format!("python developer {i}")))
            .collect();

        p.rank("python developer", &candidates).await.unwrap();
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), RANKING_LIMIT);
    }

    #[tokio::test]
    async fn test_result_length_is_min_of_limit_and_input() {
        for n in 1..=8usize {
            let p = pipeline(VocabEmbedder::new(tech_vocab()), EchoSummarizer::new());
            let candidates: Vec<Candidate> = (0..n)
                .map(|i| Candidate::new(format!("{i}.docx"), "backend engineer"))
                .collect();
            let result = p.rank("backend engineer", &candidates).await.unwrap();
            assert_eq!(result.candidates.len(), n.min(RANKING_LIMIT), "n = {n}");
        }
    }

    #[tokio::test]
    async fn test_sorted_descending() {
        let p = pipeline(
            fixed(&[
                ("job", vec![1.0, 0.0]),
                ("low", vec![0.1, 0.99]),
                ("high", vec![0.99, 0.1]),
                ("mid", vec![0.7, 0.7]),
            ]),
            EchoSummarizer::new(),
        );
        let candidates = vec![
            Candidate::new("low", "low"),
            Candidate::new("high", "high"),
            Candidate::new("mid", "mid"),
        ];

        let result = p.rank("job", &candidates).await.unwrap();
        let names: Vec<&str> = result
            .candidates
            .iter()
            .map(|c| c.identifier.as_str())
            .collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
        for pair in result.candidates.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
    }

    #[tokio::test]
    async fn test_ties_keep_input_order() {
        let p = pipeline(
            fixed(&[("job", vec![1.0, 0.0]), ("same", vec![0.5, 0.5])]),
            EchoSummarizer::new(),
        );
        let candidates = vec![
            Candidate::new("first", "same"),
            Candidate::new("second", "same"),
            Candidate::new("third", "same"),
        ];

        let result = p.rank("job", &candidates).await.unwrap();
        let names: Vec<&str> = result
            .candidates
            .iter()
            .map(|c| c.identifier.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn test_signed_zero_scores_tie_in_input_order() {
        let p = pipeline(
            fixed(&[
                ("job", vec![1.0, -0.0]),
                ("minus", vec![-0.0, 1.0]),
                ("plus", vec![0.0, 1.0]),
            ]),
            EchoSummarizer::new(),
        );
        let candidates = vec![
            Candidate::new("first", "minus"),
            Candidate::new("second", "plus"),
        ];

        let result = p.rank("job", &candidates).await.unwrap();
        let names: Vec<&str> = result
            .candidates
            .iter()
            .map(|c| c.identifier.as_str())
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    fn assert_send<T: Send>(_: T) {}

    #[test]
    fn test_rank_future_is_send() {
        let p = pipeline(VocabEmbedder::new(tech_vocab()), EchoSummarizer::new());
        let candidates = vec![Candidate::new("a.pdf", "python developer")];
        let job_description = String::from("python developer");
        assert_send(p.rank(&job_description, &candidates));
    }

    #[tokio::test]
    async fn test_summary_failure_is_isolated() {
        let p = pipeline(
            VocabEmbedder::new(tech_vocab()),
            EchoSummarizer::new().failing_on("graphic designer"),
        );
        let candidates = vec![
            Candidate::new("a.pdf", "python developer"),
            Candidate::new("b.pdf", "graphic designer"),
        ];

        let result = p.rank("python developer", &candidates).await.unwrap();
        let a = result
            .candidates
            .iter()
            .find(|c| c.identifier == "a.pdf")
            .unwrap();
        let b = result
            .candidates
            .iter()
            .find(|c| c.identifier == "b.pdf")
            .unwrap();
        assert_eq!(a.summary, "summary of python developer");
        assert_eq!(b.summary, FALLBACK_SUMMARY);
    }

    #[tokio::test]
    async fn test_job_embedding_failure_fails_ranking() {
        let p = pipeline(
            VocabEmbedder::new(tech_vocab()).failing_on("python developer"),
            EchoSummarizer::new(),
        );
        let err = p
            .rank("python developer", &[Candidate::new("a.pdf", "python")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            RankError::Embedding {
                identifier: None,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_candidate_embedding_failure_fails_ranking() {
        let summarizer = Arc::new(EchoSummarizer::new());
        let p = RankingPipeline::new(
            Arc::new(VocabEmbedder::new(tech_vocab()).failing_on("graphic designer")),
            summarizer.clone(),
            4,
        );
        let candidates = vec![
            Candidate::new("a.pdf", "python developer"),
            Candidate::new("b.pdf", "graphic designer"),
        ];

        let err = p.rank("python developer", &candidates).await.unwrap_err();
        match err {
            RankError::Embedding { identifier, .. } => {
                assert_eq!(identifier.as_deref(), Some("b.pdf"))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(summarizer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_blank_candidate_scores_zero_without_embedding() {
        let embedder = Arc::new(VocabEmbedder::new(tech_vocab()));
        let p = RankingPipeline::new(embedder.clone(), Arc::new(EchoSummarizer::new()), 4);

        let result = p
            .rank("python developer", &[Candidate::new("empty.pdf", "")])
            .await
            .unwrap();

        assert_eq!(result.candidates.len(), 1);
        assert_eq!(result.candidates[0].similarity, 0.0);
        // Only the job description was embedded.
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_vector_candidate_scores_zero() {
        let p = pipeline(
            fixed(&[("job", vec![1.0, 0.0]), ("unknown words", vec![0.0, 0.0])]),
            EchoSummarizer::new(),
        );
        let result = p
            .rank("job", &[Candidate::new("x.docx", "unknown words")])
            .await
            .unwrap();
        assert_eq!(result.candidates[0].similarity, 0.0);
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected() {
        let p = pipeline(VocabEmbedder::new(tech_vocab()), EchoSummarizer::new());

        let err = p
            .rank("   ", &[Candidate::new("a.pdf", "python")])
            .await
            .unwrap_err();
        assert!(matches!(err, RankError::EmptyJobDescription));

        let err = p.rank("python", &[]).await.unwrap_err();
        assert!(matches!(err, RankError::NoCandidates));
    }

    #[test]
    fn test_embedding_error_message_names_source() {
        let err = RankError::Embedding {
            identifier: Some("a.pdf".to_string()),
            source: ProviderError::EmptyContent,
        };
        assert!(err.to_string().contains("a.pdf"));

        let err = RankError::Embedding {
            identifier: None,
            source: ProviderError::EmptyContent,
        };
        assert!(err.to_string().contains("job description"));
    }
}
