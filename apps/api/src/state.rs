use std::sync::Arc;

use crate::config::Config;
use crate::extraction::TextExtractor;
use crate::ranking::pipeline::RankingPipeline;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Built once at startup; holds the embedding and summary providers.
    pub pipeline: Arc<RankingPipeline>,
    /// Pluggable extractor. Default: DocumentExtractor (PDF, DOCX, plain text).
    pub extractor: Arc<dyn TextExtractor>,
    pub config: Config,
}
