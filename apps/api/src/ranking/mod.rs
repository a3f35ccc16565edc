// Candidate ranking: embeddings, cosine scoring, ordering, and LLM summaries.
// All hosted-model calls go through llm_client via the provider traits.

pub mod handlers;
pub mod models;
pub mod pipeline;
pub mod providers;
pub mod similarity;
