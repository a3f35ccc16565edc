use serde::Serialize;

/// One uploaded resume: the filename it came from and its extracted text.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub identifier: String,
    pub raw_text: String,
}

impl Candidate {
    pub fn new(identifier: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            raw_text: raw_text.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    #[serde(rename = "name")]
    pub identifier: String,
    pub similarity: f32,
    pub summary: String,
}

/// Candidates ordered by descending similarity, at most `RANKING_LIMIT` long.
#[derive(Debug, Clone)]
pub struct RankingResult {
    pub candidates: Vec<ScoredCandidate>,
}
