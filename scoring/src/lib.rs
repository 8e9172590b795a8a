pub mod fallback;
pub mod profile;
pub mod weights;

use std::sync::Arc;

use async_trait::async_trait;
use common::error::AppError;
use common::model::{Chunk, RelevanceScore};
use tracing::instrument;
use vector_index::{metric::similarity, EmbeddingFn, SimilarityMetric};

pub use fallback::lexical_score;
pub use profile::{InMemoryUserProfiles, NoopUserProfiles, UserProfileProvider};
pub use weights::ScoringWeights;

/// Attaches `relevance_score` to each chunk given a query (spec.md §4.4).
/// Implementations never error out of the overall pipeline: orchestrator
/// callers fall back to [`fallback::lexical_score`] per chunk if `score`
/// returns `Err`.
#[async_trait]
pub trait RelevanceScorer: Send + Sync {
    async fn score(
        &self,
        chunks: &[Chunk],
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<RelevanceScore>, AppError>;
}

/// Pure lexical-Jaccard scorer, usable standalone when no embeddings or
/// user profiles are configured. Never errors.
#[derive(Debug, Default)]
pub struct LexicalScorer;

#[async_trait]
impl RelevanceScorer for LexicalScorer {
    async fn score(
        &self,
        chunks: &[Chunk],
        query: &str,
        _user_id: Option<&str>,
    ) -> Result<Vec<RelevanceScore>, AppError> {
        Ok(chunks.iter().map(|c| lexical_score(c, query)).collect())
    }
}

/// Blends lexical overlap, embedding cosine similarity, and learned user
/// preference (spec.md §4.4 "advanced scorer"). Chunks without an
/// embedding get `semantic = 0` rather than failing the whole call —
/// degrading gracefully is cheaper than aborting scoring for one missing
/// field.
pub struct AdvancedScorer {
    embedder: Arc<dyn EmbeddingFn>,
    weights: ScoringWeights,
    profiles: Arc<dyn UserProfileProvider>,
}

impl AdvancedScorer {
    pub fn new(embedder: Arc<dyn EmbeddingFn>) -> Self {
        Self {
            embedder,
            weights: ScoringWeights::default(),
            profiles: Arc::new(NoopUserProfiles),
        }
    }

    pub fn with_weights(mut self, weights: ScoringWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_profiles(mut self, profiles: Arc<dyn UserProfileProvider>) -> Self {
        self.profiles = profiles;
        self
    }

    fn semantic_score(&self, chunk: &Chunk, query_embedding: &[f32]) -> f32 {
        match &chunk.embedding {
            Some(embedding) => {
                similarity(SimilarityMetric::Cosine, query_embedding, embedding).clamp(0.0, 1.0)
            }
            None => 0.0,
        }
    }
}

#[async_trait]
impl RelevanceScorer for AdvancedScorer {
    #[instrument(level = "debug", skip_all, fields(chunks = chunks.len()))]
    async fn score(
        &self,
        chunks: &[Chunk],
        query: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<RelevanceScore>, AppError> {
        let query_embedding = self.embedder.embed(query);

        let scores = chunks
            .iter()
            .map(|chunk| {
                let lexical = lexical_score(chunk, query).score;
                let semantic = self.semantic_score(chunk, &query_embedding);
                let preference = user_id
                    .map(|id| self.profiles.preference(id, chunk))
                    .unwrap_or(0.0);

                let blended = self.weights.lexical.mul_add(
                    lexical,
                    self.weights
                        .semantic
                        .mul_add(semantic, self.weights.user_preference * preference),
                );
                let confidence = if chunk.embedding.is_some() { 0.8 } else { 0.5 };
                RelevanceScore::new(weights::clamp_unit(blended), confidence)
            })
            .collect();

        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{PrivacyLevel, SourceRef, SourceType};
    use vector_index::HashingEmbedder;

    fn chunk(content: &str) -> Chunk {
        Chunk::new(
            content,
            SourceRef {
                name: "docs".into(),
                source_type: SourceType::Document,
                privacy_level: PrivacyLevel::Public,
                authority_score: 0.5,
                freshness_score: 0.5,
            },
        )
    }

    #[tokio::test]
    async fn lexical_scorer_never_errors() {
        let scorer = LexicalScorer;
        let chunks = vec![chunk("Mount Everest is tall")];
        let scores = scorer.score(&chunks, "Everest", None).await.unwrap();
        assert_eq!(scores.len(), 1);
    }

    #[tokio::test]
    async fn advanced_scorer_uses_embedding_when_present() {
        let embedder: Arc<dyn EmbeddingFn> = Arc::new(HashingEmbedder::default());
        let scorer = AdvancedScorer::new(embedder.clone());

        let mut with_embedding = chunk("Mount Everest is 8849 meters tall");
        with_embedding.embedding = Some(embedder.embed(&with_embedding.content));
        let without_embedding = chunk("Mount Everest is 8849 meters tall");

        let scores = scorer
            .score(
                &[with_embedding, without_embedding],
                "how tall is Everest",
                None,
            )
            .await
            .unwrap();

        assert!(scores[0].score >= scores[1].score);
    }

    #[tokio::test]
    async fn scores_are_clamped_to_unit_interval() {
        let embedder: Arc<dyn EmbeddingFn> = Arc::new(HashingEmbedder::default());
        let scorer = AdvancedScorer::new(embedder);
        let scores = scorer
            .score(&[chunk("exact match query text")], "exact match query text", None)
            .await
            .unwrap();
        assert!(scores[0].score <= 1.0);
    }
}
