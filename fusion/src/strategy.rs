use std::sync::Arc;

use common::model::Chunk;
use scoring::UserProfileProvider;
use serde_json::json;

use crate::config::{ScoringStrategy, ScoringWeights};
use crate::quality::assess_quality;

fn contribution(
    strategy: ScoringStrategy,
    chunk: &Chunk,
    query: &str,
    user_id: Option<&str>,
    profiles: Option<&Arc<dyn UserProfileProvider>>,
) -> f32 {
    match strategy {
        // The scoring engine already blended lexical + semantic signals
        // into `relevance_score` upstream of fusion; re-use it here rather
        // than recomputing embeddings inside the fusion engine.
        ScoringStrategy::SemanticSimilarity => {
            chunk.relevance_score.map(|r| r.score).unwrap_or(0.0)
        }
        ScoringStrategy::SourceAuthority => chunk.source_ref.authority_score,
        ScoringStrategy::Freshness => (-chunk.age_days() / 30.0).exp(),
        ScoringStrategy::ContentQuality => assess_quality(chunk, query).content_quality,
        ScoringStrategy::UserPreference => match (user_id, profiles) {
            (Some(id), Some(provider)) => provider.preference(id, chunk),
            _ => 0.0,
        },
    }
}

/// Strategy-weighted re-scoring (spec.md §4.2d): a weighted sum over the
/// enabled strategies, written into the chunk's `fusion_score` metadata
/// entry for the final ranking pass.
pub fn rescore(
    chunk: &mut Chunk,
    query: &str,
    user_id: Option<&str>,
    weights: &ScoringWeights,
    enabled: &[ScoringStrategy],
    profiles: Option<&Arc<dyn UserProfileProvider>>,
) -> f32 {
    let fusion_score = enabled
        .iter()
        .map(|&strategy| weights.get(strategy) * contribution(strategy, chunk, query, user_id, profiles))
        .sum::<f32>()
        .clamp(0.0, 1.0);

    chunk
        .metadata
        .insert("fusion_score".into(), json!(fusion_score));
    fusion_score
}
