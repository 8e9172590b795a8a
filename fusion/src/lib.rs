pub mod config;
pub mod conflict;
pub mod grouping;
pub mod quality;
pub mod similarity;
pub mod strategy;

use std::cmp::Ordering;
use std::sync::Arc;

use common::model::Chunk;
use scoring::UserProfileProvider;
use serde_json::json;
use tracing::instrument;

pub use config::{FusionConfig, ScoringStrategy, ScoringWeights};
pub use conflict::ConflictStrategy;
pub use grouping::{group_chunks, GroupFeatures, SemanticGroup};
pub use quality::{assess_quality, QualityScores};
pub use similarity::chunk_similarity;

/// Optional collaborators the fusion engine consults beyond its own
/// config: currently just a learned user-preference provider for the
/// `user_preference` re-scoring strategy (spec.md §4.2d).
#[derive(Default, Clone)]
pub struct FusionContext {
    pub profiles: Option<Arc<dyn UserProfileProvider>>,
}

impl FusionContext {
    pub fn with_profiles(profiles: Arc<dyn UserProfileProvider>) -> Self {
        Self {
            profiles: Some(profiles),
        }
    }
}

/// The fusion engine's single entry point (spec.md §4.2): semantic
/// grouping, per-group conflict resolution, quality assessment,
/// strategy-weighted re-scoring, and final ranking capped at
/// `config.max_output`. Expressed as a pure function over
/// `(input chunks, query, config)` per the Design Notes — no hidden
/// globals, no mutable singletons.
#[instrument(level = "debug", skip_all, fields(input = chunks.len()))]
pub fn fuse(
    chunks: Vec<Chunk>,
    query: &str,
    user_id: Option<&str>,
    context: Option<&FusionContext>,
    config: &FusionConfig,
) -> Vec<Chunk> {
    let groups = group_chunks(&chunks, config.similarity_threshold, config.max_group_size);

    let mut resolved: Vec<Chunk> = groups
        .into_iter()
        .map(|group| conflict::resolve_conflict(&group.chunks, query))
        .collect();

    let profiles = context.and_then(|ctx| ctx.profiles.as_ref());

    for chunk in &mut resolved {
        let quality = assess_quality(chunk, query);
        chunk.metadata.insert(
            "quality".into(),
            json!({
                "content_quality": quality.content_quality,
                "authority_quality": quality.authority_quality,
                "freshness_quality": quality.freshness_quality,
                "tag_relevance": quality.tag_relevance,
                "metadata_complete": quality.metadata_complete,
                "overall": quality.overall,
            }),
        );
        strategy::rescore(
            chunk,
            query,
            user_id,
            &config.weights,
            &config.enabled_strategies,
            profiles,
        );
    }

    resolved.sort_by(|a, b| {
        let score_a = a
            .metadata
            .get("fusion_score")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0);
        let score_b = b
            .metadata
            .get("fusion_score")
            .and_then(serde_json::Value::as_f64)
            .unwrap_or(0.0);
        score_b
            .partial_cmp(&score_a)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });

    resolved.truncate(config.max_output);
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{PrivacyLevel, RelevanceScore, SourceRef, SourceType};

    fn chunk(id: &str, content: &str, source: &str, authority: f32) -> Chunk {
        let mut c = Chunk::new(
            content,
            SourceRef {
                name: source.into(),
                source_type: SourceType::Document,
                privacy_level: PrivacyLevel::Public,
                authority_score: authority,
                freshness_score: 0.5,
            },
        )
        .with_id(id);
        c.relevance_score = Some(RelevanceScore::new(0.5, 0.8));
        c
    }

    #[test]
    fn single_chunk_is_unchanged_in_count() {
        let chunks = vec![chunk("a", "mount everest is tall", "s1", 0.9)];
        let fused = fuse(chunks, "everest", None, None, &FusionConfig::default());
        assert_eq!(fused.len(), 1);
    }

    #[test]
    fn near_duplicates_collapse_to_one_representative() {
        let chunks = vec![
            chunk("a", "mount everest is tall", "s1", 0.9),
            chunk("b", "mount  everest is   tall", "s2", 0.7),
            chunk("c", "mount   everest is tall", "s3", 0.5),
        ];
        let fused = fuse(chunks, "everest", None, None, &FusionConfig::default());
        assert_eq!(fused.len(), 1);
        assert_eq!(fused[0].id, "a");
    }

    #[test]
    fn output_is_capped_at_twenty() {
        let chunks: Vec<Chunk> = (0..30)
            .map(|i| chunk(&format!("c{i}"), &format!("distinct content number {i}"), &format!("s{i}"), 0.5))
            .collect();
        let fused = fuse(chunks, "content", None, None, &FusionConfig::default());
        assert!(fused.len() <= 20);
    }

    #[test]
    fn fusion_is_idempotent_on_already_fused_output() {
        let chunks = vec![
            chunk("a", "mount everest is tall", "s1", 0.9),
            chunk("z", "rust ownership and borrowing rules", "s2", 0.6),
        ];
        let config = FusionConfig::default();
        let once = fuse(chunks, "everest rust", None, None, &config);
        let mut ids_once: Vec<&str> = once.iter().map(|c| c.id.as_str()).collect();
        ids_once.sort_unstable();

        let twice = fuse(once, "everest rust", None, None, &config);
        let mut ids_twice: Vec<&str> = twice.iter().map(|c| c.id.as_str()).collect();
        ids_twice.sort_unstable();

        assert_eq!(ids_once, ids_twice);
    }

    #[test]
    fn ranking_is_sorted_by_fusion_score_descending() {
        let chunks = vec![
            chunk("a", "low authority content about rust", "s1", 0.2),
            chunk("b", "high authority content about rust", "s2", 0.95),
        ];
        let fused = fuse(chunks, "rust", None, None, &FusionConfig::default());
        let scores: Vec<f64> = fused
            .iter()
            .map(|c| c.metadata.get("fusion_score").unwrap().as_f64().unwrap())
            .collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }
}
