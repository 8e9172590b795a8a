use common::model::Chunk;
use scoring::fallback::lexical_words;

/// Per-chunk quality breakdown (spec.md §4.2c), computed after conflict
/// resolution so every surviving chunk is assessed exactly once.
#[derive(Debug, Clone, Copy)]
pub struct QualityScores {
    pub content_quality: f32,
    pub authority_quality: f32,
    pub freshness_quality: f32,
    pub tag_relevance: f32,
    pub metadata_complete: f32,
    pub overall: f32,
}

pub fn assess_quality(chunk: &Chunk, query: &str) -> QualityScores {
    let content_quality = if (10..=10_000).contains(&chunk.content.len()) {
        1.0
    } else {
        0.5
    };
    let authority_quality = chunk.source_ref.authority_score;
    let freshness_quality = (-chunk.age_days() / 30.0).exp();

    let query_words = lexical_words(query);
    let tag_relevance = if chunk.tags.is_empty() {
        0.0
    } else {
        let matches = chunk
            .tags
            .iter()
            .filter(|tag| query_words.contains(&tag.to_lowercase()))
            .count();
        matches as f32 / chunk.tags.len() as f32
    };

    let metadata_complete = (chunk.metadata.len() as f32 / 5.0).min(1.0);

    let overall = (content_quality
        + authority_quality
        + freshness_quality
        + tag_relevance
        + metadata_complete)
        / 5.0;

    QualityScores {
        content_quality,
        authority_quality,
        freshness_quality,
        tag_relevance,
        metadata_complete,
        overall,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{PrivacyLevel, SourceRef, SourceType};

    fn chunk(content: &str, tags: &[&str]) -> Chunk {
        Chunk::new(
            content,
            SourceRef {
                name: "docs".into(),
                source_type: SourceType::Document,
                privacy_level: PrivacyLevel::Public,
                authority_score: 0.8,
                freshness_score: 0.5,
            },
        )
        .with_tags(tags.iter().map(|t| t.to_string()))
    }

    #[test]
    fn short_content_scores_half_quality() {
        let quality = assess_quality(&chunk("hi", &[]), "hi");
        assert_eq!(quality.content_quality, 0.5);
    }

    #[test]
    fn matching_tag_raises_tag_relevance() {
        let quality = assess_quality(&chunk("mount everest is tall", &["geo"]), "geo features");
        assert!(quality.tag_relevance > 0.0);
    }

    #[test]
    fn overall_is_mean_of_five_components() {
        let quality = assess_quality(&chunk("mount everest is quite tall indeed", &[]), "everest");
        let manual = (quality.content_quality
            + quality.authority_quality
            + quality.freshness_quality
            + quality.tag_relevance
            + quality.metadata_complete)
            / 5.0;
        assert!((quality.overall - manual).abs() < 1e-6);
    }
}
