use std::collections::HashSet;

use common::model::{Chunk, RelevanceScore};

use crate::weights::clamp_unit;

/// Words considered for lexical overlap: lowercased, length > 2 (spec.md
/// §4.4 fallback path). Shared with the advanced scorer's lexical term so
/// both paths treat "word" consistently for the fallback case.
pub fn lexical_words(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_owned())
        .filter(|w| w.len() > 2)
        .collect()
}

fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// The mandatory fallback scorer (spec.md §4.4): lexical Jaccard between
/// query words and content words, boosted by 0.3 (clamped) when the whole
/// query appears verbatim as a substring of the content. Used whenever the
/// primary scorer errors, and directly by callers that never wire up an
/// advanced scorer.
pub fn lexical_score(chunk: &Chunk, query: &str) -> RelevanceScore {
    let query_words = lexical_words(query);
    let content_words = lexical_words(&chunk.content);
    let mut score = jaccard(&query_words, &content_words);

    let query_lower = query.to_lowercase();
    let content_lower = chunk.content.to_lowercase();
    if !query_lower.trim().is_empty() && content_lower.contains(query_lower.trim()) {
        score += 0.3;
    }

    RelevanceScore::new(clamp_unit(score), 0.5)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{PrivacyLevel, SourceRef, SourceType};

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

    #[test]
    fn overlapping_words_score_above_zero() {
        let score = lexical_score(&chunk("Mount Everest is 8849 meters tall."), "how tall is Everest");
        assert!(score.score > 0.0);
    }

    #[test]
    fn substring_match_boosts_score() {
        let exact = lexical_score(&chunk("what is ragify"), "what is ragify");
        let partial = lexical_score(&chunk("ragify handles retrieval"), "what is ragify");
        assert!(exact.score >= partial.score);
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        let score = lexical_score(&chunk("what is ragify exactly"), "what is ragify");
        assert!(score.score <= 1.0);
        assert!(score.score >= 0.0);
    }

    #[test]
    fn disjoint_content_scores_zero() {
        let score = lexical_score(&chunk("completely unrelated banana farming"), "rust programming");
        assert_eq!(score.score, 0.0);
    }
}
