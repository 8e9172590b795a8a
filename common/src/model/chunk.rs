use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{PrivacyLevel, SourceType};

/// Reference to the source a chunk was produced by, carried on the chunk so
/// downstream stages (privacy gate, fusion) don't need to re-resolve the
/// source registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    pub name: String,
    pub source_type: SourceType,
    pub privacy_level: PrivacyLevel,
    pub authority_score: f32,
    pub freshness_score: f32,
}

/// `{score, confidence}` pair assigned by the scoring engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceScore {
    pub score: f32,
    pub confidence: f32,
}

impl RelevanceScore {
    pub fn new(score: f32, confidence: f32) -> Self {
        Self {
            score: score.clamp(0.0, 1.0),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// The atomic unit of retrieved context.
///
/// `id` is unique within a response; `embedding`, when present, always has
/// length `D` for the deployment's configured vector dimension.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub content: String,
    pub source_ref: SourceRef,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub token_count: Option<u32>,
    pub embedding: Option<Vec<f32>>,
    pub relevance_score: Option<RelevanceScore>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Chunk {
    pub fn new(content: impl Into<String>, source_ref: SourceRef) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            source_ref,
            metadata: HashMap::new(),
            tags: Vec::new(),
            token_count: None,
            embedding: None,
            relevance_score: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_token_count(mut self, token_count: u32) -> Self {
        self.token_count = Some(token_count);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    /// Age in fractional days since `updated_at`, used by freshness scoring.
    pub fn age_days(&self) -> f32 {
        let delta = Utc::now().signed_duration_since(self.updated_at);
        (delta.num_seconds().max(0) as f32) / 86_400.0
    }

    /// Lowercase whitespace-split word set, used by the fusion engine's
    /// Jaccard similarity and by lexical scoring.
    pub fn words(&self) -> std::collections::HashSet<String> {
        self.content
            .to_lowercase()
            .split_whitespace()
            .map(str::to_owned)
            .collect()
    }

    pub fn tag_set(&self) -> std::collections::HashSet<String> {
        self.tags.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_ref() -> SourceRef {
        SourceRef {
            name: "docs".into(),
            source_type: SourceType::Document,
            privacy_level: PrivacyLevel::Public,
            authority_score: 0.8,
            freshness_score: 0.5,
        }
    }

    #[test]
    fn relevance_score_clamps() {
        let score = RelevanceScore::new(1.5, -0.2);
        assert_eq!(score.score, 1.0);
        assert_eq!(score.confidence, 0.0);
    }

    #[test]
    fn words_are_lowercased_and_split() {
        let chunk = Chunk::new("Mount Everest IS tall", source_ref());
        assert!(chunk.words().contains("mount"));
        assert!(chunk.words().contains("everest"));
    }
}
