use std::collections::HashMap;
use std::sync::RwLock;

use common::model::Chunk;

/// Learned per-user term/tag weights, used by [`crate::AdvancedScorer`]'s
/// `user_preference` term. The core does not persist query history (a
/// spec.md Non-goal), so this is an in-process, best-effort profile a host
/// application may populate from its own persisted history; an empty
/// profile contributes zero preference, which is the same as omitting the
/// term entirely.
pub trait UserProfileProvider: Send + Sync {
    /// A score in `[0, 1]` for how well `chunk` matches what `user_id` has
    /// shown interest in before. Must return `0.0` for unknown users.
    fn preference(&self, user_id: &str, chunk: &Chunk) -> f32;
}

/// A no-op provider: every chunk scores 0 preference. The default when a
/// deployment has no learned profiles yet.
#[derive(Debug, Default)]
pub struct NoopUserProfiles;

impl UserProfileProvider for NoopUserProfiles {
    fn preference(&self, _user_id: &str, _chunk: &Chunk) -> f32 {
        0.0
    }
}

/// Simple in-memory tag-weight profile store: `record_interest` nudges a
/// user's weight for a tag upward; `preference` averages a chunk's tag
/// weights for that user.
#[derive(Debug, Default)]
pub struct InMemoryUserProfiles {
    weights: RwLock<HashMap<String, HashMap<String, f32>>>,
}

impl InMemoryUserProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_interest(&self, user_id: &str, tags: &[String], delta: f32) {
        let mut guard = self.weights.write().unwrap_or_else(|e| e.into_inner());
        let profile = guard.entry(user_id.to_owned()).or_default();
        for tag in tags {
            let weight = profile.entry(tag.clone()).or_insert(0.0);
            *weight = (*weight + delta).clamp(0.0, 1.0);
        }
    }
}

impl UserProfileProvider for InMemoryUserProfiles {
    fn preference(&self, user_id: &str, chunk: &Chunk) -> f32 {
        let guard = self.weights.read().unwrap_or_else(|e| e.into_inner());
        let Some(profile) = guard.get(user_id) else {
            return 0.0;
        };
        if chunk.tags.is_empty() {
            return 0.0;
        }
        let total: f32 = chunk
            .tags
            .iter()
            .map(|tag| profile.get(tag).copied().unwrap_or(0.0))
            .sum();
        (total / chunk.tags.len() as f32).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{PrivacyLevel, SourceRef, SourceType};

    fn chunk_with_tags(tags: &[&str]) -> Chunk {
        Chunk::new(
            "content",
            SourceRef {
                name: "docs".into(),
                source_type: SourceType::Document,
                privacy_level: PrivacyLevel::Public,
                authority_score: 0.5,
                freshness_score: 0.5,
            },
        )
        .with_tags(tags.iter().map(|t| t.to_string()))
    }

    #[test]
    fn unknown_user_has_zero_preference() {
        let profiles = InMemoryUserProfiles::new();
        assert_eq!(profiles.preference("nobody", &chunk_with_tags(&["geo"])), 0.0);
    }

    #[test]
    fn recorded_interest_raises_preference() {
        let profiles = InMemoryUserProfiles::new();
        profiles.record_interest("alice", &["geo".into()], 0.6);
        assert!(profiles.preference("alice", &chunk_with_tags(&["geo"])) > 0.0);
    }
}
