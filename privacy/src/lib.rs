pub mod mask;
pub mod patterns;

use std::collections::HashMap;

use common::model::{Chunk, PrivacyLevel};
use regex::Regex;
use tracing::instrument;

use crate::patterns::{compile_patterns, PiiType};

/// Outcome of running a chunk through the gate (spec.md §4.6): either the
/// chunk is dropped because its source level exceeds the target, or it is
/// kept with sensitive content transformed for that target level.
pub enum GateDecision {
    Rejected,
    Allowed(Chunk),
}

/// Per-request access checks and content anonymization. Built once and
/// reused across requests — the compiled patterns are the only state, and
/// they never change after construction, matching the Design Notes' "no
/// hidden globals, no mutable singletons" guidance for the engines.
pub struct PrivacyGate {
    patterns: HashMap<PiiType, Regex>,
}

impl Default for PrivacyGate {
    fn default() -> Self {
        Self::new()
    }
}

impl PrivacyGate {
    pub fn new() -> Self {
        Self {
            patterns: compile_patterns(),
        }
    }

    /// Whether a chunk whose source is at `source_level` may be emitted to
    /// a request at `target_level` (spec.md §4.6 access rule).
    pub fn is_accessible(&self, source_level: PrivacyLevel, target_level: PrivacyLevel) -> bool {
        source_level.accessible_at(target_level)
    }

    /// Replaces every detected sensitive-data match in `text` with a
    /// transform appropriate for `target_level`. Idempotent on text with no
    /// matches, and never lengthens a match into something sensitive at a
    /// stricter level (spec.md §8 privacy monotonicity).
    #[instrument(level = "trace", skip_all, fields(level = %target_level))]
    pub fn anonymize(&self, text: &str, target_level: PrivacyLevel) -> String {
        let mut result = text.to_owned();
        for pii_type in PiiType::ALL {
            let Some(regex) = self.patterns.get(&pii_type) else {
                continue;
            };
            result = regex
                .replace_all(&result, |caps: &regex::Captures| {
                    mask::mask_for_level(pii_type, &caps[0], target_level)
                })
                .into_owned();
        }
        result
    }

    fn anonymize_metadata(
        &self,
        metadata: &HashMap<String, serde_json::Value>,
        target_level: PrivacyLevel,
    ) -> HashMap<String, serde_json::Value> {
        metadata
            .iter()
            .map(|(key, value)| {
                let transformed = match value {
                    serde_json::Value::String(s) => {
                        serde_json::Value::String(self.anonymize(s, target_level))
                    }
                    other => other.clone(),
                };
                (key.clone(), transformed)
            })
            .collect()
    }

    /// Applies the full gate to one chunk (spec.md §4.6): rejects it
    /// outright if its source is above `target_level`, otherwise returns a
    /// new logical version with content and string metadata transformed.
    #[instrument(level = "debug", skip_all, fields(chunk_id = %chunk.id))]
    pub fn apply(&self, chunk: Chunk, target_level: PrivacyLevel) -> GateDecision {
        if !self.is_accessible(chunk.source_ref.privacy_level, target_level) {
            return GateDecision::Rejected;
        }

        let mut transformed = chunk;
        transformed.content = self.anonymize(&transformed.content, target_level);
        transformed.metadata = self.anonymize_metadata(&transformed.metadata, target_level);
        GateDecision::Allowed(transformed)
    }

    /// Applies [`PrivacyGate::apply`] to every chunk in `chunks`, dropping
    /// rejected ones. Used by the orchestrator's privacy-gate stage
    /// (spec.md §4.1 step 8).
    pub fn filter(&self, chunks: Vec<Chunk>, target_level: PrivacyLevel) -> Vec<Chunk> {
        chunks
            .into_iter()
            .filter_map(|chunk| match self.apply(chunk, target_level) {
                GateDecision::Allowed(chunk) => Some(chunk),
                GateDecision::Rejected => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::{SourceRef, SourceType};

    fn chunk(content: &str, level: PrivacyLevel) -> Chunk {
        Chunk::new(
            content,
            SourceRef {
                name: "docs".into(),
                source_type: SourceType::Document,
                privacy_level: level,
                authority_score: 0.5,
                freshness_score: 0.5,
            },
        )
    }

    #[test]
    fn chunk_above_target_level_is_rejected() {
        let gate = PrivacyGate::new();
        let chunk = chunk("hello", PrivacyLevel::Restricted);
        assert!(matches!(
            gate.apply(chunk, PrivacyLevel::Public),
            GateDecision::Rejected
        ));
    }

    #[test]
    fn chunk_at_or_below_target_level_is_allowed() {
        let gate = PrivacyGate::new();
        let chunk = chunk("hello", PrivacyLevel::Public);
        assert!(matches!(
            gate.apply(chunk, PrivacyLevel::Restricted),
            GateDecision::Allowed(_)
        ));
    }

    #[test]
    fn public_target_tokenizes_email_in_content() {
        let gate = PrivacyGate::new();
        let chunk = chunk("contact jane@example.com for details", PrivacyLevel::Public);
        let GateDecision::Allowed(allowed) = gate.apply(chunk, PrivacyLevel::Public) else {
            panic!("expected chunk to be allowed");
        };
        assert!(allowed.content.contains("[EMAIL_"));
    }

    #[test]
    fn metadata_strings_are_transformed_identically_to_content() {
        let gate = PrivacyGate::new();
        let mut c = chunk("no sensitive data here", PrivacyLevel::Public);
        c.metadata
            .insert("note".into(), serde_json::json!("email jane@example.com"));
        let GateDecision::Allowed(allowed) = gate.apply(c, PrivacyLevel::Public) else {
            panic!("expected chunk to be allowed");
        };
        let note = allowed.metadata.get("note").unwrap().as_str().unwrap();
        assert!(note.contains("[EMAIL_"));
    }

    #[test]
    fn privacy_monotonicity_stricter_levels_never_reveal() {
        let gate = PrivacyGate::new();
        let text = "no sensitive content at all";
        let at_public = gate.anonymize(text, PrivacyLevel::Public);
        let at_restricted = gate.anonymize(text, PrivacyLevel::Restricted);
        assert_eq!(at_public, text);
        assert_eq!(at_restricted, text);
    }

    #[test]
    fn filter_drops_inaccessible_and_keeps_accessible() {
        let gate = PrivacyGate::new();
        let chunks = vec![
            chunk("public one", PrivacyLevel::Public),
            chunk("restricted one", PrivacyLevel::Restricted),
        ];
        let filtered = gate.filter(chunks, PrivacyLevel::Private);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].content, "public one");
    }
}
