use serde::{Deserialize, Serialize};

use super::PrivacyLevel;

/// The kind of system a [`Source`] fronts. `Vector` marks the vector index
/// itself when it is registered as a fallback source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Document,
    Api,
    Database,
    Realtime,
    Vector,
}

/// Metadata describing a chunk's origin, used by the fusion engine's
/// authority/freshness conflict strategies and by the privacy gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub source_type: SourceType,
    pub privacy_level: PrivacyLevel,
    pub authority_score: f32,
    pub freshness_score: f32,
    pub active: bool,
}

impl Source {
    pub fn new(name: impl Into<String>, source_type: SourceType) -> Self {
        Self {
            name: name.into(),
            source_type,
            privacy_level: PrivacyLevel::Public,
            authority_score: 0.5,
            freshness_score: 0.5,
            active: true,
        }
    }

    pub fn with_privacy_level(mut self, level: PrivacyLevel) -> Self {
        self.privacy_level = level;
        self
    }

    pub fn with_authority_score(mut self, score: f32) -> Self {
        self.authority_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn with_freshness_score(mut self, score: f32) -> Self {
        self.freshness_score = score.clamp(0.0, 1.0);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
