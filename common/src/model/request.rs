use serde::{Deserialize, Serialize};

use super::PrivacyLevel;

/// The query envelope passed to [`crate::AppError`]-returning orchestrator
/// calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRequest {
    pub query: String,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub max_tokens: Option<u32>,
    pub max_chunks: usize,
    pub min_relevance: f32,
    pub privacy_level: PrivacyLevel,
    pub include_metadata: bool,
    pub include_sources: Vec<String>,
    pub exclude_sources: Vec<String>,
}

impl ContextRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user_id: None,
            session_id: None,
            max_tokens: None,
            max_chunks: 10,
            min_relevance: 0.5,
            privacy_level: PrivacyLevel::Public,
            include_metadata: false,
            include_sources: Vec::new(),
            exclude_sources: Vec::new(),
        }
    }

    pub fn with_max_chunks(mut self, max_chunks: usize) -> Self {
        self.max_chunks = max_chunks;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_min_relevance(mut self, min_relevance: f32) -> Self {
        self.min_relevance = min_relevance.clamp(0.0, 1.0);
        self
    }

    pub fn with_privacy_level(mut self, level: PrivacyLevel) -> Self {
        self.privacy_level = level;
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}
