use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Chunk, PrivacyLevel};

/// Envelope returned to the caller. `chunks` is ordered by descending
/// relevance score (ties broken by ascending `id`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub id: String,
    pub query: String,
    pub chunks: Vec<Chunk>,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
    pub max_tokens: Option<u32>,
    pub privacy_level: PrivacyLevel,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ContextResponse {
    pub fn new(query: impl Into<String>, chunks: Vec<Chunk>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query: query.into(),
            chunks,
            user_id: None,
            session_id: None,
            max_tokens: None,
            privacy_level: PrivacyLevel::Public,
            metadata: HashMap::new(),
        }
    }

    pub fn total_tokens(&self) -> u32 {
        self.chunks
            .iter()
            .filter_map(|chunk| chunk.token_count)
            .sum()
    }
}
