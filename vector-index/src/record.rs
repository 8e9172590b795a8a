use serde::{Deserialize, Serialize};

use crate::metric::SimilarityMetric;

/// `{id, chunk_id, embedding, metadata}` stored in the vector index
/// (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub chunk_id: String,
    pub embedding: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl VectorRecord {
    pub fn new(id: impl Into<String>, chunk_id: impl Into<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: id.into(),
            chunk_id: chunk_id.into(),
            embedding,
            metadata: serde_json::Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A single search result: record id plus similarity score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
}

/// Reported by `stats()`; the persistence contract (spec.md §6) requires
/// these three fields regardless of backing store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub total: usize,
    pub dim: usize,
    pub metric: SimilarityMetric,
    pub index_type: String,
    pub nlist: Option<usize>,
    pub nprobe: Option<usize>,
}
