pub mod embedding;
pub mod exact;
pub mod ivf;
pub mod metric;
pub mod record;

pub use embedding::{EmbeddingFn, HashingEmbedder, DEFAULT_DIMENSION};
pub use exact::ExactIndex;
pub use ivf::IvfIndex;
pub use metric::SimilarityMetric;
pub use record::{IndexStats, SearchHit, VectorRecord};

use async_trait::async_trait;
use common::error::AppError;

/// Storage and search contract for dense vectors of a fixed dimension
/// (spec.md §4.3). Implementations serialize writes against reads; readers
/// may run concurrently.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    async fn insert(&self, records: Vec<VectorRecord>) -> Result<(), AppError>;
    async fn update(
        &self,
        id: &str,
        embedding: Option<Vec<f32>>,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), AppError>;
    async fn delete(&self, id: &str) -> Result<(), AppError>;
    /// Returns `min(k, |index|)` hits sorted by descending score (ties
    /// broken by ascending id) when `min_score` is `None`; otherwise omits
    /// hits scoring below `min_score`.
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchHit>, AppError>;
    async fn get(&self, id: &str) -> Result<Option<VectorRecord>, AppError>;
    async fn stats(&self) -> IndexStats;
}
