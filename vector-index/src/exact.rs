use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use common::error::AppError;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::metric::{normalize_in_place, similarity, SimilarityMetric};
use crate::record::{IndexStats, SearchHit, VectorRecord};
use crate::VectorIndex;

/// Brute-force exact index: scores every stored vector against the query.
/// Correct by construction; used as the default and as the reference
/// behavior the IVF index is checked against.
pub struct ExactIndex {
    dim: usize,
    metric: SimilarityMetric,
    records: RwLock<HashMap<String, VectorRecord>>,
}

impl ExactIndex {
    pub fn new(dim: usize, metric: SimilarityMetric) -> Self {
        Self {
            dim,
            metric,
            records: RwLock::new(HashMap::new()),
        }
    }

    fn prepare(&self, mut embedding: Vec<f32>) -> Result<Vec<f32>, AppError> {
        if embedding.len() != self.dim {
            return Err(AppError::VectorIndexError {
                operation: "insert".into(),
                cause: format!(
                    "embedding has dimension {} but index expects {}",
                    embedding.len(),
                    self.dim
                ),
            });
        }
        if self.metric == SimilarityMetric::Cosine {
            normalize_in_place(&mut embedding);
        }
        Ok(embedding)
    }
}

#[async_trait]
impl VectorIndex for ExactIndex {
    #[instrument(level = "trace", skip_all)]
    async fn insert(&self, records: Vec<VectorRecord>) -> Result<(), AppError> {
        let mut guard = self.records.write().await;
        for mut record in records {
            record.embedding = self.prepare(record.embedding)?;
            guard.insert(record.id.clone(), record);
        }
        Ok(())
    }

    #[instrument(level = "trace", skip_all)]
    async fn update(
        &self,
        id: &str,
        embedding: Option<Vec<f32>>,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), AppError> {
        let prepared = match embedding {
            Some(e) => Some(self.prepare(e)?),
            None => None,
        };
        let mut guard = self.records.write().await;
        let record = guard.get_mut(id).ok_or_else(|| AppError::VectorIndexError {
            operation: "update".into(),
            cause: format!("no record with id '{id}'"),
        })?;
        if let Some(embedding) = prepared {
            record.embedding = embedding;
        }
        if let Some(metadata) = metadata {
            record.metadata = metadata;
        }
        Ok(())
    }

    #[instrument(level = "trace", skip_all)]
    async fn delete(&self, id: &str) -> Result<(), AppError> {
        self.records.write().await.remove(id);
        Ok(())
    }

    #[instrument(level = "trace", skip(self, query))]
    async fn search(
        &self,
        query: &[f32],
        k: usize,
        min_score: Option<f32>,
    ) -> Result<Vec<SearchHit>, AppError> {
        if query.len() != self.dim {
            return Err(AppError::VectorIndexError {
                operation: "search".into(),
                cause: format!(
                    "query has dimension {} but index expects {}",
                    query.len(),
                    self.dim
                ),
            });
        }

        let guard = self.records.read().await;
        let mut hits: Vec<SearchHit> = guard
            .values()
            .map(|record| SearchHit {
                id: record.id.clone(),
                score: similarity(self.metric, query, &record.embedding),
            })
            .filter(|hit| match min_score {
                Some(min) => hit.score >= min,
                None => true,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>, AppError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn stats(&self) -> IndexStats {
        let guard = self.records.read().await;
        IndexStats {
            total: guard.len(),
            dim: self.dim,
            metric: self.metric,
            index_type: "exact".into(),
            nlist: None,
            nprobe: None,
        }
    }
}
