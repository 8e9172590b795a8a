use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use common::error::AppError;
use tokio::sync::RwLock;
use tracing::instrument;

use crate::metric::{normalize_in_place, similarity, SimilarityMetric};
use crate::record::{IndexStats, SearchHit, VectorRecord};
use crate::VectorIndex;

/// An inverted file: one partition of records assigned to the centroid
/// closest to them at insert time.
#[derive(Default)]
struct Partition {
    centroid: Vec<f32>,
    records: HashMap<String, VectorRecord>,
}

/// Approximate IVF-style index: vectors are assigned to the nearest of
/// `nlist` centroids on insert; a search only scores the `nprobe` centroids
/// closest to the query (spec.md §4.3). Centroids are seeded lazily from
/// the first `nlist` distinct vectors inserted, which keeps the index
/// correct without a separate training pass at the cost of centroid
/// quality depending on insertion order.
pub struct IvfIndex {
    dim: usize,
    metric: SimilarityMetric,
    nlist: usize,
    nprobe: usize,
    partitions: RwLock<Vec<Partition>>,
    assignment: RwLock<HashMap<String, usize>>,
}

impl IvfIndex {
    pub fn new(dim: usize, metric: SimilarityMetric, nlist: usize, nprobe: usize) -> Self {
        Self {
            dim,
            metric,
            nlist: nlist.max(1),
            nprobe: nprobe.max(1),
            partitions: RwLock::new(Vec::new()),
            assignment: RwLock::new(HashMap::new()),
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

    /// Picks the partition whose centroid is closest to `embedding`,
    /// creating a new centroid (up to `nlist`) if none is close enough yet.
    fn assign(&self, partitions: &mut Vec<Partition>, embedding: &[f32]) -> usize {
        if partitions.is_empty() {
            partitions.push(Partition {
                centroid: embedding.to_vec(),
                records: HashMap::new(),
            });
            return 0;
        }

        let (best_idx, _) = partitions
            .iter()
            .enumerate()
            .map(|(idx, partition)| {
                (idx, similarity(self.metric, embedding, &partition.centroid))
            })
            .fold((0, f32::MIN), |best, candidate| {
                if candidate.1 > best.1 {
                    candidate
                } else {
                    best
                }
            });

        if partitions.len() < self.nlist {
            partitions.push(Partition {
                centroid: embedding.to_vec(),
                records: HashMap::new(),
            });
            return partitions.len() - 1;
        }

        best_idx
    }

    /// Recomputes a partition's centroid as the mean of its members after a
    /// mutation, so later assignments stay meaningful.
    fn recompute_centroid(&self, partition: &mut Partition) {
        if partition.records.is_empty() {
            return;
        }
        let mut mean = vec![0.0_f32; self.dim];
        for record in partition.records.values() {
            for (acc, value) in mean.iter_mut().zip(record.embedding.iter()) {
                *acc += value;
            }
        }
        let count = partition.records.len() as f32;
        for value in mean.iter_mut() {
            *value /= count;
        }
        partition.centroid = mean;
    }

    fn probe_order(&self, partitions: &[Partition], query: &[f32]) -> Vec<usize> {
        let mut ranked: Vec<(usize, f32)> = partitions
            .iter()
            .enumerate()
            .map(|(idx, partition)| (idx, similarity(self.metric, query, &partition.centroid)))
            .collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        ranked
            .into_iter()
            .take(self.nprobe)
            .map(|(idx, _)| idx)
            .collect()
    }
}

#[async_trait]
impl VectorIndex for IvfIndex {
    #[instrument(level = "trace", skip_all)]
    async fn insert(&self, records: Vec<VectorRecord>) -> Result<(), AppError> {
        let mut partitions = self.partitions.write().await;
        let mut assignment = self.assignment.write().await;
        for mut record in records {
            record.embedding = self.prepare(record.embedding)?;
            let idx = self.assign(&mut partitions, &record.embedding);
            let id = record.id.clone();
            if let Some(partition) = partitions.get_mut(idx) {
                partition.records.insert(id.clone(), record);
                self.recompute_centroid(partition);
            }
            assignment.insert(id, idx);
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
        let mut assignment = self.assignment.write().await;
        let current_idx = *assignment.get(id).ok_or_else(|| AppError::VectorIndexError {
            operation: "update".into(),
            cause: format!("no record with id '{id}'"),
        })?;

        let mut partitions = self.partitions.write().await;
        let prepared = match embedding {
            Some(e) => Some(self.prepare(e)?),
            None => None,
        };

        let Some(partition) = partitions.get_mut(current_idx) else {
            return Err(AppError::VectorIndexError {
                operation: "update".into(),
                cause: format!("partition for '{id}' is missing"),
            });
        };
        let record = partition
            .records
            .get_mut(id)
            .ok_or_else(|| AppError::VectorIndexError {
                operation: "update".into(),
                cause: format!("no record with id '{id}'"),
            })?;

        if let Some(metadata) = metadata {
            record.metadata = metadata;
        }

        if let Some(new_embedding) = prepared {
            let mut moved = partition.records.remove(id).ok_or_else(|| {
                AppError::VectorIndexError {
                    operation: "update".into(),
                    cause: format!("no record with id '{id}'"),
                }
            })?;
            moved.embedding = new_embedding;
            self.recompute_centroid(partition);
            let new_idx = self.assign(&mut partitions, &moved.embedding);
            if let Some(target) = partitions.get_mut(new_idx) {
                target.records.insert(id.to_owned(), moved);
                self.recompute_centroid(target);
            }
            assignment.insert(id.to_owned(), new_idx);
        } else {
            self.recompute_centroid(partition);
        }

        Ok(())
    }

    #[instrument(level = "trace", skip_all)]
    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut assignment = self.assignment.write().await;
        if let Some(idx) = assignment.remove(id) {
            let mut partitions = self.partitions.write().await;
            if let Some(partition) = partitions.get_mut(idx) {
                partition.records.remove(id);
                self.recompute_centroid(partition);
            }
        }
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

        let partitions = self.partitions.read().await;
        let probed = self.probe_order(&partitions, query);

        let mut hits: Vec<SearchHit> = probed
            .into_iter()
            .filter_map(|idx| partitions.get(idx))
            .flat_map(|partition| partition.records.values())
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
        let assignment = self.assignment.read().await;
        let Some(idx) = assignment.get(id) else {
            return Ok(None);
        };
        let partitions = self.partitions.read().await;
        Ok(partitions.get(*idx).and_then(|p| p.records.get(id).cloned()))
    }

    async fn stats(&self) -> IndexStats {
        let partitions = self.partitions.read().await;
        let total = partitions.iter().map(|p| p.records.len()).sum();
        IndexStats {
            total,
            dim: self.dim,
            metric: self.metric,
            index_type: "ivf".into(),
            nlist: Some(self.nlist),
            nprobe: Some(self.nprobe),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, embedding: Vec<f32>) -> VectorRecord {
        VectorRecord::new(id, format!("chunk-{id}"), embedding)
    }

    #[tokio::test]
    async fn search_returns_min_k_and_size() {
        let index = IvfIndex::new(2, SimilarityMetric::Cosine, 4, 4);
        index
            .insert(vec![rec("a", vec![1.0, 0.0]), rec("b", vec![0.0, 1.0])])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert_eq!(hits.len(), 2);
    }

    #[tokio::test]
    async fn honors_min_score_filter() {
        let index = IvfIndex::new(2, SimilarityMetric::Cosine, 4, 4);
        index
            .insert(vec![rec("a", vec![1.0, 0.0]), rec("b", vec![-1.0, 0.0])])
            .await
            .unwrap();

        let hits = index.search(&[1.0, 0.0], 5, Some(0.5)).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn delete_removes_from_partition() {
        let index = IvfIndex::new(2, SimilarityMetric::Cosine, 4, 4);
        index.insert(vec![rec("a", vec![1.0, 0.0])]).await.unwrap();
        index.delete("a").await.unwrap();
        assert!(index.get("a").await.unwrap().is_none());
        assert_eq!(index.stats().await.total, 0);
    }

    #[tokio::test]
    async fn update_embedding_may_move_partition() {
        let index = IvfIndex::new(2, SimilarityMetric::Cosine, 4, 1);
        index
            .insert(vec![rec("a", vec![1.0, 0.0]), rec("b", vec![0.0, 1.0])])
            .await
            .unwrap();
        index
            .update("a", Some(vec![0.0, 1.0]), None)
            .await
            .unwrap();
        let stored = index.get("a").await.unwrap().unwrap();
        assert!((stored.embedding[1] - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn search_is_deterministic_across_nprobe_one() {
        let index = IvfIndex::new(3, SimilarityMetric::Cosine, 8, 1);
        index
            .insert(vec![
                rec("a", vec![1.0, 0.0, 0.0]),
                rec("b", vec![0.0, 1.0, 0.0]),
                rec("c", vec![0.0, 0.0, 1.0]),
            ])
            .await
            .unwrap();

        let first = index.search(&[1.0, 0.0, 0.0], 3, None).await.unwrap();
        let second = index.search(&[1.0, 0.0, 0.0], 3, None).await.unwrap();
        assert_eq!(first, second);
    }
}
