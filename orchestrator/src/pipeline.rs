use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use common::model::{Chunk, PrivacyLevel, SourceRef, SourceType};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sources::{DataSource, SourceQuery};
use tokio::sync::Semaphore;
use vector_index::{EmbeddingFn, VectorIndex};

/// Named pipeline stages (spec.md §4.1 steps 1-13), used purely for
/// diagnostics: which part of `get_context` spent how long. Mirrors the
/// teacher's `StageKind`/`PipelineStageTimings` vocabulary even though this
/// pipeline has a single fixed shape rather than a `StrategyDriver` per
/// request kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    PrivacyCheck,
    SourceSelect,
    CacheProbe,
    FanOut,
    VectorFallback,
    PrivacyGate,
    Score,
    Fuse,
    Truncate,
    Assemble,
}

#[derive(Debug, Default, Clone)]
pub struct PipelineStageTimings {
    timings: Vec<(StageKind, Duration)>,
}

impl PipelineStageTimings {
    pub fn record(&mut self, kind: StageKind, duration: Duration) {
        self.timings.push((kind, duration));
    }

    pub fn as_json(&self) -> serde_json::Value {
        let map: HashMap<String, u64> = self
            .timings
            .iter()
            .map(|(kind, duration)| {
                let key = serde_json::to_value(kind)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_else(|| "unknown".into());
                (key, duration.as_micros() as u64)
            })
            .collect();
        json!(map)
    }
}

/// Times a single async stage and records it into `timings` under `kind`.
pub async fn timed<F, T>(timings: &mut PipelineStageTimings, kind: StageKind, fut: F) -> T
where
    F: std::future::Future<Output = T>,
{
    let start = Instant::now();
    let result = fut.await;
    timings.record(kind, start.elapsed());
    result
}

/// Concurrent source fan-out (spec.md §4.1 step 5, §5): every active
/// source is invoked through its own `source_timeout`, bounded to at most
/// `max_concurrent` in flight at once. A failure or timeout is recorded
/// against that source's name rather than aborting the others — merging
/// is commutative over per-source result sets, so arrival order never
/// matters.
pub async fn fan_out(
    sources: &[Arc<dyn DataSource>],
    query: &SourceQuery,
    timeout: Duration,
    max_concurrent: usize,
) -> (Vec<Chunk>, HashMap<String, String>) {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut in_flight = FuturesUnordered::new();

    for source in sources {
        let source = Arc::clone(source);
        let query = query.clone();
        let semaphore = Arc::clone(&semaphore);
        in_flight.push(async move {
            let permit = semaphore.acquire_owned().await;
            let name = source.name().to_string();
            let outcome = match tokio::time::timeout(timeout, source.get_chunks(&query)).await {
                Ok(Ok(chunks)) => Ok(chunks),
                Ok(Err(err)) => Err(err.to_string()),
                Err(_) => Err(format!("source '{name}' timed out after {timeout:?}")),
            };
            drop(permit);
            (name, outcome)
        });
    }

    let mut chunks = Vec::new();
    let mut errors = HashMap::new();
    while let Some((name, outcome)) = in_flight.next().await {
        match outcome {
            Ok(mut source_chunks) => chunks.append(&mut source_chunks),
            Err(cause) => {
                errors.insert(name, cause);
            }
        }
    }
    (chunks, errors)
}

/// The serialized shape expected in [`vector_index::VectorRecord::metadata`]
/// for records the orchestrator's vector fallback can hydrate into a
/// [`Chunk`] (spec.md §4.1 step 6, §3 `VectorRecord`). Concrete vector
/// index backends are free to store additional fields; only this shape is
/// read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorChunkMetadata {
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub source_name: String,
    pub source_type: SourceType,
    #[serde(default)]
    pub privacy_level: PrivacyLevel,
    #[serde(default)]
    pub authority_score: f32,
    #[serde(default)]
    pub freshness_score: f32,
    #[serde(default)]
    pub token_count: Option<u32>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

/// Builds the metadata payload a caller should attach to a [`VectorRecord`]
/// so the orchestrator's fallback search can hydrate it back into a
/// [`Chunk`] later (the inverse of [`hydrate_chunk`]).
pub fn chunk_to_vector_metadata(chunk: &Chunk) -> serde_json::Value {
    let payload = VectorChunkMetadata {
        content: chunk.content.clone(),
        tags: chunk.tags.clone(),
        source_name: chunk.source_ref.name.clone(),
        source_type: chunk.source_ref.source_type,
        privacy_level: chunk.source_ref.privacy_level,
        authority_score: chunk.source_ref.authority_score,
        freshness_score: chunk.source_ref.freshness_score,
        token_count: chunk.token_count,
        metadata: chunk.metadata.clone(),
    };
    serde_json::to_value(payload).unwrap_or(serde_json::Value::Null)
}

fn hydrate_chunk(chunk_id: &str, metadata: serde_json::Value) -> Option<Chunk> {
    let meta: VectorChunkMetadata = serde_json::from_value(metadata).ok()?;
    let source_ref = SourceRef {
        name: meta.source_name,
        source_type: meta.source_type,
        privacy_level: meta.privacy_level,
        authority_score: meta.authority_score,
        freshness_score: meta.freshness_score,
    };
    let mut chunk = Chunk::new(meta.content, source_ref)
        .with_id(chunk_id.to_owned())
        .with_tags(meta.tags);
    chunk.token_count = meta.token_count;
    chunk.metadata = meta.metadata;
    Some(chunk)
}

/// Vector fallback (spec.md §4.1 step 6): embeds `query`, searches for up
/// to `max_chunks` neighbors scoring at least `min_score` (default 0.1),
/// hydrates survivors into chunks, then drops any whose content shares no
/// word with the query unless its similarity is at least
/// `word_match_bypass` (default 0.7 — the spec calls this threshold out as
/// configuration rather than a hardcoded magic number).
pub async fn vector_fallback(
    vector_index: &dyn VectorIndex,
    embedder: &dyn EmbeddingFn,
    query: &str,
    max_chunks: usize,
    min_score: f32,
    word_match_bypass: f32,
) -> Result<Vec<Chunk>, common::error::AppError> {
    if max_chunks == 0 {
        return Ok(Vec::new());
    }

    let query_embedding = embedder.embed(query);
    let hits = vector_index
        .search(&query_embedding, max_chunks, Some(min_score))
        .await?;

    let query_words = scoring::fallback::lexical_words(query);
    let mut chunks = Vec::with_capacity(hits.len());

    for hit in hits {
        let Some(record) = vector_index.get(&hit.id).await? else {
            continue;
        };
        let Some(chunk) = hydrate_chunk(&record.chunk_id, record.metadata) else {
            continue;
        };
        let content_words = scoring::fallback::lexical_words(&chunk.content);
        let word_match = !content_words.is_disjoint(&query_words);
        if !word_match && hit.score < word_match_bypass {
            continue;
        }
        chunks.push(chunk);
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::model::Chunk as ChunkModel;
    use sources::testing::{FailingSource, SlowSource};
    use sources::MemorySource;
    use std::sync::Arc;
    use vector_index::{ExactIndex, HashingEmbedder, VectorRecord};

    fn doc_source(name: &str, content: &str) -> Arc<dyn DataSource> {
        Arc::new(
            MemorySource::new(common::model::Source::new(
                name,
                common::model::SourceType::Document,
            ))
            .with_document("c1", content, vec![]),
        )
    }

    #[tokio::test]
    async fn fan_out_collects_chunks_across_healthy_sources() {
        let sources: Vec<Arc<dyn DataSource>> =
            vec![doc_source("a", "rust ownership"), doc_source("b", "rust borrowing")];
        let query = SourceQuery::new("rust");
        let (chunks, errors) = fan_out(&sources, &query, Duration::from_secs(1), 10).await;
        assert_eq!(chunks.len(), 2);
        assert!(errors.is_empty());
    }

    #[tokio::test]
    async fn fan_out_records_failure_without_aborting_others() {
        let sources: Vec<Arc<dyn DataSource>> = vec![
            doc_source("good", "rust ownership rules"),
            Arc::new(FailingSource::new("bad")),
        ];
        let query = SourceQuery::new("rust");
        let (chunks, errors) = fan_out(&sources, &query, Duration::from_secs(1), 10).await;
        assert_eq!(chunks.len(), 1);
        assert!(errors.contains_key("bad"));
    }

    #[tokio::test]
    async fn fan_out_records_timeout_as_source_error() {
        let sources: Vec<Arc<dyn DataSource>> = vec![Arc::new(SlowSource::new(
            "slow",
            Duration::from_millis(200),
            "content",
        ))];
        let query = SourceQuery::new("q");
        let (chunks, errors) = fan_out(&sources, &query, Duration::from_millis(10), 10).await;
        assert!(chunks.is_empty());
        assert!(errors.contains_key("slow"));
    }

    #[tokio::test]
    async fn vector_fallback_hydrates_matching_record() {
        let index = ExactIndex::new(384, vector_index::SimilarityMetric::Cosine);
        let embedder = HashingEmbedder::default();

        let chunk = ChunkModel::new(
            "ragify fuses retrieved chunks",
            common::model::SourceRef {
                name: "vector".into(),
                source_type: common::model::SourceType::Vector,
                privacy_level: PrivacyLevel::Public,
                authority_score: 0.6,
                freshness_score: 0.5,
            },
        )
        .with_id("vchunk-1");

        let embedding = embedder.embed(&chunk.content);
        let record = VectorRecord::new("vrec-1", chunk.id.clone(), embedding)
            .with_metadata(chunk_to_vector_metadata(&chunk));
        index.insert(vec![record]).await.unwrap();

        let results = vector_fallback(&index, &embedder, "what is ragify", 5, 0.1, 0.7)
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "vchunk-1");
    }
}
