pub mod pipeline;

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;

use common::config::AppConfig;
use common::error::AppError;
use common::model::{Chunk, ContextRequest, ContextResponse, PrivacyLevel, SourceType};
use fusion::{FusionConfig, FusionContext};
use privacy::PrivacyGate;
use scoring::{LexicalScorer, RelevanceScorer};
use serde_json::json;
use sources::{DataSource, SourceQuery};
use tokio::sync::RwLock;
use tracing::instrument;
use vector_index::{EmbeddingFn, HashingEmbedder, VectorIndex};

pub use pipeline::{PipelineStageTimings, StageKind};

/// Summary of a registered source, returned by [`Orchestrator::list_sources`]
/// without exposing the trait object itself.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub name: String,
    pub source_type: SourceType,
    pub active: bool,
    pub privacy_level: PrivacyLevel,
}

/// Similarity below which a vector-fallback neighbor is dropped unless it
/// also shares a word with the query (spec.md §4.1 step 6, Open Questions).
/// Exposed as a constant rather than baked into the step itself, since the
/// spec calls this threshold out as something a deployment may want to
/// tune.
const VECTOR_FALLBACK_WORD_MATCH_BYPASS: f32 = 0.7;
const VECTOR_FALLBACK_MIN_SCORE: f32 = 0.1;

/// Wires together every engine described in spec.md §4 behind the single
/// `get_context` entry point. Holds no business logic of its own beyond
/// sequencing: each stage is delegated to the crate that owns it
/// (`privacy`, `scoring`, `fusion`, `cache`, `vector-index`, `sources`).
pub struct Orchestrator {
    config: AppConfig,
    sources: RwLock<HashMap<String, Arc<dyn DataSource>>>,
    cache: Arc<dyn cache::ResponseCache>,
    vector_index: Option<Arc<dyn VectorIndex>>,
    embedder: Arc<dyn EmbeddingFn>,
    scorer: Arc<dyn RelevanceScorer>,
    privacy_gate: PrivacyGate,
    fusion_config: FusionConfig,
    fusion_context: FusionContext,
    initialized: AtomicBool,
    closed: AtomicBool,
}

impl Orchestrator {
    /// Builds an orchestrator with the conservative defaults: lexical-only
    /// scoring, no vector index, caching per `config.enable_caching`. Use
    /// the `with_*` methods to opt into the richer engines before the first
    /// call to `get_context`.
    pub fn new(config: AppConfig) -> Self {
        let cache: Arc<dyn cache::ResponseCache> = if config.enable_caching {
            Arc::new(cache::MokaResponseCache::new(config.cache_capacity))
        } else {
            Arc::new(cache::NoopCache)
        };

        Self {
            config,
            sources: RwLock::new(HashMap::new()),
            cache,
            vector_index: None,
            embedder: Arc::new(HashingEmbedder::default()),
            scorer: Arc::new(LexicalScorer),
            privacy_gate: PrivacyGate::new(),
            fusion_config: FusionConfig::default(),
            fusion_context: FusionContext::default(),
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_vector_index(mut self, index: Arc<dyn VectorIndex>) -> Self {
        self.vector_index = Some(index);
        self
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingFn>) -> Self {
        self.embedder = embedder;
        self
    }

    pub fn with_scorer(mut self, scorer: Arc<dyn RelevanceScorer>) -> Self {
        self.scorer = scorer;
        self
    }

    pub fn with_fusion_config(mut self, config: FusionConfig) -> Self {
        self.fusion_config = config;
        self
    }

    pub fn with_fusion_context(mut self, context: FusionContext) -> Self {
        self.fusion_context = context;
        self
    }

    pub fn with_cache(mut self, cache: Arc<dyn cache::ResponseCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Registers a source under its own `name()`. Replacing an existing
    /// name is allowed and logged rather than rejected (spec.md §6).
    pub async fn add_source(&self, source: Arc<dyn DataSource>) -> Result<(), AppError> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(AppError::Closed);
        }
        let name = source.name().to_owned();
        let mut guard = self.sources.write().await;
        if guard.insert(name.clone(), source).is_some() {
            tracing::info!(source = %name, "replaced existing source registration");
        }
        Ok(())
    }

    pub async fn remove_source(&self, name: &str) -> Result<(), AppError> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(AppError::Closed);
        }
        self.sources.write().await.remove(name);
        Ok(())
    }

    pub async fn list_sources(&self) -> Vec<SourceInfo> {
        self.sources
            .read()
            .await
            .values()
            .map(|source| SourceInfo {
                name: source.name().to_owned(),
                source_type: source.source_type(),
                active: source.is_active(),
                privacy_level: source.privacy_level(),
            })
            .collect()
    }

    /// Releases every registered source. Idempotent; a second call is a
    /// no-op. Subsequent `get_context`/`add_source`/`remove_source` calls
    /// return [`AppError::Closed`].
    pub async fn close(&self) -> Result<(), AppError> {
        if self.closed.swap(true, AtomicOrdering::AcqRel) {
            return Ok(());
        }
        let guard = self.sources.read().await;
        for source in guard.values() {
            if let Err(err) = source.close().await {
                tracing::warn!(error = %err, source = source.name(), "error closing source");
            }
        }
        Ok(())
    }

    /// `true` only when not closed, initialized, and every registered
    /// source reports itself healthy.
    pub async fn is_healthy(&self) -> bool {
        if self.closed.load(AtomicOrdering::Acquire) {
            return false;
        }
        if !self.initialized.load(AtomicOrdering::Acquire) {
            return false;
        }
        let guard = self.sources.read().await;
        for source in guard.values() {
            match source.health().await {
                Ok(true) => {}
                _ => return false,
            }
        }
        true
    }

    async fn ensure_initialized(&self) {
        if self.initialized.swap(true, AtomicOrdering::AcqRel) {
            return;
        }
        let guard = self.sources.read().await;
        for source in guard.values() {
            if let Err(err) = source.refresh().await {
                tracing::warn!(error = %err, source = source.name(), "source refresh failed during init");
            }
        }
    }

    async fn select_sources(&self, request: &ContextRequest) -> Vec<Arc<dyn DataSource>> {
        let guard = self.sources.read().await;
        guard
            .values()
            .filter(|source| {
                let name = source.name();
                if !request.include_sources.is_empty()
                    && !request.include_sources.iter().any(|n| n == name)
                {
                    return false;
                }
                if request.exclude_sources.iter().any(|n| n == name) {
                    return false;
                }
                source.is_active()
            })
            .cloned()
            .collect()
    }

    async fn score_chunks(&self, chunks: Vec<Chunk>, request: &ContextRequest) -> Vec<Chunk> {
        match self
            .scorer
            .score(&chunks, &request.query, request.user_id.as_deref())
            .await
        {
            Ok(scores) if scores.len() == chunks.len() => chunks
                .into_iter()
                .zip(scores)
                .map(|(mut chunk, score)| {
                    chunk.relevance_score = Some(score);
                    chunk
                })
                .collect(),
            Ok(_) => {
                tracing::warn!("scorer returned a mismatched number of scores; falling back to lexical scoring");
                fallback_score(chunks, &request.query)
            }
            Err(err) => {
                tracing::warn!(error = %err, "scorer failed; falling back to lexical scoring");
                fallback_score(chunks, &request.query)
            }
        }
    }

    /// The RAG context-orchestration pipeline (spec.md §4.1 steps 1-13): validate
    /// the request's privacy ceiling, probe the cache, fan out to every
    /// eligible source concurrently, fall back to vector search when sources
    /// produce nothing, gate and score what survives, fuse near-duplicates,
    /// truncate to the caller's budget, and cache the assembled response.
    #[instrument(level = "info", skip_all, fields(query = %request.query))]
    pub async fn get_context(&self, request: ContextRequest) -> Result<ContextResponse, AppError> {
        if self.closed.load(AtomicOrdering::Acquire) {
            return Err(AppError::Closed);
        }
        self.ensure_initialized().await;

        if request.privacy_level < self.config.privacy_level {
            return Err(AppError::PrivacyViolation {
                operation: "get_context".into(),
                required: self.config.privacy_level,
                provided: request.privacy_level,
            });
        }

        let mut timings = PipelineStageTimings::default();
        let fp = cache::fingerprint(&request);

        if self.config.enable_caching {
            if let Some(cached) = pipeline::timed(&mut timings, StageKind::CacheProbe, self.cache.get(&fp)).await {
                return Ok(cached);
            }
        }

        let active_sources = pipeline::timed(
            &mut timings,
            StageKind::SourceSelect,
            self.select_sources(&request),
        )
        .await;

        let source_query = SourceQuery {
            query: request.query.clone(),
            max_chunks: (request.max_chunks > 0).then_some(request.max_chunks),
            min_relevance: request.min_relevance,
            user_id: request.user_id.clone(),
            session_id: request.session_id.clone(),
        };

        let (mut chunks, source_errors) = pipeline::timed(
            &mut timings,
            StageKind::FanOut,
            pipeline::fan_out(
                &active_sources,
                &source_query,
                self.config.source_timeout(),
                self.config.max_concurrent_sources,
            ),
        )
        .await;

        let mut retrieval_method = "sources";

        if chunks.is_empty() {
            if let Some(vector_index) = &self.vector_index {
                let fallback = pipeline::timed(
                    &mut timings,
                    StageKind::VectorFallback,
                    pipeline::vector_fallback(
                        vector_index.as_ref(),
                        self.embedder.as_ref(),
                        &request.query,
                        request.max_chunks,
                        VECTOR_FALLBACK_MIN_SCORE,
                        VECTOR_FALLBACK_WORD_MATCH_BYPASS,
                    ),
                )
                .await;

                match fallback {
                    Ok(fallback_chunks) if !fallback_chunks.is_empty() => {
                        chunks = fallback_chunks;
                        retrieval_method = "vector_search";
                    }
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "vector fallback failed; returning empty result");
                    }
                }
            }
        }

        if chunks.is_empty() {
            return Err(AppError::ContextNotFound(request.query.clone()));
        }

        chunks = pipeline::timed(
            &mut timings,
            StageKind::PrivacyGate,
            std::future::ready(self.privacy_gate.filter(chunks, request.privacy_level)),
        )
        .await;

        if chunks.is_empty() {
            return Err(AppError::ContextNotFound(request.query.clone()));
        }

        chunks = pipeline::timed(
            &mut timings,
            StageKind::Score,
            self.score_chunks(chunks, &request),
        )
        .await;

        chunks.retain(|chunk| {
            chunk
                .relevance_score
                .map(|score| score.score >= request.min_relevance)
                .unwrap_or(false)
        });

        if chunks.is_empty() {
            return Err(AppError::ContextNotFound(request.query.clone()));
        }

        if chunks.len() > 1 {
            chunks = pipeline::timed(
                &mut timings,
                StageKind::Fuse,
                std::future::ready(fusion::fuse(
                    chunks,
                    &request.query,
                    request.user_id.as_deref(),
                    Some(&self.fusion_context),
                    &self.fusion_config,
                )),
            )
            .await;
        }

        sort_by_final_score(&mut chunks);

        pipeline::timed(
            &mut timings,
            StageKind::Truncate,
            std::future::ready(truncate_chunks(&mut chunks, request.max_chunks, request.max_tokens)),
        )
        .await;

        let response = pipeline::timed(
            &mut timings,
            StageKind::Assemble,
            std::future::ready(assemble_response(
                &request,
                chunks,
                retrieval_method,
                &source_errors,
                &timings,
            )),
        )
        .await;

        if self.config.enable_caching {
            self.cache.set(fp, response.clone(), self.config.cache_ttl()).await;
        }

        Ok(response)
    }
}

fn fallback_score(chunks: Vec<Chunk>, query: &str) -> Vec<Chunk> {
    chunks
        .into_iter()
        .map(|mut chunk| {
            chunk.relevance_score = Some(scoring::lexical_score(&chunk, query));
            chunk
        })
        .collect()
}

/// Reads `fusion_score` off a chunk's metadata when present (post-fusion),
/// falling back to `relevance_score` otherwise, so the final ordering is
/// consistent whether or not a request's surviving chunks went through
/// fusion (spec.md §8 ranking property).
fn final_score(chunk: &Chunk) -> f32 {
    chunk
        .metadata
        .get("fusion_score")
        .and_then(serde_json::Value::as_f64)
        .map(|score| score as f32)
        .unwrap_or_else(|| chunk.relevance_score.map(|score| score.score).unwrap_or(0.0))
}

fn sort_by_final_score(chunks: &mut [Chunk]) {
    chunks.sort_by(|a, b| {
        final_score(b)
            .partial_cmp(&final_score(a))
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Truncation (spec.md §4.1 step 12): cap the chunk count at `max_chunks`,
/// then drop from the tail while the cumulative `token_count` would exceed
/// `max_tokens`.
fn truncate_chunks(chunks: &mut Vec<Chunk>, max_chunks: usize, max_tokens: Option<u32>) {
    chunks.truncate(max_chunks);

    let Some(budget) = max_tokens else { return };
    let mut cumulative: u32 = 0;
    let mut keep = chunks.len();
    for (index, chunk) in chunks.iter().enumerate() {
        let tokens = chunk.token_count.unwrap_or(0);
        if cumulative.saturating_add(tokens) > budget {
            keep = index;
            break;
        }
        cumulative = cumulative.saturating_add(tokens);
    }
    chunks.truncate(keep);
}

fn assemble_response(
    request: &ContextRequest,
    chunks: Vec<Chunk>,
    retrieval_method: &str,
    source_errors: &HashMap<String, String>,
    timings: &PipelineStageTimings,
) -> ContextResponse {
    let mut response = ContextResponse::new(request.query.clone(), chunks);
    response.user_id = request.user_id.clone();
    response.session_id = request.session_id.clone();
    response.max_tokens = request.max_tokens;
    response.privacy_level = request.privacy_level;
    response
        .metadata
        .insert("retrieval_method".into(), json!(retrieval_method));

    if !source_errors.is_empty() {
        response
            .metadata
            .insert("source_errors".into(), json!(source_errors));
    }

    if request.include_metadata {
        response
            .metadata
            .insert("stage_timings".into(), timings.as_json());
    }

    response
}
