pub mod memory;
pub mod testing;

use std::collections::HashMap;

use async_trait::async_trait;
use common::error::AppError;
use common::model::{Chunk, PrivacyLevel, SourceType};

pub use memory::MemorySource;

/// Per-call parameters a [`DataSource`] receives (spec.md §6). Distinct
/// from [`common::model::ContextRequest`]: sources see only what they need
/// to produce chunks, not the orchestrator's budget/privacy bookkeeping.
#[derive(Debug, Clone)]
pub struct SourceQuery {
    pub query: String,
    pub max_chunks: Option<usize>,
    pub min_relevance: f32,
    pub user_id: Option<String>,
    pub session_id: Option<String>,
}

impl SourceQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_chunks: None,
            min_relevance: 0.0,
            user_id: None,
            session_id: None,
        }
    }
}

/// The abstract contract every source implements, whether document, API,
/// database, realtime, or the vector index itself (spec.md §6). Concrete
/// implementations (PDF extraction, SQL dialects, WebSocket/MQTT
/// transports) are out of scope; the orchestrator only ever sees this
/// trait.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Unique, stable name used as the registry key.
    fn name(&self) -> &str;
    fn source_type(&self) -> SourceType;
    fn is_active(&self) -> bool;
    fn privacy_level(&self) -> PrivacyLevel;

    /// Must tag every returned chunk with this source's `source_ref`; must
    /// not throw for empty results; `max_chunks` is a soft upper bound,
    /// not a hard contract violation if exceeded.
    async fn get_chunks(&self, query: &SourceQuery) -> Result<Vec<Chunk>, AppError>;

    /// Refreshes any internal state (e.g. re-pulling a remote catalog).
    /// Sources with nothing to refresh return `Ok(())`.
    async fn refresh(&self) -> Result<(), AppError>;

    /// Releases held resources (connections, file handles). Idempotent.
    async fn close(&self) -> Result<(), AppError>;

    /// Cheap liveness check; distinct from `is_active`, which reflects
    /// registry-level enablement rather than current reachability.
    async fn health(&self) -> Result<bool, AppError>;

    /// Free-form diagnostic counters, surfaced to callers via
    /// `Orchestrator::list_sources` style introspection.
    async fn stats(&self) -> HashMap<String, serde_json::Value>;
}
