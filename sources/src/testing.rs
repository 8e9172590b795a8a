//! In-process sources used by `orchestrator`'s own test suite to exercise
//! failure and timeout handling without a real network dependency
//! (spec.md §8 scenario 3).

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use common::error::AppError;
use common::model::{Chunk, PrivacyLevel, Source, SourceRef, SourceType};

use crate::{DataSource, SourceQuery};

/// Always returns `Err(SourceError)` from `get_chunks`.
pub struct FailingSource {
    source: Source,
}

impl FailingSource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            source: Source::new(name, SourceType::Api),
        }
    }
}

#[async_trait]
impl DataSource for FailingSource {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn source_type(&self) -> SourceType {
        self.source.source_type
    }

    fn is_active(&self) -> bool {
        self.source.active
    }

    fn privacy_level(&self) -> PrivacyLevel {
        self.source.privacy_level
    }

    async fn get_chunks(&self, _query: &SourceQuery) -> Result<Vec<Chunk>, AppError> {
        Err(AppError::SourceError {
            source_name: self.source.name.clone(),
            cause: "simulated upstream failure".into(),
        })
    }

    async fn refresh(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn health(&self) -> Result<bool, AppError> {
        Ok(false)
    }

    async fn stats(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }
}

/// Sleeps longer than any reasonable `source_timeout` before returning a
/// fixed chunk, used to exercise the orchestrator's per-source timeout.
pub struct SlowSource {
    source: Source,
    delay: Duration,
    content: String,
}

impl SlowSource {
    pub fn new(name: impl Into<String>, delay: Duration, content: impl Into<String>) -> Self {
        Self {
            source: Source::new(name, SourceType::Api),
            delay,
            content: content.into(),
        }
    }
}

#[async_trait]
impl DataSource for SlowSource {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn source_type(&self) -> SourceType {
        self.source.source_type
    }

    fn is_active(&self) -> bool {
        self.source.active
    }

    fn privacy_level(&self) -> PrivacyLevel {
        self.source.privacy_level
    }

    async fn get_chunks(&self, _query: &SourceQuery) -> Result<Vec<Chunk>, AppError> {
        tokio::time::sleep(self.delay).await;
        let source_ref = SourceRef {
            name: self.source.name.clone(),
            source_type: self.source.source_type,
            privacy_level: self.source.privacy_level,
            authority_score: self.source.authority_score,
            freshness_score: self.source.freshness_score,
        };
        Ok(vec![Chunk::new(self.content.clone(), source_ref)])
    }

    async fn refresh(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn health(&self) -> Result<bool, AppError> {
        Ok(true)
    }

    async fn stats(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }
}

/// Returns a fixed, caller-supplied set of chunks verbatim regardless of
/// the query, ignoring `max_chunks`. Used by integration tests that need
/// precise control over chunk content, authority, freshness, or
/// `token_count` (spec.md §8 semantic-grouping and token-budget scenarios)
/// rather than `MemorySource`'s lexical matching.
pub struct FixedSource {
    source: Source,
    chunks: Vec<Chunk>,
}

impl FixedSource {
    pub fn new(source: Source, chunks: Vec<Chunk>) -> Self {
        Self { source, chunks }
    }
}

#[async_trait]
impl DataSource for FixedSource {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn source_type(&self) -> SourceType {
        self.source.source_type
    }

    fn is_active(&self) -> bool {
        self.source.active
    }

    fn privacy_level(&self) -> PrivacyLevel {
        self.source.privacy_level
    }

    async fn get_chunks(&self, _query: &SourceQuery) -> Result<Vec<Chunk>, AppError> {
        Ok(self.chunks.clone())
    }

    async fn refresh(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn health(&self) -> Result<bool, AppError> {
        Ok(true)
    }

    async fn stats(&self) -> HashMap<String, serde_json::Value> {
        HashMap::new()
    }
}
