use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use common::error::AppError;
use common::model::{Chunk, PrivacyLevel, Source, SourceRef, SourceType};
use tracing::instrument;

use crate::{DataSource, SourceQuery};

#[derive(Debug, Clone)]
struct StoredDocument {
    id: String,
    content: String,
    tags: Vec<String>,
    metadata: HashMap<String, serde_json::Value>,
}

/// An in-process document source backed by a `Vec` of stored documents.
/// Used in tests throughout the workspace and as a minimal real source for
/// deployments that only need to serve a small, preloaded corpus; concrete
/// extraction from PDFs, SQL, or streaming transports is out of scope
/// (spec.md §1).
pub struct MemorySource {
    source: Source,
    documents: RwLock<Vec<StoredDocument>>,
    closed: AtomicBool,
}

impl MemorySource {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            documents: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn with_document(
        self,
        id: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
    ) -> Self {
        self.add_document(id, content, tags, HashMap::new());
        self
    }

    pub fn add_document(
        &self,
        id: impl Into<String>,
        content: impl Into<String>,
        tags: Vec<String>,
        metadata: HashMap<String, serde_json::Value>,
    ) {
        let mut guard = self.documents.write().unwrap_or_else(|e| e.into_inner());
        guard.push(StoredDocument {
            id: id.into(),
            content: content.into(),
            tags,
            metadata,
        });
    }

    fn source_ref(&self) -> SourceRef {
        SourceRef {
            name: self.source.name.clone(),
            source_type: self.source.source_type,
            privacy_level: self.source.privacy_level,
            authority_score: self.source.authority_score,
            freshness_score: self.source.freshness_score,
        }
    }
}

fn words(text: &str) -> std::collections::HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_owned)
        .collect()
}

#[async_trait]
impl DataSource for MemorySource {
    fn name(&self) -> &str {
        &self.source.name
    }

    fn source_type(&self) -> SourceType {
        self.source.source_type
    }

    fn is_active(&self) -> bool {
        self.source.active && !self.closed.load(Ordering::Relaxed)
    }

    fn privacy_level(&self) -> PrivacyLevel {
        self.source.privacy_level
    }

    #[instrument(level = "debug", skip_all, fields(source = %self.name()))]
    async fn get_chunks(&self, query: &SourceQuery) -> Result<Vec<Chunk>, AppError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(AppError::SourceError {
                source_name: self.source.name.clone(),
                cause: "source is closed".into(),
            });
        }

        let query_words = words(&query.query);
        let guard = self.documents.read().unwrap_or_else(|e| e.into_inner());

        let mut matched: Vec<&StoredDocument> = guard
            .iter()
            .filter(|doc| {
                query_words.is_empty() || !words(&doc.content).is_disjoint(&query_words)
            })
            .collect();

        if let Some(max) = query.max_chunks {
            matched.truncate(max);
        }

        let source_ref = self.source_ref();
        let chunks = matched
            .into_iter()
            .map(|doc| {
                let mut chunk = Chunk::new(doc.content.clone(), source_ref.clone())
                    .with_id(doc.id.clone())
                    .with_tags(doc.tags.clone());
                chunk.metadata = doc.metadata.clone();
                chunk
            })
            .collect();

        Ok(chunks)
    }

    async fn refresh(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }

    async fn health(&self) -> Result<bool, AppError> {
        Ok(!self.closed.load(Ordering::Relaxed))
    }

    async fn stats(&self) -> HashMap<String, serde_json::Value> {
        let guard = self.documents.read().unwrap_or_else(|e| e.into_inner());
        let mut stats = HashMap::new();
        stats.insert("document_count".into(), serde_json::json!(guard.len()));
        stats.insert("closed".into(), serde_json::json!(self.closed.load(Ordering::Relaxed)));
        stats
    }
}
