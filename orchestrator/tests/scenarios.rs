//! End-to-end scenarios exercising the full `get_context` pipeline against
//! sources, the vector index, fusion, and privacy together rather than any
//! single engine in isolation.

use std::sync::Arc;
use std::time::Duration;

use common::config::AppConfig;
use common::error::AppError;
use common::model::{Chunk, ContextRequest, PrivacyLevel, Source, SourceRef, SourceType};
use orchestrator::Orchestrator;
use sources::testing::{FailingSource, FixedSource, SlowSource};
use sources::MemorySource;
use vector_index::{EmbeddingFn, ExactIndex, HashingEmbedder, SimilarityMetric, VectorIndex, VectorRecord};

fn source_ref(name: &str, authority: f32) -> SourceRef {
    SourceRef {
        name: name.into(),
        source_type: SourceType::Document,
        privacy_level: PrivacyLevel::Public,
        authority_score: authority,
        freshness_score: 0.5,
    }
}

#[tokio::test]
async fn single_source_single_chunk_is_returned_verbatim() {
    let orchestrator = Orchestrator::new(AppConfig::default());
    let source = MemorySource::new(Source::new("docs", SourceType::Document))
        .with_document("c1", "Mount Everest is 8849 meters tall.", vec![]);
    orchestrator.add_source(Arc::new(source)).await.unwrap();

    let response = orchestrator
        .get_context(ContextRequest::new("how tall is Everest").with_min_relevance(0.0))
        .await
        .unwrap();

    assert_eq!(response.chunks.len(), 1);
    assert!(response.chunks[0].content.contains("Everest"));
}

#[tokio::test]
async fn privacy_ceiling_refuses_without_calling_any_source() {
    let mut config = AppConfig::default();
    config.privacy_level = PrivacyLevel::Restricted;
    let orchestrator = Orchestrator::new(config);

    let source = FixedSource::new(
        Source::new("docs", SourceType::Document),
        vec![Chunk::new("anything", source_ref("docs", 0.5))],
    );
    orchestrator.add_source(Arc::new(source)).await.unwrap();

    let result = orchestrator
        .get_context(ContextRequest::new("q").with_privacy_level(PrivacyLevel::Public))
        .await;

    assert!(matches!(result, Err(AppError::PrivacyViolation { .. })));
}

#[tokio::test]
async fn one_source_failing_does_not_prevent_the_others_response() {
    let mut config = AppConfig::default();
    config.source_timeout_secs = 1;
    let orchestrator = Orchestrator::new(config);
    orchestrator
        .add_source(Arc::new(
            MemorySource::new(Source::new("good", SourceType::Document))
                .with_document("c1", "rust ownership and borrowing rules", vec![]),
        ))
        .await
        .unwrap();
    orchestrator
        .add_source(Arc::new(FailingSource::new("flaky")))
        .await
        .unwrap();
    orchestrator
        .add_source(Arc::new(SlowSource::new(
            "too-slow",
            Duration::from_secs(60),
            "irrelevant",
        )))
        .await
        .unwrap();

    let response = orchestrator
        .get_context(ContextRequest::new("rust ownership").with_min_relevance(0.0))
        .await
        .unwrap();

    assert_eq!(response.chunks.len(), 1);
    let errors = response
        .metadata
        .get("source_errors")
        .and_then(|v| v.as_object())
        .expect("source_errors should be recorded");
    assert!(errors.contains_key("flaky"));
    assert!(errors.contains_key("too-slow"));
}

#[tokio::test]
async fn near_duplicate_chunks_collapse_to_highest_authority_source() {
    let orchestrator = Orchestrator::new(AppConfig::default());

    let chunks = vec![
        Chunk::new("mount everest is tall", source_ref("low-authority", 0.2)).with_id("low"),
        Chunk::new("mount  everest is   tall", source_ref("mid-authority", 0.5)).with_id("mid"),
        Chunk::new("mount   everest is tall", source_ref("high-authority", 0.95)).with_id("high"),
    ];
    orchestrator
        .add_source(Arc::new(FixedSource::new(
            Source::new("fixture", SourceType::Document),
            chunks,
        )))
        .await
        .unwrap();

    let response = orchestrator
        .get_context(ContextRequest::new("everest").with_min_relevance(0.0))
        .await
        .unwrap();

    assert_eq!(response.chunks.len(), 1);
    assert_eq!(response.chunks[0].id, "high");
    assert!(response.chunks[0].metadata.contains_key("conflicting_chunks"));
}

#[tokio::test]
async fn vector_fallback_is_used_when_no_sources_are_registered() {
    let embedder = HashingEmbedder::default();
    let index = Arc::new(ExactIndex::new(384, SimilarityMetric::Cosine));

    let fallback_chunk = Chunk::new(
        "a context orchestrator fuses retrieved chunks into one response",
        source_ref("vector", 0.5),
    )
    .with_id("vec-1");
    let embedding = embedder.embed(&fallback_chunk.content);
    let record = VectorRecord::new("rec-1", fallback_chunk.id.clone(), embedding)
        .with_metadata(orchestrator::pipeline::chunk_to_vector_metadata(&fallback_chunk));
    index.insert(vec![record]).await.unwrap();

    let orchestrator = Orchestrator::new(AppConfig::default())
        .with_vector_index(index as Arc<dyn VectorIndex>)
        .with_embedder(Arc::new(embedder) as Arc<dyn EmbeddingFn>);

    let response = orchestrator
        .get_context(ContextRequest::new("what does a context orchestrator do").with_min_relevance(0.0))
        .await
        .unwrap();

    assert_eq!(response.chunks.len(), 1);
    assert_eq!(
        response.metadata.get("retrieval_method").unwrap(),
        "vector_search"
    );
}

#[tokio::test]
async fn token_budget_truncates_to_exactly_what_fits() {
    let orchestrator = Orchestrator::new(AppConfig::default());

    // Ten chunks on unrelated topics, each with its own tag, so every pair's
    // chunk_similarity (similarity.rs) stays well under the default 0.7
    // grouping threshold (shared source contributes 0.2, disjoint words and
    // disjoint single-member tag sets contribute 0) and fusion leaves all ten
    // as distinct single-chunk groups. That lets this test actually reach
    // truncation instead of collapsing to one fused representative.
    let topics = [
        "mount everest summit elevation measurement",
        "python list comprehension syntax guide",
        "photosynthesis chlorophyll light absorption",
        "jazz improvisation modal scale theory",
        "volcanic eruption magma viscosity data",
        "quantum entanglement bell inequality test",
        "sourdough starter fermentation temperature control",
        "tectonic plate boundary subduction process",
        "baroque architecture flying buttress structure",
        "coral reef bleaching thermal stress event",
    ];
    let chunks: Vec<Chunk> = topics
        .iter()
        .enumerate()
        .map(|(i, topic)| {
            Chunk::new(*topic, source_ref("docs", 0.5))
                .with_id(format!("c{i}"))
                .with_tags(vec![format!("topic{i}")])
                .with_token_count(120)
        })
        .collect();
    orchestrator
        .add_source(Arc::new(FixedSource::new(
            Source::new("docs", SourceType::Document),
            chunks,
        )))
        .await
        .unwrap();

    let response = orchestrator
        .get_context(
            ContextRequest::new("diverse reference chunks")
                .with_min_relevance(0.0)
                .with_max_chunks(10)
                .with_max_tokens(500),
        )
        .await
        .unwrap();

    assert_eq!(response.chunks.len(), 4);
    assert!(response.total_tokens() <= 500);
}

