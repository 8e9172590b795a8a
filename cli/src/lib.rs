pub mod serve;

use std::sync::Arc;

use common::model::{Source, SourceType};
use orchestrator::Orchestrator;
use sources::MemorySource;

/// Seeds a small in-memory corpus so `ragctx query`/`ragctx serve` have
/// something to retrieve without external configuration. Not part of the
/// orchestrator itself — a convenience for running the demo binary.
pub async fn seed_demo_corpus(orchestrator: &Orchestrator) {
    let source = MemorySource::new(Source::new("demo-docs", SourceType::Document))
        .with_document(
            "everest",
            "Mount Everest is 8,849 meters tall, the highest point on Earth.",
            vec!["geography".into()],
        )
        .with_document(
            "rust-ownership",
            "Rust's ownership system enforces memory safety without a garbage collector.",
            vec!["rust".into()],
        )
        .with_document(
            "ragify",
            "A context orchestrator fuses chunks retrieved from multiple sources into one ranked response.",
            vec!["rag".into()],
        );
    if let Err(err) = orchestrator.add_source(Arc::new(source)).await {
        tracing::warn!(error = %err, "failed to seed demo corpus");
    }
}
