use common::model::ContextRequest;
use serde::Serialize;
use sha2::{Digest, Sha256};

/// The subset of request fields that determine cache identity (spec.md
/// §4.1 step 4). `include_metadata` is deliberately excluded: it only
/// changes what the caller is shown, not which chunks are retrieved.
#[derive(Serialize)]
struct FingerprintKey<'a> {
    query: &'a str,
    user_id: Option<&'a str>,
    session_id: Option<&'a str>,
    privacy_level: common::model::PrivacyLevel,
    include_sources: &'a [String],
    exclude_sources: &'a [String],
    max_tokens: Option<u32>,
    max_chunks: usize,
    min_relevance: u32,
}

/// Stable hash of the request fields that affect `get_context`'s output,
/// used as the cache key. `min_relevance` is quantized to a fixed-point
/// integer so the hash is deterministic across platforms (raw `f32` bit
/// patterns are not guaranteed stable across serialization paths).
pub fn fingerprint(request: &ContextRequest) -> String {
    let key = FingerprintKey {
        query: &request.query,
        user_id: request.user_id.as_deref(),
        session_id: request.session_id.as_deref(),
        privacy_level: request.privacy_level,
        include_sources: &request.include_sources,
        exclude_sources: &request.exclude_sources,
        max_tokens: request.max_tokens,
        max_chunks: request.max_chunks,
        min_relevance: (request.min_relevance * 1_000.0).round() as u32,
    };

    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_vec(&key).expect("fingerprint key serialization never fails"));
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_requests_fingerprint_identically() {
        let a = ContextRequest::new("how tall is everest");
        let b = ContextRequest::new("how tall is everest");
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn different_queries_fingerprint_differently() {
        let a = ContextRequest::new("how tall is everest");
        let b = ContextRequest::new("how deep is the mariana trench");
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn include_metadata_does_not_affect_fingerprint() {
        let mut a = ContextRequest::new("q");
        a.include_metadata = false;
        let mut b = ContextRequest::new("q");
        b.include_metadata = true;
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }
}
