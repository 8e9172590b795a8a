use common::model::Chunk;

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f32 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count() as f32;
    let union = a.union(b).count() as f32;
    if union == 0.0 {
        0.0
    } else {
        intersection / union
    }
}

/// `sim(a, b, q)` from spec.md §4.2(a): a weighted blend of content-word
/// Jaccard, tag Jaccard, and a same-source indicator. The query does not
/// enter the formula directly — it biases later stages (conflict
/// resolution, re-ranking) instead.
pub fn chunk_similarity(a: &Chunk, b: &Chunk) -> f32 {
    let word_sim = jaccard(&a.words(), &b.words());
    let tag_sim = jaccard(&a.tag_set(), &b.tag_set());
    let same_source = if a.source_ref.name == b.source_ref.name {
        1.0
    } else {
        0.0
    };
    0.5_f32.mul_add(word_sim, 0.3_f32.mul_add(tag_sim, 0.2 * same_source))
}
