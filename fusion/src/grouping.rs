use common::model::Chunk;
use uuid::Uuid;

use crate::similarity::chunk_similarity;

/// Derived statistics about a [`SemanticGroup`], used by downstream
/// quality/re-scoring stages and useful for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupFeatures {
    pub avg_authority: f32,
    pub content_diversity: f32,
    pub tag_diversity: f32,
    pub freshness: f32,
}

fn compute_features(chunks: &[Chunk]) -> GroupFeatures {
    if chunks.is_empty() {
        return GroupFeatures::default();
    }

    let avg_authority =
        chunks.iter().map(|c| c.source_ref.authority_score).sum::<f32>() / chunks.len() as f32;
    let freshness = chunks
        .iter()
        .map(|c| (-c.age_days() / 30.0).exp())
        .sum::<f32>()
        / chunks.len() as f32;

    let content_diversity = if chunks.len() < 2 {
        0.0
    } else {
        let mut total = 0.0;
        let mut pairs = 0.0;
        for i in 0..chunks.len() {
            for j in (i + 1)..chunks.len() {
                let a = chunks.get(i).expect("i in bounds");
                let b = chunks.get(j).expect("j in bounds");
                total += 1.0 - chunk_similarity(a, b);
                pairs += 1.0;
            }
        }
        if pairs > 0.0 {
            total / pairs
        } else {
            0.0
        }
    };

    let distinct_tags: std::collections::HashSet<&str> = chunks
        .iter()
        .flat_map(|c| c.tags.iter().map(String::as_str))
        .collect();
    let total_tag_slots: usize = chunks.iter().map(|c| c.tags.len()).sum();
    let tag_diversity = if total_tag_slots == 0 {
        0.0
    } else {
        distinct_tags.len() as f32 / total_tag_slots as f32
    };

    GroupFeatures {
        avg_authority,
        content_diversity,
        tag_diversity,
        freshness,
    }
}

/// A transient cluster of semantically similar chunks formed during fusion
/// (spec.md §3 `SemanticGroup`). Dropped once conflict resolution collapses
/// it to a single representative chunk.
#[derive(Debug, Clone)]
pub struct SemanticGroup {
    pub id: String,
    pub chunks: Vec<Chunk>,
    pub similarity_threshold: f32,
    pub features: GroupFeatures,
}

impl SemanticGroup {
    fn new(chunks: Vec<Chunk>, similarity_threshold: f32) -> Self {
        let features = compute_features(&chunks);
        Self {
            id: Uuid::new_v4().to_string(),
            chunks,
            similarity_threshold,
            features,
        }
    }

    /// Highest-authority chunk in the group; ties broken by ascending id
    /// per spec.md §4.2's tiebreak rule.
    pub fn representative_chunk(&self) -> Option<&Chunk> {
        self.chunks.iter().fold(None, |best: Option<&Chunk>, c| {
            match best {
                None => Some(c),
                Some(current) => {
                    if c.source_ref.authority_score > current.source_ref.authority_score
                        || (c.source_ref.authority_score == current.source_ref.authority_score
                            && c.id < current.id)
                    {
                        Some(c)
                    } else {
                        Some(current)
                    }
                }
            }
        })
    }
}

/// Semantic grouping pass (spec.md §4.2a): iterate chunks in input order,
/// greedily clustering anything similar enough to the group's seed chunk,
/// bounded by `max_group_size`.
pub fn group_chunks(chunks: &[Chunk], threshold: f32, max_group_size: usize) -> Vec<SemanticGroup> {
    let mut processed = vec![false; chunks.len()];
    let mut groups = Vec::new();

    for seed_idx in 0..chunks.len() {
        if processed[seed_idx] {
            continue;
        }
        processed[seed_idx] = true;
        let mut members = vec![chunks[seed_idx].clone()];

        for idx in (seed_idx + 1)..chunks.len() {
            if processed[idx] || members.len() >= max_group_size {
                continue;
            }
            let Some(seed) = chunks.get(seed_idx) else {
                continue;
            };
            let Some(candidate) = chunks.get(idx) else {
                continue;
            };
            if chunk_similarity(seed, candidate) >= threshold {
                processed[idx] = true;
                members.push(candidate.clone());
            }
        }

        groups.push(SemanticGroup::new(members, threshold));
    }

    groups
}
