use common::model::Chunk;
use scoring::fallback::lexical_words;
use serde_json::json;

use crate::similarity::chunk_similarity;

/// The four independent conflict-resolution strategies tried per group
/// (spec.md §4.2b). Tagged variants, not trait objects, per the Design
/// Notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictStrategy {
    AuthorityBased,
    FreshnessBased,
    ConsensusBased,
    HybridWeighted,
}

impl ConflictStrategy {
    pub const ALL: [ConflictStrategy; 4] = [
        ConflictStrategy::AuthorityBased,
        ConflictStrategy::FreshnessBased,
        ConflictStrategy::ConsensusBased,
        ConflictStrategy::HybridWeighted,
    ];
}

struct Candidate<'a> {
    chunk: &'a Chunk,
    confidence: f32,
}

fn pick_best<'a>(candidates: Vec<Candidate<'a>>) -> Option<&'a Chunk> {
    candidates
        .into_iter()
        .fold(None, |best: Option<Candidate<'a>>, candidate| match best {
            None => Some(candidate),
            Some(current) => {
                if candidate.confidence > current.confidence
                    || ((candidate.confidence - current.confidence).abs() < f32::EPSILON
                        && candidate.chunk.id < current.chunk.id)
                {
                    Some(candidate)
                } else {
                    Some(current)
                }
            }
        })
        .map(|c| c.chunk)
}

/// Finds the winning chunk's position and confidence for a per-chunk
/// confidence function, without indexing back into the slice.
fn pick_winner<'a>(
    chunks: &'a [Chunk],
    confidences: &[f32],
) -> (usize, &'a Chunk, f32) {
    let candidates: Vec<Candidate> = chunks
        .iter()
        .zip(confidences.iter())
        .map(|(chunk, &confidence)| Candidate { chunk, confidence })
        .collect();
    let winner = pick_best(candidates).expect("non-empty group");
    let idx = chunks
        .iter()
        .position(|c| c.id == winner.id)
        .expect("winner present in group");
    let confidence = confidences.get(idx).copied().unwrap_or(0.0);
    (idx, winner, confidence)
}

fn authority_based(chunks: &[Chunk]) -> (usize, f32) {
    let confidences: Vec<f32> = chunks.iter().map(|c| c.source_ref.authority_score).collect();
    let (idx, _, confidence) = pick_winner(chunks, &confidences);
    (idx, confidence)
}

fn freshness_based(chunks: &[Chunk]) -> (usize, f32) {
    let confidences: Vec<f32> = chunks
        .iter()
        .map(|c| (1.0 - c.age_days() / 365.0).max(0.0))
        .collect();
    let (idx, _, confidence) = pick_winner(chunks, &confidences);
    (idx, confidence)
}

fn consensus_based(chunks: &[Chunk]) -> (usize, f32) {
    let mean_similarities: Vec<f32> = chunks
        .iter()
        .map(|chunk| {
            let others: Vec<f32> = chunks
                .iter()
                .filter(|other| other.id != chunk.id)
                .map(|other| chunk_similarity(chunk, other))
                .collect();
            if others.is_empty() {
                0.0
            } else {
                others.iter().sum::<f32>() / others.len() as f32
            }
        })
        .collect();

    let (idx, _, confidence) = pick_winner(chunks, &mean_similarities);
    (idx, confidence)
}

fn content_quality(content: &str) -> f32 {
    let len = content.len();
    if (10..=10_000).contains(&len) {
        1.0
    } else {
        0.5
    }
}

fn hybrid_weighted(chunks: &[Chunk], query: &str) -> (usize, f32) {
    let query_words = lexical_words(query);

    let scores: Vec<f32> = chunks
        .iter()
        .map(|chunk| {
            let authority = chunk.source_ref.authority_score;
            let freshness = (-chunk.age_days() / 30.0).exp();
            let quality = content_quality(&chunk.content);
            let tag_relevance = if chunk.tags.is_empty() {
                0.0
            } else {
                let matches = chunk
                    .tags
                    .iter()
                    .filter(|tag| query_words.contains(&tag.to_lowercase()))
                    .count();
                matches as f32 / chunk.tags.len() as f32
            };

            0.4_f32.mul_add(
                authority,
                0.3_f32.mul_add(
                    freshness,
                    0.2_f32.mul_add(quality, 0.1 * tag_relevance),
                ),
            )
        })
        .collect();

    let (idx, _, confidence) = pick_winner(chunks, &scores);
    (idx, confidence)
}

/// Runs all four strategies and keeps the one with the highest confidence,
/// ties broken lexicographically by the winning chunk's id (spec.md
/// §4.2b). Returns the winning chunk (with `conflicting_chunks` recorded
/// in its metadata) alone when the group has more than one chunk;
/// single-chunk groups pass through untouched.
pub fn resolve_conflict(group_chunks: &[Chunk], query: &str) -> Chunk {
    if group_chunks.len() <= 1 {
        return group_chunks
            .first()
            .cloned()
            .expect("resolve_conflict called with empty group");
    }

    let results = [
        authority_based(group_chunks),
        freshness_based(group_chunks),
        consensus_based(group_chunks),
        hybrid_weighted(group_chunks, query),
    ];

    let (winner_idx, _) = results.iter().copied().fold(
        (0_usize, f32::MIN),
        |best, (idx, confidence)| {
            let tied_prefers_lower_id = (confidence - best.1).abs() < f32::EPSILON
                && group_chunks
                    .get(idx)
                    .zip(group_chunks.get(best.0))
                    .is_some_and(|(a, b)| a.id < b.id);
            if confidence > best.1 || tied_prefers_lower_id {
                (idx, confidence)
            } else {
                best
            }
        },
    );

    let mut winner = group_chunks
        .get(winner_idx)
        .cloned()
        .expect("winner_idx is always a valid group index");
    let conflicting: Vec<serde_json::Value> = group_chunks
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != winner_idx)
        .map(|(_, c)| json!(c.id))
        .collect();
    winner
        .metadata
        .insert("conflicting_chunks".into(), json!(conflicting));
    winner
}
