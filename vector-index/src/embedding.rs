use crate::metric::normalize_in_place;

/// Default query dimension (spec.md §4.3). Changing this for a live index
/// requires rebuilding it; it is an invariant of a given index instance,
/// not something the embedding function can change on its own.
pub const DEFAULT_DIMENSION: usize = 384;

const WORD_HASH_DIMS: usize = 200;
const CHAR_FREQ_DIMS: usize = 64;
const TEXT_STATS_DIMS: usize = 64;
const POSITIONAL_DIMS: usize = 56;

/// A deterministic `String -> Vec<f32>` embedding function. The vector
/// index consumes whatever implements this; [`HashingEmbedder`] is the
/// built-in default described in spec.md §4.3, but any deterministic
/// function of the declared dimension may be swapped in.
pub trait EmbeddingFn: Send + Sync {
    fn dimension(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic feature-hashing embedder: no model weights, no network
/// call, same text always produces the same vector. Used by the
/// orchestrator's vector fallback (spec.md §4.1 step 6) and as the default
/// index embedder.
///
/// Layout of the 384-dim output:
/// - `[0, 200)`  word-hash features (bucketed, sign-hashed term frequencies)
/// - `[200, 264)` character-frequency features
/// - `[264, 328)` text statistics (length, word/sentence counts, punctuation)
/// - `[328, 384)` positional features
pub struct HashingEmbedder {
    dimension: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
        }
    }
}

impl EmbeddingFn for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut out = vec![0.0_f32; self.dimension];
        if self.dimension != DEFAULT_DIMENSION {
            // A custom dimension still gets a best-effort deterministic
            // embedding by scaling the word-hash section to fill it.
            fill_word_hash(text, &mut out);
            normalize_in_place(&mut out);
            return out;
        }

        let lower = text.to_lowercase();
        let words: Vec<&str> = lower.split_whitespace().collect();

        fill_word_hash(&lower, &mut out[0..WORD_HASH_DIMS]);
        fill_char_frequencies(&lower, &mut out[WORD_HASH_DIMS..WORD_HASH_DIMS + CHAR_FREQ_DIMS]);
        fill_text_stats(
            &lower,
            &words,
            &mut out[WORD_HASH_DIMS + CHAR_FREQ_DIMS
                ..WORD_HASH_DIMS + CHAR_FREQ_DIMS + TEXT_STATS_DIMS],
        );
        fill_positional(
            &words,
            &mut out[WORD_HASH_DIMS + CHAR_FREQ_DIMS + TEXT_STATS_DIMS..],
        );

        normalize_in_place(&mut out);
        out
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn fill_word_hash(text: &str, slice: &mut [f32]) {
    let dims = slice.len();
    if dims == 0 {
        return;
    }
    for word in text.split_whitespace() {
        let hash = fnv1a(word.as_bytes());
        let bucket = (hash as usize) % dims;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        slice[bucket] += sign;
    }
}

fn fill_char_frequencies(text: &str, slice: &mut [f32]) {
    let dims = slice.len();
    if dims == 0 {
        return;
    }
    let total = text.chars().count().max(1) as f32;
    for ch in text.chars() {
        let bucket = (ch as usize) % dims;
        slice[bucket] += 1.0 / total;
    }
}

fn fill_text_stats(text: &str, words: &[&str], slice: &mut [f32]) {
    if slice.is_empty() {
        return;
    }
    let char_len = text.chars().count() as f32;
    let word_count = words.len() as f32;
    let sentence_count = text
        .matches(|c| c == '.' || c == '!' || c == '?')
        .count()
        .max(1) as f32;
    let punctuation_count = text
        .chars()
        .filter(|c| c.is_ascii_punctuation())
        .count() as f32;
    let avg_word_len = if word_count > 0.0 {
        char_len / word_count
    } else {
        0.0
    };

    let features = [
        char_len / 1_000.0,
        word_count / 200.0,
        sentence_count / 50.0,
        punctuation_count / 100.0,
        avg_word_len / 20.0,
    ];
    for (i, value) in slice.iter_mut().enumerate() {
        *value = features[i % features.len()];
    }
}

fn fill_positional(words: &[&str], slice: &mut [f32]) {
    let dims = slice.len();
    if dims == 0 || words.is_empty() {
        return;
    }
    for (position, word) in words.iter().enumerate() {
        let hash = fnv1a(word.as_bytes());
        let bucket = (hash as usize) % dims;
        let weight = 1.0 / (1.0 + position as f32);
        slice[bucket] += weight;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("what is ragify");
        let b = embedder.embed("what is ragify");
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_has_expected_dimension() {
        let embedder = HashingEmbedder::default();
        assert_eq!(embedder.embed("hello").len(), DEFAULT_DIMENSION);
    }

    #[test]
    fn embedding_is_l2_normalized() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("Mount Everest is tall.");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-4 || norm == 0.0);
    }

    #[test]
    fn distinct_text_produces_distinct_embeddings() {
        let embedder = HashingEmbedder::default();
        assert_ne!(embedder.embed("alpha"), embedder.embed("omega capital"));
    }
}
