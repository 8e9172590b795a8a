use serde::{Deserialize, Serialize};

/// Similarity metrics supported by the index (spec.md §4.3). `Cosine` is
/// the default and the only metric for which vectors are normalized on
/// insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    Euclidean,
    Dot,
}

impl std::fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            SimilarityMetric::Cosine => "cosine",
            SimilarityMetric::Euclidean => "euclidean",
            SimilarityMetric::Dot => "dot",
        };
        f.write_str(label)
    }
}

pub fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|v| v * v).sum::<f32>().sqrt()
}

/// Normalizes `vector` to unit L2 norm in place; a zero vector is left
/// untouched rather than producing NaNs.
pub fn normalize_in_place(vector: &mut [f32]) {
    let norm = l2_norm(vector);
    if norm > f32::EPSILON {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Similarity in `[0, 1]`-ish space (dot product is unbounded) between two
/// vectors under `metric`. Callers that insert through
/// [`crate::ExactIndex`]/[`crate::IvfIndex`] with the `Cosine` metric get
/// pre-normalized vectors, so cosine similarity reduces to a dot product.
pub fn similarity(metric: SimilarityMetric, a: &[f32], b: &[f32]) -> f32 {
    match metric {
        SimilarityMetric::Cosine => {
            let denom = l2_norm(a) * l2_norm(b);
            if denom <= f32::EPSILON {
                0.0
            } else {
                (dot(a, b) / denom).clamp(-1.0, 1.0)
            }
        }
        SimilarityMetric::Euclidean => 1.0 / (1.0 + euclidean_distance(a, b)),
        SimilarityMetric::Dot => dot(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_produces_unit_vector() {
        let mut v = vec![3.0, 4.0];
        normalize_in_place(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.1, 0.2, 0.3];
        let score = similarity(SimilarityMetric::Cosine, &v, &v);
        assert!((score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn euclidean_similarity_decreases_with_distance() {
        let near = similarity(SimilarityMetric::Euclidean, &[0.0, 0.0], &[0.1, 0.0]);
        let far = similarity(SimilarityMetric::Euclidean, &[0.0, 0.0], &[10.0, 0.0]);
        assert!(near > far);
    }
}
