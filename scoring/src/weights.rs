use serde::{Deserialize, Serialize};

/// Blend weights for the advanced scorer (spec.md §4.4): lexical overlap,
/// semantic (embedding cosine) similarity, and a user-preference term.
/// Mirrors the shape of `retrieval_pipeline::scoring::FusionWeights` in the
/// teacher codebase, one knob per signal rather than a single magic number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub lexical: f32,
    pub semantic: f32,
    pub user_preference: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            lexical: 0.4,
            semantic: 0.5,
            user_preference: 0.1,
        }
    }
}

pub fn clamp_unit(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}
