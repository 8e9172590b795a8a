use serde::{Deserialize, Serialize};

/// The five built-in strategy-weighted re-scoring signals (spec.md §4.2d),
/// expressed as tagged variants per the Design Notes ("fusion strategy
/// plugins ... expressed as tagged variants, not inheritance") rather than
/// trait objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringStrategy {
    SemanticSimilarity,
    SourceAuthority,
    Freshness,
    ContentQuality,
    UserPreference,
}

impl ScoringStrategy {
    pub const ALL: [ScoringStrategy; 5] = [
        ScoringStrategy::SemanticSimilarity,
        ScoringStrategy::SourceAuthority,
        ScoringStrategy::Freshness,
        ScoringStrategy::ContentQuality,
        ScoringStrategy::UserPreference,
    ];

    fn default_weight(self) -> f32 {
        match self {
            ScoringStrategy::SemanticSimilarity => 0.30,
            ScoringStrategy::SourceAuthority => 0.25,
            ScoringStrategy::Freshness => 0.20,
            ScoringStrategy::ContentQuality => 0.15,
            ScoringStrategy::UserPreference => 0.10,
        }
    }
}

/// Weight table for [`ScoringStrategy`], defaulting to the values named in
/// spec.md §4.2(d).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub semantic_similarity: f32,
    pub source_authority: f32,
    pub freshness: f32,
    pub content_quality: f32,
    pub user_preference: f32,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            semantic_similarity: ScoringStrategy::SemanticSimilarity.default_weight(),
            source_authority: ScoringStrategy::SourceAuthority.default_weight(),
            freshness: ScoringStrategy::Freshness.default_weight(),
            content_quality: ScoringStrategy::ContentQuality.default_weight(),
            user_preference: ScoringStrategy::UserPreference.default_weight(),
        }
    }
}

impl ScoringWeights {
    pub fn get(&self, strategy: ScoringStrategy) -> f32 {
        match strategy {
            ScoringStrategy::SemanticSimilarity => self.semantic_similarity,
            ScoringStrategy::SourceAuthority => self.source_authority,
            ScoringStrategy::Freshness => self.freshness,
            ScoringStrategy::ContentQuality => self.content_quality,
            ScoringStrategy::UserPreference => self.user_preference,
        }
    }
}

/// Tunable parameters for a `fuse()` call (spec.md §4.2, §6
/// `conflict_detection_threshold` / `fusion_config`). `similarity_threshold`
/// doubles for the semantic-grouping threshold `T` and what the orchestrator
/// config calls `conflict_detection_threshold` — the spec's Open Questions
/// note these read as the same knob, and this implementation treats them
/// that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusionConfig {
    pub similarity_threshold: f32,
    pub max_group_size: usize,
    pub max_output: usize,
    pub weights: ScoringWeights,
    pub enabled_strategies: Vec<ScoringStrategy>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.7,
            max_group_size: 10,
            max_output: 20,
            weights: ScoringWeights::default(),
            enabled_strategies: ScoringStrategy::ALL.to_vec(),
        }
    }
}

impl FusionConfig {
    pub fn with_similarity_threshold(mut self, threshold: f32) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_enabled_strategies(mut self, strategies: Vec<ScoringStrategy>) -> Self {
        self.enabled_strategies = strategies;
        self
    }
}
