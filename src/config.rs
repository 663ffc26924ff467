//! Recommender tunables, their defaults and TOML loading.
//!
//! Every field is optional in a config file; absent keys keep the values
//! of the [`Default`] impls below.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::types::{RecError, Result};

/// Default number of nearest users considered for collaborative scoring.
pub const DEFAULT_NEIGHBOR_POOL: usize = 50;
/// Default minimum user similarity for a neighbor to contribute.
pub const DEFAULT_MIN_SIMILARITY: f64 = 0.1;
/// Default vocabulary cap of the product text index.
pub const DEFAULT_MAX_FEATURES: usize = 500;
/// Default minimum blended similarity for a similar-product result.
pub const DEFAULT_MIN_SCORE: f64 = 0.1;
/// Largest accepted `hybrid.fan_out_factor`.
pub const MAX_FAN_OUT_FACTOR: usize = 100;

/// Weights of the three item similarity components.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    /// Weight of TF-IDF cosine similarity.
    pub text: f64,
    /// Weight of the same-category indicator.
    pub category: f64,
    /// Weight of price closeness.
    pub price: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            text: 0.6,
            category: 0.3,
            price: 0.1,
        }
    }
}

/// Weights applied when blending the two recommenders.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HybridWeights {
    /// Multiplier of collaborative scores.
    pub collaborative: f64,
    /// Multiplier of content scores.
    pub content: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            collaborative: 0.6,
            content: 0.4,
        }
    }
}

/// Collaborative filtering tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CollaborativeConfig {
    /// How many nearest users are fetched before thresholding.
    pub neighbor_pool: usize,
    /// Neighbors below this cosine similarity are ignored.
    pub min_similarity: f64,
}

impl Default for CollaborativeConfig {
    fn default() -> Self {
        Self {
            neighbor_pool: DEFAULT_NEIGHBOR_POOL,
            min_similarity: DEFAULT_MIN_SIMILARITY,
        }
    }
}

/// Content-based tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Vocabulary cap of the TF-IDF index.
    pub max_features: usize,
    /// Smallest and largest n-gram length, inclusive.
    pub ngram_range: (usize, usize),
    /// Similar products scoring below this are cut off.
    pub min_score: f64,
    /// How many recent history products seed a per-user recommendation.
    pub history_limit: usize,
    /// Similar products fetched per history product.
    pub history_fan_out: usize,
    /// Blend of text, category and price similarity.
    pub weights: SimilarityWeights,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            max_features: DEFAULT_MAX_FEATURES,
            ngram_range: (1, 2),
            min_score: DEFAULT_MIN_SCORE,
            history_limit: 10,
            history_fan_out: 20,
            weights: SimilarityWeights::default(),
        }
    }
}

/// Hybrid blending tunables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Per-source score multipliers.
    pub weights: HybridWeights,
    /// Each source is asked for `limit * fan_out_factor` entries.
    pub fan_out_factor: usize,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            weights: HybridWeights::default(),
            fan_out_factor: 2,
        }
    }
}

/// Tunables of a [`crate::RecommenderService`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RecommenderConfig {
    /// Collaborative filtering section.
    pub collaborative: CollaborativeConfig,
    /// Content-based section.
    pub content: ContentConfig,
    /// Hybrid section.
    pub hybrid: HybridConfig,
    /// Largest `limit` a caller may request.
    pub max_limit: usize,
    /// Products sampled when estimating average content similarity.
    pub metrics_sample_size: usize,
    /// Seed of the metrics sampler.
    pub metrics_seed: u64,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            collaborative: CollaborativeConfig::default(),
            content: ContentConfig::default(),
            hybrid: HybridConfig::default(),
            max_limit: 50,
            metrics_sample_size: 10,
            metrics_seed: 0x5EED,
        }
    }
}

impl RecommenderConfig {
    /// Parses a TOML document; missing keys keep their defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: RecommenderConfig =
            toml::from_str(raw).map_err(|err| RecError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Rejects values no algorithm can work with.
    pub fn validate(&self) -> Result<()> {
        let (min_n, max_n) = self.content.ngram_range;
        if min_n == 0 || min_n > max_n {
            return Err(RecError::Config(format!(
                "content.ngram_range must satisfy 1 <= min <= max (got {min_n}..={max_n})"
            )));
        }
        if self.content.max_features == 0 {
            return Err(RecError::Config("content.max_features must be positive".into()));
        }
        if self.max_limit == 0 {
            return Err(RecError::Config("max_limit must be positive".into()));
        }
        if !(1..=MAX_FAN_OUT_FACTOR).contains(&self.hybrid.fan_out_factor) {
            return Err(RecError::Config(format!(
                "hybrid.fan_out_factor must be between 1 and {MAX_FAN_OUT_FACTOR} (got {})",
                self.hybrid.fan_out_factor
            )));
        }
        let weights = [
            self.content.weights.text,
            self.content.weights.category,
            self.content.weights.price,
            self.hybrid.weights.collaborative,
            self.hybrid.weights.content,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RecError::Config("weights must be finite and non-negative".into()));
        }
        if !self.collaborative.min_similarity.is_finite() || !self.content.min_score.is_finite() {
            return Err(RecError::Config("thresholds must be finite".into()));
        }
        Ok(())
    }
}
