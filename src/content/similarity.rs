use super::corpus::ItemFeatureIndex;
use crate::config::SimilarityWeights;
use crate::model::Product;
use crate::primitives::vector::cosine;

/// The three per-pair similarity signals before weighting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimilarityComponents {
    /// TF-IDF cosine, in `[0, 1]`.
    pub text: f64,
    /// 1 when categories are identical, else 0.
    pub category: f64,
    /// Price closeness relative to the catalog maximum, in `[0, 1]`.
    pub price: f64,
}

/// Blends text, category and price similarity between catalog products.
#[derive(Debug, Clone, Copy, Default)]
pub struct ItemSimilarityEngine {
    weights: SimilarityWeights,
}

impl ItemSimilarityEngine {
    /// Engine with the given component weights.
    pub fn new(weights: SimilarityWeights) -> Self {
        Self { weights }
    }

    /// Component weights in effect.
    pub fn weights(&self) -> SimilarityWeights {
        self.weights
    }

    /// `1 - |a - b| / max_price` clamped to `[0, 1]`; 1 for every pair when
    /// `max_price <= 0`.
    pub fn price_similarity(a: f64, b: f64, max_price: f64) -> f64 {
        if max_price <= 0.0 {
            return 1.0;
        }
        (1.0 - (a - b).abs() / max_price).clamp(0.0, 1.0)
    }

    /// Unweighted signals between catalog positions `reference` and `other`.
    ///
    /// Both positions must be valid for `products` and `index`.
    pub fn components(
        &self,
        products: &[Product],
        index: &ItemFeatureIndex,
        reference: usize,
        other: usize,
        max_price: f64,
    ) -> SimilarityComponents {
        let text = match (index.row(reference), index.row(other)) {
            (Some(a), Some(b)) => cosine(a, b).clamp(0.0, 1.0),
            _ => 0.0,
        };
        let (r, o) = (&products[reference], &products[other]);
        SimilarityComponents {
            text,
            category: if r.category == o.category { 1.0 } else { 0.0 },
            price: Self::price_similarity(r.price, o.price, max_price),
        }
    }

    /// Weighted sum of the components.
    pub fn blend(&self, components: SimilarityComponents) -> f64 {
        self.weights.text * components.text
            + self.weights.category * components.category
            + self.weights.price * components.price
    }

    /// Blended similarity of `reference` to every catalog position,
    /// including itself.
    pub fn similarities(
        &self,
        products: &[Product],
        index: &ItemFeatureIndex,
        reference: usize,
        max_price: f64,
    ) -> Vec<f64> {
        (0..products.len())
            .map(|other| self.blend(self.components(products, index, reference, other, max_price)))
            .collect()
    }
}
