//! Weighted blend of collaborative and content rankings.

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::config::HybridWeights;
use crate::model::{Algorithm, RecommendationEntry, RecommendationResult, Subject};
use crate::popularity::PopularityFallback;
use crate::types::{ProductId, Result};

/// Merges two ranked entry lists into one.
///
/// A product's hybrid score is `collaborative·s_c + content·s_t`, where a
/// missing score counts as zero and a product missing from one list simply
/// lacks that term.
#[derive(Debug, Clone)]
pub struct HybridCombiner {
    weights: HybridWeights,
    popularity: PopularityFallback,
}

impl HybridCombiner {
    /// Combiner with the given weights, falling back to `popularity`.
    pub fn new(weights: HybridWeights, popularity: PopularityFallback) -> Self {
        Self { weights, popularity }
    }

    /// Weights in effect.
    pub fn weights(&self) -> HybridWeights {
        self.weights
    }

    /// Sums weighted scores per product and keeps the best `limit`.
    ///
    /// Equal scores keep first-appearance order, collaborative entries first.
    /// Returned entries carry the hybrid score.
    pub fn merge(
        &self,
        collaborative: &[RecommendationEntry],
        content: &[RecommendationEntry],
        limit: usize,
    ) -> Vec<RecommendationEntry> {
        let mut merged: Vec<(RecommendationEntry, f64)> = Vec::new();
        let mut slots: FxHashMap<ProductId, usize> = FxHashMap::default();
        let sources = [
            (collaborative, self.weights.collaborative),
            (content, self.weights.content),
        ];
        for (entries, weight) in sources {
            for entry in entries {
                let contribution = entry.score_or_zero() * weight;
                match slots.get(&entry.product_id) {
                    Some(&slot) => merged[slot].1 += contribution,
                    None => {
                        slots.insert(entry.product_id, merged.len());
                        merged.push((entry.clone(), contribution));
                    }
                }
            }
        }
        // Stable sort: ties stay in first-appearance order.
        merged.sort_by(|a, b| b.1.total_cmp(&a.1));
        merged
            .into_iter()
            .take(limit)
            .map(|(mut entry, score)| {
                entry.score = Some(score);
                entry
            })
            .collect()
    }

    /// [`merge`](Self::merge), falling back to the popularity ranking when
    /// both inputs are empty.
    pub fn combine(
        &self,
        subject: Subject,
        collaborative: &[RecommendationEntry],
        content: &[RecommendationEntry],
        limit: usize,
    ) -> Result<RecommendationResult> {
        let items = self.merge(collaborative, content, limit);
        debug!(
            collaborative = collaborative.len(),
            content = content.len(),
            returned = items.len(),
            "hybrid.merged"
        );
        if items.is_empty() {
            return Ok(RecommendationResult::new(
                subject,
                Algorithm::PopularityBased,
                self.popularity.rank(limit)?,
            ));
        }
        Ok(RecommendationResult::new(subject, Algorithm::Hybrid, items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Product;
    use crate::repository::MemoryRepository;
    use std::sync::Arc;

    const EPS: f64 = 1e-9;

    fn entry(id: i64, score: Option<f64>) -> RecommendationEntry {
        let product = Product::new(ProductId(id), format!("P{id}"), "Misc", 1.0);
        RecommendationEntry::from_product(&product, score)
    }

    fn combiner(repo: MemoryRepository) -> HybridCombiner {
        HybridCombiner::new(
            HybridWeights::default(),
            PopularityFallback::new(Arc::new(repo)),
        )
    }

    #[test]
    fn overlapping_products_sum_both_weights() {
        let merged = combiner(MemoryRepository::new()).merge(
            &[entry(1, Some(2.0)), entry(2, Some(1.0))],
            &[entry(2, Some(0.8)), entry(3, Some(0.9))],
            10,
        );
        let scores: Vec<_> = merged
            .iter()
            .map(|e| (e.product_id.0, e.score.unwrap()))
            .collect();
        assert_eq!(scores[0].0, 1);
        assert!((scores[0].1 - 1.2).abs() < EPS);
        assert_eq!(scores[1].0, 2);
        assert!((scores[1].1 - (0.6 + 0.32)).abs() < EPS);
        assert_eq!(scores[2].0, 3);
        assert!((scores[2].1 - 0.36).abs() < EPS);
    }

    #[test]
    fn ties_keep_first_appearance_and_missing_scores_count_zero() {
        let merged = combiner(MemoryRepository::new()).merge(
            &[entry(9, None), entry(4, Some(0.0))],
            &[entry(1, None)],
            2,
        );
        let ids: Vec<_> = merged.iter().map(|e| e.product_id.0).collect();
        assert_eq!(ids, vec![9, 4]);
        assert!(merged.iter().all(|e| e.score == Some(0.0)));
    }

    #[test]
    fn empty_merge_falls_back_to_popularity() -> Result<()> {
        let repo = MemoryRepository::with_data(
            vec![Product::new(ProductId(5), "Solo", "Misc", 3.0)],
            Vec::new(),
        );
        let result = combiner(repo).combine(Subject::None, &[], &[], 5)?;
        assert_eq!(result.algorithm, Algorithm::PopularityBased);
        assert_eq!(result.items[0].product_id, ProductId(5));
        Ok(())
    }
}
