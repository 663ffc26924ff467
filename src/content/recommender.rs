use std::sync::Arc;
use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info};

use super::corpus::{ItemFeatureIndex, ProductCorpusIndexer};
use super::similarity::ItemSimilarityEngine;
use crate::config::ContentConfig;
use crate::metrics::ContentMetrics;
use crate::model::{Algorithm, Product, RecommendationEntry, RecommendationResult, Subject};
use crate::popularity::PopularityFallback;
use crate::primitives::concurrency::BuildOnce;
use crate::primitives::rank;
use crate::primitives::vector::mean;
use crate::repository::InteractionRepository;
use crate::types::{ProductId, Result, UserId};

/// Materialized content state: the catalog, its feature index and the
/// largest price used to normalize price distance.
#[derive(Debug, Clone, Default)]
pub struct ContentModel {
    products: Vec<Product>,
    positions: FxHashMap<ProductId, usize>,
    index: ItemFeatureIndex,
    max_price: f64,
}

impl ContentModel {
    /// Indexes `products`; they are reordered by ascending id.
    pub fn build(mut products: Vec<Product>, indexer: &ProductCorpusIndexer) -> Self {
        products.sort_by_key(|p| p.id);
        let index = indexer.index(&products);
        let positions = products
            .iter()
            .enumerate()
            .map(|(pos, p)| (p.id, pos))
            .collect();
        let max_price = products.iter().map(|p| p.price).fold(0.0, f64::max);
        Self {
            products,
            positions,
            index,
            max_price,
        }
    }

    /// Catalog in ascending id order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Catalog position of a product.
    pub fn position(&self, product_id: ProductId) -> Option<usize> {
        self.positions.get(&product_id).copied()
    }

    /// TF-IDF rows of the catalog.
    pub fn index(&self) -> &ItemFeatureIndex {
        &self.index
    }

    /// Largest catalog price, 0 for an empty catalog.
    pub fn max_price(&self) -> f64 {
        self.max_price
    }
}

/// Item-to-item content similarity and history-based user recommendations.
pub struct ContentRecommender {
    repo: Arc<dyn InteractionRepository>,
    config: ContentConfig,
    indexer: ProductCorpusIndexer,
    engine: ItemSimilarityEngine,
    popularity: PopularityFallback,
    model: BuildOnce<ContentModel>,
}

impl ContentRecommender {
    /// Creates a recommender; the catalog is read on first use.
    pub fn new(repo: Arc<dyn InteractionRepository>, config: ContentConfig) -> Self {
        let popularity = PopularityFallback::new(Arc::clone(&repo));
        Self {
            indexer: ProductCorpusIndexer::from_config(&config),
            engine: ItemSimilarityEngine::new(config.weights),
            repo,
            config,
            popularity,
            model: BuildOnce::new("content"),
        }
    }

    /// Tunables in effect.
    pub fn config(&self) -> &ContentConfig {
        &self.config
    }

    fn load(&self) -> Result<ContentModel> {
        let started = Instant::now();
        let products = self.repo.list_products()?;
        let model = ContentModel::build(products, &self.indexer);
        info!(
            products = model.products.len(),
            vocabulary = model.index.vocabulary_size(),
            max_price = model.max_price,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "content.index.built"
        );
        Ok(model)
    }

    /// Returns the shared model, building it on first use.
    pub fn model(&self) -> Result<Arc<ContentModel>> {
        self.model.get_or_try_build(|| self.load())
    }

    /// Builds the model now instead of on the first request.
    pub fn warm_up(&self) -> Result<()> {
        self.model().map(|_| ())
    }

    /// Rereads the catalog and swaps in a fresh model.
    pub fn rebuild(&self) -> Result<()> {
        self.model.rebuild(|| self.load()).map(|_| ())
    }

    /// Whether a model has been published.
    pub fn is_built(&self) -> bool {
        self.model.is_built()
    }

    /// Number of completed model builds.
    pub fn build_count(&self) -> u64 {
        self.model.build_count()
    }

    /// Whether the indexed catalog contains `product_id`.
    pub fn contains_product(&self, product_id: ProductId) -> Result<bool> {
        Ok(self.model()?.position(product_id).is_some())
    }

    /// Scored neighbors of `product_id` by catalog position.
    fn similar_positions(
        &self,
        model: &ContentModel,
        product_id: ProductId,
        n: usize,
        min_score: f64,
    ) -> Vec<(usize, f64)> {
        let Some(reference) = model.position(product_id) else {
            return Vec::new();
        };
        let mut scored: Vec<(usize, f64)> = self
            .engine
            .similarities(&model.products, &model.index, reference, model.max_price)
            .into_iter()
            .enumerate()
            .collect();
        // The early exit below relies on descending order.
        rank::sort_desc(&mut scored);

        let mut similar = Vec::with_capacity(n.min(scored.len()));
        for (position, score) in scored {
            if similar.len() == n {
                break;
            }
            if position == reference {
                continue;
            }
            if score < min_score {
                break;
            }
            similar.push((position, score));
        }
        similar
    }

    /// Up to `n` products most similar to `product_id`, best first, none
    /// scoring below `min_score`. Unknown products have no similar products.
    pub fn get_similar_products(
        &self,
        product_id: ProductId,
        n: usize,
        min_score: f64,
    ) -> Result<Vec<RecommendationEntry>> {
        let model = self.model()?;
        let similar = self.similar_positions(&model, product_id, n, min_score);
        debug!(product = %product_id, returned = similar.len(), "content.similar");
        Ok(similar
            .into_iter()
            .map(|(position, score)| {
                RecommendationEntry::from_product(&model.products[position], Some(score))
            })
            .collect())
    }

    /// Recommends products resembling what `user_id` interacted with most
    /// recently.
    ///
    /// Each of the last `history_limit` distinct products contributes its
    /// `history_fan_out` most similar products; scores are summed per product
    /// and history items are removed. No history, or nothing left after
    /// filtering, resolves to the popularity ranking.
    pub fn get_recommendations_for_user(
        &self,
        user_id: UserId,
        n: usize,
    ) -> Result<RecommendationResult> {
        let history = self
            .repo
            .list_recent_products_for_user(user_id, self.config.history_limit)?;
        if history.is_empty() {
            debug!(user = %user_id, "content.cold_start");
            return self.fallback(user_id, n);
        }

        let model = self.model()?;
        let seen: FxHashSet<ProductId> = history.iter().map(|p| p.id).collect();
        let mut scores: FxHashMap<ProductId, f64> = FxHashMap::default();
        for product in &history {
            let similar = self.similar_positions(
                &model,
                product.id,
                self.config.history_fan_out,
                self.config.min_score,
            );
            for (position, score) in similar {
                *scores.entry(model.products[position].id).or_insert(0.0) += score;
            }
        }
        scores.retain(|id, _| !seen.contains(id));

        let ranked = rank::top_k(scores.into_iter().collect(), n);
        if ranked.is_empty() {
            debug!(user = %user_id, history = history.len(), "content.no_candidates");
            return self.fallback(user_id, n);
        }
        let items: Vec<RecommendationEntry> = ranked
            .into_iter()
            .filter_map(|(id, score)| {
                model
                    .position(id)
                    .map(|pos| RecommendationEntry::from_product(&model.products[pos], Some(score)))
            })
            .collect();
        debug!(
            user = %user_id,
            history = history.len(),
            returned = items.len(),
            "content.recommended"
        );
        Ok(RecommendationResult::new(
            Subject::User(user_id),
            Algorithm::ContentBased,
            items,
        ))
    }

    fn fallback(&self, user_id: UserId, n: usize) -> Result<RecommendationResult> {
        Ok(RecommendationResult::new(
            Subject::User(user_id),
            Algorithm::PopularityBased,
            self.popularity.rank(n)?,
        ))
    }

    /// Shape of the current model.
    ///
    /// `avg_similarity_score` averages, over up to `sample_size` products
    /// drawn with a generator seeded by `seed`, the mean blended similarity
    /// to every other product.
    pub fn metrics(&self, sample_size: usize, seed: u64) -> Result<ContentMetrics> {
        let model = self.model()?;
        let total = model.products.len();
        let avg_similarity_score = if total < 2 {
            0.0
        } else {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let sample = rand::seq::index::sample(&mut rng, total, sample_size.min(total));
            let per_product: Vec<f64> = sample
                .iter()
                .map(|reference| {
                    let others: Vec<f64> = self
                        .engine
                        .similarities(&model.products, &model.index, reference, model.max_price)
                        .into_iter()
                        .enumerate()
                        .filter(|(pos, _)| *pos != reference)
                        .map(|(_, score)| score)
                        .collect();
                    mean(&others)
                })
                .collect();
            mean(&per_product)
        };
        Ok(ContentMetrics {
            algorithm: Algorithm::ContentBased,
            total_products: total,
            coverage: 100.0,
            avg_similarity_score,
            vocabulary_size: model.index.vocabulary_size(),
        })
    }
}

impl std::fmt::Debug for ContentRecommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentRecommender")
            .field("config", &self.config)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
