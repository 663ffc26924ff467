use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashMap;
use tracing::{debug, info};

use super::matrix::{UserItemMatrix, UserItemMatrixBuilder};
use super::similarity::{UserSimilarityEngine, UserSimilarityMatrix};
use crate::config::CollaborativeConfig;
use crate::metrics::CollaborativeMetrics;
use crate::model::{
    Algorithm, Interaction, Product, RecommendationEntry, RecommendationResult, Subject,
};
use crate::popularity::PopularityFallback;
use crate::primitives::concurrency::BuildOnce;
use crate::primitives::rank;
use crate::repository::InteractionRepository;
use crate::types::{ProductId, Result, UserId};

/// Materialized collaborative state: the folded matrix and the user
/// similarity matrix computed from it.
#[derive(Debug, Clone, Default)]
pub struct CollaborativeModel {
    /// Users × products scores.
    pub matrix: UserItemMatrix,
    /// Pairwise user similarity over `matrix` rows.
    pub similarity: UserSimilarityMatrix,
}

impl CollaborativeModel {
    /// Builds both matrices from an interaction log.
    pub fn build(interactions: &[Interaction]) -> Self {
        let matrix = UserItemMatrixBuilder::build(interactions);
        let similarity = UserSimilarityEngine::compute(&matrix);
        Self { matrix, similarity }
    }
}

/// User-based collaborative filtering with a popularity fallback.
///
/// The model is built lazily on first use and shared read-only afterwards.
pub struct CollaborativeRecommender {
    repo: Arc<dyn InteractionRepository>,
    config: CollaborativeConfig,
    popularity: PopularityFallback,
    model: BuildOnce<CollaborativeModel>,
}

impl CollaborativeRecommender {
    /// Creates a recommender; nothing is read until the first request.
    pub fn new(repo: Arc<dyn InteractionRepository>, config: CollaborativeConfig) -> Self {
        let popularity = PopularityFallback::new(Arc::clone(&repo));
        Self {
            repo,
            config,
            popularity,
            model: BuildOnce::new("collaborative"),
        }
    }

    /// Tunables in effect.
    pub fn config(&self) -> &CollaborativeConfig {
        &self.config
    }

    fn load(&self) -> Result<CollaborativeModel> {
        let started = Instant::now();
        let interactions = self.repo.list_interactions()?;
        let model = CollaborativeModel::build(&interactions);
        info!(
            users = model.matrix.n_users(),
            products = model.matrix.n_products(),
            nonzero = model.matrix.nonzero_count(),
            sparsity = model.matrix.sparsity(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "collaborative.matrix.built"
        );
        Ok(model)
    }

    /// Returns the shared model, building it on first use.
    pub fn model(&self) -> Result<Arc<CollaborativeModel>> {
        self.model.get_or_try_build(|| self.load())
    }

    /// Builds the model now instead of on the first request.
    pub fn warm_up(&self) -> Result<()> {
        self.model().map(|_| ())
    }

    /// Rereads the repository and swaps in a fresh model.
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

    /// The `n` most similar other users with their similarity.
    pub fn similar_users(&self, user_id: UserId, n: usize) -> Result<Vec<(UserId, f64)>> {
        Ok(self.model()?.similarity.nearest_neighbors(user_id, n))
    }

    /// Up to `n` products liked by similar users that `user_id` has not
    /// scored yet.
    ///
    /// Neighbors are the `neighbor_pool` most similar users at or above
    /// `min_similarity`. Unknown users, users without qualifying neighbors and
    /// empty candidate sets all resolve to the popularity ranking.
    pub fn get_recommendations(
        &self,
        user_id: UserId,
        n: usize,
        min_similarity: f64,
    ) -> Result<RecommendationResult> {
        let model = self.model()?;
        let Some(position) = model.matrix.user_position(user_id) else {
            debug!(user = %user_id, "collaborative.cold_start");
            return self.fallback(user_id, n);
        };

        let neighbors: Vec<(usize, f64)> = model
            .similarity
            .nearest_neighbors(user_id, self.config.neighbor_pool)
            .into_iter()
            .filter(|(_, sim)| *sim >= min_similarity)
            .filter_map(|(other, sim)| model.matrix.user_position(other).map(|pos| (pos, sim)))
            .collect();
        if neighbors.is_empty() {
            debug!(user = %user_id, min_similarity, "collaborative.no_neighbors");
            return self.fallback(user_id, n);
        }

        let own = model.matrix.row_at(position);
        let mut scores: FxHashMap<u32, f64> = FxHashMap::default();
        for (neighbor, sim) in &neighbors {
            for (col, score) in model.matrix.row_at(*neighbor).iter() {
                if own.get(col) > 0.0 {
                    continue;
                }
                *scores.entry(col).or_insert(0.0) += score * sim;
            }
        }

        let products = model.matrix.products();
        let ranked = rank::top_k(
            scores
                .into_iter()
                .map(|(col, score)| (products[col as usize], score))
                .collect(),
            n,
        );
        if ranked.is_empty() {
            debug!(user = %user_id, neighbors = neighbors.len(), "collaborative.no_candidates");
            return self.fallback(user_id, n);
        }

        let items = self.enrich(&ranked)?;
        debug!(
            user = %user_id,
            neighbors = neighbors.len(),
            returned = items.len(),
            "collaborative.recommended"
        );
        if items.is_empty() {
            return self.fallback(user_id, n);
        }
        Ok(RecommendationResult::new(
            Subject::User(user_id),
            Algorithm::CollaborativeFiltering,
            items,
        ))
    }

    /// Attaches catalog attributes, keeping score order and dropping ids the
    /// catalog no longer knows.
    fn enrich(&self, ranked: &[(ProductId, f64)]) -> Result<Vec<RecommendationEntry>> {
        let ids: Vec<ProductId> = ranked.iter().map(|(id, _)| *id).collect();
        let catalog: FxHashMap<ProductId, Product> = self
            .repo
            .fetch_products(&ids)?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        Ok(ranked
            .iter()
            .filter_map(|(id, score)| {
                catalog
                    .get(id)
                    .map(|product| RecommendationEntry::from_product(product, Some(*score)))
            })
            .collect())
    }

    fn fallback(&self, user_id: UserId, n: usize) -> Result<RecommendationResult> {
        Ok(RecommendationResult::new(
            Subject::User(user_id),
            Algorithm::PopularityBased,
            self.popularity.rank(n)?,
        ))
    }

    /// Shape of the current model.
    pub fn metrics(&self) -> Result<CollaborativeMetrics> {
        let model = self.model()?;
        let matrix = &model.matrix;
        let total_users = matrix.n_users();
        let total_products = matrix.n_products();
        let avg_interactions_per_user = if total_users == 0 {
            0.0
        } else {
            matrix.nonzero_count() as f64 / total_users as f64
        };
        let coverage_products = if total_products == 0 {
            0.0
        } else {
            matrix.covered_products() as f64 / total_products as f64 * 100.0
        };
        Ok(CollaborativeMetrics {
            algorithm: Algorithm::CollaborativeFiltering,
            total_users,
            total_products,
            sparsity: matrix.sparsity() * 100.0,
            avg_interactions_per_user,
            coverage_users: 100.0,
            coverage_products,
        })
    }
}

impl std::fmt::Debug for CollaborativeRecommender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollaborativeRecommender")
            .field("config", &self.config)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}
