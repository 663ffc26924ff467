//! Request-level entry point owning both recommenders.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::collaborative::CollaborativeRecommender;
use crate::config::RecommenderConfig;
use crate::content::ContentRecommender;
use crate::hybrid::HybridCombiner;
use crate::metrics::{MetricsSnapshot, MetricsTarget};
use crate::model::{
    Algorithm, AlgorithmChoice, CategoryCount, InteractionHistory, Product, ProductPage,
    ProductQuery, RecommendationResult, Subject,
};
use crate::popularity::PopularityFallback;
use crate::repository::InteractionRepository;
use crate::types::{ProductId, RecError, Result, UserId};

/// Owns the repository handle, both recommenders, the hybrid combiner and
/// the popularity fallback.
///
/// Construct one per process and share it behind an [`Arc`]; every method
/// takes `&self` and is safe to call from many threads.
pub struct RecommenderService {
    repo: Arc<dyn InteractionRepository>,
    config: RecommenderConfig,
    collaborative: CollaborativeRecommender,
    content: ContentRecommender,
    combiner: HybridCombiner,
    popularity: PopularityFallback,
}

impl RecommenderService {
    /// Builds a service over `repo`; models are built lazily.
    pub fn new(repo: Arc<dyn InteractionRepository>, config: RecommenderConfig) -> Result<Self> {
        config.validate()?;
        let popularity = PopularityFallback::new(Arc::clone(&repo));
        Ok(Self {
            collaborative: CollaborativeRecommender::new(
                Arc::clone(&repo),
                config.collaborative.clone(),
            ),
            content: ContentRecommender::new(Arc::clone(&repo), config.content.clone()),
            combiner: HybridCombiner::new(config.hybrid.weights, popularity.clone()),
            popularity,
            config,
            repo,
        })
    }

    /// Service with default configuration.
    pub fn with_defaults(repo: Arc<dyn InteractionRepository>) -> Result<Self> {
        Self::new(repo, RecommenderConfig::default())
    }

    /// Configuration in effect.
    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// The collaborative recommender.
    pub fn collaborative(&self) -> &CollaborativeRecommender {
        &self.collaborative
    }

    /// The content recommender.
    pub fn content(&self) -> &ContentRecommender {
        &self.content
    }

    fn check_limit(&self, limit: usize) -> Result<()> {
        if limit == 0 || limit > self.config.max_limit {
            return Err(RecError::InvalidArgument(format!(
                "limit must be between 1 and {} (got {limit})",
                self.config.max_limit
            )));
        }
        Ok(())
    }

    /// Products similar to `product_id`.
    ///
    /// Fails with [`RecError::ProductNotFound`] when the product is not in
    /// the catalog.
    #[instrument(level = "debug", skip(self))]
    pub fn similar_products(&self, product_id: ProductId, limit: usize) -> Result<RecommendationResult> {
        self.check_limit(limit)?;
        if !self.content.contains_product(product_id)? {
            return Err(RecError::ProductNotFound(product_id));
        }
        let items =
            self.content
                .get_similar_products(product_id, limit, self.config.content.min_score)?;
        Ok(RecommendationResult::new(
            Subject::Product(product_id),
            Algorithm::ContentBased,
            items,
        ))
    }

    /// Personalized recommendations for `user_id`.
    ///
    /// The returned algorithm names whichever ranking actually produced the
    /// items, so a cold-start user reports `popularity_based`.
    #[instrument(level = "debug", skip(self))]
    pub fn recommend_for_user(
        &self,
        user_id: UserId,
        limit: usize,
        algorithm: AlgorithmChoice,
    ) -> Result<RecommendationResult> {
        self.check_limit(limit)?;
        let result = match algorithm {
            AlgorithmChoice::Content => self.content.get_recommendations_for_user(user_id, limit)?,
            AlgorithmChoice::Collaborative => self.collaborative.get_recommendations(
                user_id,
                limit,
                self.config.collaborative.min_similarity,
            )?,
            AlgorithmChoice::Hybrid => {
                let fan_out = limit.saturating_mul(self.config.hybrid.fan_out_factor);
                let content = self.content.get_recommendations_for_user(user_id, fan_out)?;
                let collaborative = self.collaborative.get_recommendations(
                    user_id,
                    fan_out,
                    self.config.collaborative.min_similarity,
                )?;
                if fell_back(&collaborative) && fell_back(&content) {
                    RecommendationResult::new(
                        Subject::User(user_id),
                        Algorithm::PopularityBased,
                        self.popularity.rank(limit)?,
                    )
                } else {
                    // Fallback entries are unscored and only fill the tail.
                    self.combiner.combine(
                        Subject::User(user_id),
                        &collaborative.items,
                        &content.items,
                        limit,
                    )?
                }
            }
        };
        if result.items.is_empty() {
            return Ok(RecommendationResult::new(
                Subject::User(user_id),
                Algorithm::PopularityBased,
                self.popularity.rank(limit)?,
            ));
        }
        Ok(result)
    }

    /// The most interacted-with products.
    pub fn popular(&self, limit: usize) -> Result<RecommendationResult> {
        self.check_limit(limit)?;
        Ok(RecommendationResult::new(
            Subject::None,
            Algorithm::PopularityBased,
            self.popularity.rank(limit)?,
        ))
    }

    /// One catalog product; [`RecError::ProductNotFound`] when absent.
    pub fn product(&self, product_id: ProductId) -> Result<Product> {
        self.repo
            .get_product(product_id)?
            .ok_or(RecError::ProductNotFound(product_id))
    }

    /// A filtered, paginated catalog listing.
    pub fn search_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        query.validate()?;
        self.repo.search_products(query)
    }

    /// Product count per category.
    pub fn categories(&self) -> Result<Vec<CategoryCount>> {
        self.repo.category_counts()
    }

    /// The user's most recent interactions, newest first.
    pub fn user_history(&self, user_id: UserId, limit: usize) -> Result<InteractionHistory> {
        self.check_limit(limit)?;
        Ok(InteractionHistory::new(
            user_id,
            self.repo.list_user_interactions(user_id, limit)?,
        ))
    }

    /// Health report of one model.
    pub fn metrics(&self, target: MetricsTarget) -> Result<MetricsSnapshot> {
        match target {
            MetricsTarget::Collaborative => {
                Ok(MetricsSnapshot::Collaborative(self.collaborative.metrics()?))
            }
            MetricsTarget::Content => Ok(MetricsSnapshot::Content(self.content.metrics(
                self.config.metrics_sample_size,
                self.config.metrics_seed,
            )?)),
        }
    }

    /// Builds both models now.
    pub fn warm_up(&self) -> Result<()> {
        self.content.warm_up()?;
        self.collaborative.warm_up()?;
        info!("service.warmed_up");
        Ok(())
    }

    /// Rereads the repository and replaces both models.
    pub fn rebuild(&self) -> Result<()> {
        self.content.rebuild()?;
        self.collaborative.rebuild()?;
        info!(
            content_builds = self.content.build_count(),
            collaborative_builds = self.collaborative.build_count(),
            "service.rebuilt"
        );
        Ok(())
    }
}

fn fell_back(result: &RecommendationResult) -> bool {
    result.algorithm == Algorithm::PopularityBased
}

impl std::fmt::Debug for RecommenderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecommenderService")
            .field("collaborative", &self.collaborative)
            .field("content", &self.content)
            .finish_non_exhaustive()
    }
}
