//! Terminal fallback ranking by interaction count.

use std::sync::Arc;

use tracing::debug;

use crate::model::RecommendationEntry;
use crate::repository::InteractionRepository;
use crate::types::Result;

/// Ranks products by how often they were interacted with.
///
/// Used whenever a personalized recommender has nothing to offer. Entries
/// carry no score; only repository failures propagate.
#[derive(Clone)]
pub struct PopularityFallback {
    repo: Arc<dyn InteractionRepository>,
}

impl PopularityFallback {
    /// Creates a fallback over `repo`.
    pub fn new(repo: Arc<dyn InteractionRepository>) -> Self {
        Self { repo }
    }

    /// Up to `n` products by interaction count, rating, then id.
    pub fn rank(&self, n: usize) -> Result<Vec<RecommendationEntry>> {
        let rows = self.repo.popularity_rank(n)?;
        debug!(requested = n, returned = rows.len(), "popularity.ranked");
        Ok(rows.iter().map(RecommendationEntry::from_popular).collect())
    }
}

impl std::fmt::Debug for PopularityFallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopularityFallback").finish_non_exhaustive()
    }
}
