//! Read access to interactions, products and users.
//!
//! The recommenders only ever see the [`InteractionRepository`] contract.
//! [`MemoryRepository`] backs tests and embedded use; [`SqliteRepository`]
//! reads the relational store.

mod memory;
mod sqlite;

pub use memory::MemoryRepository;
pub use sqlite::SqliteRepository;

use crate::model::{
    CategoryCount, Interaction, PopularProduct, Product, ProductPage, ProductQuery, UserInteraction,
};
use crate::types::{ProductId, Result, UserId};

/// Snapshot reads the recommendation core depends on.
///
/// Implementations must be shareable across request threads. Any failure is
/// reported as an error and propagated to the caller unchanged.
pub trait InteractionRepository: Send + Sync {
    /// Every recorded interaction.
    fn list_interactions(&self) -> Result<Vec<Interaction>>;

    /// The full catalog ordered by ascending product id.
    fn list_products(&self) -> Result<Vec<Product>>;

    /// Catalog rows for `ids`; unknown ids are skipped.
    fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>>;

    /// Distinct products the user interacted with, most recent first
    /// (ties by ascending product id), at most `limit`.
    fn list_recent_products_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<Product>>;

    /// Products by descending interaction count, then descending rating
    /// (unrated last), then ascending id, at most `limit`. Products without
    /// interactions count zero.
    fn popularity_rank(&self, limit: usize) -> Result<Vec<PopularProduct>>;

    /// A single catalog row.
    fn get_product(&self, product_id: ProductId) -> Result<Option<Product>>;

    /// One page of the products matching `query`, in the order documented
    /// on [`ProductQuery`], with the total match count.
    fn search_products(&self, query: &ProductQuery) -> Result<ProductPage>;

    /// Product count per category, largest first, ties by category name.
    fn category_counts(&self) -> Result<Vec<CategoryCount>>;

    /// The user's interactions with catalog products, newest first (ties
    /// by most recently recorded), at most `limit`.
    fn list_user_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<UserInteraction>>;
}

/// Catalog listing order: rating descending with unrated last, then review
/// count descending, then ascending id.
pub(crate) fn listing_order(a: &Product, b: &Product) -> std::cmp::Ordering {
    rating_desc_unrated_last(a.rating, b.rating)
        .then_with(|| b.review_count.cmp(&a.review_count))
        .then_with(|| a.id.cmp(&b.id))
}

pub(crate) fn rating_desc_unrated_last(a: Option<f64>, b: Option<f64>) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
