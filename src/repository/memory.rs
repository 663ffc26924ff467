use std::collections::{BTreeMap, BTreeSet};

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use time::OffsetDateTime;

use super::{listing_order, rating_desc_unrated_last, InteractionRepository};
use crate::model::{
    CategoryCount, Interaction, PopularProduct, Product, ProductPage, ProductQuery, UserInteraction,
};
use crate::types::{ProductId, Result, UserId};

/// In-process repository guarded by a reader-writer lock.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    state: RwLock<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    products: BTreeMap<ProductId, Product>,
    users: BTreeSet<UserId>,
    interactions: Vec<Interaction>,
}

impl MemoryRepository {
    /// Empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-loaded with a catalog and an interaction log.
    ///
    /// Rows are taken as-is, the way an existing store would hold them; use
    /// [`record_interaction`](Self::record_interaction) for checked ingestion.
    pub fn with_data(products: Vec<Product>, interactions: Vec<Interaction>) -> Self {
        let repo = Self::new();
        {
            let mut state = repo.state.write();
            for product in products {
                state.products.insert(product.id, product);
            }
            for interaction in interactions {
                state.users.insert(interaction.user_id);
                state.interactions.push(interaction);
            }
        }
        repo
    }

    /// Inserts or replaces a product.
    pub fn insert_product(&self, product: Product) {
        self.state.write().products.insert(product.id, product);
    }

    /// Registers a user without interactions.
    pub fn insert_user(&self, user_id: UserId) {
        self.state.write().users.insert(user_id);
    }

    /// Validates and appends an interaction, registering its user.
    pub fn record_interaction(&self, interaction: Interaction) -> Result<()> {
        interaction.validate()?;
        let mut state = self.state.write();
        state.users.insert(interaction.user_id);
        state.interactions.push(interaction);
        Ok(())
    }

    /// Known users in ascending order.
    pub fn users(&self) -> Vec<UserId> {
        self.state.read().users.iter().copied().collect()
    }

    /// Number of recorded interactions.
    pub fn interaction_count(&self) -> usize {
        self.state.read().interactions.len()
    }
}

impl InteractionRepository for MemoryRepository {
    fn list_interactions(&self) -> Result<Vec<Interaction>> {
        Ok(self.state.read().interactions.clone())
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        Ok(self.state.read().products.values().cloned().collect())
    }

    fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let state = self.state.read();
        let mut seen = BTreeSet::new();
        Ok(ids
            .iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| state.products.get(id).cloned())
            .collect())
    }

    fn list_recent_products_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<Product>> {
        let state = self.state.read();
        let mut last_seen: FxHashMap<ProductId, OffsetDateTime> = FxHashMap::default();
        for interaction in state.interactions.iter().filter(|i| i.user_id == user_id) {
            last_seen
                .entry(interaction.product_id)
                .and_modify(|ts| *ts = (*ts).max(interaction.timestamp))
                .or_insert(interaction.timestamp);
        }
        let mut recent: Vec<(ProductId, OffsetDateTime)> = last_seen
            .into_iter()
            .filter(|(id, _)| state.products.contains_key(id))
            .collect();
        recent.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(recent
            .into_iter()
            .take(limit)
            .filter_map(|(id, _)| state.products.get(&id).cloned())
            .collect())
    }

    fn popularity_rank(&self, limit: usize) -> Result<Vec<PopularProduct>> {
        let state = self.state.read();
        let mut counts: FxHashMap<ProductId, u64> = FxHashMap::default();
        for interaction in &state.interactions {
            *counts.entry(interaction.product_id).or_insert(0) += 1;
        }
        let mut rows: Vec<PopularProduct> = state
            .products
            .values()
            .map(|product| PopularProduct {
                product_id: product.id,
                title: product.title.clone(),
                category: product.category.clone(),
                price: product.price,
                rating: product.rating,
                image_url: product.image_url.clone(),
                interaction_count: counts.get(&product.id).copied().unwrap_or(0),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.interaction_count
                .cmp(&a.interaction_count)
                .then_with(|| rating_desc_unrated_last(a.rating, b.rating))
                .then_with(|| a.product_id.cmp(&b.product_id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().products.get(&product_id).cloned())
    }

    fn search_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let state = self.state.read();
        let mut matches: Vec<&Product> =
            state.products.values().filter(|p| query.matches(p)).collect();
        matches.sort_by(|a, b| listing_order(a, b));
        let total = matches.len();
        let products = matches
            .into_iter()
            .skip(query.offset())
            .take(query.page_size)
            .cloned()
            .collect();
        Ok(ProductPage {
            products,
            total,
            page: query.page,
            page_size: query.page_size,
        })
    }

    fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let state = self.state.read();
        let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
        for product in state.products.values() {
            *counts.entry(product.category.as_str()).or_insert(0) += 1;
        }
        let mut rows: Vec<CategoryCount> = counts
            .into_iter()
            .map(|(category, count)| CategoryCount {
                category: category.to_string(),
                count,
            })
            .collect();
        // Stable: equal counts stay in category order.
        rows.sort_by(|a, b| b.count.cmp(&a.count));
        Ok(rows)
    }

    fn list_user_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<UserInteraction>> {
        let state = self.state.read();
        let mut rows: Vec<(usize, UserInteraction)> = state
            .interactions
            .iter()
            .enumerate()
            .filter(|(_, i)| i.user_id == user_id)
            .filter_map(|(seq, i)| {
                state
                    .products
                    .get(&i.product_id)
                    .map(|product| (seq, UserInteraction::new(i, product)))
            })
            .collect();
        rows.sort_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then_with(|| b.0.cmp(&a.0)));
        Ok(rows.into_iter().take(limit).map(|(_, row)| row).collect())
    }
}
