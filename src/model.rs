//! Records read from the catalog store and the entries produced from them.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use time::OffsetDateTime;

use crate::types::{ProductId, RecError, UserId};

/// Score assigned to a purchase when folded into the user-item matrix.
pub const PURCHASE_SCORE: f64 = 5.0;
/// Score assigned to a view when folded into the user-item matrix.
pub const VIEW_SCORE: f64 = 1.0;
/// Upper bound of an explicit rating.
pub const MAX_RATING: f64 = 5.0;

/// Kind of a recorded user interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InteractionKind {
    /// The user opened the product page.
    View,
    /// The user bought the product.
    Purchase,
    /// The user left an explicit rating.
    Rating,
    /// The user saved the product for later.
    Wishlist,
    /// Anything the ingestion layer let through that we do not know.
    Other(String),
}

impl InteractionKind {
    /// Canonical lowercase name, as stored in the `interactions` table.
    pub fn as_str(&self) -> &str {
        match self {
            InteractionKind::View => "view",
            InteractionKind::Purchase => "purchase",
            InteractionKind::Rating => "rating",
            InteractionKind::Wishlist => "wishlist",
            InteractionKind::Other(name) => name.as_str(),
        }
    }

    /// Folds an interaction into a matrix cell value.
    ///
    /// Wishlist and unknown kinds contribute nothing. Ratings are clamped to
    /// `[0, 5]`; a rating interaction without a value contributes nothing.
    pub fn score(&self, rating: Option<i32>) -> f64 {
        match self {
            InteractionKind::Purchase => PURCHASE_SCORE,
            InteractionKind::View => VIEW_SCORE,
            InteractionKind::Rating => rating
                .map(|r| f64::from(r).clamp(0.0, MAX_RATING))
                .unwrap_or(0.0),
            InteractionKind::Wishlist | InteractionKind::Other(_) => 0.0,
        }
    }
}

impl FromStr for InteractionKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_ascii_lowercase().as_str() {
            "view" => InteractionKind::View,
            "purchase" => InteractionKind::Purchase,
            "rating" => InteractionKind::Rating,
            "wishlist" => InteractionKind::Wishlist,
            other => InteractionKind::Other(other.to_string()),
        };
        Ok(kind)
    }
}

impl Serialize for InteractionKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single recorded interaction between a user and a product.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    /// Acting user.
    pub user_id: UserId,
    /// Target product.
    pub product_id: ProductId,
    /// What happened.
    pub kind: InteractionKind,
    /// Explicit rating (1..=5) when `kind` is [`InteractionKind::Rating`].
    pub rating: Option<i32>,
    /// When it happened.
    pub timestamp: OffsetDateTime,
}

impl Interaction {
    /// Creates an interaction without a rating.
    pub fn new(
        user_id: UserId,
        product_id: ProductId,
        kind: InteractionKind,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            user_id,
            product_id,
            kind,
            rating: None,
            timestamp,
        }
    }

    /// Creates a rating interaction.
    pub fn rated(
        user_id: UserId,
        product_id: ProductId,
        rating: i32,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            user_id,
            product_id,
            kind: InteractionKind::Rating,
            rating: Some(rating),
            timestamp,
        }
    }

    /// Matrix cell contribution of this interaction.
    pub fn score(&self) -> f64 {
        self.kind.score(self.rating)
    }

    /// Checks an interaction before it is recorded.
    ///
    /// Only the four known kinds are accepted, and a rating interaction must
    /// carry a rating in `1..=5`. Rows already in a store are never
    /// rechecked; unknown kinds read back fold to zero.
    pub fn validate(&self) -> Result<(), RecError> {
        match (&self.kind, self.rating) {
            (InteractionKind::Other(name), _) => Err(RecError::InvalidArgument(format!(
                "invalid interaction_type '{name}', expected one of view, purchase, rating, wishlist"
            ))),
            (InteractionKind::Rating, None) => Err(RecError::InvalidArgument(
                "rating is required when interaction_type is 'rating'".into(),
            )),
            (InteractionKind::Rating, Some(rating)) if !(1..=5).contains(&rating) => {
                Err(RecError::InvalidArgument(format!(
                    "rating must be between 1 and 5 (got {rating})"
                )))
            }
            _ => Ok(()),
        }
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Product {
    /// Primary key.
    pub id: ProductId,
    /// Display title.
    pub title: String,
    /// Category label; compared verbatim.
    pub category: String,
    /// Non-negative list price.
    pub price: f64,
    /// Free-form description.
    pub description: Option<String>,
    /// Product image.
    pub image_url: Option<String>,
    /// Average catalog rating in `[0, 5]`.
    pub rating: Option<f64>,
    /// Number of reviews behind `rating`.
    pub review_count: i64,
}

impl Product {
    /// Creates a product with no description, image or rating.
    pub fn new(
        id: ProductId,
        title: impl Into<String>,
        category: impl Into<String>,
        price: f64,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            category: category.into(),
            price,
            description: None,
            image_url: None,
            rating: None,
            review_count: 0,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the catalog rating.
    pub fn with_rating(mut self, rating: f64, review_count: i64) -> Self {
        self.rating = Some(rating);
        self.review_count = review_count;
        self
    }

    /// Sets the image URL.
    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    /// The text indexed for content similarity: title, category and
    /// description separated by spaces.
    pub fn document(&self) -> String {
        format!(
            "{} {} {}",
            self.title,
            self.category,
            self.description.as_deref().unwrap_or("")
        )
    }
}

/// A product row ranked by how often it was interacted with.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopularProduct {
    /// Product key.
    pub product_id: ProductId,
    /// Display title.
    pub title: String,
    /// Category label.
    pub category: String,
    /// List price.
    pub price: f64,
    /// Catalog rating.
    pub rating: Option<f64>,
    /// Product image.
    pub image_url: Option<String>,
    /// Number of interactions of any kind.
    pub interaction_count: u64,
}

/// Default page size of a product listing.
pub const DEFAULT_PAGE_SIZE: usize = 20;
/// Largest accepted page size of a product listing.
pub const MAX_PAGE_SIZE: usize = 100;

/// Filters and paging of a catalog listing.
///
/// Every filter is optional. Matches are ordered by rating descending
/// (unrated last), then review count descending, then ascending id.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    /// Exact category label.
    pub category: Option<String>,
    /// Case-insensitive substring of the title.
    pub search: Option<String>,
    /// Inclusive lower price bound.
    pub min_price: Option<f64>,
    /// Inclusive upper price bound.
    pub max_price: Option<f64>,
    /// Inclusive lower rating bound; unrated products never match.
    pub min_rating: Option<f64>,
    /// One-based page number.
    pub page: usize,
    /// Products per page.
    pub page_size: usize,
}

impl Default for ProductQuery {
    fn default() -> Self {
        Self {
            category: None,
            search: None,
            min_price: None,
            max_price: None,
            min_rating: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ProductQuery {
    /// Restricts to one category.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Restricts to titles containing `search`.
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Restricts to prices within the given bounds.
    pub fn with_price_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_price = min;
        self.max_price = max;
        self
    }

    /// Restricts to products rated at least `rating`.
    pub fn with_min_rating(mut self, rating: f64) -> Self {
        self.min_rating = Some(rating);
        self
    }

    /// Selects a page.
    pub fn with_page(mut self, page: usize, page_size: usize) -> Self {
        self.page = page;
        self.page_size = page_size;
        self
    }

    /// Rejects pages and bounds no listing can satisfy.
    pub fn validate(&self) -> Result<(), RecError> {
        if self.page == 0 {
            return Err(RecError::InvalidArgument("page must be at least 1".into()));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.page_size) {
            return Err(RecError::InvalidArgument(format!(
                "page_size must be between 1 and {MAX_PAGE_SIZE} (got {})",
                self.page_size
            )));
        }
        for (name, bound) in [("min_price", self.min_price), ("max_price", self.max_price)] {
            if bound.is_some_and(|b| !b.is_finite() || b < 0.0) {
                return Err(RecError::InvalidArgument(format!(
                    "{name} must be a non-negative number"
                )));
            }
        }
        if self
            .min_rating
            .is_some_and(|r| !(0.0..=MAX_RATING).contains(&r))
        {
            return Err(RecError::InvalidArgument(
                "min_rating must be between 0 and 5".into(),
            ));
        }
        Ok(())
    }

    /// Whether `product` passes every filter.
    pub fn matches(&self, product: &Product) -> bool {
        if self.category.as_ref().is_some_and(|c| *c != product.category) {
            return false;
        }
        if let Some(search) = &self.search {
            let needle = search.to_ascii_lowercase();
            if !product.title.to_ascii_lowercase().contains(&needle) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| product.price < min)
            || self.max_price.is_some_and(|max| product.price > max)
        {
            return false;
        }
        match self.min_rating {
            Some(min) => product.rating.is_some_and(|r| r >= min),
            None => true,
        }
    }

    /// Number of matches skipped before this page.
    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

/// One page of a catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductPage {
    /// Products on this page.
    pub products: Vec<Product>,
    /// Matches across all pages.
    pub total: usize,
    /// One-based page number.
    pub page: usize,
    /// Requested page size.
    pub page_size: usize,
}

/// Number of catalog products in a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    /// Category label.
    pub category: String,
    /// Products carrying it.
    pub count: u64,
}

/// A recorded interaction joined with the product it targets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserInteraction {
    /// Acting user.
    pub user_id: UserId,
    /// Target product.
    pub product_id: ProductId,
    /// What happened.
    #[serde(rename = "interaction_type")]
    pub kind: InteractionKind,
    /// Explicit rating, if any.
    pub rating: Option<i32>,
    /// When it happened.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    /// Title of the product.
    pub product_title: String,
    /// Category of the product.
    pub product_category: String,
    /// List price of the product.
    pub product_price: f64,
}

impl UserInteraction {
    /// Joins an interaction with its product row.
    pub fn new(interaction: &Interaction, product: &Product) -> Self {
        Self {
            user_id: interaction.user_id,
            product_id: interaction.product_id,
            kind: interaction.kind.clone(),
            rating: interaction.rating,
            timestamp: interaction.timestamp,
            product_title: product.title.clone(),
            product_category: product.category.clone(),
            product_price: product.price,
        }
    }
}

/// Recent interactions of one user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InteractionHistory {
    /// Whose history this is.
    pub user_id: UserId,
    /// Newest first.
    pub interactions: Vec<UserInteraction>,
    /// `interactions.len()`.
    pub count: usize,
}

impl InteractionHistory {
    /// Wraps a user's interactions, filling in `count`.
    pub fn new(user_id: UserId, interactions: Vec<UserInteraction>) -> Self {
        let count = interactions.len();
        Self {
            user_id,
            interactions,
            count,
        }
    }
}

/// Placeholder image used when a product has none.
pub fn placeholder_image_url(product_id: ProductId) -> String {
    format!("https://picsum.photos/seed/{product_id}/400/400")
}

/// The single output unit of every recommender.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationEntry {
    /// Recommended product.
    pub product_id: ProductId,
    /// Display title.
    pub title: String,
    /// Category label.
    pub category: String,
    /// List price.
    pub price: f64,
    /// Catalog rating.
    pub rating: Option<f64>,
    /// Algorithm score; `None` for popularity results.
    pub score: Option<f64>,
    /// Product image, never empty.
    pub image_url: String,
}

impl RecommendationEntry {
    /// Builds an entry from a catalog product.
    pub fn from_product(product: &Product, score: Option<f64>) -> Self {
        Self {
            product_id: product.id,
            title: product.title.clone(),
            category: product.category.clone(),
            price: product.price,
            rating: product.rating,
            score,
            image_url: product
                .image_url
                .clone()
                .unwrap_or_else(|| placeholder_image_url(product.id)),
        }
    }

    /// Builds an unscored entry from a popularity row.
    pub fn from_popular(row: &PopularProduct) -> Self {
        Self {
            product_id: row.product_id,
            title: row.title.clone(),
            category: row.category.clone(),
            price: row.price,
            rating: row.rating,
            score: None,
            image_url: row
                .image_url
                .clone()
                .unwrap_or_else(|| placeholder_image_url(row.product_id)),
        }
    }

    /// Score with `None` read as zero.
    pub fn score_or_zero(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

/// Name of the algorithm that produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    /// User-based collaborative filtering.
    CollaborativeFiltering,
    /// Item similarity over text, category and price.
    ContentBased,
    /// Weighted blend of the two above.
    Hybrid,
    /// Interaction-count ranking.
    PopularityBased,
}

impl Algorithm {
    /// Wire name of the algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::CollaborativeFiltering => "collaborative_filtering",
            Algorithm::ContentBased => "content_based",
            Algorithm::Hybrid => "hybrid",
            Algorithm::PopularityBased => "popularity_based",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Algorithm requested for a per-user recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlgorithmChoice {
    /// History-aggregated content similarity.
    Content,
    /// Neighbor-weighted collaborative filtering.
    Collaborative,
    /// Blend of both.
    #[default]
    Hybrid,
}

impl FromStr for AlgorithmChoice {
    type Err = RecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "content" | "content_based" => Ok(AlgorithmChoice::Content),
            "collaborative" | "collaborative_filtering" => Ok(AlgorithmChoice::Collaborative),
            "hybrid" => Ok(AlgorithmChoice::Hybrid),
            other => Err(RecError::InvalidArgument(format!(
                "unknown algorithm '{other}'"
            ))),
        }
    }
}

/// What a recommendation result was computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    /// Personalized for a user.
    User(UserId),
    /// Similar to a reference product.
    Product(ProductId),
    /// Not personalized.
    None,
}

/// Ranked result handed to the serving layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationResult {
    /// Who or what the ranking is for.
    pub subject: Subject,
    /// Algorithm that produced `items`.
    pub algorithm: Algorithm,
    /// Ranked entries.
    pub items: Vec<RecommendationEntry>,
    /// `items.len()`.
    pub count: usize,
}

impl RecommendationResult {
    /// Wraps ranked entries, filling in `count`.
    pub fn new(subject: Subject, algorithm: Algorithm, items: Vec<RecommendationEntry>) -> Self {
        let count = items.len();
        Self {
            subject,
            algorithm,
            items,
            count,
        }
    }
}
