//! Content-based filtering over the product catalog.
//!
//! Products are compared by a weighted blend of TF-IDF text similarity,
//! category equality and price closeness:
//!
//! ```text
//! sim(r, i) = 0.6·cos(tfidf_r, tfidf_i) + 0.3·[cat_r = cat_i] + 0.1·(1 − |p_r − p_i| / p_max)
//! ```
//!
//! Per-user recommendations aggregate the neighbors of the user's most
//! recent products.

mod corpus;
mod recommender;
mod similarity;

pub use corpus::{ItemFeatureIndex, ProductCorpusIndexer};
pub use recommender::{ContentModel, ContentRecommender};
pub use similarity::{ItemSimilarityEngine, SimilarityComponents};
