//! User-based collaborative filtering.
//!
//! Interactions are folded into a users × products matrix (purchase 5,
//! rating 0-5, view 1, anything else 0; the maximum wins per pair). Users
//! are compared by cosine similarity over their rows, and a user's unseen
//! products are scored by the similarity-weighted scores of their nearest
//! neighbors.

mod matrix;
mod recommender;
mod similarity;

pub use matrix::{UserItemMatrix, UserItemMatrixBuilder};
pub use recommender::{CollaborativeModel, CollaborativeRecommender};
pub use similarity::{UserSimilarityEngine, UserSimilarityMatrix};
