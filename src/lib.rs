//! Hybrid product recommendation engine.
//!
//! Combines user-based collaborative filtering over a folded interaction
//! matrix with content-based item similarity over the catalog, and falls
//! back to a popularity ranking whenever neither has anything to offer.
//! [`RecommenderService`] is the entry point; data comes from any
//! [`repository::InteractionRepository`].

#![warn(missing_docs)]

pub mod collaborative;
pub mod config;
pub mod content;
pub mod hybrid;
pub mod metrics;
pub mod model;
pub mod popularity;
pub mod primitives;
pub mod repository;
pub mod service;
pub mod text;
pub mod types;

pub use config::RecommenderConfig;
pub use metrics::{MetricsSnapshot, MetricsTarget};
pub use model::{
    Algorithm, AlgorithmChoice, Interaction, InteractionKind, Product, RecommendationEntry,
    RecommendationResult, Subject,
};
pub use service::RecommenderService;
pub use types::{ProductId, RecError, Result, UserId};
