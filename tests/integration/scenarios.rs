#![allow(missing_docs)]

use std::sync::Arc;

use hybridrec::{
    collaborative::{CollaborativeRecommender, UserItemMatrixBuilder, UserSimilarityEngine},
    config::{CollaborativeConfig, ContentConfig, RecommenderConfig},
    content::ContentRecommender,
    popularity::PopularityFallback,
    repository::{InteractionRepository, MemoryRepository},
    Algorithm, AlgorithmChoice, Interaction, InteractionKind, Product, ProductId, RecError,
    RecommenderService, Result, Subject, UserId,
};
use time::macros::datetime;
use time::OffsetDateTime;

const AT: OffsetDateTime = datetime!(2024-04-01 12:00 UTC);

fn books() -> Vec<Product> {
    vec![
        Product::new(ProductId(1), "The Hobbit", "Books", 12.0),
        Product::new(ProductId(2), "Dracula", "Books", 9.0),
        Product::new(ProductId(3), "Emma", "Books", 7.5),
    ]
}

fn store() -> Vec<Product> {
    vec![
        Product::new(ProductId(1), "Noise Cancelling Headphones", "Electronics", 199.0)
            .with_description("over ear wireless headphones with long battery life")
            .with_rating(4.6, 120),
        Product::new(ProductId(2), "Wireless Earbuds", "Electronics", 129.0)
            .with_description("compact wireless earbuds with charging case")
            .with_rating(4.3, 80),
        Product::new(ProductId(3), "Bluetooth Speaker", "Electronics", 89.0)
            .with_description("portable wireless speaker with deep bass"),
        Product::new(ProductId(4), "Chef Knife", "Kitchen", 60.0)
            .with_description("forged steel chef knife")
            .with_rating(4.8, 45),
        Product::new(ProductId(5), "Cutting Board", "Kitchen", 25.0)
            .with_description("bamboo cutting board for the kitchen"),
        Product::new(ProductId(6), "Cast Iron Pan", "Kitchen", 40.0)
            .with_description("pre seasoned cast iron skillet"),
    ]
}

fn store_interactions() -> Vec<Interaction> {
    let event = |user: i64, product: i64, kind: InteractionKind, day: u8| {
        Interaction::new(
            UserId(user),
            ProductId(product),
            kind,
            AT.replace_day(day).unwrap(),
        )
    };
    vec![
        event(1, 1, InteractionKind::Purchase, 1),
        event(1, 2, InteractionKind::View, 2),
        event(2, 1, InteractionKind::Purchase, 1),
        event(2, 2, InteractionKind::Purchase, 3),
        event(2, 3, InteractionKind::View, 4),
        event(3, 4, InteractionKind::Purchase, 2),
        event(3, 5, InteractionKind::View, 5),
        event(4, 4, InteractionKind::View, 6),
        event(4, 6, InteractionKind::Purchase, 7),
        Interaction::rated(UserId(5), ProductId(3), 4, AT),
    ]
}

fn store_service() -> RecommenderService {
    let repo = MemoryRepository::with_data(store(), store_interactions());
    RecommenderService::with_defaults(Arc::new(repo)).unwrap()
}

#[test]
fn single_view_folds_into_one_cell() {
    let interactions = vec![
        Interaction::new(UserId(1), ProductId(1), InteractionKind::View, AT),
        Interaction::new(UserId(2), ProductId(2), InteractionKind::Purchase, AT),
        Interaction::new(UserId(2), ProductId(3), InteractionKind::View, AT),
    ];
    let matrix = UserItemMatrixBuilder::build(&interactions);
    assert_eq!(matrix.score(UserId(1), ProductId(1)), 1.0);
    assert_eq!(matrix.score(UserId(1), ProductId(2)), 0.0);
    assert_eq!(matrix.score(UserId(1), ProductId(3)), 0.0);

    let sims = UserSimilarityEngine::compute(&matrix);
    assert_eq!(sims.similarity(UserId(1), UserId(2)), Some(0.0));
    assert_eq!(sims.similarity(UserId(1), UserId(1)), Some(1.0));

    let repo = Arc::new(MemoryRepository::with_data(books(), interactions));
    let rec = CollaborativeRecommender::new(repo, CollaborativeConfig::default());
    let result = rec.get_recommendations(UserId(1), 5, 0.1).unwrap();
    assert_eq!(result.algorithm, Algorithm::PopularityBased);
}

#[test]
fn unknown_user_gets_exact_popularity_ranking() -> Result<()> {
    let repo: Arc<dyn InteractionRepository> =
        Arc::new(MemoryRepository::with_data(store(), store_interactions()));
    let popularity = PopularityFallback::new(Arc::clone(&repo)).rank(4)?;
    let collaborative = CollaborativeRecommender::new(Arc::clone(&repo), CollaborativeConfig::default())
        .get_recommendations(UserId(999), 4, 0.1)?;
    assert_eq!(collaborative.items, popularity);

    let service = RecommenderService::with_defaults(repo)?;
    for choice in [AlgorithmChoice::Content, AlgorithmChoice::Collaborative, AlgorithmChoice::Hybrid] {
        let result = service.recommend_for_user(UserId(999), 4, choice)?;
        assert_eq!(result.subject, Subject::User(UserId(999)));
        let ids: Vec<_> = result.items.iter().map(|e| e.product_id).collect();
        let expected: Vec<_> = popularity.iter().map(|e| e.product_id).collect();
        assert_eq!(ids, expected);
    }
    Ok(())
}

#[test]
fn high_threshold_cuts_off_everything() -> Result<()> {
    let repo = Arc::new(MemoryRepository::with_data(store(), Vec::new()));
    let rec = ContentRecommender::new(repo, ContentConfig::default());
    let best = rec.get_similar_products(ProductId(6), 1, 0.0)?;
    assert!(best[0].score.unwrap() < 0.9);
    assert!(rec.get_similar_products(ProductId(6), 10, 0.9)?.is_empty());
    Ok(())
}

#[test]
fn unknown_product_is_empty_or_not_found() -> Result<()> {
    let repo = Arc::new(MemoryRepository::with_data(store(), Vec::new()));
    let rec = ContentRecommender::new(repo.clone(), ContentConfig::default());
    assert!(rec.get_similar_products(ProductId(4242), 5, 0.1)?.is_empty());

    let service = RecommenderService::with_defaults(repo)?;
    let err = service.similar_products(ProductId(4242), 5).unwrap_err();
    assert!(matches!(err, RecError::ProductNotFound(ProductId(4242))));
    Ok(())
}

#[test]
fn similar_products_prefer_same_category() -> Result<()> {
    let result = store_service().similar_products(ProductId(1), 3)?;
    assert_eq!(result.algorithm, Algorithm::ContentBased);
    assert!(result.items.iter().all(|e| e.category == "Electronics"));
    assert_eq!(result.items[0].product_id, ProductId(2));
    Ok(())
}

#[test]
fn collaborative_never_recommends_owned_products() -> Result<()> {
    let service = store_service();
    let result = service.recommend_for_user(UserId(1), 5, AlgorithmChoice::Collaborative)?;
    assert_eq!(result.algorithm, Algorithm::CollaborativeFiltering);
    let ids: Vec<_> = result.items.iter().map(|e| e.product_id).collect();
    assert_eq!(ids, vec![ProductId(3)]);
    Ok(())
}

#[test]
fn hybrid_blends_both_sources() -> Result<()> {
    let repo: Arc<dyn InteractionRepository> =
        Arc::new(MemoryRepository::with_data(store(), store_interactions()));
    let config = RecommenderConfig::default();
    let service = RecommenderService::new(Arc::clone(&repo), config.clone())?;
    let collab = service
        .collaborative()
        .get_recommendations(UserId(1), 10, config.collaborative.min_similarity)?;
    let content = service.content().get_recommendations_for_user(UserId(1), 10)?;

    let hybrid = service.recommend_for_user(UserId(1), 5, AlgorithmChoice::Hybrid)?;
    assert_eq!(hybrid.algorithm, Algorithm::Hybrid);
    let speaker = hybrid
        .items
        .iter()
        .find(|e| e.product_id == ProductId(3))
        .expect("speaker is recommended by both sources");
    let collab_score = collab.items.iter().find(|e| e.product_id == ProductId(3)).unwrap().score.unwrap();
    let content_score = content.items.iter().find(|e| e.product_id == ProductId(3)).unwrap().score.unwrap();
    let expected = 0.6 * collab_score + 0.4 * content_score;
    assert!((speaker.score.unwrap() - expected).abs() < 1e-9);
    assert!(hybrid
        .items
        .windows(2)
        .all(|w| w[0].score.unwrap() >= w[1].score.unwrap()));
    Ok(())
}

#[test]
fn degenerate_catalogs_are_not_errors() -> Result<()> {
    let empty = RecommenderService::with_defaults(Arc::new(MemoryRepository::new()))?;
    assert!(empty.popular(5)?.items.is_empty());
    assert!(empty.recommend_for_user(UserId(1), 5, AlgorithmChoice::Hybrid)?.items.is_empty());
    empty.warm_up()?;

    let free: Vec<Product> = (1..=3)
        .map(|id| Product::new(ProductId(id), format!("Sample {id}"), "Freebies", 0.0))
        .collect();
    let repo = Arc::new(MemoryRepository::with_data(free, Vec::new()));
    let rec = ContentRecommender::new(repo, ContentConfig::default());
    let similar = rec.get_similar_products(ProductId(1), 5, 0.1)?;
    assert_eq!(similar.len(), 2);
    assert!(similar.iter().all(|e| e.score.unwrap() >= 0.4 - 1e-9));
    Ok(())
}
