#![allow(missing_docs)]

use std::sync::Arc;

use hybridrec::{
    repository::{InteractionRepository, MemoryRepository, SqliteRepository},
    Algorithm, AlgorithmChoice, Interaction, InteractionKind, MetricsSnapshot, MetricsTarget,
    Product, ProductId, RecommenderService, Result, UserId,
};
use tempfile::TempDir;
use time::macros::datetime;

fn catalog() -> Vec<Product> {
    vec![
        Product::new(ProductId(10), "Yoga Mat", "Fitness", 30.0)
            .with_description("non slip yoga mat")
            .with_rating(4.4, 12),
        Product::new(ProductId(11), "Yoga Block", "Fitness", 12.0).with_description("foam yoga block"),
        Product::new(ProductId(12), "Dumbbell Set", "Fitness", 80.0).with_rating(4.7, 30),
        Product::new(ProductId(13), "French Press", "Kitchen", 35.0)
            .with_description("glass coffee press")
            .with_image_url("https://img.example/press.png"),
    ]
}

fn interactions() -> Vec<Interaction> {
    vec![
        Interaction::new(UserId(1), ProductId(10), InteractionKind::Purchase, datetime!(2024-07-01 8:00 UTC)),
        Interaction::new(UserId(1), ProductId(12), InteractionKind::View, datetime!(2024-07-02 8:00 UTC)),
        Interaction::new(UserId(2), ProductId(10), InteractionKind::Purchase, datetime!(2024-07-01 9:00 UTC)),
        Interaction::new(UserId(2), ProductId(11), InteractionKind::Purchase, datetime!(2024-07-03 9:00 UTC)),
        Interaction::rated(UserId(3), ProductId(13), 5, datetime!(2024-07-04 10:00 UTC)),
        Interaction::new(UserId(3), ProductId(13), InteractionKind::Wishlist, datetime!(2024-07-05 10:00 UTC)),
    ]
}

fn seeded_file() -> Result<(TempDir, SqliteRepository)> {
    let dir = tempfile::tempdir()?;
    let repo = SqliteRepository::open(dir.path().join("shop.db"))?;
    repo.import(&catalog(), &interactions())?;
    Ok((dir, repo))
}

#[test]
fn data_survives_reopen() -> Result<()> {
    let (dir, repo) = seeded_file()?;
    drop(repo);
    let reopened = SqliteRepository::open(dir.path().join("shop.db"))?;
    assert_eq!(reopened.list_products()?.len(), 4);
    assert_eq!(reopened.list_interactions()?.len(), 6);
    Ok(())
}

#[test]
fn sqlite_and_memory_agree() -> Result<()> {
    let (_dir, sqlite) = seeded_file()?;
    let memory = MemoryRepository::with_data(catalog(), interactions());

    let ids = |rows: Vec<hybridrec::model::PopularProduct>| {
        rows.into_iter()
            .map(|r| (r.product_id, r.interaction_count))
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(sqlite.popularity_rank(10)?), ids(memory.popularity_rank(10)?));

    let recent = |rows: Vec<Product>| rows.into_iter().map(|p| p.id).collect::<Vec<_>>();
    assert_eq!(
        recent(sqlite.list_recent_products_for_user(UserId(2), 10)?),
        recent(memory.list_recent_products_for_user(UserId(2), 10)?)
    );
    assert_eq!(sqlite.list_products()?, memory.list_products()?);
    Ok(())
}

#[test]
fn service_over_sqlite() -> Result<()> {
    let (_dir, repo) = seeded_file()?;
    let service = RecommenderService::with_defaults(Arc::new(repo))?;
    service.warm_up()?;

    let similar = service.similar_products(ProductId(10), 5)?;
    assert_eq!(similar.items[0].product_id, ProductId(11));

    let collab = service.recommend_for_user(UserId(1), 5, AlgorithmChoice::Collaborative)?;
    assert_eq!(collab.algorithm, Algorithm::CollaborativeFiltering);
    assert_eq!(collab.items[0].product_id, ProductId(11));

    let popular = service.popular(2)?;
    assert_eq!(popular.items[0].product_id, ProductId(10));
    assert_eq!(popular.items[1].product_id, ProductId(13));
    assert_eq!(popular.items[1].image_url, "https://img.example/press.png");

    match service.metrics(MetricsTarget::Collaborative)? {
        MetricsSnapshot::Collaborative(m) => {
            assert_eq!(m.total_users, 3);
            assert_eq!(m.total_products, 4);
            // 5 positive cells out of 12
            assert!((m.sparsity - 700.0 / 12.0).abs() < 1e-9);
        }
        other => panic!("unexpected snapshot {other:?}"),
    }
    Ok(())
}
