#![forbid(unsafe_code)]

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hybridrec::{
    collaborative::{UserItemMatrixBuilder, UserSimilarityEngine},
    content::ProductCorpusIndexer,
    repository::MemoryRepository,
    AlgorithmChoice, Interaction, InteractionKind, Product, ProductId, RecommenderService, UserId,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use time::macros::datetime;

const CATEGORIES: &[&str] = &["Audio", "Books", "Garden", "Kitchen", "Outdoor", "Toys"];
const WORDS: &[&str] = &[
    "compact", "wireless", "classic", "steel", "bamboo", "portable", "premium", "organic",
    "vintage", "ergonomic", "waterproof", "handmade",
];

struct Dataset {
    products: Vec<Product>,
    interactions: Vec<Interaction>,
}

impl Dataset {
    fn generate(users: i64, products: i64, interactions: usize) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let catalog = (1..=products)
            .map(|id| {
                let category = CATEGORIES[rng.gen_range(0..CATEGORIES.len())];
                let title: Vec<&str> = (0..3).map(|_| WORDS[rng.gen_range(0..WORDS.len())]).collect();
                let description: Vec<&str> =
                    (0..8).map(|_| WORDS[rng.gen_range(0..WORDS.len())]).collect();
                Product::new(ProductId(id), title.join(" "), category, rng.gen_range(5.0..500.0))
                    .with_description(description.join(" "))
            })
            .collect();
        let start = datetime!(2024-01-01 0:00 UTC);
        let log = (0..interactions)
            .map(|i| {
                let kind = match rng.gen_range(0..10) {
                    0..=5 => InteractionKind::View,
                    6..=7 => InteractionKind::Purchase,
                    _ => InteractionKind::Wishlist,
                };
                Interaction::new(
                    UserId(rng.gen_range(1..=users)),
                    ProductId(rng.gen_range(1..=products)),
                    kind,
                    start + time::Duration::seconds(i as i64),
                )
            })
            .collect();
        Self {
            products: catalog,
            interactions: log,
        }
    }
}

fn build_models(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(20);
    for users in [100i64, 400] {
        let data = Dataset::generate(users, 500, users as usize * 20);
        group.throughput(Throughput::Elements(users as u64));
        group.bench_with_input(BenchmarkId::new("user_similarity", users), &data, |b, data| {
            b.iter(|| {
                let matrix = UserItemMatrixBuilder::build(&data.interactions);
                UserSimilarityEngine::compute(&matrix)
            });
        });
    }
    let data = Dataset::generate(100, 1000, 0);
    group.throughput(Throughput::Elements(data.products.len() as u64));
    group.bench_function("tfidf_index", |b| {
        b.iter(|| ProductCorpusIndexer::default().index(&data.products));
    });
    group.finish();
}

fn serve_requests(c: &mut Criterion) {
    let data = Dataset::generate(300, 800, 6000);
    let repo = MemoryRepository::with_data(data.products, data.interactions);
    let service = RecommenderService::with_defaults(Arc::new(repo)).expect("service");
    service.warm_up().expect("warm up");

    let mut group = c.benchmark_group("serve");
    group.throughput(Throughput::Elements(1));
    group.bench_function("similar_products", |b| {
        let mut id = 0i64;
        b.iter(|| {
            id = id % 800 + 1;
            service.similar_products(ProductId(id), 10).expect("similar")
        });
    });
    for choice in [AlgorithmChoice::Collaborative, AlgorithmChoice::Content, AlgorithmChoice::Hybrid] {
        group.bench_with_input(
            BenchmarkId::new("for_user", format!("{choice:?}")),
            &choice,
            |b, choice| {
                let mut user = 0i64;
                b.iter(|| {
                    user = user % 300 + 1;
                    service
                        .recommend_for_user(UserId(user), 10, *choice)
                        .expect("recommend")
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, build_models, serve_requests);
criterion_main!(benches);
