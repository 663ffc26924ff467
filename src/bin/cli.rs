//! Binary entry point for the hybridrec command-line tool.
#![forbid(unsafe_code)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use hybridrec::{
    model::{CategoryCount, InteractionHistory, Product, ProductPage, ProductQuery},
    repository::SqliteRepository,
    AlgorithmChoice, Interaction, InteractionKind, MetricsSnapshot, MetricsTarget, ProductId,
    RecError, RecommendationResult, RecommenderConfig, RecommenderService, Subject, UserId,
};
use serde::Serialize;
use time::OffsetDateTime;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    name = "hybridrec",
    version,
    about = "Product recommendations from a SQLite catalog",
    disable_help_subcommand = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Text,
        help = "Output format for structured responses"
    )]
    format: OutputFormat,

    #[arg(
        long,
        global = true,
        value_name = "FILE",
        env = "HYBRIDREC_CONFIG",
        help = "TOML file overriding recommender defaults"
    )]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct DbArg {
    #[arg(value_name = "DB")]
    db_path: PathBuf,
}

#[derive(Args, Debug)]
struct LimitArg {
    #[arg(long, default_value_t = 10, help = "Number of recommendations")]
    limit: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(about = "Products similar to a reference product")]
    Similar {
        #[command(flatten)]
        db: DbArg,
        #[arg(value_name = "PRODUCT_ID")]
        product_id: i64,
        #[command(flatten)]
        limit: LimitArg,
    },

    #[command(about = "Personalized recommendations for a user")]
    ForUser {
        #[command(flatten)]
        db: DbArg,
        #[arg(value_name = "USER_ID")]
        user_id: i64,
        #[command(flatten)]
        limit: LimitArg,
        #[arg(long, value_enum, default_value_t = AlgorithmArg::Hybrid)]
        algorithm: AlgorithmArg,
    },

    #[command(about = "Most interacted-with products")]
    Popular {
        #[command(flatten)]
        db: DbArg,
        #[command(flatten)]
        limit: LimitArg,
    },

    #[command(about = "Model health report")]
    Metrics {
        #[command(flatten)]
        db: DbArg,
        #[arg(long, value_enum, default_value_t = MetricsArg::Content)]
        algorithm: MetricsArg,
    },

    #[command(about = "Show one catalog product")]
    Product {
        #[command(flatten)]
        db: DbArg,
        #[arg(value_name = "PRODUCT_ID")]
        product_id: i64,
    },

    #[command(about = "List catalog products with optional filters")]
    Products {
        #[command(flatten)]
        db: DbArg,
        #[command(flatten)]
        filter: ProductFilterArgs,
    },

    #[command(about = "Product counts per category")]
    Categories {
        #[command(flatten)]
        db: DbArg,
    },

    #[command(about = "Recent interactions of a user")]
    History {
        #[command(flatten)]
        db: DbArg,
        #[arg(value_name = "USER_ID")]
        user_id: i64,
        #[arg(long, default_value_t = 50, help = "Number of interactions")]
        limit: usize,
    },

    #[command(about = "Record a user interaction")]
    Track {
        #[command(flatten)]
        db: DbArg,
        #[arg(value_name = "USER_ID")]
        user_id: i64,
        #[arg(value_name = "PRODUCT_ID")]
        product_id: i64,
        #[arg(value_name = "KIND", help = "view, purchase, rating or wishlist")]
        kind: String,
        #[arg(long, help = "Rating from 1 to 5, required for rating interactions")]
        rating: Option<i32>,
    },
}

#[derive(Args, Debug)]
struct ProductFilterArgs {
    #[arg(long)]
    category: Option<String>,
    #[arg(long, help = "Case-insensitive title substring")]
    search: Option<String>,
    #[arg(long)]
    min_price: Option<f64>,
    #[arg(long)]
    max_price: Option<f64>,
    #[arg(long)]
    min_rating: Option<f64>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = hybridrec::model::DEFAULT_PAGE_SIZE)]
    page_size: usize,
}

impl From<ProductFilterArgs> for ProductQuery {
    fn from(args: ProductFilterArgs) -> Self {
        ProductQuery {
            category: args.category,
            search: args.search,
            min_price: args.min_price,
            max_price: args.max_price,
            min_rating: args.min_rating,
            page: args.page,
            page_size: args.page_size,
        }
    }
}

#[derive(Serialize, Debug)]
struct TrackedInteraction {
    id: i64,
    user_id: UserId,
    product_id: ProductId,
    interaction_type: String,
    rating: Option<i32>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum AlgorithmArg {
    Content,
    Collaborative,
    Hybrid,
}

impl From<AlgorithmArg> for AlgorithmChoice {
    fn from(arg: AlgorithmArg) -> Self {
        match arg {
            AlgorithmArg::Content => AlgorithmChoice::Content,
            AlgorithmArg::Collaborative => AlgorithmChoice::Collaborative,
            AlgorithmArg::Hybrid => AlgorithmChoice::Hybrid,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum MetricsArg {
    Content,
    Collaborative,
}

impl From<MetricsArg> for MetricsTarget {
    fn from(arg: MetricsArg) -> Self {
        match arg {
            MetricsArg::Content => MetricsTarget::Content,
            MetricsArg::Collaborative => MetricsTarget::Collaborative,
        }
    }
}

fn main() {
    install_tracing_subscriber();
    if let Err(err) = run() {
        eprintln!("error: {err}");
        let not_found = err
            .downcast_ref::<RecError>()
            .is_some_and(RecError::is_not_found);
        std::process::exit(if not_found { 2 } else { 1 });
    }
}

fn install_tracing_subscriber() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => RecommenderConfig::load(path)?,
        None => RecommenderConfig::default(),
    };

    match cli.command {
        Command::Similar {
            db,
            product_id,
            limit,
        } => {
            let service = open_service(&db.db_path, config)?;
            let result = service.similar_products(ProductId(product_id), limit.limit)?;
            emit(&cli.format, &result, |_| print_result_text(&result))?;
        }
        Command::ForUser {
            db,
            user_id,
            limit,
            algorithm,
        } => {
            let service = open_service(&db.db_path, config)?;
            let result =
                service.recommend_for_user(UserId(user_id), limit.limit, algorithm.into())?;
            emit(&cli.format, &result, |_| print_result_text(&result))?;
        }
        Command::Popular { db, limit } => {
            let service = open_service(&db.db_path, config)?;
            let result = service.popular(limit.limit)?;
            emit(&cli.format, &result, |_| print_result_text(&result))?;
        }
        Command::Metrics { db, algorithm } => {
            let service = open_service(&db.db_path, config)?;
            let snapshot = service.metrics(algorithm.into())?;
            emit(&cli.format, &snapshot, |_| print_metrics_text(&snapshot))?;
        }
        Command::Product { db, product_id } => {
            let service = open_service(&db.db_path, config)?;
            let product = service.product(ProductId(product_id))?;
            emit(&cli.format, &product, |_| print_product_text(&product))?;
        }
        Command::Products { db, filter } => {
            let service = open_service(&db.db_path, config)?;
            let page = service.search_products(&filter.into())?;
            emit(&cli.format, &page, |_| print_page_text(&page))?;
        }
        Command::Categories { db } => {
            let service = open_service(&db.db_path, config)?;
            let categories = service.categories()?;
            emit(&cli.format, &categories, |_| print_categories_text(&categories))?;
        }
        Command::History { db, user_id, limit } => {
            let service = open_service(&db.db_path, config)?;
            let history = service.user_history(UserId(user_id), limit)?;
            emit(&cli.format, &history, |_| print_history_text(&history))?;
        }
        Command::Track {
            db,
            user_id,
            product_id,
            kind,
            rating,
        } => {
            let repo = open_repository(&db.db_path)?;
            let mut interaction = Interaction::new(
                UserId(user_id),
                ProductId(product_id),
                kind.parse::<InteractionKind>().unwrap_or_else(|never| match never {}),
                OffsetDateTime::now_utc(),
            );
            interaction.rating = rating;
            let id = repo.record_interaction(&interaction)?;
            let tracked = TrackedInteraction {
                id,
                user_id: interaction.user_id,
                product_id: interaction.product_id,
                interaction_type: interaction.kind.to_string(),
                rating: interaction.rating,
            };
            emit(&cli.format, &tracked, |_| {
                println!(
                    "Recorded interaction {} ({} of product {} by user {})",
                    tracked.id, tracked.interaction_type, tracked.product_id, tracked.user_id
                )
            })?;
        }
    }
    Ok(())
}

fn open_repository(path: &Path) -> Result<SqliteRepository, Box<dyn Error>> {
    if !path.exists() {
        return Err(format!("database {} does not exist", path.display()).into());
    }
    Ok(SqliteRepository::open(path)?)
}

fn open_service(path: &Path, config: RecommenderConfig) -> Result<RecommenderService, Box<dyn Error>> {
    let repo = open_repository(path)?;
    Ok(RecommenderService::new(Arc::new(repo), config)?)
}

fn emit<T, F>(format: &OutputFormat, value: &T, printer: F) -> Result<(), Box<dyn Error>>
where
    T: serde::Serialize,
    F: Fn(OutputFormat),
{
    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{json}");
        }
        OutputFormat::Text => printer(OutputFormat::Text),
    }
    Ok(())
}

fn print_result_text(result: &RecommendationResult) {
    let heading = match result.subject {
        Subject::User(user) => format!("Recommendations for user {user}"),
        Subject::Product(product) => format!("Similar to product {product}"),
        Subject::None => "Popular products".to_string(),
    };
    println!("{heading} ({}, {} items)", result.algorithm, result.count);
    for (rank, item) in result.items.iter().enumerate() {
        let score = item
            .score
            .map(|s| format!(" score={s:.4}"))
            .unwrap_or_default();
        let rating = item
            .rating
            .map(|r| format!(" rating={r:.1}"))
            .unwrap_or_default();
        println!(
            "  {:>2}. [{}] {} ({}) ${:.2}{}{}",
            rank + 1,
            item.product_id,
            item.title,
            item.category,
            item.price,
            rating,
            score
        );
    }
}

fn print_metrics_text(snapshot: &MetricsSnapshot) {
    println!("{snapshot}");
}

fn print_product_text(product: &Product) {
    println!("[{}] {}", product.id, product.title);
    println!("  category: {}", product.category);
    println!("  price: ${:.2}", product.price);
    match product.rating {
        Some(rating) => println!("  rating: {rating:.1} ({} reviews)", product.review_count),
        None => println!("  rating: unrated"),
    }
    if let Some(description) = &product.description {
        println!("  {description}");
    }
}

fn print_page_text(page: &ProductPage) {
    println!(
        "Products page {} ({} of {} matches)",
        page.page,
        page.products.len(),
        page.total
    );
    for product in &page.products {
        let rating = product
            .rating
            .map(|r| format!(" rating={r:.1}"))
            .unwrap_or_default();
        println!(
            "  [{}] {} ({}) ${:.2}{}",
            product.id, product.title, product.category, product.price, rating
        );
    }
}

fn print_categories_text(categories: &[CategoryCount]) {
    for row in categories {
        println!("  {:<24} {}", row.category, row.count);
    }
}

fn print_history_text(history: &InteractionHistory) {
    println!(
        "Interactions of user {} ({} items)",
        history.user_id, history.count
    );
    for row in &history.interactions {
        let rating = row.rating.map(|r| format!(" rating={r}")).unwrap_or_default();
        println!(
            "  {} {:<8} [{}] {} ({}){}",
            row.timestamp.date(),
            row.kind,
            row.product_id,
            row.product_title,
            row.product_category,
            rating
        );
    }
}
