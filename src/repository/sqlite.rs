use std::path::Path;

use parking_lot::Mutex;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use time::OffsetDateTime;
use tracing::debug;

use super::InteractionRepository;
use crate::model::{
    CategoryCount, Interaction, InteractionKind, PopularProduct, Product, ProductPage, ProductQuery,
    UserInteraction,
};
use crate::types::{ProductId, Result, UserId};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS products (
        id INTEGER PRIMARY KEY,
        title TEXT NOT NULL,
        category TEXT NOT NULL,
        price REAL NOT NULL,
        description TEXT,
        image_url TEXT,
        rating REAL,
        review_count INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS interactions (
        id INTEGER PRIMARY KEY,
        user_id INTEGER NOT NULL,
        product_id INTEGER NOT NULL,
        interaction_type TEXT NOT NULL,
        rating INTEGER,
        timestamp INTEGER NOT NULL,
        FOREIGN KEY (user_id) REFERENCES users (id) ON DELETE CASCADE,
        FOREIGN KEY (product_id) REFERENCES products (id) ON DELETE CASCADE
    )",
    "CREATE INDEX IF NOT EXISTS idx_products_category ON products (category)",
    "CREATE INDEX IF NOT EXISTS idx_interactions_user ON interactions (user_id)",
    "CREATE INDEX IF NOT EXISTS idx_interactions_product ON interactions (product_id)",
];

const PRODUCT_COLUMNS: &str =
    "p.id, p.title, p.category, p.price, p.description, p.image_url, p.rating, p.review_count";

/// Repository over a SQLite database holding `products`, `users` and
/// `interactions` tables.
pub struct SqliteRepository {
    conn: Mutex<Connection>,
}

impl SqliteRepository {
    /// Opens (creating if needed) a database file and ensures the schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        for ddl in SCHEMA {
            conn.execute(ddl, [])?;
        }
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Inserts or replaces a product row.
    pub fn insert_product(&self, product: &Product) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR REPLACE INTO products
                (id, title, category, price, description, image_url, rating, review_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                product.id.0,
                product.title,
                product.category,
                product.price,
                product.description,
                product.image_url,
                product.rating,
                product.review_count
            ],
        )?;
        Ok(())
    }

    /// Registers a user; an existing id is left untouched.
    pub fn insert_user(&self, user_id: UserId, username: &str) -> Result<()> {
        self.conn.lock().execute(
            "INSERT OR IGNORE INTO users (id, username) VALUES (?1, ?2)",
            params![user_id.0, username],
        )?;
        Ok(())
    }

    /// Validates and appends an interaction, returning its row id. Unknown
    /// users are registered with a generated username.
    pub fn record_interaction(&self, interaction: &Interaction) -> Result<i64> {
        interaction.validate()?;
        let conn = self.conn.lock();
        insert_interaction(&conn, interaction)?;
        Ok(conn.last_insert_rowid())
    }

    /// Loads a catalog and interaction log in one transaction.
    ///
    /// Every interaction is validated first; one invalid row rejects the
    /// whole batch.
    pub fn import(&self, products: &[Product], interactions: &[Interaction]) -> Result<()> {
        for interaction in interactions {
            interaction.validate()?;
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        for product in products {
            tx.execute(
                "INSERT OR REPLACE INTO products
                    (id, title, category, price, description, image_url, rating, review_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    product.id.0,
                    product.title,
                    product.category,
                    product.price,
                    product.description,
                    product.image_url,
                    product.rating,
                    product.review_count
                ],
            )?;
        }
        for interaction in interactions {
            insert_interaction(&tx, interaction)?;
        }
        tx.commit()?;
        debug!(
            products = products.len(),
            interactions = interactions.len(),
            "sqlite.import.committed"
        );
        Ok(())
    }
}

fn insert_interaction(conn: &Connection, interaction: &Interaction) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO users (id, username) VALUES (?1, 'user_' || ?1)",
        params![interaction.user_id.0],
    )?;
    conn.execute(
        "INSERT INTO interactions (user_id, product_id, interaction_type, rating, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            interaction.user_id.0,
            interaction.product_id.0,
            interaction.kind.as_str(),
            interaction.rating,
            interaction.timestamp.unix_timestamp()
        ],
    )?;
    Ok(())
}

fn timestamp_from_column(idx: usize, secs: i64) -> rusqlite::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp(secs)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Integer, Box::new(err)))
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<Product> {
    Ok(Product {
        id: ProductId(row.get(0)?),
        title: row.get(1)?,
        category: row.get(2)?,
        price: row.get(3)?,
        description: row.get(4)?,
        image_url: row.get(5)?,
        rating: row.get(6)?,
        review_count: row.get(7)?,
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn listing_filter(query: &ProductQuery) -> (String, Vec<Value>) {
    let mut conditions = Vec::new();
    let mut values = Vec::new();
    if let Some(category) = &query.category {
        conditions.push("p.category = ?");
        values.push(Value::Text(category.clone()));
    }
    if let Some(search) = &query.search {
        conditions.push("p.title LIKE ? ESCAPE '\\'");
        values.push(Value::Text(format!("%{}%", escape_like(search))));
    }
    if let Some(min) = query.min_price {
        conditions.push("p.price >= ?");
        values.push(Value::Real(min));
    }
    if let Some(max) = query.max_price {
        conditions.push("p.price <= ?");
        values.push(Value::Real(max));
    }
    if let Some(min) = query.min_rating {
        conditions.push("p.rating >= ?");
        values.push(Value::Real(min));
    }
    let clause = if conditions.is_empty() {
        "1 = 1".to_string()
    } else {
        conditions.join(" AND ")
    };
    (clause, values)
}

impl InteractionRepository for SqliteRepository {
    fn list_interactions(&self) -> Result<Vec<Interaction>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT user_id, product_id, interaction_type, rating, timestamp
             FROM interactions ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            let kind: String = row.get(2)?;
            Ok(Interaction {
                user_id: UserId(row.get(0)?),
                product_id: ProductId(row.get(1)?),
                kind: kind.parse::<InteractionKind>().unwrap_or_else(|never| match never {}),
                rating: row.get(3)?,
                timestamp: timestamp_from_column(4, row.get(4)?)?,
            })
        })?;
        let mut interactions = Vec::new();
        for interaction in rows {
            interactions.push(interaction?);
        }
        Ok(interactions)
    }

    fn list_products(&self) -> Result<Vec<Product>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("SELECT {PRODUCT_COLUMNS} FROM products p ORDER BY p.id"))?;
        let rows = stmt.query_map([], product_from_row)?;
        let mut products = Vec::new();
        for product in rows {
            products.push(product?);
        }
        Ok(products)
    }

    fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(",");
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id IN ({placeholders}) ORDER BY p.id"
        ))?;
        let rows = stmt.query_map(params_from_iter(ids.iter().map(|id| id.0)), product_from_row)?;
        let mut products = Vec::new();
        for product in rows {
            products.push(product?);
        }
        Ok(products)
    }

    fn list_recent_products_for_user(&self, user_id: UserId, limit: usize) -> Result<Vec<Product>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS}, MAX(i.timestamp) AS last_seen
             FROM interactions i
             JOIN products p ON p.id = i.product_id
             WHERE i.user_id = ?1
             GROUP BY p.id
             ORDER BY last_seen DESC, p.id ASC
             LIMIT ?2"
        ))?;
        let rows = stmt.query_map(params![user_id.0, sql_limit(limit)], product_from_row)?;
        let mut products = Vec::new();
        for product in rows {
            products.push(product?);
        }
        Ok(products)
    }

    fn popularity_rank(&self, limit: usize) -> Result<Vec<PopularProduct>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT p.id, p.title, p.category, p.price, p.rating, p.image_url,
                    COUNT(i.id) AS interaction_count
             FROM products p
             LEFT JOIN interactions i ON p.id = i.product_id
             GROUP BY p.id
             ORDER BY interaction_count DESC, p.rating IS NULL, p.rating DESC, p.id ASC
             LIMIT ?1",
        )?;
        let rows = stmt.query_map([sql_limit(limit)], |row| {
            let count: i64 = row.get(6)?;
            Ok(PopularProduct {
                product_id: ProductId(row.get(0)?),
                title: row.get(1)?,
                category: row.get(2)?,
                price: row.get(3)?,
                rating: row.get(4)?,
                image_url: row.get(5)?,
                interaction_count: u64::try_from(count).unwrap_or(0),
            })
        })?;
        let mut popular = Vec::new();
        for row in rows {
            popular.push(row?);
        }
        Ok(popular)
    }

    fn get_product(&self, product_id: ProductId) -> Result<Option<Product>> {
        let conn = self.conn.lock();
        let product = conn
            .query_row(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products p WHERE p.id = ?1"),
                [product_id.0],
                product_from_row,
            )
            .optional()?;
        Ok(product)
    }

    fn search_products(&self, query: &ProductQuery) -> Result<ProductPage> {
        let (clause, mut values) = listing_filter(query);
        let conn = self.conn.lock();
        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM products p WHERE {clause}"),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;
        values.push(Value::Integer(sql_limit(query.page_size)));
        values.push(Value::Integer(sql_limit(query.offset())));
        let mut stmt = conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products p
             WHERE {clause}
             ORDER BY p.rating IS NULL, p.rating DESC, p.review_count DESC, p.id ASC
             LIMIT ? OFFSET ?"
        ))?;
        let rows = stmt.query_map(params_from_iter(values.iter()), product_from_row)?;
        let mut products = Vec::new();
        for product in rows {
            products.push(product?);
        }
        Ok(ProductPage {
            products,
            total: usize::try_from(total).unwrap_or(0),
            page: query.page,
            page_size: query.page_size,
        })
    }

    fn category_counts(&self) -> Result<Vec<CategoryCount>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT category, COUNT(*) AS count
             FROM products
             GROUP BY category
             ORDER BY count DESC, category ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            let count: i64 = row.get(1)?;
            Ok(CategoryCount {
                category: row.get(0)?,
                count: u64::try_from(count).unwrap_or(0),
            })
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    fn list_user_interactions(&self, user_id: UserId, limit: usize) -> Result<Vec<UserInteraction>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT i.user_id, i.product_id, i.interaction_type, i.rating, i.timestamp,
                    p.title, p.category, p.price
             FROM interactions i
             JOIN products p ON p.id = i.product_id
             WHERE i.user_id = ?1
             ORDER BY i.timestamp DESC, i.id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![user_id.0, sql_limit(limit)], |row| {
            let kind: String = row.get(2)?;
            Ok(UserInteraction {
                user_id: UserId(row.get(0)?),
                product_id: ProductId(row.get(1)?),
                kind: kind.parse::<InteractionKind>().unwrap_or_else(|never| match never {}),
                rating: row.get(3)?,
                timestamp: timestamp_from_column(4, row.get(4)?)?,
                product_title: row.get(5)?,
                product_category: row.get(6)?,
                product_price: row.get(7)?,
            })
        })?;
        let mut history = Vec::new();
        for row in rows {
            history.push(row?);
        }
        Ok(history)
    }
}
