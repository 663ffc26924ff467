#![allow(missing_docs)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use hybridrec::{repository::SqliteRepository, Interaction, InteractionKind, Product, ProductId, UserId};
use serde_json::Value;
use tempfile::TempDir;
use time::macros::datetime;

fn setup_db(name: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join(format!("{name}.db"));
    let repo = SqliteRepository::open(&path).expect("open db");
    repo.import(
        &[
            Product::new(ProductId(1), "Espresso Beans", "Coffee", 18.0)
                .with_description("dark roast espresso beans")
                .with_rating(4.5, 40),
            Product::new(ProductId(2), "Filter Coffee Beans", "Coffee", 15.0)
                .with_description("light roast beans for filter coffee"),
            Product::new(ProductId(3), "Milk Frother", "Appliances", 45.0),
        ],
        &[
            Interaction::new(UserId(1), ProductId(1), InteractionKind::Purchase, datetime!(2024-08-01 7:00 UTC)),
            Interaction::new(UserId(2), ProductId(1), InteractionKind::Purchase, datetime!(2024-08-01 8:00 UTC)),
            Interaction::new(UserId(2), ProductId(3), InteractionKind::View, datetime!(2024-08-02 8:00 UTC)),
        ],
    )
    .expect("seed catalog");
    (dir, path)
}

#[test]
fn popular_emits_json() {
    let (_dir, db_path) = setup_db("popular");
    let output = cargo_bin_cmd!("hybridrec")
        .args(["--format", "json", "popular"])
        .arg(&db_path)
        .args(["--limit", "2"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["algorithm"], "popularity_based");
    assert_eq!(json["count"], 2);
    assert_eq!(json["items"][0]["product_id"], 1);
    assert!(json["items"][0]["score"].is_null());
}

#[test]
fn similar_emits_ranked_items() {
    let (_dir, db_path) = setup_db("similar");
    let output = cargo_bin_cmd!("hybridrec")
        .args(["--format", "json", "similar"])
        .arg(&db_path)
        .arg("1")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["algorithm"], "content_based");
    assert_eq!(json["subject"]["product"], 1);
    assert_eq!(json["items"][0]["product_id"], 2);
    assert!(json["items"][0]["score"].as_f64().unwrap() > 0.1);
}

#[test]
fn for_user_text_output() {
    let (_dir, db_path) = setup_db("for_user");
    let output = cargo_bin_cmd!("hybridrec")
        .arg("for-user")
        .arg(&db_path)
        .args(["1", "--algorithm", "collaborative"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.starts_with("Recommendations for user 1 (collaborative_filtering, 1 items)"));
    assert!(text.contains("[3] Milk Frother"));
}

#[test]
fn metrics_reports_vocabulary() {
    let (_dir, db_path) = setup_db("metrics");
    let output = cargo_bin_cmd!("hybridrec")
        .args(["--format", "json", "metrics"])
        .arg(&db_path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["algorithm"], "content_based");
    assert_eq!(json["total_products"], 3);
    assert!(json["vocabulary_size"].as_u64().unwrap() > 0);
}

#[test]
fn unknown_product_exits_with_two() {
    let (_dir, db_path) = setup_db("missing");
    cargo_bin_cmd!("hybridrec")
        .arg("similar")
        .arg(&db_path)
        .arg("99")
        .assert()
        .code(2);
}

#[test]
fn bad_limit_and_missing_db_exit_with_one() {
    let (dir, db_path) = setup_db("limits");
    cargo_bin_cmd!("hybridrec")
        .arg("popular")
        .arg(&db_path)
        .args(["--limit", "0"])
        .assert()
        .code(1);
    cargo_bin_cmd!("hybridrec")
        .arg("popular")
        .arg(dir.path().join("absent.db"))
        .assert()
        .code(1);
}

#[test]
fn config_file_overrides_limits() {
    let (dir, db_path) = setup_db("config");
    let config = dir.path().join("rec.toml");
    std::fs::write(&config, "max_limit = 1\n").expect("write config");
    cargo_bin_cmd!("hybridrec")
        .arg("--config")
        .arg(&config)
        .arg("popular")
        .arg(&db_path)
        .args(["--limit", "2"])
        .assert()
        .code(1);
}

#[test]
fn products_filter_and_page() {
    let (_dir, db_path) = setup_db("products");
    let output = cargo_bin_cmd!("hybridrec")
        .args(["--format", "json", "products"])
        .arg(&db_path)
        .args(["--category", "Coffee", "--page-size", "1"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["total"], 2);
    assert_eq!(json["page_size"], 1);
    assert_eq!(json["products"].as_array().unwrap().len(), 1);
    assert_eq!(json["products"][0]["id"], 1);

    cargo_bin_cmd!("hybridrec")
        .arg("products")
        .arg(&db_path)
        .args(["--page", "0"])
        .assert()
        .code(1);
}

#[test]
fn categories_and_product_lookup() {
    let (_dir, db_path) = setup_db("categories");
    let output = cargo_bin_cmd!("hybridrec")
        .args(["--format", "json", "categories"])
        .arg(&db_path)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json[0]["category"], "Coffee");
    assert_eq!(json[0]["count"], 2);
    assert_eq!(json[1]["category"], "Appliances");

    let output = cargo_bin_cmd!("hybridrec")
        .arg("product")
        .arg(&db_path)
        .arg("3")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.starts_with("[3] Milk Frother"));
    assert!(text.contains("rating: unrated"));

    cargo_bin_cmd!("hybridrec")
        .arg("product")
        .arg(&db_path)
        .arg("99")
        .assert()
        .code(2);
}

#[test]
fn track_validates_and_shows_in_history() {
    let (_dir, db_path) = setup_db("track");
    let output = cargo_bin_cmd!("hybridrec")
        .args(["--format", "json", "track"])
        .arg(&db_path)
        .args(["3", "2", "rating", "--rating", "5"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["id"], 4);
    assert_eq!(json["interaction_type"], "rating");

    for args in [["3", "2", "share"], ["3", "2", "rating"]] {
        cargo_bin_cmd!("hybridrec")
            .arg("track")
            .arg(&db_path)
            .args(args)
            .assert()
            .code(1);
    }
    cargo_bin_cmd!("hybridrec")
        .arg("track")
        .arg(&db_path)
        .args(["3", "2", "rating", "--rating", "6"])
        .assert()
        .code(1);

    let output = cargo_bin_cmd!("hybridrec")
        .args(["--format", "json", "history"])
        .arg(&db_path)
        .arg("3")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(json["count"], 1);
    assert_eq!(json["interactions"][0]["interaction_type"], "rating");
    assert_eq!(json["interactions"][0]["rating"], 5);
    assert_eq!(json["interactions"][0]["product_title"], "Filter Coffee Beans");
}
