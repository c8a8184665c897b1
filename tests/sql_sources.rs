//! Tables loaded through the SQL loader behave like any other source.

use pretty_assertions::assert_eq;
use serde_json::json;
use varql::prelude::*;

async fn seeded_loader() -> SqlLoader {
    let loader = SqlLoader::connect("sqlite::memory:").await.unwrap();
    for sql in [
        "CREATE TABLE movies (title TEXT, status TEXT, rating REAL, year INTEGER)",
        "INSERT INTO movies VALUES ('Movie 1', 'active', 4.5, 2023)",
        "INSERT INTO movies VALUES ('Movie 2', 'canceled', 3.8, 2022)",
        "INSERT INTO movies VALUES ('Movie 3', 'active', 4.2, 2023)",
    ] {
        sqlx::query(sql).execute(loader.pool()).await.unwrap();
    }
    loader
}

#[tokio::test]
async fn load_tables_and_query() {
    let loader = seeded_loader().await;
    let db = loader.load_tables(&["movies".to_string()]).await.unwrap();
    let ctx = Context::builder().source("db", db).build();

    let result = ctx
        .query("SELECT title FROM db.movies WHERE status == active AND year == 2023")
        .unwrap();
    assert_eq!(
        result.to_json(),
        json!([{"title": "Movie 1"}, {"title": "Movie 3"}])
    );

    let result = ctx.query("SELECT title FROM db.movies WHERE rating < 4.0").unwrap();
    assert_eq!(result.to_json(), json!([{"title": "Movie 2"}]));
}

#[tokio::test]
async fn invalid_table_name_is_rejected() {
    let loader = seeded_loader().await;
    assert!(matches!(
        loader.load_table("movies; DROP TABLE movies").await,
        Err(VarqlError::Database(_))
    ));
}

#[tokio::test]
async fn load_query_returns_rows() {
    let loader = seeded_loader().await;
    let rows = loader
        .load_query("SELECT COUNT(*) AS n FROM movies")
        .await
        .unwrap();
    assert_eq!(rows.to_json(), json!([{"n": 3}]));
}

#[tokio::test]
async fn computed_and_null_columns_keep_their_values() {
    let loader = seeded_loader().await;
    let rows = loader
        .load_query("SELECT COUNT(*) AS n, MAX(rating) AS best, NULL AS missing, 'x' AS tag FROM movies")
        .await
        .unwrap();
    assert_eq!(
        rows.to_json(),
        json!([{"n": 3, "best": 4.5, "missing": null, "tag": "x"}])
    );
}
