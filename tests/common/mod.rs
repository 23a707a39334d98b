//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use keystone::server::database::Database;
use sqlx::sqlite::SqlitePoolOptions;

/// Fresh in-memory database with the schema applied.
///
/// A single pooled connection keeps every statement on the same in-memory
/// database.
pub async fn test_db() -> Arc<Database> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    let db = Database::SQLite(pool);
    db.migrate().await.expect("failed to create schema");
    Arc::new(db)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

/// Run a raw statement against the test database, e.g. to drop a table and
/// simulate a storage failure.
pub async fn execute(db: &Database, sql: &str) {
    match db {
        Database::SQLite(pool) => {
            sqlx::query(sql)
                .execute(pool)
                .await
                .expect("failed to execute statement");
        }
        #[allow(unreachable_patterns)]
        _ => panic!("test helpers only support SQLite"),
    }
}
