//! Shared fixtures for database tests.
//!
//! Tests run against `DATABASE_URL` (a `.env` file is honored). When it is
//! unset each test prints a notice and returns early.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use pgguard::{Db, GuardConfig, Record};

#[derive(Debug, Default, Clone, Record)]
pub struct TableForTest {
    #[orm(column = "id")]
    pub id: uuid::Uuid,
    #[orm(column = "uid")]
    pub uid: String,
    #[orm(column = "name")]
    pub name: Option<String>,
    #[orm(column = "is_active")]
    pub is_active: bool,
    #[orm(column = "created_at")]
    pub created_at: DateTime<Utc>,
    #[orm(column = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, Record)]
pub struct DeferredForTest {
    #[orm(column = "id")]
    pub id: uuid::Uuid,
    #[orm(column = "uid")]
    pub uid: String,
    #[orm(column = "created_at")]
    pub created_at: DateTime<Utc>,
    #[orm(column = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

const SCHEMA: &str = r#"
SELECT pg_advisory_lock(72210417);
CREATE TABLE IF NOT EXISTS "table_for_tests" (
    "id" uuid NOT NULL DEFAULT gen_random_uuid(),
    "uid" VARCHAR(500) NOT NULL,
    "name" text,
    "is_active" bool NOT NULL DEFAULT true,
    "created_at" timestamptz NOT NULL DEFAULT now(),
    "updated_at" timestamptz NOT NULL DEFAULT now(),
    PRIMARY KEY ("id"),
    CONSTRAINT "uniq__table_for_tests__uid" UNIQUE ("uid")
);
CREATE TABLE IF NOT EXISTS "deferred_for_tests" (
    "id" uuid NOT NULL DEFAULT gen_random_uuid(),
    "uid" VARCHAR(500) NOT NULL,
    "created_at" timestamptz NOT NULL DEFAULT now(),
    "updated_at" timestamptz NOT NULL DEFAULT now(),
    PRIMARY KEY ("id"),
    CONSTRAINT "uniq__deferred_for_tests__uid" UNIQUE ("uid") DEFERRABLE INITIALLY DEFERRED
);
SELECT pg_advisory_unlock(72210417);
"#;

/// Connect in debug mode, creating the test tables if needed.
pub async fn try_db() -> Option<Db> {
    try_db_with(GuardConfig::new().with_sql_logging()).await
}

pub async fn try_db_with(config: GuardConfig) -> Option<Db> {
    let _ = dotenvy::dotenv();
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping database test");
        return None;
    };
    let db = Db::connect(&database_url, config).expect("invalid DATABASE_URL");
    let client = db
        .pool()
        .get()
        .await
        .expect("Failed to connect to DATABASE_URL");
    client
        .batch_execute(SCHEMA)
        .await
        .expect("Failed to create test tables");
    Some(db)
}

/// A uid no other test uses.
pub fn unique_uid(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// Insert a row through the unguarded driver path.
pub async fn seed(db: &Db, uid: &str, name: &str) {
    let client = db.pool().get().await.expect("pool");
    client
        .execute(
            "INSERT INTO table_for_tests (name, uid) VALUES ($1, $2)",
            &[&name, &uid],
        )
        .await
        .expect("seed insert");
}
