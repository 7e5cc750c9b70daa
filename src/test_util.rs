//! Shared fixtures for the inline service tests.

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;

use crate::database::{DbPool, MIGRATOR};

/// In-memory SQLite pool with the full schema applied. A single
/// connection keeps every handle on the same in-memory database.
pub async fn test_pool() -> DbPool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

/// Pool backed by a named shared-cache in-memory database, sized for two
/// connections so transactions can genuinely race. `name` must be unique
/// per test.
pub async fn shared_test_pool(name: &str) -> DbPool {
    let pool = SqlitePoolOptions::new()
        .min_connections(2)
        .max_connections(2)
        .connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .unwrap();
    MIGRATOR.run(&pool).await.unwrap();
    pool
}

/// A non-zero starting balance gets a paired ledger row, keeping the
/// sum-of-amounts == credits invariant true in fixture state.
pub async fn insert_user(pool: &DbPool, username: &str, credits: i64) -> i64 {
    let id = sqlx::query(
        "INSERT INTO users (username, email, credits, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(username)
    .bind(format!("{username}@test.dev"))
    .bind(credits)
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid();
    if credits != 0 {
        sqlx::query(
            r#"
            INSERT INTO credit_transactions
                (user_id, transaction_type, amount, description, balance, created_at)
            VALUES (?, 'admin_add', ?, 'seed balance', ?, ?)
            "#,
        )
        .bind(id)
        .bind(credits)
        .bind(credits)
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap();
    }
    id
}

pub async fn insert_post(pool: &DbPool, owner_id: i64) -> i64 {
    sqlx::query("INSERT INTO posts (user_id, description, created_at) VALUES (?, ?, ?)")
        .bind(owner_id)
        .bind("test post")
        .bind(Utc::now())
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
}

pub async fn insert_paid_post(pool: &DbPool, post_id: i64, price: i64) -> i64 {
    sqlx::query(
        r#"
        INSERT INTO paid_posts (post_id, price_credits, description, is_active, created_at)
        VALUES (?, ?, ?, 1, ?)
        "#,
    )
    .bind(post_id)
    .bind(price)
    .bind("exclusive content")
    .bind(Utc::now())
    .execute(pool)
    .await
    .unwrap()
    .last_insert_rowid()
}

pub async fn user_credits(pool: &DbPool, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT credits FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn ledger_sum(pool: &DbPool, user_id: i64) -> i64 {
    let sum: Option<i64> =
        sqlx::query_scalar("SELECT SUM(amount) FROM credit_transactions WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .unwrap();
    sum.unwrap_or(0)
}

pub async fn ledger_count(pool: &DbPool, user_id: i64) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM credit_transactions WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await
        .unwrap()
}
