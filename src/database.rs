// src/database.rs
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::auth::password::hash_password;
use crate::config::Config;
use crate::error::AppError;
use crate::workflow::DEFAULT_WORKSPACE_ID;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
}

/// Runs migrations, then makes sure the workspace headers and a first user exist.
pub async fn initialize(pool: &PgPool, config: &Config) -> Result<(), AppError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| AppError::internal(format!("Migration failed: {e}")))?;

    let mut tx = pool.begin().await?;

    sqlx::query(
        "INSERT INTO adjustment_headers (id, description) VALUES ($1, 'Stock Adjustment')
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(DEFAULT_WORKSPACE_ID)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "INSERT INTO purchase_headers (id, description, status) VALUES ($1, 'Purchase Order', 'new')
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(DEFAULT_WORKSPACE_ID)
    .execute(&mut *tx)
    .await?;

    let has_users = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users)")
        .fetch_one(&mut *tx)
        .await?;
    if !has_users {
        let password_hash = hash_password(&config.seed_password)?;
        sqlx::query("INSERT INTO users (username, password_hash) VALUES ($1, $2)")
            .bind(&config.seed_username)
            .bind(password_hash)
            .execute(&mut *tx)
            .await?;
        tracing::info!(username = %config.seed_username, "Seeded initial user");
    }

    tx.commit().await?;
    Ok(())
}
