use async_trait::async_trait;
use sqlx::postgres::PgPool;
use uuid::Uuid;

use tally_models::auth::RefreshRecord;
use tally_models::error::AppResult;

use super::RefreshTokenStore;

/// Postgres-backed [`RefreshTokenStore`]. Every statement is a single-row or
/// single-owner operation; nothing here spans more than one statement.
#[derive(Clone)]
pub struct PgRefreshTokenStore {
    pool: PgPool,
}

impl PgRefreshTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RefreshTokenStore for PgRefreshTokenStore {
    async fn insert(&self, record: &RefreshRecord) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (uuid, user_uuid, token, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.id)
        .bind(record.user_id)
        .bind(&record.token)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn exists(&self, id: Uuid, user_id: Uuid, token: &str) -> AppResult<bool> {
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM refresh_tokens
                WHERE uuid = $1 AND user_uuid = $2 AND token = $3
            )
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(token)
        .fetch_one(&self.pool)
        .await?;

        Ok(found)
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE uuid = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_uuid = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM refresh_tokens WHERE user_uuid = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count as usize)
    }
}
