use async_trait::async_trait;
use sqlx::postgres::{PgExecutor, PgPool};
use sqlx::types::Json;
use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use tally_models::auth::User;
use tally_models::error::AppResult;
use tally_models::settings::{StoredSettings, UserSettings};

use super::{user_not_found, UserStore, UserTransaction};
use crate::models::UserRow;

const SELECT_BY_ID: &str =
    "SELECT uuid, email, name, hash, settings, created_at, updated_at FROM users WHERE uuid = $1";
const SELECT_BY_EMAIL: &str =
    "SELECT uuid, email, name, hash, settings, created_at, updated_at FROM users WHERE email = $1";
const UPDATE_SETTINGS: &str = r#"
    UPDATE users SET settings = $1, updated_at = NOW() WHERE uuid = $2
    RETURNING uuid, email, name, hash, settings, created_at, updated_at
"#;

async fn fetch_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> AppResult<User> {
    let row = sqlx::query_as::<_, UserRow>(SELECT_BY_ID)
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.ok_or_else(user_not_found)?.try_into()
}

async fn fetch_by_email<'e, E: PgExecutor<'e>>(executor: E, email: &str) -> AppResult<User> {
    let row = sqlx::query_as::<_, UserRow>(SELECT_BY_EMAIL)
        .bind(email)
        .fetch_optional(executor)
        .await?;

    row.ok_or_else(user_not_found)?.try_into()
}

async fn insert_user<'e, E: PgExecutor<'e>>(executor: E, user: &User) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO users (uuid, email, name, hash, settings, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.name)
    .bind(&user.password_hash)
    .bind(Json(StoredSettings::from(&user.settings)))
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(executor)
    .await?;

    Ok(())
}

async fn update_settings<'e, E: PgExecutor<'e>>(executor: E, id: Uuid, settings: &UserSettings) -> AppResult<User> {
    let row = sqlx::query_as::<_, UserRow>(UPDATE_SETTINGS)
        .bind(Json(StoredSettings::from(settings)))
        .bind(id)
        .fetch_optional(executor)
        .await?;

    row.ok_or_else(user_not_found)?.try_into()
}

/// Postgres-backed [`UserStore`].
#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<User> {
        fetch_by_id(&self.pool, id).await
    }

    async fn find_by_email(&self, email: &str) -> AppResult<User> {
        fetch_by_email(&self.pool, email).await
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        insert_user(&self.pool, user).await
    }

    async fn replace_settings(&self, id: Uuid, settings: &UserSettings) -> AppResult<User> {
        update_settings(&self.pool, id, settings).await
    }

    async fn begin(&self) -> AppResult<Box<dyn UserTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUserTransaction { tx }))
    }
}

/// An open Postgres transaction. Dropped without `commit`, it rolls back.
pub struct PgUserTransaction {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UserTransaction for PgUserTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> AppResult<User> {
        fetch_by_id(&mut *self.tx, id).await
    }

    async fn find_by_email(&mut self, email: &str) -> AppResult<User> {
        fetch_by_email(&mut *self.tx, email).await
    }

    async fn insert(&mut self, user: &User) -> AppResult<()> {
        insert_user(&mut *self.tx, user).await
    }

    async fn replace_settings(&mut self, id: Uuid, settings: &UserSettings) -> AppResult<User> {
        update_settings(&mut *self.tx, id, settings).await
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
