//! Credential store contract and its implementations.
//!
//! "No rows" is turned into `AppError::NotFound` here and nowhere else; every
//! other store failure reaches the caller unchanged.

pub mod memory;
pub mod refresh_token;
pub mod user;

pub use memory::{InMemoryRefreshTokenStore, InMemoryUserStore};
pub use refresh_token::PgRefreshTokenStore;
pub use user::PgUserStore;

use async_trait::async_trait;
use futures::future::BoxFuture;
use uuid::Uuid;

use tally_models::auth::{RefreshRecord, User};
use tally_models::error::{slugs, AppError, AppResult};
use tally_models::settings::UserSettings;

pub(crate) fn user_not_found() -> AppError {
    AppError::not_found("User not found", slugs::USER_NOT_FOUND)
}

/// User reads and writes bound to one open transaction.
#[async_trait]
pub trait UserTransaction: Send {
    async fn find_by_id(&mut self, id: Uuid) -> AppResult<User>;

    async fn find_by_email(&mut self, email: &str) -> AppResult<User>;

    async fn insert(&mut self, user: &User) -> AppResult<()>;

    async fn replace_settings(&mut self, id: Uuid, settings: &UserSettings) -> AppResult<User>;

    async fn commit(self: Box<Self>) -> AppResult<()>;

    async fn rollback(self: Box<Self>) -> AppResult<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<User>;

    async fn find_by_email(&self, email: &str) -> AppResult<User>;

    /// Fails with a store error if the email is already taken.
    async fn insert(&self, user: &User) -> AppResult<()>;

    /// Replaces the whole settings document and returns the updated user.
    async fn replace_settings(&self, id: Uuid, settings: &UserSettings) -> AppResult<User>;

    async fn begin(&self) -> AppResult<Box<dyn UserTransaction>>;
}

/// Runs `work` inside a transaction on `store`.
///
/// Commits when `work` returns `Ok` and rolls back when it returns `Err`.
/// Dropping the returned future before it completes drops the open
/// transaction, which rolls it back as well.
///
/// ```ignore
/// let user = transactional(store, |tx| Box::pin(async move {
///     tx.insert(&user).await?;
///     Ok(user)
/// })).await?;
/// ```
pub async fn transactional<T, F>(store: &dyn UserStore, work: F) -> AppResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn UserTransaction) -> BoxFuture<'t, AppResult<T>> + Send,
{
    let mut tx = store.begin().await?;

    match work(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                tracing::warn!(error = %rollback_err, "Rollback failed after transactional error");
            }
            Err(err)
        }
    }
}

#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, record: &RefreshRecord) -> AppResult<()>;

    /// True only when a row matches token id, owner and raw token exactly.
    async fn exists(&self, id: Uuid, user_id: Uuid, token: &str) -> AppResult<bool>;

    async fn delete(&self, id: Uuid) -> AppResult<()>;

    /// Returns the number of rows removed.
    async fn delete_for_user(&self, user_id: Uuid) -> AppResult<u64>;

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<usize>;
}
