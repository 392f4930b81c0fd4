//! Session ledger: the set of refresh-token rows a user currently holds.

use std::sync::Arc;

use uuid::Uuid;

use tally_database::RefreshTokenStore;
use tally_models::auth::{RefreshRecord, SignedRefresh};
use tally_models::error::AppResult;
use tally_observability::log_sessions_revoked;

use super::SERVICE_NAME;

#[derive(Clone)]
pub struct SessionLedger {
    store: Arc<dyn RefreshTokenStore>,
    max_sessions: usize,
}

impl SessionLedger {
    pub fn new(store: Arc<dyn RefreshTokenStore>, max_sessions: usize) -> Self {
        Self { store, max_sessions }
    }

    pub async fn count(&self, user_id: Uuid) -> AppResult<usize> {
        self.store.count_for_user(user_id).await
    }

    pub async fn add(&self, refresh: &SignedRefresh) -> AppResult<()> {
        self.store.insert(&RefreshRecord::from(refresh)).await
    }

    /// True only when the stored row for `jti` belongs to `user_id` and holds
    /// exactly `raw`.
    pub async fn exists(&self, jti: Uuid, user_id: Uuid, raw: &str) -> AppResult<bool> {
        self.store.exists(jti, user_id, raw).await
    }

    pub async fn delete(&self, jti: Uuid) -> AppResult<()> {
        self.store.delete(jti).await
    }

    pub async fn delete_all_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        self.store.delete_for_user(user_id).await
    }

    /// Drops every session of `user_id` once the count is strictly above the
    /// cap. Returns the count seen before any deletion.
    ///
    /// Count, wipe and the caller's following insert are separate store
    /// calls, so concurrent issuances for one user can briefly leave more
    /// than `max_sessions` rows.
    pub async fn enforce_cap(&self, user_id: Uuid) -> AppResult<usize> {
        let count = self.count(user_id).await?;

        if count > self.max_sessions {
            let revoked = self.delete_all_for_user(user_id).await?;
            log_sessions_revoked(SERVICE_NAME, user_id, revoked as usize, self.max_sessions);
        }

        Ok(count)
    }
}
