//! In-process store implementations used by tests and local runs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use tally_models::auth::{RefreshRecord, User};
use tally_models::error::{slugs, AppError, AppResult};
use tally_models::settings::UserSettings;

use super::{user_not_found, RefreshTokenStore, UserStore, UserTransaction};

fn injected_failure(what: &str) -> AppError {
    AppError::unknown(format!("{what} failed"), slugs::INTERNAL_SERVER_ERROR)
}

fn duplicate_email(email: &str) -> AppError {
    AppError::unknown(
        format!("duplicate key value violates unique constraint on email {email:?}"),
        slugs::INTERNAL_SERVER_ERROR,
    )
}

fn insert_unique(users: &mut HashMap<Uuid, User>, user: &User) -> AppResult<()> {
    if users.values().any(|u| u.email == user.email) || users.contains_key(&user.id) {
        return Err(duplicate_email(&user.email));
    }
    users.insert(user.id, user.clone());
    Ok(())
}

fn apply_settings(users: &mut HashMap<Uuid, User>, id: Uuid, settings: &UserSettings) -> AppResult<User> {
    let user = users.get_mut(&id).ok_or_else(user_not_found)?;
    user.settings = settings.clone();
    user.updated_at = Utc::now();
    Ok(user.clone())
}

#[derive(Default)]
struct UserState {
    users: RwLock<HashMap<Uuid, User>>,
    fail_inserts: AtomicBool,
}

/// [`UserStore`] over a shared map. Email uniqueness is enforced on insert
/// and again when a transaction commits.
#[derive(Clone, Default)]
pub struct InMemoryUserStore {
    state: Arc<UserState>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent insert fail with a store error.
    pub fn set_failing_inserts(&self, failing: bool) {
        self.state.fail_inserts.store(failing, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.state.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> AppResult<User> {
        self.state.users.read().await.get(&id).cloned().ok_or_else(user_not_found)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<User> {
        let users = self.state.users.read().await;
        users.values().find(|u| u.email == email).cloned().ok_or_else(user_not_found)
    }

    async fn insert(&self, user: &User) -> AppResult<()> {
        if self.state.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected_failure("insert"));
        }
        insert_unique(&mut *self.state.users.write().await, user)
    }

    async fn replace_settings(&self, id: Uuid, settings: &UserSettings) -> AppResult<User> {
        apply_settings(&mut *self.state.users.write().await, id, settings)
    }

    async fn begin(&self) -> AppResult<Box<dyn UserTransaction>> {
        let snapshot = self.state.users.read().await.clone();
        Ok(Box::new(InMemoryUserTransaction {
            state: Arc::clone(&self.state),
            working: snapshot,
            staged: Vec::new(),
        }))
    }
}

enum StagedWrite {
    Insert(User),
    Settings(Uuid, UserSettings),
}

/// Reads see the snapshot taken at `begin` plus this transaction's own
/// writes. Writes reach the shared map only on `commit`.
pub struct InMemoryUserTransaction {
    state: Arc<UserState>,
    working: HashMap<Uuid, User>,
    staged: Vec<StagedWrite>,
}

#[async_trait]
impl UserTransaction for InMemoryUserTransaction {
    async fn find_by_id(&mut self, id: Uuid) -> AppResult<User> {
        self.working.get(&id).cloned().ok_or_else(user_not_found)
    }

    async fn find_by_email(&mut self, email: &str) -> AppResult<User> {
        self.working.values().find(|u| u.email == email).cloned().ok_or_else(user_not_found)
    }

    async fn insert(&mut self, user: &User) -> AppResult<()> {
        if self.state.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected_failure("insert"));
        }
        insert_unique(&mut self.working, user)?;
        self.staged.push(StagedWrite::Insert(user.clone()));
        Ok(())
    }

    async fn replace_settings(&mut self, id: Uuid, settings: &UserSettings) -> AppResult<User> {
        let user = apply_settings(&mut self.working, id, settings)?;
        self.staged.push(StagedWrite::Settings(id, settings.clone()));
        Ok(user)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let mut users = self.state.users.write().await;
        let mut next = users.clone();

        for write in &self.staged {
            match write {
                StagedWrite::Insert(user) => insert_unique(&mut next, user)?,
                StagedWrite::Settings(id, settings) => {
                    apply_settings(&mut next, *id, settings)?;
                }
            }
        }

        *users = next;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}

/// [`RefreshTokenStore`] over a shared map keyed by token id.
#[derive(Clone, Default)]
pub struct InMemoryRefreshTokenStore {
    rows: Arc<RwLock<HashMap<Uuid, RefreshRecord>>>,
    fail_inserts: Arc<AtomicBool>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing_inserts(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }

    /// Stored rows for `user_id`, oldest first.
    pub async fn records_for_user(&self, user_id: Uuid) -> Vec<RefreshRecord> {
        let mut records: Vec<_> = self
            .rows
            .read()
            .await
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.created_at);
        records
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, record: &RefreshRecord) -> AppResult<()> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(injected_failure("refresh token insert"));
        }

        let mut rows = self.rows.write().await;
        if rows.contains_key(&record.id) {
            return Err(AppError::unknown("duplicate refresh token id", slugs::INTERNAL_SERVER_ERROR));
        }
        rows.insert(record.id, record.clone());
        Ok(())
    }

    async fn exists(&self, id: Uuid, user_id: Uuid, token: &str) -> AppResult<bool> {
        let rows = self.rows.read().await;
        Ok(rows
            .get(&id)
            .is_some_and(|r| r.user_id == user_id && r.token == token))
    }

    async fn delete(&self, id: Uuid) -> AppResult<()> {
        self.rows.write().await.remove(&id);
        Ok(())
    }

    async fn delete_for_user(&self, user_id: Uuid) -> AppResult<u64> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, r| r.user_id != user_id);
        Ok((before - rows.len()) as u64)
    }

    async fn count_for_user(&self, user_id: Uuid) -> AppResult<usize> {
        Ok(self.rows.read().await.values().filter(|r| r.user_id == user_id).count())
    }
}
