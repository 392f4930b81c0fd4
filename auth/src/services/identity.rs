//! Maps a verified Google identity onto a local account.

use std::sync::Arc;

use tally_database::UserStore;
use tally_models::auth::{GoogleIdentity, User};
use tally_models::error::{slugs, AppError, AppResult};
use tally_models::settings::UserSettings;

use super::security::{generate_throwaway_password, hash_password};

/// Outcome of reconciling one identity.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub user: User,
    pub created: bool,
}

#[derive(Clone)]
pub struct IdentityReconciler {
    users: Arc<dyn UserStore>,
}

impl IdentityReconciler {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// An existing account only has its profile picture replaced; currency
    /// and first day of week stay as they are. Otherwise a new account is
    /// created with a random password nobody knows.
    pub async fn reconcile(&self, identity: GoogleIdentity) -> AppResult<Reconciled> {
        match self.users.find_by_email(&identity.email).await {
            Ok(existing) => {
                let settings = existing.settings.with_profile_picture(identity.picture);
                let user = self.users.replace_settings(existing.id, &settings).await?;
                Ok(Reconciled { user, created: false })
            }
            Err(e) if e.is_not_found() => {
                let user = self.create(identity).await?;
                Ok(Reconciled { user, created: true })
            }
            Err(e) => Err(e),
        }
    }

    async fn create(&self, identity: GoogleIdentity) -> AppResult<User> {
        let password_hash = hash_password(generate_throwaway_password()).await?;
        let settings = UserSettings::default().with_profile_picture(identity.picture);
        let user = User::new(identity.email, identity.name, password_hash, settings);

        self.users.insert(&user).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to save federated user");
            AppError::unknown("Could not save user", slugs::USER_SAVING_ERROR)
        })?;

        Ok(user)
    }
}
