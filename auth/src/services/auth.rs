//! Auth orchestrator. The only place that knows about tokens, sessions and
//! users at the same time.

use std::sync::Arc;

use uuid::Uuid;

use tally_database::{transactional, RefreshTokenStore, UserStore};
use tally_models::auth::{LoginResponse, SignedAccess, SignedRefresh, Token, User};
use tally_models::error::{slugs, AppError, AppResult};
use tally_models::settings::{Currency, UserSettings, Weekday, WeekdayPolicy};
use tally_observability::token_debug::fingerprint;
use tally_observability::{
    log_auth_failure, log_federated_sign_in, log_refresh_rotated, log_session_issued, log_settings_updated,
    log_user_registered,
};

use super::google::GoogleIdentityVerifier;
use super::identity::IdentityReconciler;
use super::security::{hash_password, verify_password};
use super::sessions::SessionLedger;
use super::tokens::{access_claims, refresh_claims, TokenCodec};
use super::SERVICE_NAME;

fn invalid_credentials() -> AppError {
    AppError::authorization("Invalid email or password", slugs::INVALID_CREDENTIALS)
}

fn invalid_token() -> AppError {
    AppError::authorization("Invalid token", slugs::INVALID_TOKEN)
}

fn could_not_authorize(reason: impl std::fmt::Display) -> AppError {
    tracing::error!(error = %reason, "Token issuance failed");
    AppError::authorization("Could not authorize user", slugs::COULD_NOT_AUTHORIZE_USER)
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    codec: Arc<TokenCodec>,
    sessions: SessionLedger,
    identities: IdentityReconciler,
    google: Arc<dyn GoogleIdentityVerifier>,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        codec: TokenCodec,
        max_sessions: usize,
        google: Arc<dyn GoogleIdentityVerifier>,
    ) -> Self {
        Self {
            identities: IdentityReconciler::new(Arc::clone(&users)),
            sessions: SessionLedger::new(refresh_tokens, max_sessions),
            codec: Arc::new(codec),
            users,
            google,
        }
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn sign_in(&self, email: &str, password: &str) -> AppResult<LoginResponse> {
        let user = match self.users.find_by_email(email).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                log_auth_failure(SERVICE_NAME, "sign_in", slugs::INVALID_CREDENTIALS, None);
                return Err(invalid_credentials());
            }
            Err(e) => return Err(e),
        };

        if !verify_password(password.to_string(), user.password_hash.clone()).await {
            log_auth_failure(SERVICE_NAME, "sign_in", slugs::INVALID_CREDENTIALS, Some(user.id));
            return Err(invalid_credentials());
        }

        self.issue_tokens(user.id).await
    }

    pub async fn sign_up(&self, email: &str, password: &str, name: &str) -> AppResult<LoginResponse> {
        match self.users.find_by_email(email).await {
            Ok(_) => {
                return Err(AppError::incorrect_input(
                    "Email is already registered",
                    slugs::FIELD_EMAIL_INVALID,
                ))
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => return Err(e),
        }

        let password_hash = hash_password(password.to_string()).await?;
        let user = User::new(email, name, password_hash, UserSettings::default());

        let staged = user.clone();
        transactional(self.users.as_ref(), move |tx| {
            Box::pin(async move { tx.insert(&staged).await })
        })
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to save user");
            AppError::unknown("Could not save user", slugs::USER_SAVING_ERROR)
        })?;

        log_user_registered(SERVICE_NAME, user.id);
        self.issue_tokens(user.id).await
    }

    /// Consumes `raw` and issues a new pair. The old row is deleted before
    /// anything new is signed, so a token can be rotated at most once.
    pub async fn refresh(&self, raw: &str) -> AppResult<LoginResponse> {
        let signed = self.codec.validate_refresh(raw)?;
        let (jti, user_id) = (signed.claims.jti, signed.claims.user_id);

        if !self.sessions.exists(jti, user_id, raw).await? {
            log_auth_failure(SERVICE_NAME, "refresh", slugs::INVALID_TOKEN, Some(user_id));
            return Err(invalid_token());
        }

        self.sessions.delete(jti).await?;

        let user = match self.users.find_by_id(user_id).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => return Err(invalid_token()),
            Err(e) => return Err(e),
        };

        log_refresh_rotated(SERVICE_NAME, user.id, &fingerprint(raw));
        self.issue_tokens(user.id).await
    }

    pub async fn google_sign_in(&self, credential: &str) -> AppResult<LoginResponse> {
        let identity = self.google.verify(credential).await.map_err(|e| {
            tracing::warn!(error = %e, "Google credential rejected");
            log_auth_failure(SERVICE_NAME, "federated_sign_in", slugs::INVALID_CREDENTIALS, None);
            AppError::incorrect_input("Invalid Google credential", slugs::INVALID_CREDENTIALS)
        })?;

        let reconciled = self.identities.reconcile(identity).await?;
        log_federated_sign_in(SERVICE_NAME, reconciled.user.id, reconciled.created);

        self.issue_tokens(reconciled.user.id).await
    }

    pub fn validate_access(&self, raw: &str) -> AppResult<Token> {
        let signed = self.codec.validate_access(raw)?;
        Ok(Token {
            value: signed.token,
            user_id: signed.claims.user_id,
        })
    }

    /// Replaces the whole settings document. Nothing is written unless both
    /// currency and first day of week parse.
    pub async fn update_settings(
        &self,
        user_id: Uuid,
        currency: &str,
        first_day_of_week: &str,
        profile_picture_url: &str,
    ) -> AppResult<User> {
        let currency: Currency = currency
            .parse()
            .map_err(|e| AppError::incorrect_input(format!("{e}"), slugs::FIELD_CURRENCY_INVALID))?;
        let first_day_of_week = Weekday::parse_with(first_day_of_week, WeekdayPolicy::Strict)
            .map_err(|e| AppError::incorrect_input(format!("{e}"), slugs::FIELD_FIRST_DAY_OF_WEEK_INVALID))?;

        let settings = UserSettings::new(currency, first_day_of_week, profile_picture_url);
        let user = self.users.replace_settings(user_id, &settings).await?;

        log_settings_updated(SERVICE_NAME, user.id);
        Ok(user)
    }

    pub async fn get_user(&self, user_id: Uuid) -> AppResult<User> {
        self.users.find_by_id(user_id).await
    }

    /// Signs both tokens in parallel, applies the session cap and stores the
    /// refresh row. Every failure here is reported as one authorization slug.
    async fn issue_tokens(&self, user_id: Uuid) -> AppResult<LoginResponse> {
        let (access, refresh) = self.sign_pair(user_id).await?;

        let sessions_before = self.sessions.enforce_cap(user_id).await.map_err(could_not_authorize)?;
        self.sessions.add(&refresh).await.map_err(could_not_authorize)?;

        log_session_issued(SERVICE_NAME, user_id, sessions_before);

        Ok(LoginResponse {
            access: Token {
                value: access.token,
                user_id,
            },
            refresh: Token {
                value: refresh.token,
                user_id,
            },
        })
    }

    async fn sign_pair(&self, user_id: Uuid) -> AppResult<(SignedAccess, SignedRefresh)> {
        let access_codec = Arc::clone(&self.codec);
        let refresh_codec = Arc::clone(&self.codec);

        let access_task = tokio::task::spawn_blocking(move || access_codec.create_access(access_claims(user_id)));
        let refresh_task = tokio::task::spawn_blocking(move || refresh_codec.create_refresh(refresh_claims(user_id)));

        let (access, refresh) = tokio::join!(access_task, refresh_task);

        let access = access.map_err(could_not_authorize)?.map_err(could_not_authorize)?;
        let refresh = refresh.map_err(could_not_authorize)?.map_err(could_not_authorize)?;

        Ok((access, refresh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tally_config::TokenConfig;
    use tally_database::{InMemoryRefreshTokenStore, InMemoryUserStore};
    use tally_models::auth::GoogleIdentity;

    struct RejectingVerifier;

    #[async_trait]
    impl GoogleIdentityVerifier for RejectingVerifier {
        async fn verify(&self, _id_token: &str) -> anyhow::Result<GoogleIdentity> {
            Err(anyhow::anyhow!("rejected"))
        }
    }

    fn service() -> (AuthService, InMemoryUserStore, InMemoryRefreshTokenStore) {
        let users = InMemoryUserStore::new();
        let tokens = InMemoryRefreshTokenStore::new();
        let codec = TokenCodec::new(&TokenConfig {
            secret: "unit-test-secret".to_string(),
            access_ttl_secs: 60,
            refresh_ttl_secs: 120,
        });
        let service = AuthService::new(
            Arc::new(users.clone()),
            Arc::new(tokens.clone()),
            codec,
            2,
            Arc::new(RejectingVerifier),
        );
        (service, users, tokens)
    }

    #[tokio::test]
    async fn duplicate_sign_up_is_rejected_as_invalid_email() {
        let (service, users, _) = service();
        service.sign_up("a@b.com", "abcde", "A").await.unwrap();

        let err = service.sign_up("a@b.com", "other", "B").await.unwrap_err();
        assert_eq!(err.slug(), slugs::FIELD_EMAIL_INVALID);
        assert_eq!(users.len().await, 1);
    }

    #[tokio::test]
    async fn failed_insert_is_a_saving_error() {
        let (service, users, tokens) = service();
        users.set_failing_inserts(true);

        let err = service.sign_up("a@b.com", "abcde", "A").await.unwrap_err();
        assert_eq!(err.slug(), slugs::USER_SAVING_ERROR);
        assert!(users.is_empty().await);
        assert_eq!(tokens.records_for_user(Uuid::nil()).await.len(), 0);
    }

    #[tokio::test]
    async fn failed_refresh_insert_cannot_authorize() {
        let (service, _, tokens) = service();
        tokens.set_failing_inserts(true);

        let err = service.sign_up("a@b.com", "abcde", "A").await.unwrap_err();
        assert_eq!(err.slug(), slugs::COULD_NOT_AUTHORIZE_USER);
    }

    #[tokio::test]
    async fn rejected_google_credential_is_incorrect_input() {
        let (service, _, _) = service();
        let err = service.google_sign_in("whatever").await.unwrap_err();
        assert_eq!(err.slug(), slugs::INVALID_CREDENTIALS);
        assert_eq!(err.kind(), tally_models::ErrorKind::IncorrectInput);
    }

    #[tokio::test]
    async fn settings_for_missing_user_are_not_found() {
        let (service, _, _) = service();
        let err = service
            .update_settings(Uuid::new_v4(), "USD", "MON", "")
            .await
            .unwrap_err();
        assert_eq!(err.slug(), slugs::USER_NOT_FOUND);
    }

    #[tokio::test]
    async fn refresh_with_garbage_token_is_invalid() {
        let (service, _, _) = service();
        let err = service.refresh("not.a.token").await.unwrap_err();
        assert_eq!(err.slug(), slugs::INVALID_TOKEN);
    }

    #[tokio::test]
    async fn access_token_is_not_a_refresh_token() {
        let (service, _, _) = service();
        let pair = service.sign_up("a@b.com", "abcde", "A").await.unwrap();

        let err = service.refresh(&pair.access.value).await.unwrap_err();
        assert_eq!(err.slug(), slugs::INVALID_TOKEN);
    }
}
