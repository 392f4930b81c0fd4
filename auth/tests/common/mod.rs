#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tally_auth::services::{AuthService, GoogleIdentityVerifier, TokenCodec};
use tally_auth::AppState;
use tally_config::TokenConfig;
use tally_database::{InMemoryRefreshTokenStore, InMemoryUserStore};
use tally_models::auth::GoogleIdentity;

pub const SECRET: &str = "integration-test-secret";

pub fn token_config(secret: &str) -> TokenConfig {
    TokenConfig {
        secret: secret.to_string(),
        access_ttl_secs: 300,
        refresh_ttl_secs: 3600,
    }
}

/// Accepts only the credentials it was given, each mapping to one identity.
#[derive(Default)]
pub struct StaticGoogleVerifier {
    identities: HashMap<String, GoogleIdentity>,
}

impl StaticGoogleVerifier {
    pub fn with(mut self, credential: &str, email: &str, name: &str, picture: &str) -> Self {
        self.identities.insert(
            credential.to_string(),
            GoogleIdentity {
                email: email.to_string(),
                name: name.to_string(),
                picture: picture.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl GoogleIdentityVerifier for StaticGoogleVerifier {
    async fn verify(&self, id_token: &str) -> anyhow::Result<GoogleIdentity> {
        self.identities
            .get(id_token)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("unknown credential"))
    }
}

/// Never answers within any reasonable deadline.
pub struct StalledGoogleVerifier;

#[async_trait]
impl GoogleIdentityVerifier for StalledGoogleVerifier {
    async fn verify(&self, _id_token: &str) -> anyhow::Result<GoogleIdentity> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Err(anyhow::anyhow!("stalled"))
    }
}

pub struct Harness {
    pub service: AuthService,
    pub users: InMemoryUserStore,
    pub tokens: InMemoryRefreshTokenStore,
    /// Same secret as the service, for decoding what it issues.
    pub codec: TokenCodec,
}

pub fn harness(max_sessions: usize) -> Harness {
    harness_with_verifier(max_sessions, Arc::new(StaticGoogleVerifier::default()))
}

pub fn harness_with_verifier(max_sessions: usize, verifier: Arc<dyn GoogleIdentityVerifier>) -> Harness {
    let users = InMemoryUserStore::new();
    let tokens = InMemoryRefreshTokenStore::new();
    let service = AuthService::new(
        Arc::new(users.clone()),
        Arc::new(tokens.clone()),
        TokenCodec::new(&token_config(SECRET)),
        max_sessions,
        verifier,
    );

    Harness {
        service,
        users,
        tokens,
        codec: TokenCodec::new(&token_config(SECRET)),
    }
}

pub fn app_state(harness: Harness, request_timeout: Duration) -> (AppState, InMemoryUserStore, InMemoryRefreshTokenStore) {
    let Harness { service, users, tokens, .. } = harness;
    (AppState::new(service, request_timeout), users, tokens)
}
