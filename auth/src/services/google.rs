use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use tally_models::auth::GoogleIdentity;

pub const GOOGLE_CERTS_URL: &str = "https://www.googleapis.com/oauth2/v3/certs";
pub const GOOGLE_ISSUERS: [&str; 2] = ["accounts.google.com", "https://accounts.google.com"];

/// Checks a Google ID token and returns the profile it asserts.
///
/// Errors are opaque; callers only need to know the assertion was refused.
#[async_trait]
pub trait GoogleIdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity>;
}

/// JWKS response from Google
#[derive(Debug, Deserialize)]
struct JwksResponse {
    keys: Vec<Jwk>,
}

/// JSON Web Key
#[derive(Debug, Clone, Deserialize, Serialize)]
struct Jwk {
    kid: String,
    kty: String,
    n: String,
    e: String,
    alg: Option<String>,
}

/// Claims of a Google ID token that this service reads
#[derive(Debug, Serialize, Deserialize)]
pub struct GoogleClaims {
    pub iss: String,
    pub aud: String,
    pub sub: String,
    pub exp: i64,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleClaims {
    pub fn into_identity(self) -> Result<GoogleIdentity> {
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| anyhow!("ID token carries no email"))?;

        Ok(GoogleIdentity {
            email,
            name: self.name.unwrap_or_default(),
            picture: self.picture.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
struct JwksCache {
    keys: Vec<Jwk>,
    fetched_at: DateTime<Utc>,
}

/// Verifies Google ID tokens against Google's published RS256 keys.
pub struct GoogleTokenVerifier {
    audience: String,
    certs_url: String,
    client: Client,
    jwks_cache: Arc<RwLock<Option<JwksCache>>>,
    cache_ttl: Duration,
}

impl GoogleTokenVerifier {
    /// `audience` is the OAuth client id the token must be issued for.
    pub fn new(audience: impl Into<String>) -> Self {
        Self::with_certs_url(audience, GOOGLE_CERTS_URL)
    }

    pub fn with_certs_url(audience: impl Into<String>, certs_url: impl Into<String>) -> Self {
        Self {
            audience: audience.into(),
            certs_url: certs_url.into(),
            client: Client::new(),
            jwks_cache: Arc::new(RwLock::new(None)),
            cache_ttl: Duration::minutes(60),
        }
    }

    async fn fetch_jwks(&self) -> Result<Vec<Jwk>> {
        tracing::debug!("Fetching Google signing keys from {}", self.certs_url);

        let response = self
            .client
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to fetch JWKS: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("JWKS fetch failed with status {}", response.status()));
        }

        let jwks: JwksResponse = response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse JWKS response: {}", e))?;

        tracing::debug!("Fetched {} Google signing keys", jwks.keys.len());
        Ok(jwks.keys)
    }

    /// Keys from cache when fresh; `force` skips the cache (used after a
    /// `kid` miss, since Google rotates keys).
    async fn get_jwks(&self, force: bool) -> Result<Vec<Jwk>> {
        if !force {
            let cache = self.jwks_cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if Utc::now() - cached.fetched_at < self.cache_ttl {
                    return Ok(cached.keys.clone());
                }
            }
        }

        let keys = self.fetch_jwks().await?;

        let mut cache = self.jwks_cache.write().await;
        *cache = Some(JwksCache {
            keys: keys.clone(),
            fetched_at: Utc::now(),
        });

        Ok(keys)
    }

    async fn find_jwk(&self, kid: &str) -> Result<Jwk> {
        if let Some(jwk) = self.get_jwks(false).await?.into_iter().find(|k| k.kid == kid) {
            return Ok(jwk);
        }

        self.get_jwks(true)
            .await?
            .into_iter()
            .find(|k| k.kid == kid)
            .ok_or_else(|| anyhow!("JWK with kid '{}' not found", kid))
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&GOOGLE_ISSUERS);
        validation.set_audience(&[&self.audience]);
        validation.validate_exp = true;
        validation
    }
}

#[async_trait]
impl GoogleIdentityVerifier for GoogleTokenVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity> {
        let header = decode_header(id_token).map_err(|e| anyhow!("Failed to decode token header: {}", e))?;

        if header.alg != Algorithm::RS256 {
            return Err(anyhow!("Unexpected signing algorithm {:?}", header.alg));
        }

        let kid = header.kid.ok_or_else(|| anyhow!("Token missing 'kid' in header"))?;
        let jwk = self.find_jwk(&kid).await?;

        if jwk.kty != "RSA" || jwk.alg.as_deref().is_some_and(|alg| alg != "RS256") {
            return Err(anyhow!("JWK '{}' is not an RS256 key", kid));
        }

        let decoding_key = DecodingKey::from_rsa_components(&jwk.n, &jwk.e)
            .map_err(|e| anyhow!("Failed to create decoding key from JWK: {}", e))?;

        let token_data = decode::<GoogleClaims>(id_token, &decoding_key, &self.validation())
            .map_err(|e| anyhow!("Token validation failed: {}", e))?;

        token_data.claims.into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims() -> GoogleClaims {
        GoogleClaims {
            iss: "https://accounts.google.com".to_string(),
            aud: "client-id".to_string(),
            sub: "1234".to_string(),
            exp: 0,
            email: Some("a@b.com".to_string()),
            email_verified: Some(true),
            name: Some("A".to_string()),
            picture: Some("https://pic".to_string()),
        }
    }

    #[test]
    fn identity_takes_profile_fields() {
        let identity = claims().into_identity().unwrap();
        assert_eq!(identity.email, "a@b.com");
        assert_eq!(identity.name, "A");
        assert_eq!(identity.picture, "https://pic");
    }

    #[test]
    fn missing_optional_profile_fields_become_empty() {
        let identity = GoogleClaims {
            name: None,
            picture: None,
            ..claims()
        }
        .into_identity()
        .unwrap();
        assert!(identity.name.is_empty());
        assert!(identity.picture.is_empty());
    }

    #[test]
    fn missing_email_is_refused() {
        assert!(GoogleClaims { email: None, ..claims() }.into_identity().is_err());
    }

    #[test]
    fn validation_pins_issuer_audience_and_algorithm() {
        let verifier = GoogleTokenVerifier::new("client-id");
        let validation = verifier.validation();

        assert_eq!(validation.algorithms, vec![Algorithm::RS256]);
        let issuers = validation.iss.unwrap();
        assert!(issuers.contains("accounts.google.com"));
        assert!(issuers.contains("https://accounts.google.com"));
        assert!(validation.aud.unwrap().contains("client-id"));
    }

    #[tokio::test]
    async fn malformed_token_fails_before_any_key_fetch() {
        let verifier = GoogleTokenVerifier::with_certs_url("client-id", "http://127.0.0.1:9/unreachable");
        assert!(verifier.verify("definitely-not-a-jwt").await.is_err());
    }
}
